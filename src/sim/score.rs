//! Score reconciliation
//!
//! The displayed score is never earned by gameplay; it is read off the
//! committed progression curve at the body's current depth, then scaled by
//! the grab factor (dark-cloud grabs halve the display and recover on
//! release). Landing snaps straight to the final milestone, so the curve's
//! endpoint IS the payout.

use crate::round_payout;
use crate::script::ScorePoint;

/// Piecewise-linear lookup over the committed milestones
#[derive(Debug, Clone)]
pub struct ScoreCurve {
    points: Vec<ScorePoint>,
}

impl ScoreCurve {
    pub fn new(points: Vec<ScorePoint>) -> Self {
        Self { points }
    }

    /// Committed payout (final milestone)
    pub fn payout(&self) -> f64 {
        self.points.last().map(|p| p.score).unwrap_or(0.0)
    }

    /// Interpolated curve value at depth `y`, clamped to the endpoints
    pub fn value_at(&self, y: f32) -> f64 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        if y <= first.y {
            return first.score;
        }
        let last = self.points.last().unwrap();
        if y >= last.y {
            return last.score;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if y <= b.y {
                if b.y <= a.y {
                    return b.score;
                }
                let t = ((y - a.y) / (b.y - a.y)) as f64;
                return a.score + (b.score - a.score) * t;
            }
        }
        last.score
    }

    /// Displayed score: curve value scaled by the display factor, floored
    /// to two decimals like every other money amount. The factor runs below
    /// 1.0 after a grab and above 1.0 after a bonus exit.
    pub fn displayed(&self, y: f32, factor: f64) -> f64 {
        round_payout(self.value_at(y) * factor.max(0.0))
    }
}
