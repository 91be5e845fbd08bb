//! Deterministic simulation module
//!
//! All round physics lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (the round's visual stream)
//! - Stable iteration order (script spawn order)
//! - No rendering or platform dependencies
//!
//! The sim never decides what a round pays. It *discovers* the committed
//! stop the script placed, and the score curve maps the body's depth to the
//! displayed number.

pub mod collision;
pub mod score;
pub mod state;
pub mod tick;
pub mod world;

pub use collision::{Contact, circle_contact, rect_contact, reflect_velocity};
pub use score::ScoreCurve;
pub use state::{BodyState, GameEvent, Round, RoundStatus};
pub use tick::{advance, tick};
pub use world::{Collectible, Obstacle, Shape, World};
