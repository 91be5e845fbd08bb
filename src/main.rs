//! Headless demo: play a handful of rounds against the in-memory ledger and
//! print what the fall discovered.
//!
//! Usage: skydrop [rounds] [bet]

use std::time::Instant;

use log::info;

use skydrop::ledger::InMemoryLedger;
use skydrop::session::Session;
use skydrop::sim::state::GameEvent;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let rounds: u32 = args
        .next()
        .and_then(|a| a.parse().ok())
        .unwrap_or(5);
    let bet: f64 = args
        .next()
        .and_then(|a| a.parse().ok())
        .unwrap_or(10.0);

    let mut session = Session::new(InMemoryLedger::new(), "demo", "demo-client-seed");
    info!("starting balance {:.2}", session.balance());

    for n in 1..=rounds {
        let round = match session.place_bet(bet) {
            Ok(round) => round,
            Err(err) => {
                eprintln!("round {n}: {err}");
                break;
            }
        };
        println!(
            "round {n}: bet {bet:.2}, bucket {} (x{:.2})",
            round.outcome.bucket.as_str(),
            round.outcome.multiplier
        );
        if let Err(err) = session.start_fall() {
            eprintln!("round {n}: {err}");
            break;
        }

        let started = Instant::now();
        let mut ticks = 0u64;
        loop {
            let events = match session.tick() {
                Ok(events) => events,
                Err(err) => {
                    eprintln!("round {n}: {err}");
                    return;
                }
            };
            ticks += 1;
            for event in &events {
                match event {
                    GameEvent::Grabbed => println!("  grabbed by a dark cloud"),
                    GameEvent::Released => println!("  released"),
                    GameEvent::BonusEntered { multiplier } => {
                        println!("  black hole! showcasing x{multiplier:.1}")
                    }
                    GameEvent::Died => println!("  down in flames"),
                    GameEvent::Landed { payout } => println!("  landed: payout {payout:.2}"),
                    _ => {}
                }
            }
            let settled = session
                .round()
                .map(|r| r.is_settled())
                .unwrap_or(true);
            if settled {
                break;
            }
        }

        match session.resolve() {
            Ok(payout) => println!(
                "  resolved {payout:.2} after {ticks} ticks ({:.0} ms), balance {:.2}",
                started.elapsed().as_secs_f64() * 1000.0,
                session.balance()
            ),
            Err(err) => eprintln!("round {n}: {err}"),
        }
    }

    println!("final balance {:.2}", session.balance());
}
