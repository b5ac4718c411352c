//! Blueprint training binary.
//!
//! Trains the bundled micro game against the compact store and checkpoints
//! into `checkpoints/` on exit, resuming from the newest complete stem when
//! one exists. Press 'Q + Enter' to stop gracefully; TRAIN_DURATION
//! (e.g. "30s", "5m", "2h") caps wall-clock time.

use snap_core::*;
use snap_mccfr::DenseStore;
use snap_mccfr::SolverError;
use snap_mccfr::Trainer;
use snap_nlhe::Abstractor;
use snap_nlhe::Micro;
use std::path::Path;

fn main() {
    log();
    brb();
    deadline();
    let dir = Path::new("checkpoints");
    let game = Micro::default();
    let expected = game.fingerprint();
    let mut trainer = match snap_mccfr::load::<DenseStore>(dir, Some(expected)) {
        Ok(profile) => Trainer::resume(game, profile),
        Err(SolverError::NoCheckpoint(_)) => Trainer::new(game),
        Err(err) => {
            log::error!("refusing to train over {}: {}", dir.display(), err);
            std::process::exit(1);
        }
    };
    trainer.solve(usize::MAX);
    let stem = format!("blueprint.{:012}", trainer.profile().epochs());
    snap_mccfr::save(trainer.profile(), dir, &stem).expect("checkpoint");
}

/// Arms the optional wall-clock limit.
fn deadline() {
    if let Some(limit) = duration_limit() {
        std::thread::spawn(move || {
            std::thread::sleep(limit);
            log::warn!("duration limit reached, finishing current batch...");
            interrupt();
        });
    }
}
