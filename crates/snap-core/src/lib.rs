//! Core type aliases, constants, and runtime utilities for snapcall.
//!
//! Everything here is shared across the workspace: numeric vocabulary,
//! solver tuning parameters, and the small amount of process-level
//! runtime (logging, interrupts) that long training runs need.

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Stack sizes, pot sizes, and bet amounts in big blinds.
pub type Chips = i16;
/// Seat index around the table (0 = button in heads-up).
pub type Position = usize;
/// Distance metrics, divergence penalties, and smoothing terms.
pub type Energy = f32;
/// Temperature parameters and information-theoretic measures.
pub type Entropy = f32;
/// Expected values, regrets, and payoffs.
pub type Utility = f32;
/// Strategy weights, sampling distributions, and reach probabilities.
pub type Probability = f32;

// ============================================================================
// TRAITS
// ============================================================================
/// Random instance generation for testing and Monte Carlo sampling.
pub trait Arbitrary {
    /// Generate a uniformly random instance.
    fn random() -> Self;
}

// ============================================================================
// GAME TREE PARAMETERS
// ============================================================================
/// Largest table size the solver supports.
pub const MAX_PLAYERS: usize = 6;
/// Maximum re-raises per betting round (limits tree width).
pub const MAX_RAISE_REPEATS: usize = 3;
/// Maximum abstract actions per street (4-bit packed path capacity).
pub const MAX_STREET_PLIES: usize = 16;
/// Maximum node depth when materializing a subgame tree.
pub const MAX_DEPTH_SUBGAME: usize = 16;

// ============================================================================
// REGRET MATCHING
// Convert cumulative regrets to current iteration strategy via normalization.
// ============================================================================
/// Minimum policy weight to prevent division by zero in normalization.
pub const POLICY_MIN: Probability = Probability::MIN_POSITIVE;
/// Floor for cumulative regret storage (prevents unbounded negative growth).
pub const REGRET_MIN: Utility = -3e5;
/// Ceiling for cumulative regret storage (keeps f32 accumulation exact-ish).
pub const REGRET_MAX: Utility = 3e5;

// ============================================================================
// NEGATIVE-REGRET PRUNING
// Walker actions with regret below -PRUNE_SCALE/sqrt(t) are skipped, unless
// that would leave the infoset with no actions at all.
// ============================================================================
/// Numerator of the epoch-dependent pruning threshold.
pub const PRUNE_SCALE: Utility = 3e5;
/// Warm-up epochs before pruning activates (let regrets stabilize first).
pub const PRUNING_WARMUP: usize = 524288;

// ============================================================================
// TRAINING SCHEDULE
// Epoch thresholds partitioning a run into discount / explore / prune /
// freeze behavior.
// ============================================================================
/// Epochs of discounted accumulation before discounting stops.
pub const DISCOUNT_HORIZON: usize = 262144;
/// Epochs after which the average strategy is frozen (regrets still learn).
pub const FREEZE_HORIZON: usize = 16777216;
/// Trees sampled per epoch (parallelized across threads).
pub const CFR_BATCH_SIZE: usize = 128;
/// Interval between progress log messages during training.
pub const TRAINING_LOG_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

// ============================================================================
// REGRET INITIALIZATION BIAS
// Weights (not probabilities) for initial regret seeding. Only ratios matter.
// ============================================================================
/// Initial regret weight for fold actions (high = fold more often early).
pub const BIAS_FOLDS: Utility = 3.0;
/// Initial regret weight for raise actions (low = raise less often early).
pub const BIAS_RAISE: Utility = 0.5;
/// Initial regret weight for call/check actions (baseline).
pub const BIAS_OTHER: Utility = 1.0;

// ============================================================================
// SUBGAME RESOLVING
// Real-time refinement of the blueprint strategy at decision points.
// ============================================================================
/// Fewest epochs a resolve must run before its output is trusted.
pub const SUBGAME_MIN_ITERATIONS: usize = 128;
/// Most epochs a resolve will run regardless of remaining budget.
pub const SUBGAME_MAX_ITERATIONS: usize = 8192;
/// Streets past the root street a subgame explores before bottoming out.
pub const SUBGAME_STREETS: usize = 1;
/// Total regret mass seeded at the subgame root, split by blueprint odds.
pub const SUBGAME_WARMTH: Utility = 8.0;
/// Minimum probability kept on each sentinel bet family after resolving.
pub const SENTINEL_FLOOR: Probability = 0.02;

// ============================================================================
// KL REGULARIZATION
// Penalty anchoring re-solved strategies to the blueprint. Later streets
// anchor harder; acting out of position adds a constant bonus.
// ============================================================================
/// Per-street base penalty weight, preflop through river.
pub const KL_STREET: [Energy; 4] = [0.05, 0.10, 0.20, 0.35];
/// Additive penalty bonus when the hero acts out of position.
pub const KL_OOP_BONUS: Energy = 0.05;
/// Floor on blueprint probabilities inside the divergence term.
pub const KL_EPSILON: Probability = 1e-3;

// ============================================================================
// LEAF EVALUATION
// ============================================================================
/// Bounded leaf-value cache capacity (entries, FIFO eviction).
pub const LEAF_CACHE_LIMIT: usize = 65536;
/// Rollout samples averaged per uncached leaf.
pub const LEAF_ROLLOUTS: usize = 32;

// ============================================================================
// RUNOUT FAN-OUT
// ============================================================================
/// Future board run-outs sampled per coordinated resolve.
pub const RUNOUT_SAMPLES: usize = 8;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Global interrupt flag for graceful shutdown coordination.
static INTERRUPTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Request a graceful stop after the current training batch.
pub fn interrupt() {
    INTERRUPTED.store(true, std::sync::atomic::Ordering::Relaxed);
}

/// Check if a graceful stop was requested (via stdin "Q" or [`interrupt`]).
pub fn interrupted() -> bool {
    INTERRUPTED.load(std::sync::atomic::Ordering::Relaxed)
}

/// Register graceful interrupt handler. Type "Q" + Enter to stop after the
/// current batch.
pub fn brb() {
    std::thread::spawn(|| {
        loop {
            let ref mut buffer = String::new();
            if let Ok(_) = std::io::stdin().read_line(buffer) {
                if buffer.trim().to_uppercase() == "Q" {
                    log::warn!("graceful interrupt requested, finishing current batch...");
                    interrupt();
                    break;
                }
            }
        }
    });
}

/// Optional training duration limit from the TRAIN_DURATION env var
/// (e.g., "30s", "5m", "2h", "1d").
pub fn duration_limit() -> Option<std::time::Duration> {
    std::env::var("TRAIN_DURATION")
        .ok()
        .and_then(|s| parse_duration(&s))
}

/// Parse duration string like "30s", "5m", "2h", "1d" into Duration.
fn parse_duration(s: &str) -> Option<std::time::Duration> {
    let s = s.trim();
    let (num, unit) = s.split_at(s.len().saturating_sub(1));
    let value: u64 = num.parse().ok()?;
    match unit {
        "s" => Some(std::time::Duration::from_secs(value)),
        "m" => Some(std::time::Duration::from_secs(value * 60)),
        "h" => Some(std::time::Duration::from_secs(value * 3600)),
        "d" => Some(std::time::Duration::from_secs(value * 86400)),
        _ => None,
    }
}
