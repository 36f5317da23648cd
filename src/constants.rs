/// Rating points per factor-of-ten change in win odds (ELO scale)
pub const ELO_SCALE: f64 = 400.0;

/// Rating scale slope for converting a projected win percentage to a rating
pub const ELO_PER_WIN_PCT: f64 = 706.0;

/// Rating of a team projected to win no games; centres a .500 team near 1500
pub const ELO_AT_ZERO_WIN_PCT: f64 = 1147.0;

/// Playoff teams per league
pub const DEFAULT_PLAYOFF_SEEDS: u32 = 6;

/// Trials simulated by a single batch unless configured otherwise
pub const DEFAULT_TRIALS_PER_BATCH: u32 = 100;

/// Offsets (in units of the configured magnitude) drawn per team when
/// perturbing ratings. Half the teams keep their rating on average.
pub const PERTURBATION_OFFSETS: [f64; 4] = [-1.0, 1.0, 0.0, 0.0];

/// Multiplier for job id in the composite run id
pub const RUN_ID_STRIDE: u64 = 10_000;

/// Number of distinct batch sizes produced by the job size distribution
pub const JOB_SIZE_STEPS: u32 = 9;
