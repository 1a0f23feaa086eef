/// Upper bound on any link-scale score a leaf update may produce.
pub const MAX_LINK_SCORE: f64 = 19.0;
/// Lower bound on any link-scale score a leaf update may produce.
pub const MIN_LINK_SCORE: f64 = -19.0;
/// Row count from which per-observation passes run on the rayon pool.
pub const PARALLEL_MIN_ROWS: usize = 16_384;
/// Newton iterations used for the Bernoulli initial score when an offset is present.
pub const INIT_NEWTON_ITERATIONS: usize = 6;

pub const DEFAULT_N_TREES: usize = 100;
pub const DEFAULT_SHRINKAGE: f64 = 0.1;
pub const DEFAULT_BAG_FRACTION: f64 = 0.5;
pub const DEFAULT_MIN_OBS_IN_NODE: usize = 10;
