//! Default values and numeric constants.

/// Maximal depth set as default.
pub const DEFAULT_MAX_DEPTH:  i32 = 30;
/// Minimal weighted size of a node to attempt a split.
pub const DEFAULT_MIN_SPLIT:  f64 = 20f64;
/// Minimal weighted size of a leaf.
pub const DEFAULT_MIN_BUCKET: f64 = 7f64;
/// Complexity parameter set as default.
pub const DEFAULT_CP:         f64 = 0.01;

/// Categorical features with at most this many observed levels
/// are split by enumerating every subset of levels.
pub const MAX_EXHAUSTIVE_LEVELS: usize = 12;

/// Nodes with at least this many observations grow
/// their children on separate rayon tasks.
pub const PARALLEL_THRESHOLD: usize = 2_048;

/// Deviances below this value are treated as zero.
pub const NUMERIC_TOLERANCE: f64 = 1e-10;

/// Initial capacity of a column built by appending.
pub const BUFFER_SIZE: usize = 256;
