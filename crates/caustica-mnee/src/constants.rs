//! Solver thresholds and limits.

/// Newton iterations before the walk gives up.
pub const MAX_ITERATIONS: usize = 64;

/// Ray casts per seeding or projection query.
pub const MAX_INTERSECTION_COUNT: usize = 10;

/// Largest constraint norm accepted as converged.
pub const SOLVER_THRESHOLD: f64 = 0.001;

/// Smallest step scale before the walk gives up.
pub const MINIMUM_STEP_SIZE: f64 = 0.0001;

/// Maximum number of refractive interfaces in one chain.
pub const MAX_CAUSTIC_CASTERS: usize = 6;

/// Shortest segment between chain elements.
pub const MIN_DISTANCE: f64 = 0.001;

/// Smallest vertex displacement counted as progress.
pub const MIN_PROGRESS_DISTANCE: f64 = 0.0001;

/// Pivot blocks with a smaller determinant are singular.
pub const MIN_DETERMINANT: f64 = 0.0001;

/// Reprojection rays reach this many times the proposal distance.
pub const PROJECTION_DISTANCE_MULTIPLIER: f64 = 2.0;

/// Upper bound of the generalized geometry term.
pub const MAX_GEOMETRY_TERM: f64 = 2.0;

/// Step scale of the first Newton iteration.
pub const INITIAL_STEP_SIZE: f64 = 0.1;
