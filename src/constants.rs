//! Constants used throughout the solver

/// Number of landmark correspondences the solver is tuned for
pub const NUM_POSE_LANDMARKS: usize = 6;

/// Number of residuals (u, v per landmark)
pub const NUM_RESIDUALS: usize = 2 * NUM_POSE_LANDMARKS;

/// Default image dimensions when the caller supplies none
pub const DEFAULT_IMAGE_WIDTH: u32 = 640;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 480;

/// Camera matrix center factor
pub const CAMERA_CENTER_FACTOR: f64 = 2.0;

/// Guard added to spread denominators in the initial guess
pub const INIT_EPSILON: f64 = 1e-6;

/// Damping applied to the closed-form rotation proxies
pub const INIT_ROTATION_DAMPING: f64 = 0.5;

/// Pivot magnitude below which a linear system is treated as singular
pub const PIVOT_EPSILON: f64 = 1e-10;

/// Rotation angle below which Rodrigues returns the identity
pub const ROTATION_EPSILON: f64 = 1e-10;

/// `sy` threshold separating the regular and gimbal-lock Euler branches
pub const GIMBAL_LOCK_EPSILON: f64 = 1e-6;

/// Levenberg-Marquardt defaults
pub const DEFAULT_MAX_ITERATIONS: usize = 30;
pub const DEFAULT_INITIAL_DAMPING: f64 = 1e-3;
pub const DEFAULT_DAMPING_DECREASE: f64 = 0.1;
pub const DEFAULT_DAMPING_INCREASE: f64 = 10.0;
pub const DEFAULT_ERROR_CHANGE_TOLERANCE: f64 = 1e-8;
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.01;
pub const DEFAULT_MAX_STEP_NORM: f64 = 1.0;
pub const DEFAULT_CLAMPED_STEP_NORM: f64 = 0.5;

/// Number of decimals printed by the CLI
pub const DEFAULT_OUTPUT_PRECISION: usize = 2;
