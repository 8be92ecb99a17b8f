/// Chain diagnostics: sample moments, autocorrelation and integrated
/// autocorrelation time.
pub mod summary;

pub use summary::ChainSummary;

/// Bias and mean squared error of the particle filter against the exact
/// Kalman recursion, as a function of the particle count.
pub mod accuracy;

pub use accuracy::*;
