/// Generic sequential importance resampling engine, with the fully-adapted
/// (linear-Gaussian) and bootstrap (stochastic volatility) proposals.
pub mod particle;

pub use particle::*;

/// Exact scalar Kalman recursion, used as a reference for the particle filter
/// on the linear-Gaussian model.
pub mod kalman;

pub use kalman::*;
