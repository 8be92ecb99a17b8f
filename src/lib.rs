/// Error type shared by the models, filters and the sampler.
pub mod error;

pub use error::{Error, Result};

/// Seedable random source and the variates drawn from it (normal, uniform,
/// multinomial resampling, correlated Gaussian increments).
pub mod random;

/// Univariate densities used as observation densities and parameter priors.
pub mod prob;

/// Scalar state-space models: the linear-Gaussian model and the
/// stochastic-volatility model.
pub mod model;

/// Inference: sequential Monte Carlo and Kalman filtering of the latent states,
/// and particle Metropolis-Hastings over the model parameters.
pub mod fit;

/// Synthetic state and observation sequences.
pub mod sim;

/// Chain diagnostics and filter accuracy studies.
pub mod calc;

/// CSV and JSON input/output, and run configuration.
pub mod io;
