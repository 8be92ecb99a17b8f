/// Online filtering algorithms: particle filters returning a state estimate
/// together with an unbiased likelihood estimate, and the Kalman filter for the
/// linear-Gaussian case.
pub mod filter;

/// Full posterior estimation via random walk simulation (particle
/// Metropolis-Hastings), with the random-walk proposals, the parameter
/// transforms and the per-model posterior targets it needs.
pub mod walk;
