/// Gaussian random-walk increments and pilot-run step tuning.
pub mod proposal;

pub use proposal::*;

/// Parameter posteriors whose likelihood is estimated by a particle filter.
pub mod posterior;

pub use posterior::*;

/// Progress reporting hooks.
pub mod observer;

pub use observer::*;

/// Particle Metropolis-Hastings sampler.
pub mod metropolis;

pub use metropolis::*;
