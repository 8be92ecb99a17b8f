use serde::{Serialize, Deserialize};
use crate::random::RandomSource;
use crate::error::Result;

/// Linear-Gaussian state-space model, with its fully-adapted proposal.
pub mod lgss;

pub use lgss::*;

/// Stochastic-volatility model, in the natural and in the unconstrained
/// (tanh/exp) parametrization.
pub mod sv;

pub use sv::*;

/// Scalar state-space model: a Markov transition for the latent state
/// and a conditionally-independent observation density. Implementors are
/// plain parameter holders; every method is a pure function of the parameters,
/// the state and the random source.
pub trait StateSpaceModel {

    /// Draws x_t ~ f(x_t | x_{t-1}).
    fn sample_transition(&self, prev : f64, rng : &mut RandomSource) -> f64;

    /// Draws y_t ~ g(y_t | x_t).
    fn sample_observation(&self, x : f64, rng : &mut RandomSource) -> f64;

    /// ln g(y_t | x_t).
    fn log_observation(&self, y : f64, x : f64) -> f64;

    /// Verifies the parameters lie in the region where the model is defined
    /// (stationary state process, positive noise scales).
    fn validate(&self) -> Result<()>;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

}

/// Any of the supported models, as read from a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum Model {
    Lgss(Lgss),
    Sv(Sv)
}

impl Model {

    pub fn validate(&self) -> Result<()> {
        match self {
            Model::Lgss(m) => m.validate(),
            Model::Sv(m) => m.validate()
        }
    }

    /// Parameter vector in the canonical order of the variant:
    /// (phi, sigma_v, sigma_e) or (mu, phi, sigma_v).
    pub fn theta(&self) -> [f64; 3] {
        match self {
            Model::Lgss(m) => m.theta(),
            Model::Sv(m) => m.theta()
        }
    }

}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn model_from_json() {
        let m : Model = serde_json::from_str(r#"{"model":"sv","mu":0.0,"phi":0.9,"sigma_v":0.2}"#).unwrap();
        assert_eq!(m, Model::Sv(Sv { mu : 0.0, phi : 0.9, sigma_v : 0.2 }));
        assert_eq!(m.theta(), [0.0, 0.9, 0.2]);
    }

    #[test]
    fn invalid_model_is_reported() {
        let m = Model::Lgss(Lgss { phi : 1.2, sigma_v : 1.0, sigma_e : 0.1 });
        assert!(m.validate().is_err());
    }

}
