use serde::{Serialize, Deserialize};
use crate::prob::normal_log_prob;
use crate::random::RandomSource;
use crate::error::{Error, Result};
use super::StateSpaceModel;

/// Linear-Gaussian state-space model:
///
/// x_t = phi x_{t-1} + sigma_v v_t
/// y_t = x_t + sigma_e e_t
///
/// with v_t, e_t i.i.d. standard normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lgss {

    pub phi : f64,

    pub sigma_v : f64,

    pub sigma_e : f64

}

impl Lgss {

    pub fn new(phi : f64, sigma_v : f64, sigma_e : f64) -> Result<Self> {
        let m = Self { phi, sigma_v, sigma_e };
        m.validate()?;
        Ok(m)
    }

    pub fn from_theta(theta : &[f64]) -> Result<Self> {
        match theta {
            [phi, sigma_v, sigma_e] => Self::new(*phi, *sigma_v, *sigma_e),
            _ => Err(Error::DimensionMismatch { expected : 3, got : theta.len() })
        }
    }

    pub fn theta(&self) -> [f64; 3] {
        [self.phi, self.sigma_v, self.sigma_e]
    }

    /// Mean and variance of the fully-adapted proposal p(x_t | x_{t-1}, y_t),
    /// obtained by completing the square in the joint Gaussian of (x_t, y_t):
    /// the precision is sigma_v^-2 + sigma_e^-2 and the mean blends the prior
    /// prediction phi x_{t-1} with the observation.
    pub fn adapted_proposal(&self, prev : f64, y : f64) -> (f64, f64) {
        let prec_v = self.sigma_v.powi(-2);
        let prec_e = self.sigma_e.powi(-2);
        let var = 1.0 / (prec_v + prec_e);
        let mean = var * (prec_e * y + prec_v * self.phi * prev);
        (mean, var)
    }

    /// ln p(y_{t+1} | x_t) = ln N(y_{t+1}; phi x_t, sigma_v^2 + sigma_e^2), the
    /// weight attached to a particle by the fully-adapted filter.
    pub fn adapted_log_weight(&self, x : f64, y_next : f64) -> f64 {
        let stddev = (self.sigma_v.powi(2) + self.sigma_e.powi(2)).sqrt();
        normal_log_prob(y_next, self.phi * x, stddev)
    }

}

impl StateSpaceModel for Lgss {

    fn sample_transition(&self, prev : f64, rng : &mut RandomSource) -> f64 {
        self.phi * prev + self.sigma_v * rng.standard_normal()
    }

    fn sample_observation(&self, x : f64, rng : &mut RandomSource) -> f64 {
        x + self.sigma_e * rng.standard_normal()
    }

    fn log_observation(&self, y : f64, x : f64) -> f64 {
        normal_log_prob(y, x, self.sigma_e)
    }

    fn validate(&self) -> Result<()> {
        if !(self.phi.abs() < 1.0) {
            return Err(Error::InvalidParameter { name : "phi", value : self.phi });
        }
        if !(self.sigma_v > 0.0) || !self.sigma_v.is_finite() {
            return Err(Error::InvalidParameter { name : "sigma_v", value : self.sigma_v });
        }
        if !(self.sigma_e > 0.0) || !self.sigma_e.is_finite() {
            return Err(Error::InvalidParameter { name : "sigma_e", value : self.sigma_e });
        }
        Ok(())
    }

}
