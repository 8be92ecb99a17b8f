use serde::{Serialize, Deserialize};
use crate::prob::normal_log_prob;
use crate::random::RandomSource;
use crate::error::{Error, Result};
use super::StateSpaceModel;

/// Stochastic volatility model for (demeaned) log-returns:
///
/// x_t = mu + phi (x_{t-1} - mu) + sigma_v v_t
/// y_t = exp(x_t / 2) e_t
///
/// where x_t is the log-volatility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sv {

    pub mu : f64,

    pub phi : f64,

    pub sigma_v : f64

}

impl Sv {

    pub fn new(mu : f64, phi : f64, sigma_v : f64) -> Result<Self> {
        let m = Self { mu, phi, sigma_v };
        m.validate()?;
        Ok(m)
    }

    pub fn from_theta(theta : &[f64]) -> Result<Self> {
        match theta {
            [mu, phi, sigma_v] => Self::new(*mu, *phi, *sigma_v),
            _ => Err(Error::DimensionMismatch { expected : 3, got : theta.len() })
        }
    }

    pub fn theta(&self) -> [f64; 3] {
        [self.mu, self.phi, self.sigma_v]
    }

    /// Builds the model from (mu, psi, zeta), with phi = tanh(psi) and
    /// sigma_v = exp(zeta). Any real input maps into the valid region
    /// (up to floating-point saturation of tanh).
    pub fn from_unconstrained(z : &[f64; 3]) -> Self {
        Self { mu : z[0], phi : z[1].tanh(), sigma_v : z[2].exp() }
    }

    /// Inverse of `from_unconstrained`: (mu, atanh(phi), ln(sigma_v)).
    pub fn to_unconstrained(&self) -> [f64; 3] {
        [self.mu, self.phi.atanh(), self.sigma_v.ln()]
    }

    /// ln |d theta / d z| for the map z -> theta above:
    /// d tanh(psi)/d psi = 1 - phi^2 and d exp(zeta)/d zeta = sigma_v.
    pub fn log_jacobian(&self) -> f64 {
        (1.0 - self.phi.powi(2)).abs().ln() + self.sigma_v.abs().ln()
    }

    pub fn stationary_stddev(&self) -> f64 {
        self.sigma_v / (1.0 - self.phi.powi(2)).sqrt()
    }

    /// Draw from the stationary law N(mu, sigma_v^2 / (1 - phi^2)).
    pub fn sample_stationary(&self, rng : &mut RandomSource) -> f64 {
        rng.normal(self.mu, self.stationary_stddev())
    }

}

impl StateSpaceModel for Sv {

    fn sample_transition(&self, prev : f64, rng : &mut RandomSource) -> f64 {
        self.mu + self.phi * (prev - self.mu) + self.sigma_v * rng.standard_normal()
    }

    fn sample_observation(&self, x : f64, rng : &mut RandomSource) -> f64 {
        (x / 2.0).exp() * rng.standard_normal()
    }

    fn log_observation(&self, y : f64, x : f64) -> f64 {
        normal_log_prob(y, 0.0, (x / 2.0).exp())
    }

    fn validate(&self) -> Result<()> {
        if !self.mu.is_finite() {
            return Err(Error::InvalidParameter { name : "mu", value : self.mu });
        }
        if !(self.phi.abs() < 1.0) {
            return Err(Error::InvalidParameter { name : "phi", value : self.phi });
        }
        if !(self.sigma_v > 0.0) || !self.sigma_v.is_finite() {
            return Err(Error::InvalidParameter { name : "sigma_v", value : self.sigma_v });
        }
        Ok(())
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unconstrained_round_trip() {
        for phi in [-0.99, -0.5, 0.0, 0.3, 0.95, 0.999].iter() {
            for sigma_v in [1e-3, 0.16, 1.0, 7.5].iter() {
                let m = Sv::new(0.2, *phi, *sigma_v).unwrap();
                let back = Sv::from_unconstrained(&m.to_unconstrained());
                assert_relative_eq!(back.phi, *phi, epsilon = 1e-12);
                assert_relative_eq!(back.sigma_v, *sigma_v, max_relative = 1e-12);
                assert_eq!(back.mu, 0.2);
            }
        }
    }

    #[test]
    fn jacobian_matches_numerical_derivative() {
        let z = [0.1, 0.8, -1.3];
        let m = Sv::from_unconstrained(&z);
        let h = 1e-6;
        let dphi = ((z[1] + h).tanh() - (z[1] - h).tanh()) / (2.0 * h);
        let dsig = ((z[2] + h).exp() - (z[2] - h).exp()) / (2.0 * h);
        assert_relative_eq!(m.log_jacobian(), (dphi * dsig).ln(), epsilon = 1e-8);
    }

    #[test]
    fn validation() {
        assert!(Sv::new(0.0, 1.0, 0.2).is_err());
        assert!(Sv::new(0.0, 0.9, 0.0).is_err());
        assert!(Sv::new(f64::INFINITY, 0.9, 0.2).is_err());
        assert!(Sv::new(-1.0, 0.97, 0.15).is_ok());
    }

    #[test]
    fn observation_density_scales_with_volatility() {
        let m = Sv::new(0.0, 0.9, 0.2).unwrap();
        // y ~ N(0, exp(x)); x = 0 gives a standard normal.
        assert_relative_eq!(m.log_observation(0.0, 0.0), -0.5 * crate::prob::LN_2_PI, epsilon = 1e-12);
        assert!(m.log_observation(3.0, 2.0) > m.log_observation(3.0, -2.0));
    }

}
