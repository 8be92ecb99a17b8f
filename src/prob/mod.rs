/// Gaussian log-density, used for the observation and proposal densities
/// of both state-space models and for the location priors.
mod normal;

pub use normal::*;

/// Gamma log-density (shape/rate), used as prior for the state noise.
mod gamma;

pub use gamma::*;

// (2*pi).ln()
pub(crate) const LN_2_PI : f64 = 1.8378770664093454835606594728112352797227949472755668256343030809;

/// Trait shared by the scalar densities used as model components and priors.
/// Implementors evaluate densities at a single point, on the log scale,
/// returning -inf outside of the support.
pub trait Univariate {

    fn log_prob(&self, x : f64) -> f64;

    fn prob(&self, x : f64) -> f64 {
        self.log_prob(x).exp()
    }

}
