use super::*;
use special::Gamma as GammaFn;

/// Gamma distribution in the shape/rate parametrization (mean = shape / rate).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gamma {

    pub shape : f64,

    pub rate : f64

}

impl Gamma {

    pub fn new(shape : f64, rate : f64) -> Self {
        Self { shape, rate }
    }

    pub fn mean(&self) -> f64 {
        self.shape / self.rate
    }

}

impl Univariate for Gamma {

    fn log_prob(&self, x : f64) -> f64 {
        if x < 0.0 || x.is_nan() {
            return f64::NEG_INFINITY;
        }
        // (shape - 1) ln x vanishes for shape 1, including at x = 0.
        let kernel = if self.shape == 1.0 { 0.0 } else { (self.shape - 1.0)*x.ln() };
        self.shape * self.rate.ln() - GammaFn::ln_gamma(self.shape).0 + kernel - self.rate * x
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exponential_special_case() {
        let g = Gamma::new(1.0, 2.0);
        assert_relative_eq!(g.log_prob(0.5), 2f64.ln() - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn shape_two_rate_ten() {
        // dgamma(0.2, 2, 10, log = TRUE) = log(100 * 0.2 * exp(-2))
        let g = Gamma::new(2.0, 10.0);
        assert_relative_eq!(g.log_prob(0.2), (20.0f64).ln() - 2.0, epsilon = 1e-12);
        assert_relative_eq!(g.mean(), 0.2);
    }

    #[test]
    fn outside_support() {
        let g = Gamma::new(3.0, 10.0);
        assert_eq!(g.log_prob(-0.1), f64::NEG_INFINITY);
        assert_eq!(g.log_prob(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn exponential_density_at_origin() {
        let g = Gamma::new(1.0, 2.0);
        assert_relative_eq!(g.log_prob(0.0), 2f64.ln(), epsilon = 1e-12);
    }

}
