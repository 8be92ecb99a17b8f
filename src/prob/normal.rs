use super::*;

/// Normal distribution parametrized by its location and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {

    pub loc : f64,

    pub scale : f64

}

impl Normal {

    pub fn new(loc : f64, scale : f64) -> Self {
        Self { loc, scale }
    }

    pub fn standard() -> Self {
        Self { loc : 0.0, scale : 1.0 }
    }

}

impl Default for Normal {

    fn default() -> Self {
        Self::standard()
    }

}

/// ln N(x; mu, stddev^2). Evaluating at an infinite or NaN point, or with a
/// non-positive standard deviation, gives -inf or NaN the way the closed form does.
pub fn normal_log_prob(x : f64, mu : f64, stddev : f64) -> f64 {
    let z = (x - mu) / stddev;
    -0.5 * LN_2_PI - stddev.ln() - 0.5 * z * z
}

impl Univariate for Normal {

    fn log_prob(&self, x : f64) -> f64 {
        normal_log_prob(x, self.loc, self.scale)
    }

}
