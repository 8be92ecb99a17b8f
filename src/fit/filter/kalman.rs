use crate::model::Lgss;
use crate::prob::normal_log_prob;
use crate::error::{Error, Result};

/// Output of the exact filter. Vectors are indexed like the observations:
/// entry 0 describes the initial state prior and carries no log-density.
#[derive(Debug, Clone)]
pub struct KalmanOutput {

    /// E[x_t | y_1..y_t].
    pub x_hat_filtered : Vec<f64>,

    /// Var[x_t | y_1..y_t].
    pub filtered_variance : Vec<f64>,

    /// ln p(y_t | y_1..y_{t-1}).
    pub log_predictive : Vec<f64>,

    pub log_likelihood : f64

}

impl KalmanOutput {

    /// Sum of the predictive log-densities over the observation indices in `range`.
    pub fn log_likelihood_over(&self, range : std::ops::Range<usize>) -> f64 {
        self.log_predictive[range].iter().sum()
    }

}

/// Scalar Kalman filter for the linear-Gaussian model, with the initial state
/// x_0 ~ N(initial_state, initial_variance). Each observation y[t], t >= 1, is
/// preceded by a prediction through the state equation; y[0] is not read.
///
/// Setting `initial_variance` to zero conditions on a known initial state, which
/// is what the fully-adapted particle filter does: its log-likelihood estimates
/// `log_likelihood_over(2..y.len())` and its filtered means estimate
/// `x_hat_filtered[..y.len() - 1]`.
pub fn kalman_filter(
    y : &[f64],
    model : &Lgss,
    initial_state : f64,
    initial_variance : f64
) -> Result<KalmanOutput> {
    if y.len() < 2 {
        return Err(Error::DimensionMismatch { expected : 2, got : y.len() });
    }
    if !(initial_variance >= 0.0) {
        return Err(Error::InvalidParameter { name : "initial_variance", value : initial_variance });
    }
    let n = y.len();
    let (a, q, r) = (model.phi, model.sigma_v.powi(2), model.sigma_e.powi(2));

    let mut x_hat_filtered = vec![initial_state; n];
    let mut filtered_variance = vec![initial_variance; n];
    let mut log_predictive = vec![0.0; n];

    let (mut x_filt, mut p_filt) = (initial_state, initial_variance);
    for t in 1..n {
        if !y[t].is_finite() {
            return Err(Error::NonFiniteObservation { index : t });
        }

        // Predict
        let x_pred = a * x_filt;
        let p_pred = a * p_filt * a + q;

        // Correct
        let s = p_pred + r;
        let gain = p_pred / s;
        x_filt = x_pred + gain * (y[t] - x_pred);
        p_filt = p_pred - gain * s * gain;

        x_hat_filtered[t] = x_filt;
        filtered_variance[t] = p_filt;
        log_predictive[t] = normal_log_prob(y[t], x_pred, s.sqrt());
    }
    let log_likelihood = log_predictive.iter().sum();
    Ok(KalmanOutput { x_hat_filtered, filtered_variance, log_predictive, log_likelihood })
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_step_by_hand() {
        let m = Lgss::new(0.5, 1.0, 0.1).unwrap();
        let out = kalman_filter(&[f64::NAN, 1.0], &m, 2.0, 0.0).unwrap();
        // x_1 | x_0 = 2 ~ N(1, 1); y_1 | x_1 ~ N(x_1, 0.01)
        let s : f64 = 1.01;
        assert_relative_eq!(out.log_predictive[1], normal_log_prob(1.0, 1.0, s.sqrt()), epsilon = 1e-14);
        assert_relative_eq!(out.x_hat_filtered[1], 1.0, epsilon = 1e-14);
        assert_relative_eq!(out.filtered_variance[1], 1.0 - 1.0 / s, epsilon = 1e-14);
        assert_relative_eq!(out.log_likelihood, out.log_predictive[1]);
    }

    #[test]
    fn variance_converges_to_riccati_fixed_point() {
        let m = Lgss::new(0.5, 1.0, 0.1).unwrap();
        let y = vec![0.0; 200];
        let out = kalman_filter(&y, &m, 0.0, 5.0).unwrap();
        let p = out.filtered_variance[199];
        let p_pred = 0.25 * p + 1.0;
        assert_relative_eq!(p, p_pred * 0.01 / (p_pred + 0.01), epsilon = 1e-12);
    }

    #[test]
    fn rejects_bad_input() {
        let m = Lgss::new(0.5, 1.0, 0.1).unwrap();
        assert!(kalman_filter(&[0.0], &m, 0.0, 0.0).is_err());
        assert!(kalman_filter(&[0.0, 1.0], &m, 0.0, -1.0).is_err());
        assert_eq!(
            kalman_filter(&[0.0, 1.0, f64::INFINITY], &m, 0.0, 0.0).unwrap_err(),
            Error::NonFiniteObservation { index : 2 }
        );
    }

}
