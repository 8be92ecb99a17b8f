use serde::{Serialize, Deserialize};
use tracing::debug;
use crate::model::Lgss;
use crate::fit::filter::{particle_filter, kalman_filter};
use crate::random::RandomSource;
use crate::error::{Error, Result};

/// Error of the fully-adapted filter against the Kalman filter at one particle count,
/// pooled over time steps and replicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRow {

    pub n_particles : usize,

    /// Mean of x_hat_pf[t] - x_hat_kf[t].
    pub state_bias : f64,

    /// Mean of (x_hat_pf[t] - x_hat_kf[t])^2.
    pub state_mse : f64,

    /// Mean of log L_pf - log L_kf over replicates.
    pub log_likelihood_bias : f64,

    pub log_likelihood_mse : f64

}

/// Bias and mean squared error of the particle filter estimates of the filtered
/// states and the log-likelihood of an LGSS sequence, for each particle count.
/// The exact values come from the Kalman filter started at the same known state.
/// Replicate r of count index k draws from `rng.stream(k * n_replicates + r)`, so
/// every cell of the table is reproducible on its own.
pub fn filter_accuracy(
    y : &[f64],
    model : &Lgss,
    initial_state : f64,
    particle_counts : &[usize],
    n_replicates : usize,
    rng : &RandomSource
) -> Result<Vec<AccuracyRow>> {
    if n_replicates == 0 {
        return Err(Error::NoIterations);
    }
    let exact = kalman_filter(y, model, initial_state, 0.0)?;
    let exact_ll = exact.log_likelihood_over(2..y.len());
    let mut rows = Vec::with_capacity(particle_counts.len());
    for (k, n) in particle_counts.iter().enumerate() {
        let (mut bias, mut sq, mut count) = (0.0, 0.0, 0usize);
        let (mut ll_bias, mut ll_sq) = (0.0, 0.0);
        for r in 0..n_replicates {
            let mut stream = rng.stream((k * n_replicates + r) as u64);
            let out = particle_filter(y, model, *n, initial_state, &mut stream)?;
            for (est, truth) in out.x_hat_filtered.iter().zip(exact.x_hat_filtered.iter()) {
                let e = est - truth;
                bias += e;
                sq += e * e;
                count += 1;
            }
            let e = out.log_likelihood - exact_ll;
            ll_bias += e;
            ll_sq += e * e;
        }
        let row = AccuracyRow {
            n_particles : *n,
            state_bias : bias / count as f64,
            state_mse : sq / count as f64,
            log_likelihood_bias : ll_bias / n_replicates as f64,
            log_likelihood_mse : ll_sq / n_replicates as f64
        };
        debug!(n_particles = n, state_mse = row.state_mse, log_likelihood_mse = row.log_likelihood_mse, "accuracy row");
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::sim;

    #[test]
    fn error_shrinks_with_particle_count() {
        let m = Lgss::new(0.5, 1.0, 0.1).unwrap();
        let data = sim::generate_lgss(&m, 100, 0.0, &mut RandomSource::new(100));
        let rows = filter_accuracy(&data.y, &m, 0.0, &[20, 1000], 3, &RandomSource::new(7)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].state_mse < rows[0].state_mse);
        assert!(rows[1].state_bias.abs() < 0.01);
        assert!(rows[1].log_likelihood_mse < 1.0);
    }

    #[test]
    fn rows_are_reproducible() {
        let m = Lgss::new(0.7, 0.5, 0.3).unwrap();
        let data = sim::generate_lgss(&m, 30, 0.0, &mut RandomSource::new(1));
        let a = filter_accuracy(&data.y, &m, 0.0, &[10, 50], 2, &RandomSource::new(3)).unwrap();
        let b = filter_accuracy(&data.y, &m, 0.0, &[10, 50], 2, &RandomSource::new(3)).unwrap();
        assert_eq!(a, b);
        assert!(filter_accuracy(&data.y, &m, 0.0, &[10], 0, &RandomSource::new(3)).is_err());
    }

}
