use nalgebra::*;
use serde::{Serialize, Deserialize};
use crate::fit::walk::Chain;

pub fn mean(v : &[f64]) -> f64 {
    if v.is_empty() {
        return f64::NAN;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Column means of the rows skip..; NaN when no rows remain.
pub fn column_means(m : &DMatrix<f64>, skip : usize) -> Vec<f64> {
    let n = m.nrows().saturating_sub(skip);
    (0..m.ncols())
        .map(|j| {
            if n == 0 {
                f64::NAN
            } else {
                m.column(j).rows(skip, n).sum() / n as f64
            }
        })
        .collect()
}

/// Sample covariance (n - 1 denominator) of a matrix whose rows are observations.
pub fn covariance(m : &DMatrix<f64>) -> DMatrix<f64> {
    let n = m.nrows();
    let mu = m.row_mean();
    let mut centered = m.clone();
    for mut row in centered.row_iter_mut() {
        row -= &mu;
    }
    (centered.transpose() * centered) / (n as f64 - 1.0)
}

/// Mean of v[..=k] for every k.
pub fn running_mean(v : &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    v.iter()
        .enumerate()
        .map(|(k, x)| {
            acc += x;
            acc / (k + 1) as f64
        })
        .collect()
}

/// Sample autocorrelation at lags 0..=max_lag (capped at v.len() - 1), using the
/// biased autocovariance estimator. A constant series has rho_0 = 1 and zero elsewhere.
pub fn autocorrelation(v : &[f64], max_lag : usize) -> Vec<f64> {
    let n = v.len();
    if n == 0 {
        return Vec::new();
    }
    let mu = mean(v);
    let gamma = |lag : usize| -> f64 {
        (0..(n - lag)).map(|t| (v[t] - mu) * (v[t + lag] - mu) ).sum::<f64>() / n as f64
    };
    let g0 = gamma(0);
    let max_lag = max_lag.min(n - 1);
    (0..=max_lag)
        .map(|lag| {
            if lag == 0 {
                1.0
            } else if g0 > 0.0 {
                gamma(lag) / g0
            } else {
                0.0
            }
        })
        .collect()
}

/// Integrated autocorrelation time 1 + 2 sum_{l=1}^{L} rho_l.
pub fn integrated_autocorrelation_time(v : &[f64], max_lag : usize) -> f64 {
    let rho = autocorrelation(v, max_lag);
    1.0 + 2.0 * rho.iter().skip(1).sum::<f64>()
}

/// Per-parameter posterior summary of a chain after burn-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {

    pub names : Vec<String>,

    pub burn_in : usize,

    pub mean : Vec<f64>,

    pub stddev : Vec<f64>,

    pub covariance : Vec<Vec<f64>>,

    /// Integrated autocorrelation time of each parameter.
    pub iact : Vec<f64>,

    pub acceptance_rate : f64

}

impl ChainSummary {

    pub fn new(chain : &Chain, burn_in : usize, max_lag : usize) -> Self {
        let burn_in = burn_in.min(chain.len().saturating_sub(1));
        let kept = chain.theta.rows(burn_in, chain.len() - burn_in).clone_owned();
        let cov = if kept.nrows() > 1 {
            covariance(&kept)
        } else {
            DMatrix::zeros(kept.ncols(), kept.ncols())
        };
        let iact = (0..kept.ncols())
            .map(|j| {
                let col : Vec<f64> = kept.column(j).iter().cloned().collect();
                integrated_autocorrelation_time(&col, max_lag)
            })
            .collect();
        Self {
            names : chain.names.clone(),
            burn_in,
            mean : column_means(&kept, 0),
            stddev : cov.diagonal().iter().map(|v| v.sqrt() ).collect(),
            covariance : cov.row_iter().map(|r| r.iter().cloned().collect() ).collect(),
            iact,
            acceptance_rate : chain.acceptance_rate()
        }
    }

}

impl std::fmt::Display for ChainSummary {

    fn fmt(&self, f : &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<10}{:>12}{:>12}{:>10}", "param", "mean", "sd", "iact")?;
        for (i, name) in self.names.iter().enumerate() {
            writeln!(f, "{:<10}{:>12.5}{:>12.5}{:>10.2}", name, self.mean[i], self.stddev[i], self.iact[i])?;
        }
        write!(f, "acceptance rate {:.3} (burn-in {})", self.acceptance_rate, self.burn_in)
    }

}
