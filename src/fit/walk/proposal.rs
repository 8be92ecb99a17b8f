use nalgebra::*;
use crate::random::RandomSource;
use crate::error::{Error, Result};
use crate::calc::summary;

/// Scale of the Gaussian random-walk increment, chosen by the walk dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSize {

    /// Standard deviation of the increment of a one-dimensional walk.
    Scalar(f64),

    /// Covariance matrix of the increment of a multi-dimensional walk.
    Covariance(DMatrix<f64>)

}

impl StepSize {

    /// Diagonal covariance built from per-coordinate standard deviations.
    pub fn diagonal(stddevs : &[f64]) -> Self {
        let d = DVector::from_iterator(stddevs.len(), stddevs.iter().map(|s| s * s ));
        StepSize::Covariance(DMatrix::from_diagonal(&d))
    }

}

/// Gaussian random walk: proposed = current + L z, z ~ N(0, I), with L the
/// lower Cholesky factor of the step covariance (or the scalar step itself).
/// The proposal is symmetric, so it drops out of the acceptance ratio.
#[derive(Debug, Clone)]
pub struct RandomWalkProposal {

    chol_l : DMatrix<f64>

}

impl RandomWalkProposal {

    pub fn new(step : &StepSize, dim : usize) -> Result<Self> {
        match step {
            StepSize::Scalar(s) => {
                if dim != 1 {
                    return Err(Error::InvalidStepSize(
                        format!("scalar step size given for a {}-dimensional walk", dim)
                    ));
                }
                if !(*s > 0.0) || !s.is_finite() {
                    return Err(Error::InvalidStepSize(format!("scalar step size must be positive, got {}", s)));
                }
                Ok(Self { chol_l : DMatrix::from_element(1, 1, *s) })
            },
            StepSize::Covariance(cov) => {
                if cov.nrows() != dim || cov.ncols() != dim {
                    return Err(Error::InvalidStepSize(format!(
                        "covariance is {}x{} for a {}-dimensional walk", cov.nrows(), cov.ncols(), dim
                    )));
                }
                if cov.iter().any(|c| !c.is_finite() ) {
                    return Err(Error::InvalidStepSize("covariance has non-finite entries".into()));
                }
                let chol = Cholesky::new(cov.clone())
                    .ok_or_else(|| Error::InvalidStepSize("covariance is not positive-definite".into()))?;
                Ok(Self { chol_l : chol.l() })
            }
        }
    }

    pub fn dim(&self) -> usize {
        self.chol_l.nrows()
    }

    pub fn propose(&self, current : &DVector<f64>, rng : &mut RandomSource) -> DVector<f64> {
        rng.multivariate_normal(current, &self.chol_l)
    }

}

// Optimal random-walk scaling for pseudo-marginal chains (Sherlock et al., 2015).
const PSEUDO_MARGINAL_SCALE : f64 = 2.562;

/// Step size tuned from a pilot run: the empirical covariance of the walk-space
/// trace after `burn_in` rows, scaled by 2.562^2 / d. One-dimensional walks get
/// the corresponding scalar standard deviation.
pub fn tuned_step_size(trace : &DMatrix<f64>, burn_in : usize) -> Result<StepSize> {
    let dim = trace.ncols();
    if trace.nrows() < burn_in + 2 {
        return Err(Error::DimensionMismatch { expected : burn_in + 2, got : trace.nrows() });
    }
    let cov = summary::covariance(&trace.rows(burn_in, trace.nrows() - burn_in).clone_owned());
    let scale = PSEUDO_MARGINAL_SCALE.powi(2) / dim as f64;
    if dim == 1 {
        Ok(StepSize::Scalar((scale * cov[(0, 0)]).sqrt()))
    } else {
        Ok(StepSize::Covariance(cov * scale))
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scalar_only_for_one_dimension() {
        assert!(RandomWalkProposal::new(&StepSize::Scalar(0.1), 1).is_ok());
        assert!(RandomWalkProposal::new(&StepSize::Scalar(0.1), 3).is_err());
        assert!(RandomWalkProposal::new(&StepSize::Scalar(0.0), 1).is_err());
    }

    #[test]
    fn covariance_must_match_and_be_positive_definite() {
        let ok = StepSize::diagonal(&[0.1, 0.01, 0.05]);
        assert_eq!(RandomWalkProposal::new(&ok, 3).unwrap().dim(), 3);
        assert!(RandomWalkProposal::new(&ok, 2).is_err());
        let singular = StepSize::Covariance(DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]));
        assert!(RandomWalkProposal::new(&singular, 2).is_err());
    }

    #[test]
    fn scalar_walk_increment_has_requested_spread() {
        let prop = RandomWalkProposal::new(&StepSize::Scalar(0.1), 1).unwrap();
        let mut rng = RandomSource::new(5);
        let start = DVector::from_element(1, 0.3);
        let n = 20_000;
        let mut sq = 0.0;
        for _ in 0..n {
            let d = prop.propose(&start, &mut rng)[0] - 0.3;
            sq += d * d;
        }
        assert!(((sq / n as f64).sqrt() - 0.1).abs() < 0.005);
    }

    #[test]
    fn tuned_step_size_scales_pilot_covariance() {
        let trace = DMatrix::from_row_slice(4, 2, &[
            0.0, 1.0,
            1.0, 0.0,
            2.0, 1.0,
            3.0, 0.0
        ]);
        match tuned_step_size(&trace, 0).unwrap() {
            StepSize::Covariance(c) => {
                let var0 = 5.0 / 3.0;
                assert_relative_eq!(c[(0, 0)], var0 * 2.562f64.powi(2) / 2.0, epsilon = 1e-12);
            },
            other => panic!("unexpected {:?}", other)
        }
        let one = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        match tuned_step_size(&one, 0).unwrap() {
            StepSize::Scalar(s) => assert_relative_eq!(s, 2.562, epsilon = 1e-12),
            other => panic!("unexpected {:?}", other)
        }
        assert!(tuned_step_size(&one, 2).is_err());
    }

}
