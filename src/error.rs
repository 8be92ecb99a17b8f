/// Errors raised while setting up or running the filters and the sampler.
///
/// Configuration problems (bad initial parameters, step sizes that do not match
/// the parameter dimension, observation sequences that are too short) are fatal and
/// reported before any filtering starts. `Degenerate` is the only variant produced
/// from inside a filter pass; the sampler absorbs it as a rejected proposal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {

    /// A parameter lies outside the region where the model is defined.
    #[error("invalid parameter {name} = {value}")]
    InvalidParameter {
        name : &'static str,
        value : f64
    },

    /// The random-walk step size does not agree with the walk dimension,
    /// or its covariance is not positive-definite.
    #[error("invalid step size: {0}")]
    InvalidStepSize(String),

    #[error("dimension mismatch: expected at least {expected} entries, got {got}")]
    DimensionMismatch {
        expected : usize,
        got : usize
    },

    /// An observation the filter needs is missing or not finite.
    #[error("observation at index {index} is not finite")]
    NonFiniteObservation {
        index : usize
    },

    #[error("particle count must be at least one")]
    NoParticles,

    #[error("zero iterations requested")]
    NoIterations,

    /// Every particle log-weight was -inf (or NaN) at this step.
    #[error("all particle weights vanished at step {step}")]
    Degenerate {
        step : usize
    }

}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn messages() {
        let err = Error::InvalidParameter { name : "phi", value : 1.5 };
        assert_eq!(err.to_string(), "invalid parameter phi = 1.5");
        let err = Error::DimensionMismatch { expected : 2, got : 1 };
        assert_eq!(err.to_string(), "dimension mismatch: expected at least 2 entries, got 1");
        assert_eq!(Error::Degenerate { step : 4 }.to_string(), "all particle weights vanished at step 4");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T : std::error::Error + Send + Sync>() {}
        assert_impl::<Error>();
    }

}
