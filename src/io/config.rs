use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};
use crate::fit::walk::*;
use super::{IoError, IoResult};

/// Random-walk step as written in a run configuration:
/// `{"scalar": 0.1}`, `{"covariance": [[..], ..]}` or `{"diagonal": [..]}`
/// (per-coordinate standard deviations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepSizeConfig {
    Scalar(f64),
    Covariance(Vec<Vec<f64>>),
    Diagonal(Vec<f64>)
}

impl StepSizeConfig {

    pub fn step_size(&self) -> IoResult<StepSize> {
        match self {
            StepSizeConfig::Scalar(s) => Ok(StepSize::Scalar(*s)),
            StepSizeConfig::Diagonal(d) => Ok(StepSize::diagonal(d)),
            StepSizeConfig::Covariance(rows) => {
                let n = rows.len();
                if rows.iter().any(|r| r.len() != n ) {
                    return Err(IoError::Config(String::from("covariance must be a square matrix")));
                }
                let flat : Vec<f64> = rows.iter().flatten().copied().collect();
                Ok(StepSize::Covariance(DMatrix::from_row_slice(n, n, &flat)))
            }
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {

    /// phi of the linear-Gaussian model; sigma_v and sigma_e are fixed.
    Lgss,

    /// (mu, phi, sigma_v) of the stochastic-volatility model.
    Sv,

    /// As `Sv`, walking in (mu, atanh(phi), ln(sigma_v)).
    SvReparameterised

}

fn default_progress() -> usize {
    100
}

/// Everything needed to run the sampler on an observation sequence.
///
/// ```json
/// {
///     "target": "lgss",
///     "initial_theta": [0.1],
///     "n_particles": 50,
///     "sigma_v": 1.0,
///     "sigma_e": 0.1,
///     "n_iterations": 500,
///     "step_size": { "scalar": 0.1 },
///     "seed": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {

    pub target : Target,

    pub initial_theta : Vec<f64>,

    pub n_particles : usize,

    /// Fixed state noise scale (LGSS only).
    #[serde(default)]
    pub sigma_v : Option<f64>,

    /// Fixed observation noise scale (LGSS only).
    #[serde(default)]
    pub sigma_e : Option<f64>,

    /// Known initial state (LGSS only).
    #[serde(default)]
    pub initial_state : f64,

    pub n_iterations : usize,

    pub step_size : StepSizeConfig,

    #[serde(default)]
    pub seed : u64,

    #[serde(default = "default_progress")]
    pub progress_every : usize,

    /// Rows discarded by summaries and pilot tuning.
    #[serde(default)]
    pub burn_in : usize

}

impl RunConfig {

    pub fn settings(&self) -> IoResult<Settings> {
        let mut settings = Settings::new(self.n_iterations, self.step_size.step_size()?, self.seed);
        settings.progress_every = self.progress_every;
        Ok(settings)
    }

    fn fixed_scale(value : Option<f64>, name : &str) -> IoResult<f64> {
        value.ok_or_else(|| IoError::Config(format!("target lgss requires {}", name)))
    }

    /// Builds the sampler for the configured target and runs it.
    pub fn run_with<O>(&self, y : &[f64], observer : &mut O) -> IoResult<Chain>
    where
        O : ChainObserver + ?Sized
    {
        let settings = self.settings()?;
        let chain = match self.target {
            Target::Lgss => {
                let posterior = LgssPosterior::new(
                    Self::fixed_scale(self.sigma_v, "sigma_v")?,
                    Self::fixed_scale(self.sigma_e, "sigma_e")?,
                    self.initial_state,
                    self.n_particles
                );
                Metropolis::new(posterior, settings)?.run_with(y, &self.initial_theta, observer)?
            },
            Target::Sv => {
                Metropolis::new(SvPosterior::new(self.n_particles), settings)?
                    .run_with(y, &self.initial_theta, observer)?
            },
            Target::SvReparameterised => {
                Metropolis::new(SvReparamPosterior::new(self.n_particles), settings)?
                    .run_with(y, &self.initial_theta, observer)?
            }
        };
        Ok(chain)
    }

}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn parses_lgss_config() {
        let cfg : RunConfig = serde_json::from_str(r#"{
            "target": "lgss",
            "initial_theta": [0.1],
            "n_particles": 50,
            "sigma_v": 1.0,
            "sigma_e": 0.1,
            "n_iterations": 500,
            "step_size": { "scalar": 0.1 },
            "seed": 1
        }"#).unwrap();
        assert_eq!(cfg.target, Target::Lgss);
        assert_eq!(cfg.progress_every, 100);
        assert_eq!(cfg.initial_state, 0.0);
        let s = cfg.settings().unwrap();
        assert_eq!(s.step_size, StepSize::Scalar(0.1));
        assert_eq!(s.n_iterations, 500);
    }

    #[test]
    fn step_size_variants() {
        let d : StepSizeConfig = serde_json::from_str(r#"{"diagonal": [0.1, 0.2]}"#).unwrap();
        assert_eq!(d.step_size().unwrap(), StepSize::diagonal(&[0.1, 0.2]));
        let c : StepSizeConfig = serde_json::from_str(r#"{"covariance": [[1.0, 0.5], [0.5, 2.0]]}"#).unwrap();
        match c.step_size().unwrap() {
            StepSize::Covariance(m) => assert_eq!(m[(0, 1)], 0.5),
            other => panic!("unexpected {:?}", other)
        }
        let bad = StepSizeConfig::Covariance(vec![vec![1.0, 0.0], vec![0.0]]);
        assert!(bad.step_size().is_err());
        let t : Target = serde_json::from_str(r#""sv-reparameterised""#).unwrap();
        assert_eq!(t, Target::SvReparameterised);
    }

    #[test]
    fn lgss_requires_fixed_scales() {
        let cfg = RunConfig {
            target : Target::Lgss,
            initial_theta : vec![0.1],
            n_particles : 10,
            sigma_v : Some(1.0),
            sigma_e : None,
            initial_state : 0.0,
            n_iterations : 10,
            step_size : StepSizeConfig::Scalar(0.1),
            seed : 0,
            progress_every : 100,
            burn_in : 0
        };
        assert!(matches!(cfg.run_with(&[f64::NAN, 0.1, 0.2], &mut NoopObserver), Err(IoError::Config(_))));
    }

}
