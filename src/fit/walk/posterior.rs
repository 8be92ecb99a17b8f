use nalgebra::*;
use crate::prob::{Univariate, Normal, Gamma};
use crate::model::{Lgss, Sv, StateSpaceModel};
use crate::fit::filter::{self, FilterOutput};
use crate::random::RandomSource;
use crate::error::{Error, Result};

/// Unnormalized parameter posterior explored by the particle Metropolis-Hastings
/// sampler. The random walk moves in "walk space"; `theta` maps a walk point to
/// the model parameters in which priors, the Jacobian and the likelihood are
/// evaluated. The likelihood is a particle filter estimate, so each call to
/// `log_likelihood` consumes draws from the random source.
pub trait Posterior {

    /// Names of the model parameters, in the order used by `theta`.
    fn names(&self) -> &'static [&'static str];

    fn dim(&self) -> usize {
        self.names().len()
    }

    fn theta(&self, walk : &DVector<f64>) -> DVector<f64>;

    fn walk(&self, theta : &DVector<f64>) -> DVector<f64>;

    /// Strict check of a starting point.
    fn validate(&self, theta : &DVector<f64>) -> Result<()>;

    /// Proposals failing this check are rejected without running the filter.
    fn admissible(&self, theta : &DVector<f64>) -> bool;

    fn log_prior(&self, theta : &DVector<f64>) -> f64;

    /// ln |d theta / d walk| of the walk-space reparametrization.
    fn log_jacobian(&self, _theta : &DVector<f64>) -> f64 {
        0.0
    }

    fn log_likelihood(&self, theta : &DVector<f64>, y : &[f64], rng : &mut RandomSource) -> Result<FilterOutput>;

}

/// Posterior of the persistence phi of the linear-Gaussian model, with both noise
/// scales held fixed. The likelihood comes from the fully-adapted filter.
#[derive(Debug, Clone)]
pub struct LgssPosterior {

    pub sigma_v : f64,

    pub sigma_e : f64,

    pub initial_state : f64,

    pub n_particles : usize,

    /// Prior on phi.
    pub prior : Normal

}

impl LgssPosterior {

    pub fn new(sigma_v : f64, sigma_e : f64, initial_state : f64, n_particles : usize) -> Self {
        Self { sigma_v, sigma_e, initial_state, n_particles, prior : Normal::standard() }
    }

    fn model(&self, theta : &DVector<f64>) -> Lgss {
        Lgss { phi : theta[0], sigma_v : self.sigma_v, sigma_e : self.sigma_e }
    }

}

impl Posterior for LgssPosterior {

    fn names(&self) -> &'static [&'static str] {
        &["phi"]
    }

    fn theta(&self, walk : &DVector<f64>) -> DVector<f64> {
        walk.clone()
    }

    fn walk(&self, theta : &DVector<f64>) -> DVector<f64> {
        theta.clone()
    }

    fn validate(&self, theta : &DVector<f64>) -> Result<()> {
        check_dim(theta, 1)?;
        self.model(theta).validate()
    }

    fn admissible(&self, theta : &DVector<f64>) -> bool {
        theta[0].abs() < 1.0
    }

    fn log_prior(&self, theta : &DVector<f64>) -> f64 {
        self.prior.log_prob(theta[0])
    }

    fn log_likelihood(&self, theta : &DVector<f64>, y : &[f64], rng : &mut RandomSource) -> Result<FilterOutput> {
        filter::particle_filter(y, &self.model(theta), self.n_particles, self.initial_state, rng)
    }

}

/// Independent priors on the stochastic-volatility parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvPrior {

    pub mu : Normal,

    pub phi : Normal,

    pub sigma_v : Gamma

}

impl SvPrior {

    /// Prior paired with the unconstrained walk (Gamma(3, 10) on sigma_v).
    pub fn reparameterised() -> Self {
        Self { sigma_v : Gamma::new(3.0, 10.0), ..Self::default() }
    }

    pub fn log_prob(&self, theta : &DVector<f64>) -> f64 {
        self.mu.log_prob(theta[0]) + self.phi.log_prob(theta[1]) + self.sigma_v.log_prob(theta[2])
    }

}

impl Default for SvPrior {

    fn default() -> Self {
        Self {
            mu : Normal::new(0.0, 1.0),
            phi : Normal::new(0.95, 0.05),
            sigma_v : Gamma::new(2.0, 10.0)
        }
    }

}

const SV_NAMES : &[&str] = &["mu", "phi", "sigma_v"];

/// Posterior of (mu, phi, sigma_v) for the stochastic-volatility model, walked
/// in its natural parametrization. Proposals outside |phi| < 1, sigma_v > 0
/// never reach the filter.
#[derive(Debug, Clone)]
pub struct SvPosterior {

    pub n_particles : usize,

    pub prior : SvPrior

}

impl SvPosterior {

    pub fn new(n_particles : usize) -> Self {
        Self { n_particles, prior : SvPrior::default() }
    }

}

impl Posterior for SvPosterior {

    fn names(&self) -> &'static [&'static str] {
        SV_NAMES
    }

    fn theta(&self, walk : &DVector<f64>) -> DVector<f64> {
        walk.clone()
    }

    fn walk(&self, theta : &DVector<f64>) -> DVector<f64> {
        theta.clone()
    }

    fn validate(&self, theta : &DVector<f64>) -> Result<()> {
        check_dim(theta, 3)?;
        sv_model(theta).validate()
    }

    fn admissible(&self, theta : &DVector<f64>) -> bool {
        theta[1].abs() < 1.0 && theta[2] > 0.0
    }

    fn log_prior(&self, theta : &DVector<f64>) -> f64 {
        self.prior.log_prob(theta)
    }

    fn log_likelihood(&self, theta : &DVector<f64>, y : &[f64], rng : &mut RandomSource) -> Result<FilterOutput> {
        filter::particle_filter_sv(y, &sv_model(theta), self.n_particles, rng)
    }

}

/// Posterior of the stochastic-volatility model walked in (mu, atanh(phi),
/// ln(sigma_v)). Every walk point maps to a valid model, so nothing is gated;
/// the change of variables adds ln(1 - phi^2) + ln(sigma_v) to the target.
#[derive(Debug, Clone)]
pub struct SvReparamPosterior {

    pub n_particles : usize,

    pub prior : SvPrior

}

impl SvReparamPosterior {

    pub fn new(n_particles : usize) -> Self {
        Self { n_particles, prior : SvPrior::reparameterised() }
    }

}

impl Posterior for SvReparamPosterior {

    fn names(&self) -> &'static [&'static str] {
        SV_NAMES
    }

    fn theta(&self, walk : &DVector<f64>) -> DVector<f64> {
        let m = Sv::from_unconstrained(&[walk[0], walk[1], walk[2]]);
        DVector::from_column_slice(&m.theta())
    }

    fn walk(&self, theta : &DVector<f64>) -> DVector<f64> {
        DVector::from_column_slice(&sv_model(theta).to_unconstrained())
    }

    fn validate(&self, theta : &DVector<f64>) -> Result<()> {
        check_dim(theta, 3)?;
        sv_model(theta).validate()
    }

    fn admissible(&self, _theta : &DVector<f64>) -> bool {
        true
    }

    fn log_prior(&self, theta : &DVector<f64>) -> f64 {
        self.prior.log_prob(theta)
    }

    fn log_jacobian(&self, theta : &DVector<f64>) -> f64 {
        sv_model(theta).log_jacobian()
    }

    fn log_likelihood(&self, theta : &DVector<f64>, y : &[f64], rng : &mut RandomSource) -> Result<FilterOutput> {
        filter::particle_filter_sv(y, &sv_model(theta), self.n_particles, rng)
    }

}

fn sv_model(theta : &DVector<f64>) -> Sv {
    Sv { mu : theta[0], phi : theta[1], sigma_v : theta[2] }
}

fn check_dim(theta : &DVector<f64>, dim : usize) -> Result<()> {
    if theta.nrows() != dim {
        return Err(Error::DimensionMismatch { expected : dim, got : theta.nrows() });
    }
    Ok(())
}
