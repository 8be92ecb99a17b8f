use nalgebra::*;
use tracing::{debug, warn};
use crate::random::RandomSource;
use crate::error::{Error, Result};
use super::*;

/// Particle Metropolis-Hastings settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {

    /// Chain length, the initial state included.
    pub n_iterations : usize,

    pub step_size : StepSize,

    /// Seed of the random source shared by the walk and the particle filters.
    pub seed : u64,

    /// Observers are called every `progress_every` iterations (0 disables them).
    pub progress_every : usize

}

impl Settings {

    pub fn new(n_iterations : usize, step_size : StepSize, seed : u64) -> Self {
        Self { n_iterations, step_size, seed, progress_every : 100 }
    }

}

/// Markov chain produced by the sampler. Row k of every matrix (entry k of every
/// vector) is iteration k + 1; row 0 holds the initial parameters.
#[derive(Debug, Clone)]
pub struct Chain {

    pub names : Vec<String>,

    /// Accepted parameters, n_iterations x P.
    pub theta : DMatrix<f64>,

    /// Accepted parameters in walk space (equal to `theta` unless reparametrized).
    pub theta_walk : DMatrix<f64>,

    /// Proposed parameters; row 0 repeats the initial parameters.
    pub theta_proposed : DMatrix<f64>,

    pub log_likelihood : Vec<f64>,

    /// Estimated log-likelihood of each proposal; -inf for proposals that were
    /// gated out or whose filter pass degenerated.
    pub log_likelihood_proposed : Vec<f64>,

    /// Filtered-state estimate attached to the accepted parameters, n_iterations x T.
    pub filtered_states : DMatrix<f64>,

    /// Whether the proposal at each iteration was accepted; entry 0 is false.
    pub accepted : Vec<bool>,

    /// Number of particle filter passes, the initial one included.
    pub filter_evaluations : usize

}

impl Chain {

    pub fn len(&self) -> usize {
        self.theta.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.len() < 2 {
            return 0.0;
        }
        self.accepted.iter().filter(|a| **a ).count() as f64 / (self.len() - 1) as f64
    }

    /// Column means of `theta` over rows burn_in.., one per parameter.
    pub fn posterior_mean(&self, burn_in : usize) -> Vec<f64> {
        crate::calc::summary::column_means(&self.theta, burn_in)
    }

}

/// Particle Metropolis-Hastings sampler (pseudo-marginal MCMC). The exact
/// likelihood in the Metropolis-Hastings ratio is replaced by the particle filter
/// estimate, which is carried along with the chain state: a rejected proposal
/// keeps the previous estimate instead of re-filtering the current parameters.
///
/// At each iteration:
/// (1) Propose walk* = walk_{k-1} + L z in walk space and map it to theta*.
/// (2) If theta* is not admissible, the acceptance probability is zero and the
/// filter is not run.
/// (3) Otherwise estimate ln p(y | theta*) with the particle filter. A degenerate
/// pass (every weight vanished) or a non-finite estimate is a rejection.
/// (4) Accept with probability min(1, exp(d ln prior + d ln likelihood + d ln jacobian)),
/// comparing a uniform draw against the exponentiated log-ratio.
#[derive(Debug, Clone)]
pub struct Metropolis<P> {

    posterior : P,

    settings : Settings,

    proposal : RandomWalkProposal

}

impl<P> Metropolis<P>
where
    P : Posterior
{

    pub fn new(posterior : P, settings : Settings) -> Result<Self> {
        if settings.n_iterations == 0 {
            return Err(Error::NoIterations);
        }
        let proposal = RandomWalkProposal::new(&settings.step_size, posterior.dim())?;
        Ok(Self { posterior, settings, proposal })
    }

    pub fn posterior(&self) -> &P {
        &self.posterior
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs the chain, reporting progress through `tracing`.
    pub fn run(&self, y : &[f64], initial_theta : &[f64]) -> Result<Chain> {
        self.run_with(y, initial_theta, &mut LogObserver)
    }

    pub fn run_with<O>(&self, y : &[f64], initial_theta : &[f64], observer : &mut O) -> Result<Chain>
    where
        O : ChainObserver + ?Sized
    {
        let post = &self.posterior;
        let dim = post.dim();
        let n = self.settings.n_iterations;
        let theta_init = DVector::from_column_slice(initial_theta);
        if theta_init.nrows() != dim {
            return Err(Error::DimensionMismatch { expected : dim, got : theta_init.nrows() });
        }
        post.validate(&theta_init)?;

        let mut rng = RandomSource::new(self.settings.seed);
        let first = post.log_likelihood(&theta_init, y, &mut rng)?;
        let n_states = first.x_hat_filtered.len();

        let mut chain = Chain {
            names : post.names().iter().map(|s| s.to_string() ).collect(),
            theta : DMatrix::zeros(n, dim),
            theta_walk : DMatrix::zeros(n, dim),
            theta_proposed : DMatrix::zeros(n, dim),
            log_likelihood : vec![0.0; n],
            log_likelihood_proposed : vec![0.0; n],
            filtered_states : DMatrix::zeros(n, n_states),
            accepted : vec![false; n],
            filter_evaluations : 1
        };

        let mut walk_curr = post.walk(&theta_init);
        let mut theta_curr = theta_init;
        let mut ll_curr = first.log_likelihood;
        let mut lp_curr = post.log_prior(&theta_curr) + post.log_jacobian(&theta_curr);
        chain.theta.row_mut(0).tr_copy_from(&theta_curr);
        chain.theta_walk.row_mut(0).tr_copy_from(&walk_curr);
        chain.theta_proposed.row_mut(0).tr_copy_from(&theta_curr);
        chain.log_likelihood[0] = ll_curr;
        chain.log_likelihood_proposed[0] = ll_curr;
        chain.filtered_states.row_mut(0).copy_from_slice(&first.x_hat_filtered);

        let mut theta_sum = theta_curr.clone();
        let mut n_accept = 0;

        for k in 1..n {
            let walk_prop = self.proposal.propose(&walk_curr, &mut rng);
            let theta_prop = post.theta(&walk_prop);

            let scored = if post.admissible(&theta_prop) {
                chain.filter_evaluations += 1;
                match post.log_likelihood(&theta_prop, y, &mut rng) {
                    Ok(out) if out.log_likelihood.is_finite() => Some(out),
                    Ok(out) => {
                        warn!(iteration = k + 1, log_likelihood = out.log_likelihood, "non-finite likelihood estimate, rejecting");
                        None
                    },
                    Err(Error::Degenerate { step }) => {
                        warn!(iteration = k + 1, step, "particle weights vanished, rejecting");
                        None
                    },
                    Err(e) => return Err(e)
                }
            } else {
                debug!(iteration = k + 1, "proposal outside the admissible region");
                None
            };

            let (accept_prob, ll_prop, lp_prop) = match &scored {
                Some(out) => {
                    let lp_prop = post.log_prior(&theta_prop) + post.log_jacobian(&theta_prop);
                    let log_ratio = lp_prop - lp_curr + out.log_likelihood - ll_curr;
                    (log_ratio.exp(), out.log_likelihood, lp_prop)
                },
                None => (0.0, f64::NEG_INFINITY, f64::NEG_INFINITY)
            };

            let u = rng.uniform();
            chain.theta_proposed.row_mut(k).tr_copy_from(&theta_prop);
            chain.log_likelihood_proposed[k] = ll_prop;

            match scored {
                Some(out) if u < accept_prob => {
                    walk_curr = walk_prop;
                    theta_curr = theta_prop;
                    ll_curr = ll_prop;
                    lp_curr = lp_prop;
                    chain.filtered_states.row_mut(k).copy_from_slice(&out.x_hat_filtered);
                    chain.accepted[k] = true;
                    n_accept += 1;
                },
                _ => {
                    let prev = chain.filtered_states.row(k - 1).clone_owned();
                    chain.filtered_states.row_mut(k).copy_from(&prev);
                }
            }
            chain.theta.row_mut(k).tr_copy_from(&theta_curr);
            chain.theta_walk.row_mut(k).tr_copy_from(&walk_curr);
            chain.log_likelihood[k] = ll_curr;
            theta_sum += &theta_curr;

            let every = self.settings.progress_every;
            if every > 0 && (k + 1) % every == 0 {
                let mean = theta_sum.clone() / (k + 1) as f64;
                let proposed = chain.theta_proposed.row(k).iter().cloned().collect::<Vec<_>>();
                observer.progress(&ProgressReport {
                    iteration : k + 1,
                    n_iterations : n,
                    names : post.names(),
                    current : theta_curr.as_slice(),
                    proposed : &proposed,
                    posterior_mean : mean.as_slice(),
                    acceptance_rate : n_accept as f64 / k as f64
                });
            }
        }
        observer.finish();
        debug!(
            iterations = n,
            filter_evaluations = chain.filter_evaluations,
            acceptance_rate = chain.acceptance_rate(),
            "pmh finished"
        );
        Ok(chain)
    }

}

/// Particle Metropolis-Hastings for phi in the linear-Gaussian model with known
/// noise scales, with a scalar random-walk step (standard deviation `step_size`).
pub fn particle_metropolis_hastings(
    y : &[f64],
    initial_phi : f64,
    sigma_v : f64,
    sigma_e : f64,
    n_particles : usize,
    initial_state : f64,
    n_iterations : usize,
    step_size : f64,
    seed : u64
) -> Result<Chain> {
    let posterior = LgssPosterior::new(sigma_v, sigma_e, initial_state, n_particles);
    let settings = Settings::new(n_iterations, StepSize::Scalar(step_size), seed);
    Metropolis::new(posterior, settings)?.run(y, &[initial_phi])
}

/// Particle Metropolis-Hastings for (mu, phi, sigma_v) in the stochastic-volatility model.
pub fn particle_metropolis_hastings_sv(
    y : &[f64],
    initial_theta : &[f64],
    n_particles : usize,
    settings : Settings
) -> Result<Chain> {
    Metropolis::new(SvPosterior::new(n_particles), settings)?.run(y, initial_theta)
}

/// As `particle_metropolis_hastings_sv`, walking in (mu, atanh(phi), ln(sigma_v)).
/// The step size is a covariance in that space.
pub fn particle_metropolis_hastings_sv_reparameterised(
    y : &[f64],
    initial_theta : &[f64],
    n_particles : usize,
    settings : Settings
) -> Result<Chain> {
    Metropolis::new(SvReparamPosterior::new(n_particles), settings)?.run(y, initial_theta)
}
