use nalgebra::*;
use tracing::debug;
use crate::model::{Lgss, Sv, StateSpaceModel};
use crate::random::RandomSource;
use crate::error::{Error, Result};

/// How a proposal turns the particle system into the filtered-state estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEstimate {

    /// Unweighted mean of the propagated particles at every column. Used when
    /// the weights attached to a column only matter for the next resampling
    /// (the fully-adapted filter), so the propagated cloud is already
    /// equally weighted.
    ParticleMean,

    /// After the forward pass, one terminal particle is drawn from the final
    /// normalized weights and its ancestry walked back; the lineage is the estimate.
    AncestralDraw

}

/// Importance proposal driving the generic filter. Column 0 of the particle
/// system is filled by `initialize`; every later column t is produced by
/// resampling column t-1, moving each ancestor through `propagate` and
/// weighting the result through `log_weight`.
pub trait Proposal {

    /// Checks the observation sequence carries what the proposal reads.
    fn check(&self, y : &[f64]) -> Result<()>;

    /// Number of particle columns (initial column included).
    fn columns(&self, y : &[f64]) -> usize;

    fn initialize(&self, particles : &mut [f64], rng : &mut RandomSource);

    fn propagate(&self, t : usize, ancestor : f64, y : &[f64], rng : &mut RandomSource) -> f64;

    fn log_weight(&self, t : usize, particle : f64, y : &[f64]) -> f64;

    fn estimate(&self) -> StateEstimate;

}

/// Result of one filter pass. Matrices are N x columns, column t
/// holding the particle system after step t.
#[derive(Debug, Clone)]
pub struct FilterOutput {

    pub x_hat_filtered : Vec<f64>,

    pub log_likelihood : f64,

    pub particles : DMatrix<f64>,

    /// Normalized weights; column 0 is uniform.
    pub weights : DMatrix<f64>,

    /// ancestors[(i, t)] is the index, in column t-1, of the parent of particle i
    /// at column t. Column 0 holds the identity.
    pub ancestors : DMatrix<usize>

}

impl FilterOutput {

    /// Follows the recorded ancestry from particle `index` at the last column
    /// back to column 0, returning the particle values along the lineage.
    pub fn trajectory(&self, index : usize) -> Vec<f64> {
        let cols = self.particles.ncols();
        let mut traj = vec![0.0; cols];
        let mut ix = index;
        for t in (0..cols).rev() {
            traj[t] = self.particles[(ix, t)];
            ix = self.ancestors[(ix, t)];
        }
        traj
    }

}

/// Sequential importance resampling engine with multinomial resampling at every
/// step. The log-likelihood is accumulated with the usual unbiased estimator of
/// the incremental predictive likelihood, stabilized by subtracting the largest
/// log-weight before exponentiating:
///
/// ln p(y_t | y_{1:t-1}) ~ max_i lw_i + ln sum_i exp(lw_i - max_i lw_i) - ln N
#[derive(Debug, Clone, Copy)]
pub struct ParticleFilter {

    n_particles : usize

}

impl ParticleFilter {

    pub fn new(n_particles : usize) -> Result<Self> {
        if n_particles == 0 {
            return Err(Error::NoParticles);
        }
        Ok(Self { n_particles })
    }

    pub fn n_particles(&self) -> usize {
        self.n_particles
    }

    pub fn run<P>(&self, proposal : &P, y : &[f64], rng : &mut RandomSource) -> Result<FilterOutput>
    where
        P : Proposal
    {
        proposal.check(y)?;
        let n = self.n_particles;
        let cols = proposal.columns(y);
        let mut particles = DMatrix::zeros(n, cols);
        let mut weights = DMatrix::zeros(n, cols);
        let mut ancestors = DMatrix::<usize>::zeros(n, cols);

        let mut prev = vec![0.0; n];
        let mut curr = vec![0.0; n];
        let mut log_w = vec![0.0; n];
        let mut norm_w = vec![1.0 / n as f64; n];
        let mut anc = vec![0; n];

        proposal.initialize(&mut prev, rng);
        for i in 0..n {
            particles[(i, 0)] = prev[i];
            weights[(i, 0)] = norm_w[i];
            ancestors[(i, 0)] = i;
        }

        let mut x_hat = Vec::with_capacity(cols);
        if proposal.estimate() == StateEstimate::ParticleMean {
            x_hat.push(mean(&prev));
        }

        let ln_n = (n as f64).ln();
        let mut log_likelihood = 0.0;
        for t in 1..cols {
            rng.multinomial(&norm_w, &mut anc)
                .map_err(|_| Error::Degenerate { step : t })?;
            for i in 0..n {
                curr[i] = proposal.propagate(t, prev[anc[i]], y, rng);
                log_w[i] = proposal.log_weight(t, curr[i], y);
            }

            // f64::max skips NaN, so a column of NaN leaves the fold at -inf.
            let max_w = log_w.iter().fold(f64::NEG_INFINITY, |m, w| m.max(*w) );
            if !max_w.is_finite() {
                return Err(Error::Degenerate { step : t });
            }
            let mut sum_w = 0.0;
            for i in 0..n {
                let w = (log_w[i] - max_w).exp();
                norm_w[i] = if w.is_nan() { 0.0 } else { w };
                sum_w += norm_w[i];
            }
            norm_w.iter_mut().for_each(|w| *w /= sum_w );
            log_likelihood += max_w + sum_w.ln() - ln_n;

            for i in 0..n {
                particles[(i, t)] = curr[i];
                weights[(i, t)] = norm_w[i];
                ancestors[(i, t)] = anc[i];
            }
            if proposal.estimate() == StateEstimate::ParticleMean {
                x_hat.push(mean(&curr));
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        let mut out = FilterOutput { x_hat_filtered : x_hat, log_likelihood, particles, weights, ancestors };
        if proposal.estimate() == StateEstimate::AncestralDraw {
            let last = rng.categorical(&norm_w)
                .map_err(|_| Error::Degenerate { step : cols - 1 })?;
            let mut traj = out.trajectory(last);
            traj.remove(0);
            out.x_hat_filtered = traj;
        }
        debug!(n_particles = n, steps = cols - 1, log_likelihood = out.log_likelihood, "particle filter pass");
        Ok(out)
    }

}

fn mean(v : &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// Fully-adapted proposal for the linear-Gaussian model. Particles start at a
/// known initial state; at step t they are drawn from p(x_t | x_{t-1}, y_t) and
/// weighted by the predictive p(y_{t+1} | x_t), so y[0] is never read and
/// steps run t = 1..T-1 for T = y.len() - 1.
#[derive(Debug, Clone, Copy)]
pub struct FullyAdapted {

    pub model : Lgss,

    pub initial_state : f64

}

impl Proposal for FullyAdapted {

    fn check(&self, y : &[f64]) -> Result<()> {
        if y.len() < 2 {
            return Err(Error::DimensionMismatch { expected : 2, got : y.len() });
        }
        check_finite(y, 1..y.len())
    }

    fn columns(&self, y : &[f64]) -> usize {
        y.len() - 1
    }

    fn initialize(&self, particles : &mut [f64], _rng : &mut RandomSource) {
        particles.iter_mut().for_each(|p| *p = self.initial_state );
    }

    fn propagate(&self, t : usize, ancestor : f64, y : &[f64], rng : &mut RandomSource) -> f64 {
        let (mean, var) = self.model.adapted_proposal(ancestor, y[t]);
        rng.normal(mean, var.sqrt())
    }

    fn log_weight(&self, t : usize, particle : f64, y : &[f64]) -> f64 {
        self.model.adapted_log_weight(particle, y[t + 1])
    }

    fn estimate(&self) -> StateEstimate {
        StateEstimate::ParticleMean
    }

}

/// Models whose state process has a closed-form stationary law, which the
/// bootstrap filter uses to draw its initial particle cloud.
pub trait Stationary {

    fn sample_stationary(&self, rng : &mut RandomSource) -> f64;

}

impl Stationary for Sv {

    fn sample_stationary(&self, rng : &mut RandomSource) -> f64 {
        Sv::sample_stationary(self, rng)
    }

}

/// Bootstrap proposal: particles move through the state transition alone and
/// are weighted by the observation density. With T = y.len() - 1, columns run
/// 0..=T; column 0 is a draw from the stationary law and particle column t is
/// weighted against y[t-1], so y[T] is not read. The filtered trajectory is a
/// single ancestral draw.
#[derive(Debug, Clone, Copy)]
pub struct Bootstrap<M> {

    pub model : M

}

impl<M> Proposal for Bootstrap<M>
where
    M : StateSpaceModel + Stationary
{

    fn check(&self, y : &[f64]) -> Result<()> {
        if y.len() < 2 {
            return Err(Error::DimensionMismatch { expected : 2, got : y.len() });
        }
        check_finite(y, 0..y.len() - 1)
    }

    fn columns(&self, y : &[f64]) -> usize {
        y.len()
    }

    fn initialize(&self, particles : &mut [f64], rng : &mut RandomSource) {
        particles.iter_mut().for_each(|p| *p = self.model.sample_stationary(rng) );
    }

    fn propagate(&self, _t : usize, ancestor : f64, _y : &[f64], rng : &mut RandomSource) -> f64 {
        self.model.sample_transition(ancestor, rng)
    }

    fn log_weight(&self, t : usize, particle : f64, y : &[f64]) -> f64 {
        self.model.log_observation(y[t - 1], particle)
    }

    fn estimate(&self) -> StateEstimate {
        StateEstimate::AncestralDraw
    }

}

fn check_finite(y : &[f64], range : std::ops::Range<usize>) -> Result<()> {
    for t in range {
        if !y[t].is_finite() {
            return Err(Error::NonFiniteObservation { index : t });
        }
    }
    Ok(())
}

/// Fully-adapted particle filter for the linear-Gaussian model.
pub fn particle_filter(
    y : &[f64],
    model : &Lgss,
    n_particles : usize,
    initial_state : f64,
    rng : &mut RandomSource
) -> Result<FilterOutput> {
    let proposal = FullyAdapted { model : *model, initial_state };
    ParticleFilter::new(n_particles)?.run(&proposal, y, rng)
}

/// Bootstrap particle filter for the stochastic-volatility model.
pub fn particle_filter_sv(
    y : &[f64],
    model : &Sv,
    n_particles : usize,
    rng : &mut RandomSource
) -> Result<FilterOutput> {
    let proposal = Bootstrap { model : *model };
    ParticleFilter::new(n_particles)?.run(&proposal, y, rng)
}
