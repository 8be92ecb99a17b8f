use serde::{Serialize, Deserialize};
use crate::model::{Lgss, Sv, StateSpaceModel};
use crate::random::RandomSource;

/// Latent states and observations drawn from a state-space model. Both vectors
/// have n_obs + 1 entries; index 0 holds the initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedData {

    pub x : Vec<f64>,

    pub y : Vec<f64>

}

impl SimulatedData {

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

}

/// Simulates the linear-Gaussian model from a known initial state. The initial
/// state has no measurement, so y[0] is NaN.
pub fn generate_lgss(model : &Lgss, n_obs : usize, initial_state : f64, rng : &mut RandomSource) -> SimulatedData {
    let mut x = vec![0.0; n_obs + 1];
    let mut y = vec![0.0; n_obs + 1];
    x[0] = initial_state;
    y[0] = f64::NAN;
    for t in 1..=n_obs {
        x[t] = model.sample_transition(x[t-1], rng);
        y[t] = model.sample_observation(x[t], rng);
    }
    SimulatedData { x, y }
}

/// Simulates the stochastic-volatility model with x[0] drawn from the stationary
/// law. Every entry of y, y[0] included, is an observation.
pub fn generate_sv(model : &Sv, n_obs : usize, rng : &mut RandomSource) -> SimulatedData {
    let mut x = vec![0.0; n_obs + 1];
    let mut y = vec![0.0; n_obs + 1];
    x[0] = model.sample_stationary(rng);
    y[0] = model.sample_observation(x[0], rng);
    for t in 1..=n_obs {
        x[t] = model.sample_transition(x[t-1], rng);
        y[t] = model.sample_observation(x[t], rng);
    }
    SimulatedData { x, y }
}
