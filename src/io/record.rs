use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};
use crate::fit::walk::Chain;
use crate::fit::filter::FilterOutput;
use crate::calc::ChainSummary;

fn rows<T : Copy + nalgebra::Scalar>(m : &DMatrix<T>) -> Vec<Vec<T>> {
    m.row_iter().map(|r| r.iter().copied().collect() ).collect()
}

/// Row-major, self-describing copy of a chain for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRecord {

    pub names : Vec<String>,

    pub theta : Vec<Vec<f64>>,

    pub theta_proposed : Vec<Vec<f64>>,

    pub log_likelihood : Vec<f64>,

    /// Non-finite entries (gated or degenerate proposals) are written as null.
    pub log_likelihood_proposed : Vec<Option<f64>>,

    pub filtered_states : Vec<Vec<f64>>,

    pub accepted : Vec<bool>,

    pub filter_evaluations : usize,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary : Option<ChainSummary>

}

impl ChainRecord {

    pub fn new(chain : &Chain) -> Self {
        Self {
            names : chain.names.clone(),
            theta : rows(&chain.theta),
            theta_proposed : rows(&chain.theta_proposed),
            log_likelihood : chain.log_likelihood.clone(),
            log_likelihood_proposed : chain.log_likelihood_proposed.iter()
                .map(|l| if l.is_finite() { Some(*l) } else { None } )
                .collect(),
            filtered_states : rows(&chain.filtered_states),
            accepted : chain.accepted.clone(),
            filter_evaluations : chain.filter_evaluations,
            summary : None
        }
    }

    pub fn with_summary(mut self, summary : ChainSummary) -> Self {
        self.summary = Some(summary);
        self
    }

}

/// Summary of one particle filter pass; the particle system is left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRecord {

    pub n_particles : usize,

    pub log_likelihood : f64,

    pub x_hat_filtered : Vec<f64>

}

impl FilterRecord {

    pub fn new(out : &FilterOutput) -> Self {
        Self {
            n_particles : out.particles.nrows(),
            log_likelihood : out.log_likelihood,
            x_hat_filtered : out.x_hat_filtered.clone()
        }
    }

}
