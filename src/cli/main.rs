use structopt::StructOpt;
use std::io::{self, Write};
use std::str::FromStr;
use anyhow::{anyhow, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use pmh::model::{Lgss, Sv, Model};
use pmh::random::RandomSource;
use pmh::fit::filter;
use pmh::fit::walk::{ChainObserver, ProgressReport, tuned_step_size, StepSize};
use pmh::calc::{self, ChainSummary};
use pmh::io::{self as pio, RunConfig, StepSizeConfig, ChainRecord, FilterRecord};
use pmh::sim;

mod logging;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ModelKind {
    Lgss,
    Sv
}

impl FromStr for ModelKind {

    type Err = String;

    fn from_str(s : &str) -> Result<Self, String> {
        match s {
            "lgss" => Ok(ModelKind::Lgss),
            "sv" => Ok(ModelKind::Sv),
            other => Err(format!("unknown model '{}' (expected lgss or sv)", other))
        }
    }

}

/// Model parameters. Unset values take the defaults of the chosen model:
/// lgss (phi 0.5, sigma_v 1.0, sigma_e 0.1), sv (mu 0.0, phi 0.95, sigma_v 0.2).
#[derive(StructOpt, Debug)]
struct ModelArgs {

    #[structopt(long, default_value = "lgss")]
    model : ModelKind,

    #[structopt(long)]
    mu : Option<f64>,

    #[structopt(long)]
    phi : Option<f64>,

    #[structopt(long)]
    sigma_v : Option<f64>,

    #[structopt(long)]
    sigma_e : Option<f64>

}

impl ModelArgs {

    fn model(&self) -> pmh::Result<Model> {
        match self.model {
            ModelKind::Lgss => Ok(Model::Lgss(Lgss::new(
                self.phi.unwrap_or(0.5),
                self.sigma_v.unwrap_or(1.0),
                self.sigma_e.unwrap_or(0.1)
            )?)),
            ModelKind::Sv => Ok(Model::Sv(Sv::new(
                self.mu.unwrap_or(0.0),
                self.phi.unwrap_or(0.95),
                self.sigma_v.unwrap_or(0.2)
            )?))
        }
    }

    fn lgss(&self) -> anyhow::Result<Lgss> {
        match self.model()? {
            Model::Lgss(m) => Ok(m),
            Model::Sv(_) => Err(anyhow!("this command requires --model lgss"))
        }
    }

}

/// Observation file and column.
#[derive(StructOpt, Debug)]
struct DataArgs {

    /// CSV file with one observation per row
    #[structopt(short, long)]
    data : String,

    /// Column name (defaults to the first column)
    #[structopt(long)]
    column : Option<String>

}

impl DataArgs {

    fn load(&self) -> anyhow::Result<Vec<f64>> {
        let y = pio::read_observations_from_path(&self.data, self.column.as_deref())
            .with_context(|| format!("reading observations from {}", self.data))?;
        info!(path = %self.data, n = y.len(), "observations loaded");
        Ok(y)
    }

}

/// Particle filtering and particle Metropolis-Hastings for scalar state-space models
#[derive(StructOpt, Debug)]
#[structopt(name = "pmh")]
struct Opt {

    /// Increase log verbosity (-v, -vv, -vvv)
    #[structopt(short, long, parse(from_occurrences), global = true)]
    verbose : u8,

    #[structopt(subcommand)]
    cmd : Command

}

#[derive(StructOpt, Debug)]
enum Command {

    /// Simulates states and observations, written as CSV (t,x,y)
    Generate {

        #[structopt(flatten)]
        model : ModelArgs,

        #[structopt(long, default_value = "100")]
        n_obs : usize,

        /// Known initial state (lgss only)
        #[structopt(long, default_value = "0")]
        initial_state : f64,

        #[structopt(long, default_value = "0")]
        seed : u64,

        #[structopt(short, long)]
        output : Option<String>
    },

    /// Runs a particle filter pass and writes the filtered states
    Filter {

        #[structopt(flatten)]
        data : DataArgs,

        #[structopt(flatten)]
        model : ModelArgs,

        #[structopt(short = "p", long, default_value = "100")]
        n_particles : usize,

        #[structopt(long, default_value = "0")]
        initial_state : f64,

        #[structopt(long, default_value = "0")]
        seed : u64,

        /// Write a JSON record instead of CSV
        #[structopt(long)]
        json : bool,

        #[structopt(short, long)]
        output : Option<String>
    },

    /// Runs the exact Kalman filter (lgss only)
    Kalman {

        #[structopt(flatten)]
        data : DataArgs,

        #[structopt(flatten)]
        model : ModelArgs,

        #[structopt(long, default_value = "0")]
        initial_state : f64,

        #[structopt(long, default_value = "0")]
        initial_variance : f64,

        #[structopt(short, long)]
        output : Option<String>
    },

    /// Samples the parameter posterior with particle Metropolis-Hastings
    Sample {

        /// JSON run configuration
        #[structopt(short, long)]
        config : String,

        #[structopt(flatten)]
        data : DataArgs,

        /// Length of a pilot run whose trace replaces the configured step size
        #[structopt(long)]
        pilot : Option<usize>,

        /// Lags used for the integrated autocorrelation time
        #[structopt(long, default_value = "100")]
        max_lag : usize,

        /// Also write the accepted draws as CSV to this path
        #[structopt(long)]
        csv : Option<String>,

        #[structopt(long)]
        no_progress : bool,

        /// JSON chain record
        #[structopt(short, long)]
        output : Option<String>
    },

    /// Tabulates bias and MSE of the particle filter against the Kalman filter (lgss only)
    Accuracy {

        #[structopt(flatten)]
        data : DataArgs,

        #[structopt(flatten)]
        model : ModelArgs,

        /// Comma-separated particle counts
        #[structopt(long, default_value = "10,20,50,100,200,500,1000", use_delimiter = true)]
        particles : Vec<usize>,

        #[structopt(long, default_value = "10")]
        replicates : usize,

        #[structopt(long, default_value = "0")]
        initial_state : f64,

        #[structopt(long, default_value = "0")]
        seed : u64,

        #[structopt(short, long)]
        output : Option<String>
    }

}

/// Shows sampler progress on stderr.
struct BarObserver {
    bar : ProgressBar
}

impl BarObserver {

    fn new(n_iterations : usize) -> Self {
        let bar = ProgressBar::new(n_iterations as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{elapsed_precise} [{bar:40}] {pos}/{len} {msg}")
                .progress_chars("=> ")
        );
        Self { bar }
    }

}

impl ChainObserver for BarObserver {

    fn progress(&mut self, report : &ProgressReport<'_>) {
        self.bar.set_position(report.iteration as u64);
        let current = report.names.iter()
            .zip(report.current.iter())
            .map(|(n, v)| format!("{}={:.4}", n, v) )
            .collect::<Vec<_>>()
            .join(" ");
        self.bar.set_message(format!("{} accept={:.3}", current, report.acceptance_rate));
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }

}

fn output_writer(path : &Option<String>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let f = pio::create_file(p).with_context(|| format!("creating {}", p))?;
            Ok(Box::new(f))
        },
        None => Ok(Box::new(io::stdout()))
    }
}

fn run_sample(
    config : &str,
    data : &DataArgs,
    pilot : Option<usize>,
    max_lag : usize,
    csv : &Option<String>,
    no_progress : bool,
    output : &Option<String>
) -> anyhow::Result<()> {
    let mut cfg : RunConfig = pio::load_json_from_path(config)
        .with_context(|| format!("reading configuration {}", config))?;
    let y = data.load()?;

    if let Some(n_pilot) = pilot {
        let mut pilot_cfg = cfg.clone();
        pilot_cfg.n_iterations = n_pilot;
        let chain = pilot_cfg.run_with(&y, &mut pmh::fit::walk::LogObserver)?;
        let tuned = tuned_step_size(&chain.theta_walk, n_pilot / 2)?;
        info!(step_size = ?tuned, "tuned step size from pilot run");
        cfg.step_size = match tuned {
            StepSize::Scalar(s) => StepSizeConfig::Scalar(s),
            StepSize::Covariance(c) => StepSizeConfig::Covariance(
                c.row_iter().map(|r| r.iter().copied().collect() ).collect()
            )
        };
    }

    let chain = if no_progress {
        cfg.run_with(&y, &mut pmh::fit::walk::LogObserver)?
    } else {
        cfg.run_with(&y, &mut BarObserver::new(cfg.n_iterations))?
    };
    let summary = ChainSummary::new(&chain, cfg.burn_in, max_lag);
    eprintln!("{}", summary);

    if let Some(path) = csv {
        pio::write_chain(pio::create_file(path)?, &chain)?;
    }
    pio::save_json(&ChainRecord::new(&chain).with_summary(summary), output_writer(output)?)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    logging::init(opt.verbose);
    match &opt.cmd {
        Command::Generate { model, n_obs, initial_state, seed, output } => {
            let mut rng = RandomSource::new(*seed);
            let data = match model.model()? {
                Model::Lgss(m) => sim::generate_lgss(&m, *n_obs, *initial_state, &mut rng),
                Model::Sv(m) => sim::generate_sv(&m, *n_obs, &mut rng)
            };
            pio::write_simulated(output_writer(output)?, &data)?;
        },
        Command::Filter { data, model, n_particles, initial_state, seed, json, output } => {
            let y = data.load()?;
            let mut rng = RandomSource::new(*seed);
            let out = match model.model()? {
                Model::Lgss(m) => filter::particle_filter(&y, &m, *n_particles, *initial_state, &mut rng)?,
                Model::Sv(m) => filter::particle_filter_sv(&y, &m, *n_particles, &mut rng)?
            };
            info!(log_likelihood = out.log_likelihood, "filter pass complete");
            if *json {
                pio::save_json(&FilterRecord::new(&out), output_writer(output)?)?;
            } else {
                pio::write_filter_output(output_writer(output)?, &out)?;
            }
        },
        Command::Kalman { data, model, initial_state, initial_variance, output } => {
            let y = data.load()?;
            let out = filter::kalman_filter(&y, &model.lgss()?, *initial_state, *initial_variance)?;
            info!(log_likelihood = out.log_likelihood, "kalman filter complete");
            pio::write_kalman_output(output_writer(output)?, &out)?;
        },
        Command::Sample { config, data, pilot, max_lag, csv, no_progress, output } => {
            run_sample(config, data, *pilot, *max_lag, csv, *no_progress, output)?;
        },
        Command::Accuracy { data, model, particles, replicates, initial_state, seed, output } => {
            let y = data.load()?;
            let rows = calc::filter_accuracy(
                &y,
                &model.lgss()?,
                *initial_state,
                particles,
                *replicates,
                &RandomSource::new(*seed)
            )?;
            let mut wtr = csv::Writer::from_writer(output_writer(output)?);
            wtr.write_record(&["n_particles", "state_bias", "state_mse", "log_likelihood_bias", "log_likelihood_mse"])?;
            for r in rows {
                wtr.write_record(&[
                    r.n_particles.to_string(),
                    r.state_bias.to_string(),
                    r.state_mse.to_string(),
                    r.log_likelihood_bias.to_string(),
                    r.log_likelihood_mse.to_string()
                ])?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn accuracy_accepts_output_path() {
        let opt = Opt::from_iter(&["pmh", "accuracy", "-d", "y.csv", "--particles", "20,100", "-o", "acc.csv"]);
        match opt.cmd {
            Command::Accuracy { particles, output, .. } => {
                assert_eq!(particles, vec![20, 100]);
                assert_eq!(output.as_deref(), Some("acc.csv"));
            },
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn output_writer_creates_file() {
        let path = std::env::temp_dir().join("pmh_output_writer.csv");
        let name = path.to_string_lossy().into_owned();
        {
            let mut w = output_writer(&Some(name.clone())).unwrap();
            w.write_all(b"n_particles\n20\n").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "n_particles\n20\n");
        std::fs::remove_file(&path).unwrap();
    }

}
