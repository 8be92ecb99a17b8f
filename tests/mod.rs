use approx::assert_relative_eq;
use pmh::model::{Lgss, Sv};
use pmh::random::RandomSource;
use pmh::fit::filter::{particle_filter, particle_filter_sv, kalman_filter};
use pmh::fit::walk::*;
use pmh::calc::{self, ChainSummary};
use pmh::io;
use pmh::sim;
use pmh::Error;

fn lgss_sequence(seed : u64) -> (Lgss, Vec<f64>) {
    let m = Lgss::new(0.5, 1.0, 0.1).unwrap();
    let data = sim::generate_lgss(&m, 100, 0.0, &mut RandomSource::new(seed));
    (m, data.y)
}

#[test]
fn generated_lgss_sequence() {
    let m = Lgss::new(0.5, 1.0, 0.1).unwrap();
    let data = sim::generate_lgss(&m, 100, 0.0, &mut RandomSource::new(0));
    assert_eq!(data.x.len(), 101);
    assert_eq!(data.y.len(), 101);
    assert_eq!(data.x[0], 0.0);
}

#[test]
fn particle_filter_matches_kalman() {
    let (m, y) = lgss_sequence(1);
    let exact = kalman_filter(&y, &m, 0.0, 0.0).unwrap();
    let approx = particle_filter(&y, &m, 2000, 0.0, &mut RandomSource::new(2)).unwrap();
    assert_eq!(approx.x_hat_filtered.len(), y.len() - 1);
    let mae = approx.x_hat_filtered.iter()
        .zip(exact.x_hat_filtered.iter())
        .map(|(a, b)| (a - b).abs() )
        .sum::<f64>() / approx.x_hat_filtered.len() as f64;
    assert!(mae < 0.01, "mean absolute state error {}", mae);
    assert!((approx.log_likelihood - exact.log_likelihood_over(2..y.len())).abs() < 0.5);
}

#[test]
fn filter_error_decreases_with_particles() {
    let (m, y) = lgss_sequence(3);
    let rows = calc::filter_accuracy(&y, &m, 0.0, &[20, 100, 1000], 2, &RandomSource::new(4)).unwrap();
    assert!(rows[2].state_mse < rows[0].state_mse);
    assert!(rows[2].log_likelihood_mse < rows[0].log_likelihood_mse + 1e-3);
}

#[test]
fn lgss_pmh_recovers_phi() {
    let (_, y) = lgss_sequence(5);
    let chain = particle_metropolis_hastings(&y, 0.1, 1.0, 0.1, 50, 0.0, 500, 0.10, 11).unwrap();
    assert_eq!(chain.len(), 500);
    let tail_mean = chain.theta.column(0).rows(250, 250).mean();
    assert!((tail_mean - 0.5).abs() < 0.3, "posterior mean {}", tail_mean);
    assert!(chain.acceptance_rate() > 0.05);
    assert_relative_eq!(chain.posterior_mean(250)[0], tail_mean, epsilon = 1e-12);
}

#[test]
fn pmh_is_reproducible() {
    let (_, y) = lgss_sequence(6);
    let a = particle_metropolis_hastings(&y, 0.1, 1.0, 0.1, 30, 0.0, 120, 0.1, 42).unwrap();
    let b = particle_metropolis_hastings(&y, 0.1, 1.0, 0.1, 30, 0.0, 120, 0.1, 42).unwrap();
    for k in 0..a.len() {
        assert_eq!(a.theta[(k, 0)].to_bits(), b.theta[(k, 0)].to_bits());
        assert_eq!(a.log_likelihood[k].to_bits(), b.log_likelihood[k].to_bits());
    }

    let truth = Sv::new(-0.5, 0.9, 0.25).unwrap();
    let data = sim::generate_sv(&truth, 60, &mut RandomSource::new(43));
    let settings = Settings::new(80, StepSize::diagonal(&[0.1, 0.1, 0.1]), 44);
    let c = particle_metropolis_hastings_sv_reparameterised(&data.y, &[-0.5, 0.9, 0.25], 40, settings.clone()).unwrap();
    let d = particle_metropolis_hastings_sv_reparameterised(&data.y, &[-0.5, 0.9, 0.25], 40, settings).unwrap();
    assert_eq!(c.accepted, d.accepted);
    for k in 0..c.len() {
        for j in 0..3 {
            assert_eq!(c.theta[(k, j)].to_bits(), d.theta[(k, j)].to_bits());
        }
        assert_eq!(c.log_likelihood[k].to_bits(), d.log_likelihood[k].to_bits());
    }
    assert_eq!(c.filtered_states, d.filtered_states);
}

#[test]
fn unstable_phi_is_never_accepted() {
    let (_, y) = lgss_sequence(7);
    let chain = particle_metropolis_hastings(&y, 0.95, 1.0, 0.1, 20, 0.0, 300, 0.5, 8).unwrap();
    let mut gated = 0;
    for k in 1..chain.len() {
        assert!(chain.theta[(k, 0)].abs() < 1.0);
        if chain.theta_proposed[(k, 0)].abs() >= 1.0 {
            assert!(!chain.accepted[k]);
            gated += 1;
        }
    }
    assert!(gated > 0);
    assert_eq!(chain.filter_evaluations, chain.len() - gated);
}

#[test]
fn starting_outside_the_stationary_region_fails() {
    let (_, y) = lgss_sequence(9);
    let err = particle_metropolis_hastings(&y, 1.5, 1.0, 0.1, 20, 0.0, 10, 0.1, 1).unwrap_err();
    assert_eq!(err, Error::InvalidParameter { name : "phi", value : 1.5 });
}

#[test]
fn sv_filter_and_samplers() {
    let truth = Sv::new(-0.5, 0.95, 0.2).unwrap();
    let data = sim::generate_sv(&truth, 150, &mut RandomSource::new(12));
    let out = particle_filter_sv(&data.y, &truth, 200, &mut RandomSource::new(13)).unwrap();
    assert_eq!(out.x_hat_filtered.len(), 150);
    assert!(out.log_likelihood.is_finite());

    let step = StepSize::diagonal(&[0.1, 0.01, 0.02]);
    let mut settings = Settings::new(150, step, 14);
    settings.progress_every = 50;
    let natural = particle_metropolis_hastings_sv(&data.y, &[-0.5, 0.95, 0.2], 100, settings.clone()).unwrap();
    for k in 0..natural.len() {
        assert!(natural.theta[(k, 1)].abs() < 1.0);
        assert!(natural.theta[(k, 2)] > 0.0);
    }
    assert_eq!(natural.filtered_states.ncols(), 150);

    settings.step_size = StepSize::diagonal(&[0.1, 0.1, 0.1]);
    let reparam = particle_metropolis_hastings_sv_reparameterised(&data.y, &[-0.5, 0.95, 0.2], 100, settings).unwrap();
    // The unconstrained walk maps every proposal into the support.
    assert_eq!(reparam.filter_evaluations, reparam.len());
    for k in 0..reparam.len() {
        assert_relative_eq!(reparam.theta_walk[(k, 1)].tanh(), reparam.theta[(k, 1)], epsilon = 1e-12);
        assert_relative_eq!(reparam.theta_walk[(k, 2)].exp(), reparam.theta[(k, 2)], epsilon = 1e-12);
    }

    let summary = ChainSummary::new(&reparam, 50, 20);
    assert_eq!(summary.names, vec!["mu", "phi", "sigma_v"]);
    assert!(summary.iact.iter().all(|t| t.is_finite() ));
}

#[test]
fn pilot_tuning_feeds_a_new_run() {
    let (_, y) = lgss_sequence(15);
    let pilot = particle_metropolis_hastings(&y, 0.4, 1.0, 0.1, 30, 0.0, 200, 0.1, 16).unwrap();
    let step = tuned_step_size(&pilot.theta_walk, 100).unwrap();
    let s = match step {
        StepSize::Scalar(s) => s,
        other => panic!("expected a scalar step, got {:?}", other)
    };
    assert!(s > 0.0 && s.is_finite());
    let chain = particle_metropolis_hastings(&y, 0.4, 1.0, 0.1, 30, 0.0, 100, s, 17).unwrap();
    assert_eq!(chain.len(), 100);
}

#[test]
fn configured_run_writes_records() {
    let (_, y) = lgss_sequence(18);
    let cfg : io::RunConfig = serde_json::from_str(r#"{
        "target": "lgss",
        "initial_theta": [0.3],
        "n_particles": 20,
        "sigma_v": 1.0,
        "sigma_e": 0.1,
        "n_iterations": 60,
        "step_size": { "scalar": 0.1 },
        "seed": 19,
        "progress_every": 20
    }"#).unwrap();
    let mut reports = 0;
    let chain = cfg.run_with(&y, &mut |_ : &ProgressReport<'_>| reports += 1 ).unwrap();
    assert_eq!(reports, 3);
    let direct = particle_metropolis_hastings(&y, 0.3, 1.0, 0.1, 20, 0.0, 60, 0.1, 19).unwrap();
    assert_eq!(chain.theta, direct.theta);

    let mut buf = Vec::new();
    io::write_chain(&mut buf, &chain).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.starts_with("phi,log_likelihood,accepted\n"));
    assert_eq!(text.lines().count(), 61);
}
