use tracing::info;

/// Snapshot of the chain handed to observers at the reporting cadence.
#[derive(Debug, Clone)]
pub struct ProgressReport<'a> {

    /// 1-based iteration just completed.
    pub iteration : usize,

    pub n_iterations : usize,

    pub names : &'static [&'static str],

    /// Chain state after this iteration.
    pub current : &'a [f64],

    /// Parameters proposed at this iteration.
    pub proposed : &'a [f64],

    /// Mean of the chain over iterations 1..=iteration.
    pub posterior_mean : &'a [f64],

    /// Fraction of proposals accepted so far.
    pub acceptance_rate : f64

}

/// Receives progress reports from the sampler. Observers cannot touch the chain,
/// so attaching one never changes the draws.
pub trait ChainObserver {

    fn progress(&mut self, report : &ProgressReport<'_>);

    /// Called once after the last iteration.
    fn finish(&mut self) { }

}

/// Emits each report as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ChainObserver for LogObserver {

    fn progress(&mut self, report : &ProgressReport<'_>) {
        info!(
            iteration = report.iteration,
            of = report.n_iterations,
            current = ?report.current,
            proposed = ?report.proposed,
            posterior_mean = ?report.posterior_mean,
            acceptance_rate = report.acceptance_rate,
            "pmh progress"
        );
    }

}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ChainObserver for NoopObserver {

    fn progress(&mut self, _report : &ProgressReport<'_>) { }

}

impl<F> ChainObserver for F
where
    F : FnMut(&ProgressReport<'_>)
{

    fn progress(&mut self, report : &ProgressReport<'_>) {
        self(report)
    }

}
