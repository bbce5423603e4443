use std::io;

use log::{info, warn};

use pipeline::{HarnessConfig, PipelineErr, bench};

fn main() -> io::Result<()> {
    env_logger::init();

    let cfg = HarnessConfig::from_env()?;

    let outcome = match bench::run(cfg) {
        Ok(outcome) => outcome,
        Err(PipelineErr::BackendUnavailable) => {
            warn!("compute backend unavailable, skipping the run");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let metrics = &outcome.report.metrics;
    info!(
        iterations = metrics.iterations,
        samples = metrics.samples;
        "fill {:?}, wait {:?}, eval {:?}",
        metrics.fill_time,
        metrics.wait_time,
        metrics.eval_time
    );

    if !outcome.passed() {
        return Err(io::Error::other(format!(
            "final accuracy {:.2}% is below the {:.2}% threshold",
            outcome.accuracy * 100.0,
            outcome.threshold * 100.0
        )));
    }

    info!("final accuracy {:.2}%", outcome.accuracy * 100.0);
    Ok(())
}
