//! Scrape orchestrator
//!
//! One [`Exporter::collect`] call is one cycle: liveness check, concurrent
//! fan-out of every active probe, barrier, sequential fold of the outcomes and
//! a snapshot of the resulting state. Cycles of one exporter never overlap.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use prometheus::core::Desc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, warn};

use super::metrics::{MetricState, Snapshot};
use crate::adapters::Transport;
use crate::error::{ProbeError, Result, TransportError};
use crate::probes::{Probe, ProbeOutcome, ProbeRegistry, SampleSink};

/// Point in time at which a cycle gives up on unfinished work
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }
}

/// Run `fut` to completion or until the deadline passes.
async fn bounded<F: Future>(
    deadline: Option<Deadline>,
    fut: F,
) -> std::result::Result<F::Output, TransportError> {
    match deadline {
        Some(d) => timeout_at(d.at, fut)
            .await
            .map_err(|_| TransportError::DeadlineExceeded(d.budget)),
        None => Ok(fut.await),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// One probe unit: always yields exactly one outcome, whatever the probe does.
async fn run_probe(
    probe: Arc<dyn Probe>,
    client: Arc<dyn Transport>,
    sink: SampleSink,
    deadline: Option<Deadline>,
) -> ProbeOutcome {
    let started = Instant::now();
    let unit = AssertUnwindSafe(probe.run(client.as_ref(), &sink)).catch_unwind();

    let result = match bounded(deadline, unit).await {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => Err(ProbeError::Panicked(panic_message(payload))),
        Err(expired) => Err(expired.into()),
    };

    ProbeOutcome {
        probe: probe.name(),
        duration: started.elapsed(),
        failure: result.err(),
    }
}

/// Outcome for a probe whose task never reported back; timed from the fan-out.
fn lost_outcome(probe: &'static str, fan_out: Instant) -> ProbeOutcome {
    ProbeOutcome {
        probe,
        duration: fan_out.elapsed(),
        failure: Some(ProbeError::Panicked("probe task was lost".to_string())),
    }
}

/// Drives scrape cycles against one harbor instance
pub struct Exporter {
    client: Arc<dyn Transport>,
    probes: Vec<Arc<dyn Probe>>,
    state: MetricState,
    descs: Vec<Desc>,
    target: String,
    cycle: Mutex<()>,
}

impl Exporter {
    /// Wire an exporter for the `active` probes.
    ///
    /// Every shape registered in `registry` is described, active or not.
    pub fn new(
        client: Arc<dyn Transport>,
        registry: &ProbeRegistry,
        active: Vec<Arc<dyn Probe>>,
        target: impl Into<String>,
    ) -> Result<Self> {
        let names: Vec<&str> = active.iter().map(|p| p.name()).collect();
        let state = MetricState::new(&names, registry.sample_shapes())?;

        let mut descs = state.describe();
        for shape in state.shapes() {
            descs.push(Desc::new(
                shape.name.to_string(),
                shape.help.to_string(),
                shape.labels.iter().map(|l| l.to_string()).collect(),
                HashMap::new(),
            )?);
        }

        Ok(Self {
            client,
            probes: active,
            state,
            descs,
            target: target.into(),
            cycle: Mutex::new(()),
        })
    }

    /// Static descriptors of every metric this exporter can expose
    pub fn describe(&self) -> &[Desc] {
        &self.descs
    }

    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Run one cycle without a deadline.
    pub async fn collect(&self) -> Snapshot {
        self.collect_within(None).await
    }

    /// Run one cycle; the liveness check and every probe must finish within
    /// `budget` or are folded as failed.
    pub async fn collect_within(&self, budget: Option<Duration>) -> Snapshot {
        let _cycle = self.cycle.lock().await;
        let deadline = budget.map(Deadline::after);
        let mut fold = self.state.begin_cycle();

        let started = Instant::now();
        let up = match bounded(deadline, self.client.check_live()).await {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                warn!(url = %self.target, "harbor rejected the configured credentials");
                false
            }
            Ok(Err(err)) | Err(err) => {
                warn!(url = %self.target, error = %err, "harbor liveness check failed");
                false
            }
        };
        fold.fold_liveness(up, started.elapsed());

        let (sink, mut samples_rx) = SampleSink::channel();
        let fan_out = Instant::now();
        let mut tasks = JoinSet::new();
        for probe in &self.probes {
            tasks.spawn(run_probe(
                Arc::clone(probe),
                Arc::clone(&self.client),
                sink.clone(),
                deadline,
            ));
        }
        drop(sink);

        let mut pending = self.probe_names();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    if let Some(err) = &outcome.failure {
                        error!(
                            probe = outcome.probe,
                            kind = %err.kind(),
                            url = %self.target,
                            error = %err,
                            "probe failed"
                        );
                    }
                    pending.retain(|name| *name != outcome.probe);
                    fold.fold(&outcome);
                }
                Err(err) => error!(error = %err, "probe task did not complete"),
            }
        }

        // a task lost to the runtime still counts as a failed probe
        for probe in pending {
            fold.fold(&lost_outcome(probe, fan_out));
        }

        let failed = fold.finish();

        let mut samples = Vec::new();
        while let Ok(sample) = samples_rx.try_recv() {
            samples.push(sample);
        }
        debug!(
            url = %self.target,
            up,
            failed,
            probes = self.probes.len(),
            samples = samples.len(),
            "scrape cycle complete"
        );

        self.state.snapshot(samples)
    }
}
