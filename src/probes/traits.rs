//! Probe contract and the sample types probes emit
//!
//! A probe exercises one logical area of the target API through a shared
//! [`Transport`] and reports success or a typed [`ProbeError`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::adapters::Transport;
use crate::error::ProbeError;

// ============================================================================
// Probe Trait
// ============================================================================

/// Core trait that every probe must implement
///
/// Implementations hold no mutable state shared with other probes, so any
/// number of them can run concurrently against the same client.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable, unique, non-empty identifier
    fn name(&self) -> &'static str;

    /// Static description of what the probe exercises
    fn help(&self) -> &'static str;

    /// Shapes of every sample this probe may emit
    fn samples(&self) -> &'static [&'static SampleDesc];

    /// Exercise the API, sending successful samples to `sink`.
    ///
    /// Samples sent before a failure remain valid; nothing is sent after it.
    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError>;
}

// ============================================================================
// Samples
// ============================================================================

/// Static shape of a gauge sample
#[derive(Debug, PartialEq, Eq)]
pub struct SampleDesc {
    /// Fully qualified metric name
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

/// One gauge value emitted by a probe
#[derive(Debug, Clone)]
pub struct Sample {
    pub desc: &'static SampleDesc,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl Sample {
    pub fn new(desc: &'static SampleDesc, value: f64, label_values: &[&str]) -> Self {
        Self {
            desc,
            label_values: label_values.iter().map(|v| v.to_string()).collect(),
            value,
        }
    }
}

/// Multi-producer sample queue shared by all probe units of one cycle
///
/// Sends never block; the orchestrator drains the receiving side after the
/// barrier.
#[derive(Debug, Clone)]
pub struct SampleSink {
    tx: mpsc::UnboundedSender<Sample>,
}

impl SampleSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Sample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, sample: Sample) {
        // The receiver lives until every producer of the cycle is joined.
        let _ = self.tx.send(sample);
    }

    pub fn gauge(&self, desc: &'static SampleDesc, value: f64, label_values: &[&str]) {
        self.emit(Sample::new(desc, value, label_values));
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of one probe unit within one cycle
#[derive(Debug)]
pub struct ProbeOutcome {
    pub probe: &'static str,
    pub duration: Duration,
    pub failure: Option<ProbeError>,
}

impl ProbeOutcome {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}
