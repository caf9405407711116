//! Exporter metric state and per-cycle snapshots
//!
//! [`MetricState`] owns the values that persist across scrapes: cycle count,
//! error counters, target liveness and per-probe durations. Probe samples are
//! rendered into a fresh registry on every cycle so that a snapshot only ever
//! carries the samples of the cycle that produced it.

use std::collections::HashMap;
use std::time::Duration;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{
    Encoder, GaugeVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tracing::warn;

use crate::error::{ExporterError, Result};
use crate::probes::{ProbeOutcome, Sample, SampleDesc, LIVENESS_LABEL};

pub const SCRAPES_TOTAL: &str = "harbor_exporter_scrapes_total";
pub const SCRAPE_ERRORS_TOTAL: &str = "harbor_exporter_scrape_errors_total";
pub const LAST_SCRAPE_ERROR: &str = "harbor_exporter_last_scrape_error";
pub const UP: &str = "harbor_up";
pub const COLLECTOR_DURATION: &str = "harbor_exporter_collector_duration_seconds";

const STATE_METRICS: [&str; 5] = [
    SCRAPES_TOTAL,
    SCRAPE_ERRORS_TOTAL,
    LAST_SCRAPE_ERROR,
    UP,
    COLLECTOR_DURATION,
];

/// Metric values carried between scrapes
pub struct MetricState {
    registry: Registry,
    scrapes_total: IntCounter,
    scrape_errors: IntCounterVec,
    last_scrape_error: IntGauge,
    up: IntGauge,
    durations: GaugeVec,
    /// Every sample shape a probe may emit
    shapes: Vec<&'static SampleDesc>,
}

impl MetricState {
    /// Create the state metrics; the error counter of each probe in `probes`
    /// starts at zero.
    pub fn new(probes: &[&str], shapes: Vec<&'static SampleDesc>) -> Result<Self> {
        if let Some(shape) = shapes.iter().find(|s| STATE_METRICS.contains(&s.name)) {
            return Err(ExporterError::ConflictingShape {
                name: shape.name.to_string(),
                reason: "collides with an exporter state metric".to_string(),
            });
        }

        let scrapes_total = IntCounter::with_opts(Opts::new(
            SCRAPES_TOTAL,
            "Total number of times harbor was scraped for metrics.",
        ))?;
        let scrape_errors = IntCounterVec::new(
            Opts::new(
                SCRAPE_ERRORS_TOTAL,
                "Total number of times an error occurred scraping a harbor.",
            ),
            &["collector"],
        )?;
        let last_scrape_error = IntGauge::with_opts(Opts::new(
            LAST_SCRAPE_ERROR,
            "Whether the last scrape of metrics from harbor resulted in an error (1 for error, 0 for success).",
        ))?;
        let up = IntGauge::with_opts(Opts::new(UP, "Whether the harbor is up."))?;
        let durations = GaugeVec::new(
            Opts::new(COLLECTOR_DURATION, "Collector time duration."),
            &["collector"],
        )?;

        let registry = Registry::new();
        registry.register(Box::new(scrapes_total.clone()))?;
        registry.register(Box::new(scrape_errors.clone()))?;
        registry.register(Box::new(last_scrape_error.clone()))?;
        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(durations.clone()))?;

        for probe in probes {
            scrape_errors.with_label_values(&[*probe]);
        }

        Ok(Self {
            registry,
            scrapes_total,
            scrape_errors,
            last_scrape_error,
            up,
            durations,
            shapes,
        })
    }

    /// Static descriptors of the five state metrics
    pub fn describe(&self) -> Vec<Desc> {
        let collectors: [&dyn Collector; 5] = [
            &self.scrapes_total,
            &self.scrape_errors,
            &self.last_scrape_error,
            &self.up,
            &self.durations,
        ];
        collectors
            .iter()
            .flat_map(|c| c.desc().into_iter().cloned())
            .collect()
    }

    pub fn shapes(&self) -> &[&'static SampleDesc] {
        &self.shapes
    }

    /// Start a cycle: count it and forget the durations of the previous one.
    pub fn begin_cycle(&self) -> CycleFold<'_> {
        self.scrapes_total.inc();
        self.durations.reset();
        CycleFold {
            state: self,
            failed: false,
        }
    }

    /// Gather the state metrics together with the samples of one cycle.
    pub fn snapshot(&self, samples: Vec<Sample>) -> Snapshot {
        let mut families = self.registry.gather();
        families.extend(self.render(samples));
        families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        Snapshot { families }
    }

    fn render(&self, samples: Vec<Sample>) -> Vec<MetricFamily> {
        let registry = Registry::new();
        let mut vecs: HashMap<&'static str, GaugeVec> = HashMap::new();

        for sample in samples {
            let desc = sample.desc;
            if !self.shapes.iter().any(|s| *s == desc) {
                warn!(metric = desc.name, "dropping sample with undeclared shape");
                continue;
            }

            if !vecs.contains_key(desc.name) {
                let vec = match GaugeVec::new(Opts::new(desc.name, desc.help), desc.labels)
                    .and_then(|vec| registry.register(Box::new(vec.clone())).map(|_| vec))
                {
                    Ok(vec) => vec,
                    Err(err) => {
                        warn!(metric = desc.name, error = %err, "cannot render sample family");
                        continue;
                    }
                };
                vecs.insert(desc.name, vec);
            }

            let Some(vec) = vecs.get(desc.name) else {
                continue;
            };
            let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
            match vec.get_metric_with_label_values(&values) {
                Ok(gauge) => gauge.set(sample.value),
                Err(err) => {
                    warn!(metric = desc.name, error = %err, "dropping malformed sample")
                }
            }
        }

        registry.gather()
    }
}

/// Outcome fold of a single cycle
///
/// Only the orchestrator holds one, so every write to the state happens from
/// a single task.
pub struct CycleFold<'a> {
    state: &'a MetricState,
    failed: bool,
}

impl CycleFold<'_> {
    pub fn fold_liveness(&mut self, up: bool, duration: Duration) {
        self.state.up.set(i64::from(up));
        self.state
            .durations
            .with_label_values(&[LIVENESS_LABEL])
            .set(duration.as_secs_f64());
        if !up {
            self.failed = true;
        }
    }

    pub fn fold(&mut self, outcome: &ProbeOutcome) {
        self.state
            .durations
            .with_label_values(&[outcome.probe])
            .set(outcome.duration.as_secs_f64());
        if !outcome.success() {
            self.state
                .scrape_errors
                .with_label_values(&[outcome.probe])
                .inc();
            self.failed = true;
        }
    }

    /// Publish the cycle error flag and return it.
    pub fn finish(self) -> bool {
        self.state.last_scrape_error.set(i64::from(self.failed));
        self.failed
    }
}

/// Metric families of exactly one completed cycle
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    families: Vec<MetricFamily>,
}

impl Snapshot {
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    /// Encode in the Prometheus text exposition format
    pub fn encode_text(&self) -> std::result::Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Value of the series `name` whose labels include every pair in `labels`
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let family = self.families.iter().find(|f| f.get_name() == name)?;
        family
            .get_metric()
            .iter()
            .find(|m| {
                labels.iter().all(|(k, v)| {
                    m.get_label()
                        .iter()
                        .any(|p| p.get_name() == *k && p.get_value() == *v)
                })
            })
            .map(|m| {
                if m.has_counter() {
                    m.get_counter().get_value()
                } else {
                    m.get_gauge().get_value()
                }
            })
    }

    pub fn series_count(&self, name: &str) -> usize {
        self.families
            .iter()
            .find(|f| f.get_name() == name)
            .map_or(0, |f| f.get_metric().len())
    }
}
