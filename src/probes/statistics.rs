use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, Probe, SampleDesc, SampleSink};
use crate::adapters::Transport;
use crate::error::ProbeError;

const STATISTICS_ENDPOINT: &str = "/statistics";

pub const PROJECT_COUNT: SampleDesc = SampleDesc {
    name: "harbor_project_count_total",
    help: "projects number relevant to the user",
    labels: &["type"],
};

pub const REPO_COUNT: SampleDesc = SampleDesc {
    name: "harbor_repo_count_total",
    help: "repositories number relevant to the user",
    labels: &["type"],
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Statistics {
    private_project_count: f64,
    private_repo_count: f64,
    public_project_count: f64,
    public_repo_count: f64,
    total_project_count: f64,
    total_repo_count: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsProbe;

#[async_trait]
impl Probe for StatisticsProbe {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn help(&self) -> &'static str {
        "Collect the statistics"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&PROJECT_COUNT, &REPO_COUNT]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let stats: Statistics = fetch_json(client, STATISTICS_ENDPOINT).await?;

        sink.gauge(&PROJECT_COUNT, stats.total_project_count, &["total"]);
        sink.gauge(&PROJECT_COUNT, stats.public_project_count, &["public"]);
        sink.gauge(&PROJECT_COUNT, stats.private_project_count, &["private"]);
        sink.gauge(&REPO_COUNT, stats.total_repo_count, &["total"]);
        sink.gauge(&REPO_COUNT, stats.public_repo_count, &["public"]);
        sink.gauge(&REPO_COUNT, stats.private_repo_count, &["private"]);
        Ok(())
    }
}
