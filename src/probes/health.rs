use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, Probe, SampleDesc, SampleSink};
use crate::adapters::Transport;
use crate::error::ProbeError;

const HEALTH_ENDPOINT: &str = "/health";

pub const COMPONENT_HEALTH: SampleDesc = SampleDesc {
    name: "harbor_health",
    help: "components status(0 for error, 1 for success).",
    labels: &["name"],
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Health {
    components: Vec<ComponentStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComponentStatus {
    name: String,
    status: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthProbe;

#[async_trait]
impl Probe for HealthProbe {
    fn name(&self) -> &'static str {
        "health"
    }

    fn help(&self) -> &'static str {
        "Collect the health ref work"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&COMPONENT_HEALTH]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let health: Health = fetch_json(client, HEALTH_ENDPOINT).await?;

        for component in &health.components {
            let status = if component.status == "healthy" { 1.0 } else { 0.0 };
            sink.gauge(&COMPONENT_HEALTH, status, &[&component.name]);
        }
        Ok(())
    }
}
