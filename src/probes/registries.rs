use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, Probe, SampleDesc, SampleSink};
use crate::adapters::Transport;
use crate::error::ProbeError;

const REGISTRIES_ENDPOINT: &str = "/registries";

pub const REGISTRY_HEALTHY: SampleDesc = SampleDesc {
    name: "harbor_registries_healthy",
    help: "the registries health status(0 for unhealthy, 1 for healthy).",
    labels: &["name"],
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteRegistry {
    name: String,
    status: String,
}

/// Health of every configured remote registry endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistriesProbe;

#[async_trait]
impl Probe for RegistriesProbe {
    fn name(&self) -> &'static str {
        "registries"
    }

    fn help(&self) -> &'static str {
        "Collect the registries health status"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&REGISTRY_HEALTHY]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let registries: Vec<RemoteRegistry> = fetch_json(client, REGISTRIES_ENDPOINT).await?;
        if registries.is_empty() {
            return Err(ProbeError::missing(REGISTRIES_ENDPOINT, "name"));
        }

        for registry in &registries {
            let healthy = if registry.status == "unhealthy" { 0.0 } else { 1.0 };
            sink.gauge(&REGISTRY_HEALTHY, healthy, &[&registry.name]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::testing;

    #[tokio::test]
    async fn test_reports_each_registry() {
        let client = testing::routes(&[(
            REGISTRIES_ENDPOINT,
            r#"[{"id": 1, "name": "hub", "status": "healthy"},
                {"id": 2, "name": "mirror", "status": "unhealthy"}]"#,
        )]);
        let (result, samples) = testing::run(&RegistriesProbe, &client).await;

        assert!(result.is_ok());
        assert_eq!(
            testing::flat(&samples),
            vec![
                ("harbor_registries_healthy", vec!["hub".to_string()], 1.0),
                ("harbor_registries_healthy", vec!["mirror".to_string()], 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_registries_is_semantic_failure() {
        let client = testing::routes(&[(REGISTRIES_ENDPOINT, "[]")]);
        let (result, _) = testing::run(&RegistriesProbe, &client).await;
        assert!(matches!(result, Err(ProbeError::MissingField { .. })));
    }
}
