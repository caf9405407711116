use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, Probe, SampleDesc, SampleSink};
use crate::adapters::Transport;
use crate::error::ProbeError;

const VOLUMES_ENDPOINT: &str = "/systeminfo/volumes";

pub const SYSTEM_VOLUMES: SampleDesc = SampleDesc {
    name: "harbor_system_volumes_bytes",
    help: "Get system volume info (total/free size).",
    labels: &["type"],
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Volumes {
    storage: Storage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Storage {
    total: f64,
    free: f64,
}

/// Storage volume sizes; requires an admin account.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumesProbe;

#[async_trait]
impl Probe for VolumesProbe {
    fn name(&self) -> &'static str {
        "systeminfoVolumes"
    }

    fn help(&self) -> &'static str {
        "Collect the systeminfoVolumes, user must have admin"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&SYSTEM_VOLUMES]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let volumes: Volumes = fetch_json(client, VOLUMES_ENDPOINT).await?;
        let storage = volumes.storage;
        if storage.total == 0.0 {
            return Err(ProbeError::missing(VOLUMES_ENDPOINT, "storage.total"));
        }

        sink.gauge(&SYSTEM_VOLUMES, storage.total, &["total"]);
        sink.gauge(&SYSTEM_VOLUMES, storage.free, &["free"]);
        sink.gauge(&SYSTEM_VOLUMES, storage.total - storage.free, &["used"]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::testing;

    #[tokio::test]
    async fn test_reports_used_space() {
        let body = r#"{"storage": {"total": 1000, "free": 250}}"#;
        let client = testing::routes(&[("/systeminfo/volumes", body)]);
        let (result, samples) = testing::run(&VolumesProbe, &client).await;

        assert!(result.is_ok());
        let used = samples.iter().find(|s| s.label_values == ["used"]).unwrap();
        assert_eq!(used.value, 750.0);
    }

    #[tokio::test]
    async fn test_zero_total_is_semantic_failure() {
        let client = testing::routes(&[("/systeminfo/volumes", r#"{"storage": {}}"#)]);
        let (result, samples) = testing::run(&VolumesProbe, &client).await;

        assert!(matches!(result, Err(ProbeError::MissingField { .. })));
        assert!(samples.is_empty());
    }
}
