use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, Probe, SampleDesc, SampleSink};
use crate::adapters::Transport;
use crate::error::ProbeError;

const SYSTEM_INFO_ENDPOINT: &str = "/systeminfo";

pub const VERSION_INFO: SampleDesc = SampleDesc {
    name: "harbor_version_info",
    help: "harbor system info",
    labels: &[
        "registry_url",
        "project_creation_restriction",
        "self_registration",
        "version",
    ],
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SystemInfo {
    registry_url: String,
    project_creation_restriction: String,
    self_registration: bool,
    harbor_version: String,
}

/// General system info; some harbor builds report no version number, so the
/// reported version can be overridden.
#[derive(Debug, Clone, Default)]
pub struct SystemInfoProbe {
    version_override: Option<String>,
}

impl SystemInfoProbe {
    pub fn new(version_override: Option<String>) -> Self {
        Self {
            version_override: version_override.filter(|v| !v.is_empty()),
        }
    }
}

#[async_trait]
impl Probe for SystemInfoProbe {
    fn name(&self) -> &'static str {
        "systeminfo"
    }

    fn help(&self) -> &'static str {
        "Collect the general system info"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&VERSION_INFO]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let info: SystemInfo = fetch_json(client, SYSTEM_INFO_ENDPOINT).await?;
        if info.registry_url.is_empty() {
            return Err(ProbeError::missing(SYSTEM_INFO_ENDPOINT, "registry_url"));
        }

        let version = self
            .version_override
            .as_deref()
            .unwrap_or(&info.harbor_version);
        let self_registration = info.self_registration.to_string();

        sink.gauge(
            &VERSION_INFO,
            1.0,
            &[
                &info.registry_url,
                &info.project_creation_restriction,
                &self_registration,
                version,
            ],
        );
        Ok(())
    }
}
