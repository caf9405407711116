//! Harbor probes
//!
//! Each probe issues one or more GETs against the harbor API, decodes the JSON
//! payload and emits gauges in the `harbor` namespace. Probes that only check
//! whether an endpoint works emit `harbor_ref_work_*{ref, method} = 1` per
//! working endpoint and stop at the first failing one.

use serde::de::DeserializeOwned;

use crate::adapters::Transport;
use crate::error::ProbeError;

pub mod gc;
pub mod health;
pub mod labels;
pub mod logs;
pub mod projects;
pub mod registries;
pub mod registry;
pub mod replication;
pub mod statistics;
pub mod system_info;
pub mod traits;
pub mod users;
pub mod volumes;

pub use gc::GcProbe;
pub use health::HealthProbe;
pub use labels::LabelsProbe;
pub use logs::LogsProbe;
pub use projects::ProjectsProbe;
pub use registries::RegistriesProbe;
pub use registry::{ProbeRegistry, RegistryEntry, LIVENESS_LABEL};
pub use replication::ReplicationProbe;
pub use statistics::StatisticsProbe;
pub use system_info::SystemInfoProbe;
pub use traits::{Probe, ProbeOutcome, Sample, SampleDesc, SampleSink};
pub use users::UsersProbe;
pub use volumes::VolumesProbe;

/// Label names shared by every `harbor_ref_work_*` gauge
pub(crate) const REF_WORK_LABELS: &[&str] = &["ref", "method"];

/// GET `endpoint` and decode its JSON body
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &dyn Transport,
    endpoint: &str,
) -> Result<T, ProbeError> {
    let body = client.get(endpoint).await?;
    serde_json::from_slice(&body).map_err(|source| ProbeError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Mark `reference` as a working GET endpoint
pub(crate) fn ref_work(sink: &SampleSink, desc: &'static SampleDesc, reference: &str) {
    sink.gauge(desc, 1.0, &[reference, "GET"]);
}

/// Identifier-bearing list item used by several endpoints
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub(crate) struct IdItem {
    pub id: i64,
}

/// Exactly one item with a non-zero id, as returned by `page_size=1` queries
pub(crate) fn single_id(items: &[IdItem], endpoint: &str) -> Result<i64, ProbeError> {
    match items {
        [only] if only.id != 0 => Ok(only.id),
        _ => Err(ProbeError::missing(endpoint, "id")),
    }
}


#[cfg(test)]
mod tests {
    use super::testing;
    use super::*;

    #[tokio::test]
    async fn test_fetch_json_decode_failure() {
        let client = testing::routes(&[("/broken", "{not json")]);
        let err = fetch_json::<Vec<IdItem>>(&client, "/broken").await.unwrap_err();
        assert!(matches!(err, ProbeError::Decode { ref endpoint, .. } if endpoint == "/broken"));
    }

    #[tokio::test]
    async fn test_fetch_json_status_is_protocol_failure() {
        let client = testing::routes(&[]);
        let err = fetch_json::<Vec<IdItem>>(&client, "/missing").await.unwrap_err();
        assert!(matches!(err, ProbeError::Protocol { status: 404, .. }));
    }

    #[test]
    fn test_single_id_requires_exactly_one_nonzero() {
        assert_eq!(single_id(&[IdItem { id: 7 }], "/x").unwrap(), 7);
        assert!(single_id(&[], "/x").is_err());
        assert!(single_id(&[IdItem { id: 0 }], "/x").is_err());
        assert!(single_id(&[IdItem { id: 1 }, IdItem { id: 2 }], "/x").is_err());
    }
}
