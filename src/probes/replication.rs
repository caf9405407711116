use async_trait::async_trait;

use super::{fetch_json, ref_work, single_id, IdItem, Probe, SampleDesc, SampleSink, REF_WORK_LABELS};
use crate::adapters::Transport;
use crate::error::ProbeError;

const ADAPTERS_ENDPOINT: &str = "/replication/adapters";

pub const REPLICATION_REF_WORK: SampleDesc = SampleDesc {
    name: "harbor_ref_work_replication",
    help: "test the replication ref work status(0 for error, 1 for success).",
    labels: REF_WORK_LABELS,
};

/// Replication policies, executions and adapters; needs at least one policy
/// with an execution, so it is off by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicationProbe;

#[async_trait]
impl Probe for ReplicationProbe {
    fn name(&self) -> &'static str {
        "replication"
    }

    fn help(&self) -> &'static str {
        "Collect the replication ref work"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&REPLICATION_REF_WORK]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let endpoint = "/replication/policies?page_size=1";
        let policies: Vec<IdItem> = fetch_json(client, endpoint).await?;
        let policy_id = single_id(&policies, endpoint)?;
        ref_work(sink, &REPLICATION_REF_WORK, "/replication/policies");

        let endpoint = format!("/replication/executions?page=1&page_size=1&policy_id={policy_id}");
        let executions: Vec<IdItem> = fetch_json(client, &endpoint).await?;
        single_id(&executions, &endpoint)?;
        ref_work(sink, &REPLICATION_REF_WORK, "/replication/executions");

        let adapters: Vec<String> = fetch_json(client, ADAPTERS_ENDPOINT).await?;
        if adapters.is_empty() {
            return Err(ProbeError::missing(ADAPTERS_ENDPOINT, "adapter"));
        }
        ref_work(sink, &REPLICATION_REF_WORK, ADAPTERS_ENDPOINT);

        Ok(())
    }
}
