use async_trait::async_trait;

use super::{fetch_json, ref_work, single_id, IdItem, Probe, SampleDesc, SampleSink, REF_WORK_LABELS};
use crate::adapters::Transport;
use crate::error::ProbeError;

const LABELS_ENDPOINT: &str = "/labels?scope=g&pagesize=1";

pub const LABELS_REF_WORK: SampleDesc = SampleDesc {
    name: "harbor_ref_work_labels",
    help: "test the labels ref work status(0 for error, 1 for success).",
    labels: REF_WORK_LABELS,
};

/// Global-scope labels; needs at least one label defined.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelsProbe;

#[async_trait]
impl Probe for LabelsProbe {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn help(&self) -> &'static str {
        "Collect the labels ref work"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&LABELS_REF_WORK]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let labels: Vec<IdItem> = fetch_json(client, LABELS_ENDPOINT).await?;
        single_id(&labels, LABELS_ENDPOINT)?;
        ref_work(sink, &LABELS_REF_WORK, "/labels");
        Ok(())
    }
}
