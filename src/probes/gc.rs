use async_trait::async_trait;

use super::{fetch_json, ref_work, single_id, IdItem, Probe, SampleDesc, SampleSink, REF_WORK_LABELS};
use crate::adapters::Transport;
use crate::error::ProbeError;

const GC_ENDPOINT: &str = "/system/gc";

pub const GC_REF_WORK: SampleDesc = SampleDesc {
    name: "harbor_ref_work_gc",
    help: "test the system gc ref work status(0 for error, 1 for success).",
    labels: REF_WORK_LABELS,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct GcProbe;

#[async_trait]
impl Probe for GcProbe {
    fn name(&self) -> &'static str {
        "systemgc"
    }

    fn help(&self) -> &'static str {
        "Collect the systemgc ref work"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&GC_REF_WORK]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let jobs: Vec<IdItem> = fetch_json(client, GC_ENDPOINT).await?;
        single_id(&jobs, GC_ENDPOINT)?;
        ref_work(sink, &GC_REF_WORK, GC_ENDPOINT);
        Ok(())
    }
}
