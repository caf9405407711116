use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, ref_work, Probe, SampleDesc, SampleSink, REF_WORK_LABELS};
use crate::adapters::Transport;
use crate::error::ProbeError;

const LOGS_ENDPOINT: &str = "/logs?page_size=1";

pub const LOGS_REF_WORK: SampleDesc = SampleDesc {
    name: "harbor_ref_work_logs",
    help: "test the logs ref work status(0 for error, 1 for success).",
    labels: REF_WORK_LABELS,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuditLog {
    log_id: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogsProbe;

#[async_trait]
impl Probe for LogsProbe {
    fn name(&self) -> &'static str {
        "logs"
    }

    fn help(&self) -> &'static str {
        "Collect the logs ref work"
    }

    fn samples(&self) -> &'static [&'static SampleDesc] {
        &[&LOGS_REF_WORK]
    }

    async fn run(&self, client: &dyn Transport, sink: &SampleSink) -> Result<(), ProbeError> {
        let logs: Vec<AuditLog> = fetch_json(client, LOGS_ENDPOINT).await?;
        match logs.as_slice() {
            [only] if only.log_id != 0 => {}
            _ => return Err(ProbeError::missing(LOGS_ENDPOINT, "log_id")),
        }
        ref_work(sink, &LOGS_REF_WORK, "/logs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::testing;

    #[tokio::test]
    async fn test_reports_logs_endpoint() {
        let client = testing::routes(&[(LOGS_ENDPOINT, r#"[{"log_id": 42, "operation": "push"}]"#)]);
        let (result, samples) = testing::run(&LogsProbe, &client).await;

        assert!(result.is_ok());
        assert_eq!(
            testing::flat(&samples),
            vec![(
                "harbor_ref_work_logs",
                vec!["/logs".to_string(), "GET".to_string()],
                1.0
            )]
        );
    }

    #[tokio::test]
    async fn test_object_instead_of_list_is_decode_failure() {
        let client = testing::routes(&[(LOGS_ENDPOINT, r#"{"log_id": 42}"#)]);
        let (result, _) = testing::run(&LogsProbe, &client).await;
        assert!(matches!(result, Err(ProbeError::Decode { .. })));
    }
}
