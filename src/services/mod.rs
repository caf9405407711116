pub mod exporter;
pub mod metrics;
pub mod server;

pub use exporter::Exporter;
pub use metrics::{CycleFold, MetricState, Snapshot};
pub use server::{router, scrape_budget, HealthResponse, MetricsServer, ServerState};
