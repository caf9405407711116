pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod probes;
pub mod services;

pub use adapters::{HarborClient, Transport};
pub use config::AppConfig;
pub use error::{ExporterError, ProbeError, Result, TransportError};
pub use probes::{Probe, ProbeRegistry};
pub use services::{Exporter, MetricsServer, Snapshot};
