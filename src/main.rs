use anyhow::Context;
use clap::Parser;
use harbor_exporter::cli::Cli;
use harbor_exporter::config::AppConfig;
use harbor_exporter::error::ExporterError;
use harbor_exporter::probes::ProbeRegistry;
use harbor_exporter::services::{Exporter, MetricsServer};
use harbor_exporter::HarborClient;
use std::sync::Arc;
use tracing::info;

mod main_runtime;

use main_runtime::{init_logging, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = AppConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    cli.apply(&mut cfg);

    let registry = ProbeRegistry::builtin(cfg.override_version.clone())?;

    if cli.list_collectors {
        for entry in registry.entries() {
            let default = if entry.default_enabled { "on" } else { "off" };
            println!(
                "{:<20} {:<4} {}",
                entry.probe.name(),
                default,
                entry.probe.help()
            );
        }
        return Ok(());
    }

    let _log_guard = init_logging(&cfg.logging)?;

    cfg.validate().map_err(ExporterError::InvalidConfig)?;
    info!(harbor = ?cfg.harbor, web = ?cfg.web, "Starting harbor_exporter");

    let client = HarborClient::new(&cfg.harbor)?;
    let target = client.base_url().to_string();

    let active = registry.resolve(&cfg.collect)?;
    for probe in &active {
        info!(collector = probe.name(), "Collector enabled");
    }

    let exporter = Exporter::new(Arc::new(client), &registry, active, target)?;
    let server = MetricsServer::new(Arc::new(exporter), &cfg.web)?;
    server.run(shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}
