use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

/// Command line flags; every flag that is set overrides the config file and
/// environment.
#[derive(Parser, Debug)]
#[command(name = "harbor_exporter")]
#[command(version)]
#[command(about = "Prometheus exporter for the Harbor registry API", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// HTTP API address of a harbor server (prefix with https:// to use TLS)
    #[arg(long = "harbor-server", env = "HARBOR_URI")]
    pub harbor_server: Option<String>,

    /// Username for the harbor API
    #[arg(long = "harbor-user")]
    pub harbor_user: Option<String>,

    /// Password for the harbor API
    #[arg(long = "harbor-pass")]
    pub harbor_pass: Option<String>,

    /// User agent of the harbor http client
    #[arg(long = "harbor-ua")]
    pub harbor_ua: Option<String>,

    /// Timeout on HTTP requests to the harbor API in milliseconds
    #[arg(long = "time-out")]
    pub timeout_ms: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path")]
    pub telemetry_path: Option<String>,

    /// Upper bound for one scrape in milliseconds
    #[arg(long = "scrape-timeout")]
    pub scrape_timeout_ms: Option<u64>,

    /// Milliseconds subtracted from the Prometheus scrape timeout header
    #[arg(long = "scrape-timeout-offset")]
    pub scrape_timeout_offset_ms: Option<u64>,

    /// The logging level: trace, debug, info, warn, error
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// File to write logs to (default stdout)
    #[arg(long = "log-output")]
    pub log_output: Option<PathBuf>,

    /// Emit JSON formatted logs
    #[arg(long = "log-json")]
    pub log_json: bool,

    /// Override the version reported by the systeminfo collector
    #[arg(long = "override-version")]
    pub override_version: Option<String>,

    /// Enable or disable a collector, e.g. --collect replication=true
    #[arg(long = "collect", value_name = "NAME=BOOL", value_parser = parse_collect)]
    pub collect: Vec<(String, bool)>,

    /// Print every collector with its default and exit
    #[arg(long = "list-collectors")]
    pub list_collectors: bool,
}

fn parse_collect(raw: &str) -> Result<(String, bool), String> {
    let (name, enabled) = match raw.split_once('=') {
        Some((name, value)) => {
            let enabled = value
                .trim()
                .parse::<bool>()
                .map_err(|_| format!("expected true or false after '=', got {value:?}"))?;
            (name.trim(), enabled)
        }
        None => (raw.trim(), true),
    };
    if name.is_empty() {
        return Err("collector name is empty".to_string());
    }
    Ok((name.to_string(), enabled))
}

impl Cli {
    /// Layer the flags that were given on top of `cfg`.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(url) = &self.harbor_server {
            cfg.harbor.url = url.clone();
        }
        if let Some(user) = &self.harbor_user {
            cfg.harbor.username = user.clone();
        }
        if let Some(pass) = &self.harbor_pass {
            cfg.harbor.password = pass.clone();
        }
        if let Some(ua) = &self.harbor_ua {
            cfg.harbor.user_agent = ua.clone();
        }
        if let Some(ms) = self.timeout_ms {
            cfg.harbor.timeout_ms = ms;
        }
        if self.insecure {
            cfg.harbor.insecure = true;
        }

        if let Some(addr) = &self.listen_address {
            cfg.web.listen_address = addr.clone();
        }
        if let Some(path) = &self.telemetry_path {
            cfg.web.telemetry_path = path.clone();
        }
        if let Some(ms) = self.scrape_timeout_ms {
            cfg.web.scrape_timeout_ms = Some(ms);
        }
        if let Some(ms) = self.scrape_timeout_offset_ms {
            cfg.web.scrape_timeout_offset_ms = ms;
        }

        if let Some(level) = &self.log_level {
            cfg.logging.level = level.clone();
        }
        if let Some(file) = &self.log_output {
            cfg.logging.file = Some(file.clone());
        }
        if self.log_json {
            cfg.logging.json = true;
        }

        if let Some(version) = &self.override_version {
            cfg.override_version = Some(version.clone());
        }
        for (name, enabled) in &self.collect {
            cfg.collect.retain(|key, _| !key.eq_ignore_ascii_case(name));
            cfg.collect.insert(name.clone(), *enabled);
        }
    }
}
