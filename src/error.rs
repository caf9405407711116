use std::time::Duration;
use thiserror::Error;

/// Start-up and wiring errors for the exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("Invalid harbor URL: {0}")]
    InvalidUrl(String),

    // Network errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    // Probe wiring errors
    #[error("Duplicate probe registration: {0}")]
    DuplicateProbe(String),

    #[error("Invalid probe name: {0:?}")]
    InvalidProbeName(String),

    #[error("Unknown probe in enablement override: {0}")]
    UnknownProbe(String),

    #[error("Probe overridden more than once: {0}")]
    DuplicateOverride(String),

    #[error("Conflicting sample shape {name}: {reason}")]
    ConflictingShape { name: String, reason: String },

    // Metric registration errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for ExporterError
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Failures of the transport client
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {endpoint} failed: {message}")]
    Connect { endpoint: String, message: String },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("error handling request for {endpoint} http-statuscode: {status}")]
    Status { endpoint: String, status: u16 },

    #[error("reading response body of {endpoint} failed: {message}")]
    Body { endpoint: String, message: String },

    #[error("scrape deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Coarse failure classification, used for logging only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Protocol,
    Decode,
    Semantic,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Decode => "decode",
            Self::Semantic => "semantic",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a single probe run
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("transport failure: {0}")]
    Transport(TransportError),

    #[error("{endpoint} returned HTTP status {status}")]
    Protocol { endpoint: String, status: u16 },

    #[error("malformed payload from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot find {expected_field} in response of {endpoint}")]
    MissingField {
        endpoint: String,
        expected_field: &'static str,
    },

    #[error("probe panicked: {0}")]
    Panicked(String),
}

impl ProbeError {
    pub fn missing(endpoint: impl Into<String>, expected_field: &'static str) -> Self {
        ProbeError::MissingField {
            endpoint: endpoint.into(),
            expected_field,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::Protocol { .. } => FailureKind::Protocol,
            Self::Decode { .. } => FailureKind::Decode,
            Self::MissingField { .. } => FailureKind::Semantic,
            Self::Panicked(_) => FailureKind::Internal,
        }
    }
}

impl From<TransportError> for ProbeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { endpoint, status } => ProbeError::Protocol { endpoint, status },
            other => ProbeError::Transport(other),
        }
    }
}
