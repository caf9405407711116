//! Harbor REST transport.
//!
//! All probes and the liveness check share one `HarborClient`; the underlying
//! `reqwest::Client` pools connections and is safe for concurrent use.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::HarborConfig;
use crate::error::{ExporterError, Result, TransportError};

/// Endpoint used by the liveness check; it requires valid credentials.
pub const LIVENESS_ENDPOINT: &str = "/configurations";

/// Authenticated GET access to the target API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` relative to the API base; any status other than 200 is an error.
    async fn get(&self, path: &str) -> std::result::Result<Vec<u8>, TransportError>;

    /// Lightweight reachability and credential check backing the `up` gauge.
    async fn check_live(&self) -> std::result::Result<bool, TransportError>;
}

#[derive(Clone)]
pub struct HarborClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl HarborClient {
    pub fn new(config: &HarborConfig) -> Result<Self> {
        let base_url = config.base_url()?;

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(ExporterError::Http)?;

        Ok(Self {
            http,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send(&self, endpoint: &str) -> std::result::Result<reqwest::Response, TransportError> {
        let url = self.url(endpoint);
        debug!("request url {}", url);

        self.http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .send()
            .await
            .map_err(|e| request_error(endpoint, e))
    }
}

fn request_error(endpoint: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        TransportError::Connect {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HarborClient {
    async fn get(&self, path: &str) -> std::result::Result<Vec<u8>, TransportError> {
        let resp = self.send(path).await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(TransportError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    endpoint: path.to_string(),
                }
            } else {
                TransportError::Body {
                    endpoint: path.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(body.to_vec())
    }

    async fn check_live(&self) -> std::result::Result<bool, TransportError> {
        let resp = self.send(LIVENESS_ENDPOINT).await?;

        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("harbor rejected the configured credentials");
                Ok(false)
            }
            status => Err(TransportError::Status {
                endpoint: LIVENESS_ENDPOINT.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}
