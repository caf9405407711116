pub mod harbor_client;

pub use harbor_client::{HarborClient, Transport, LIVENESS_ENDPOINT};

#[cfg(test)]
pub use harbor_client::MockTransport;
