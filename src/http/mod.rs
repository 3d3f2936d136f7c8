//! HTTP pipeline
//!
//! - [`transport`]: the network call primitive and its `reqwest` implementation
//! - [`envelope`]: the `{code, data, msg}` business-result wrapper
//! - [`stage`]: bearer-token injection and response classification
//! - [`refresh`]: single-flight token refresh with queued replay
//! - [`client`]: the pipeline wiring, [`ApiClient`]

pub mod client;
pub mod envelope;
pub mod refresh;
pub mod stage;
pub mod transport;

#[cfg(test)]
pub mod fake;

pub use client::ApiClient;
pub use envelope::Envelope;
pub use refresh::RefreshCoordinator;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportError};
