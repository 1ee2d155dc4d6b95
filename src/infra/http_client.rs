//! HTTP client factory with consistent timeout configuration.
//!
//! Gateway adapters use `build_client()` rather than constructing
//! `reqwest::Client` directly.

use reqwest::Client;
use std::time::Duration;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build an HTTP client whose per-request timeout is `request_timeout`.
///
/// Collection bridges hold the initiation request open while the payer
/// confirms, so callers pass the gateway timeout explicitly.
pub fn build_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
}
