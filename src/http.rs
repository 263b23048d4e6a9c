//! Outbound HTTP client construction.
//!
//! Every search request gets its own [`reqwest::Client`] so connection pooling
//! and the timeout policy are shared by that request's connectors and released
//! together when the request finishes.

use std::time::Duration;

use crate::error::ConnectorError;

pub const USER_AGENT: &str = concat!("api-fusion/", env!("CARGO_PKG_VERSION"));

/// Client used by connectors for one aggregation call.
pub fn make_client(timeout: Duration) -> Result<reqwest::Client, ConnectorError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ConnectorError::Unknown(format!("failed to build HTTP client: {e}")))
}

/// Client used by health probes: bounded and redirect-following.
pub fn make_probe_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("api-fusion/"));
        assert!(USER_AGENT.len() > "api-fusion/".len());
    }

    #[test]
    fn clients_build() {
        assert!(make_client(Duration::from_secs(3)).is_ok());
        assert!(make_probe_client(Duration::from_millis(500)).is_ok());
    }
}
