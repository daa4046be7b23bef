//! Reachability probes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::MonitorConfig;
use crate::error::Result;

/// Trait for reachability checks.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Whether the network is reachable right now.
    async fn is_reachable(&self) -> bool;
}

/// Probe that issues a lightweight GET to each endpoint in turn.
///
/// Any HTTP response, whatever its status, means the network is reachable.
/// Connection errors and timeouts move on to the next endpoint.
pub struct HttpProbe {
    /// HTTP client.
    client: reqwest::Client,

    /// Endpoints, in the order they are tried.
    endpoints: Vec<String>,

    /// Timeout per endpoint.
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe for the given endpoints.
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    /// Create a probe from monitor configuration.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Self::new(config.endpoints.clone(), config.probe_timeout())
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        for endpoint in &self.endpoints {
            match self
                .client
                .get(endpoint)
                .timeout(self.timeout)
                .send()
                .await
            {
                Ok(response) => {
                    debug!("Probe {endpoint} answered {}", response.status());
                    return true;
                }
                Err(e) => debug!("Probe {endpoint} failed: {e}"),
            }
        }
        false
    }
}

/// Probe whose answer is set by hand.
///
/// Used to pin the assistant offline and to drive the monitor in tests.
#[derive(Debug, Default)]
pub struct FixedProbe {
    reachable: AtomicBool,
}

impl FixedProbe {
    /// Create a probe that answers `reachable`.
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
        }
    }

    /// Change the answer for subsequent probes.
    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Probe for FixedProbe {
    async fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Nothing listens on the discard port of localhost in the test sandbox.
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:9";

    fn probe(endpoints: Vec<String>) -> HttpProbe {
        HttpProbe::new(endpoints, Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_second_endpoint_used_when_first_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let probe = probe(vec![DEAD_ENDPOINT.to_string(), server.uri()]);
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_any_status_counts_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(probe(vec![server.uri()]).is_reachable().await);
    }

    #[tokio::test]
    async fn test_all_endpoints_down() {
        let probe = probe(vec![DEAD_ENDPOINT.to_string(), DEAD_ENDPOINT.to_string()]);
        assert!(!probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(vec![server.uri()], Duration::from_millis(100)).unwrap();
        assert!(!probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_fixed_probe() {
        let probe = FixedProbe::new(false);
        assert!(!probe.is_reachable().await);
        probe.set(true);
        assert!(probe.is_reachable().await);
    }
}
