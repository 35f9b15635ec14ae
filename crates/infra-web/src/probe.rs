// Outbound reachability probe (HTTP GET against a known-good endpoint)

use async_trait::async_trait;
use jobsync_core::port::NetworkProbe;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub probe_url: String,
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_url: "https://www.google.com/generate_204".to_string(),
            timeout_secs: 5,
        }
    }
}

pub struct HttpNetworkProbe {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpNetworkProbe {
    pub fn new(client: reqwest::Client, config: &HealthConfig) -> Self {
        Self {
            client,
            url: config.probe_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl NetworkProbe for HttpNetworkProbe {
    async fn check(&self) -> Result<(), String> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| format!("{} unreachable: {}", self.url, e))?;

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(format!("{} answered HTTP {}", self.url, status.as_u16()))
        }
    }
}
