//! HTTP connectivity probe

use anyhow::{Context, Result};
use async_trait::async_trait;
use kready_lib::{CollectorError, ConnectivityProbe};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Probe that succeeds once an endpoint answers with a success status
pub struct HttpConnectivityProbe {
    client: Client,
    url: Url,
}

impl HttpConnectivityProbe {
    /// Create a probe; `request_timeout` bounds a single check
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let url = Url::parse(url).context("Invalid connectivity URL")?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    fn target(&self) -> &str {
        self.url.as_str()
    }

    async fn check(&self) -> Result<(), CollectorError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| CollectorError::unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CollectorError::unreachable(format!(
                "{} answered {}",
                self.url, status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(HttpConnectivityProbe::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_target_is_normalised_url() {
        let probe = HttpConnectivityProbe::new("http://backend:8080", Duration::from_secs(1)).unwrap();
        assert_eq!(probe.target(), "http://backend:8080/");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Port 9 on localhost is reserved for discard and normally closed
        let probe =
            HttpConnectivityProbe::new("http://127.0.0.1:9/health", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            probe.check().await,
            Err(CollectorError::Unreachable(_))
        ));
    }
}
