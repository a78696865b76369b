//! Inventory lookup over HTTP.

use async_trait::async_trait;
use common::SkuCode;
use domain::Availability;
use reqwest::StatusCode;

use crate::error::LookupError;
use crate::services::inventory::InventoryLookup;

/// Calls the inventory service's `GET /api/inventory` endpoint.
///
/// The client carries no timeout of its own. Deadlines are enforced per
/// attempt by the resilience controller, which drops the in-flight request
/// when it expires.
#[derive(Debug, Clone)]
pub struct HttpInventoryLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryLookup {
    /// Creates a lookup against the given base URL, e.g. `http://localhost:8082`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a lookup using an existing client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Gateway statuses mean the service behind the proxy could not be reached.
fn classify_status(status: StatusCode) -> LookupError {
    match status {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            LookupError::RemoteUnavailable(format!("inventory responded {status}"))
        }
        _ => LookupError::RemoteError(format!("inventory responded {status}")),
    }
}

#[async_trait]
impl InventoryLookup for HttpInventoryLookup {
    async fn check(&self, skus: &[SkuCode]) -> Result<Vec<Availability>, LookupError> {
        if skus.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/inventory", self.base_url);
        let query: Vec<(&str, &str)> = skus.iter().map(|sku| ("skuCode", sku.as_str())).collect();

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| LookupError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, "inventory lookup failed");
            return Err(classify_status(status));
        }

        response.json::<Vec<Availability>>().await.map_err(|e| {
            if e.is_decode() {
                LookupError::RemoteError(format!("malformed inventory response: {e}"))
            } else {
                LookupError::RemoteUnavailable(e.to_string())
            }
        })
    }
}
