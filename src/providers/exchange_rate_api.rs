use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::rates::{RateProvider, RateTable};

/// Rate source backed by the exchangerate-api.com v6 endpoint.
///
/// One outbound request per call, no caching here. The endpoint base URL and
/// API key are injected through configuration.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        ExchangeRateApiProvider {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct LatestRatesResponse {
    conversion_rates: HashMap<String, f64>,
    time_last_update_unix: Option<i64>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(
        name = "RateFetch",
        skip(self),
        fields(base = %base)
    )]
    async fn fetch_rates(&self, base: &str) -> Result<RateTable> {
        let base = base.trim();
        if base.is_empty() {
            bail!("Base currency must not be empty");
        }

        // The key is part of the URL path; log only the base currency.
        let url = format!("{}/v6/{}/latest/{}", self.base_url, self.api_key, base);
        debug!("Requesting exchange rates for {}", base);

        let client = reqwest::Client::builder().user_agent("fxc/1.0").build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse rates response for {}: {}", base, e))?;

        if data.conversion_rates.is_empty() {
            return Err(anyhow!("No rates found for base currency: {}", base));
        }

        let last_updated = data
            .time_last_update_unix
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        Ok(RateTable::new(base, data.conversion_rates, last_updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "test-key";

    pub async fn create_mock_server(base: &str, mock_response: &str) -> wiremock::MockServer {
        let mock_server = wiremock::MockServer::start().await;
        let request_path = format!("/v6/{API_KEY}/latest/{base}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_response = r#"{
            "result": "success",
            "base_code": "USD",
            "time_last_update_unix": 1700000000,
            "conversion_rates": {
                "EUR": 0.9,
                "NGN": 1500.0,
                "USD": 1.0
            }
        }"#;

        let mock_server = create_mock_server("USD", mock_response).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), API_KEY);

        let table = provider.fetch_rates("USD").await.unwrap();
        assert_eq!(table.base(), "USD");
        assert_eq!(table.len(), 3);
        assert_eq!(table.rate("EUR"), Some(0.9));
        assert_eq!(table.rate("NGN"), Some(1500.0));
        assert_eq!(
            table.last_updated().map(|ts| ts.timestamp()),
            Some(1700000000)
        );
    }

    #[tokio::test]
    async fn test_last_update_time_is_optional() {
        let mock_response = r#"{"conversion_rates": {"EUR": 0.9}}"#;

        let mock_server = create_mock_server("USD", mock_response).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), API_KEY);

        let table = provider.fetch_rates("USD").await.unwrap();
        assert!(table.last_updated().is_none());
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let mock_server = MockServer::start().await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), API_KEY);

        Mock::given(method("GET"))
            .and(path(format!("/v6/{API_KEY}/latest/USD")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = provider.fetch_rates("USD").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for base currency: USD"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        // "rates" instead of "conversion_rates"
        let mock_response = r#"{"rates": {"EUR": 0.9}}"#;

        let mock_server = create_mock_server("USD", mock_response).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), API_KEY);

        let result = provider.fetch_rates("USD").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse rates response for USD")
        );
    }

    #[tokio::test]
    async fn test_empty_rate_map_is_an_error() {
        let mock_response = r#"{"conversion_rates": {}}"#;

        let mock_server = create_mock_server("USD", mock_response).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri(), API_KEY);

        let result = provider.fetch_rates("USD").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No rates found for base currency: USD"
        );
    }

    #[tokio::test]
    async fn test_empty_base_is_rejected_before_any_request() {
        let provider = ExchangeRateApiProvider::new("http://127.0.0.1:0", API_KEY);

        let result = provider.fetch_rates("  ").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Base currency must not be empty"
        );
    }
}
