use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::core::error::{ApiError, DecodeStage, ErrorPayload};
use crate::core::rates::{ExchangeRateProvider, RateSet};

pub const DEFAULT_BASE_URL: &str = "https://openexchangerates.org/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const LATEST_ENDPOINT: &str = "latest.json";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    app_id: String,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(app_id: &str) -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id: app_id.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Client for the Open Exchange Rates `latest` endpoint.
///
/// Holds no per-call state: every call builds and sends its own request, so a
/// single instance can be cloned or shared across tasks.
#[derive(Debug, Clone)]
pub struct OpenExchangeRatesClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl OpenExchangeRatesClient {
    pub fn new(app_id: &str) -> Self {
        Self::with_config(ClientConfig::new(app_id))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        OpenExchangeRatesClient { config, http }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds the `latest` URL. `base` and `symbols` are each added only when
    /// non-empty; symbols keep their order and are comma-joined.
    pub fn latest_url(&self, base: &str, symbols: &[&str]) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.config.base_url, LATEST_ENDPOINT);
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::InvalidRequest(format!("{raw}: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("app_id", &self.config.app_id);
            if !base.is_empty() {
                query.append_pair("base", base);
            }
            if !symbols.is_empty() {
                query.append_pair("symbols", &symbols.join(","));
            }
        }

        Ok(url)
    }

    fn redacted(&self, url: &Url) -> String {
        let mut shown = url.clone();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| match k.as_ref() {
                "app_id" => (k.into_owned(), "REDACTED".to_string()),
                _ => (k.into_owned(), v.into_owned()),
            })
            .collect();
        shown.query_pairs_mut().clear().extend_pairs(pairs);
        shown.to_string()
    }

    async fn call_api(&self, url: Url) -> Result<RateSet, ApiError> {
        debug!("Requesting latest rates from {}", self.redacted(&url));

        let response = self
            .http
            .get(url)
            .timeout(self.config.timeout)
            .send()
            .await?;

        let status = response.status();
        debug!(%status, "Received rates response");

        let body = response.text().await?;

        if status != StatusCode::OK {
            let payload: ErrorPayload = serde_json::from_str(&body).map_err(|e| {
                error!(error = ?e, response = %body, "Failed to parse error response");
                ApiError::Decode {
                    stage: DecodeStage::ErrorBody,
                    status: status.as_u16(),
                    source: e,
                }
            })?;
            return Err(ApiError::Provider(payload));
        }

        serde_json::from_str::<RateSet>(&body).map_err(|e| {
            error!(error = ?e, response = %body, "Failed to parse rates response");
            ApiError::Decode {
                stage: DecodeStage::RatesBody,
                status: status.as_u16(),
                source: e,
            }
        })
    }
}

#[async_trait]
impl ExchangeRateProvider for OpenExchangeRatesClient {
    #[instrument(name = "LatestRatesFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str, symbols: &[&str]) -> Result<RateSet, ApiError> {
        let url = self.latest_url(base, symbols)?;
        self.call_api(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const APP_ID: &str = "test-app-id";

    const LATEST_JSON: &str = r#"{
        "disclaimer": "Usage subject to terms: https://openexchangerates.org/terms",
        "license": "https://openexchangerates.org/license",
        "timestamp": 1700000000,
        "base": "USD",
        "rates": {
            "EUR": 0.9,
            "GBP": 0.8
        }
    }"#;

    fn client_for(server: &MockServer) -> OpenExchangeRatesClient {
        OpenExchangeRatesClient::with_config(ClientConfig::new(APP_ID).with_base_url(&server.uri()))
    }

    async fn mount_latest(server: &MockServer, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("app_id", APP_ID))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_latest_url_shapes() {
        let client = OpenExchangeRatesClient::new("key");

        let url = client.latest_url("", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://openexchangerates.org/api/latest.json?app_id=key"
        );

        let url = client.latest_url("EUR", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://openexchangerates.org/api/latest.json?app_id=key&base=EUR"
        );

        let url = client.latest_url("EUR", &["USD", "GBP"]).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("app_id".to_string(), "key".to_string()),
                ("base".to_string(), "EUR".to_string()),
                ("symbols".to_string(), "USD,GBP".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let client = OpenExchangeRatesClient::with_config(
            ClientConfig::new("key").with_base_url("not a url"),
        );
        let err = client.latest_url("", &[]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn test_default_config() {
        let client = OpenExchangeRatesClient::new("key");
        assert_eq!(client.config().base_url(), DEFAULT_BASE_URL);
        assert_eq!(client.config().app_id(), "key");
        assert_eq!(client.config().timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_fetch_with_key_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("app_id", APP_ID))
            .and(query_param_is_missing("base"))
            .and(query_param_is_missing("symbols"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let rates = client_for(&server).fetch_rates("", &[]).await.unwrap();
        assert_eq!(rates.base, "USD");
        assert_eq!(rates.timestamp, 1700000000);
        assert_eq!(rates.license, "https://openexchangerates.org/license");
        assert_eq!(rates.rate("EUR"), Some(0.9));
        assert_eq!(rates.rate("GBP"), Some(0.8));
    }

    #[tokio::test]
    async fn test_fetch_with_base() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("app_id", APP_ID))
            .and(query_param("base", "USD"))
            .and(query_param_is_missing("symbols"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let rates = client_for(&server).fetch_rates("USD", &[]).await.unwrap();
        assert_eq!(rates.rates.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_with_base_and_symbols() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("app_id", APP_ID))
            .and(query_param("base", "USD"))
            .and(query_param("symbols", "EUR,GBP"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let rates = client_for(&server)
            .fetch_rates("USD", &["EUR", "GBP"])
            .await
            .unwrap();
        assert_eq!(rates.rate("EUR"), Some(0.9));
    }

    #[tokio::test]
    async fn test_convert_now() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("base", "USD"))
            .and(query_param_is_missing("symbols"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST_JSON))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.convert_now("USD", "EUR", 100.0).await.unwrap();
        assert_eq!(result, 90.0);
    }

    #[tokio::test]
    async fn test_convert_now_rate_not_found() {
        let server = MockServer::start().await;
        mount_latest(&server, 200, LATEST_JSON).await;

        let err = client_for(&server)
            .convert_now("USD", "JPY", 100.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RateNotFound { ref currency } if currency == "JPY"));
    }

    #[tokio::test]
    async fn test_provider_error_response() {
        let server = MockServer::start().await;
        let body = r#"{
            "error": true,
            "status": 401,
            "message": "invalid_app_id",
            "description": "Invalid App ID provided. Please sign up at https://openexchangerates.org/signup"
        }"#;
        mount_latest(&server, 401, body).await;

        let err = client_for(&server).fetch_rates("", &[]).await.unwrap_err();
        match err {
            ApiError::Provider(payload) => {
                assert!(payload.error);
                assert_eq!(payload.status, 401);
                assert_eq!(payload.message, "invalid_app_id");
                assert!(payload.description.starts_with("Invalid App ID"));
            }
            other => panic!("Expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_error_response() {
        let server = MockServer::start().await;
        mount_latest(&server, 500, "<html>Internal Server Error</html>").await;

        let err = client_for(&server).fetch_rates("", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Decode {
                stage: DecodeStage::ErrorBody,
                status: 500,
                ..
            }
        ));
        assert_eq!(err.payload().message, "decode_error_body");
    }

    #[tokio::test]
    async fn test_foreign_error_body_keeps_http_status() {
        for body in [r#"{}"#, r#"[]"#, r#"{"detail": "bad gateway"}"#] {
            let server = MockServer::start().await;
            mount_latest(&server, 502, body).await;

            let err = client_for(&server).fetch_rates("", &[]).await.unwrap_err();
            assert!(
                matches!(
                    err,
                    ApiError::Decode {
                        stage: DecodeStage::ErrorBody,
                        status: 502,
                        ..
                    }
                ),
                "Expected error body decode failure for {body}, got {err:?}"
            );
            assert_eq!(err.status(), Some(502));
        }
    }

    #[tokio::test]
    async fn test_fetch_with_symbols_and_default_base() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("app_id", APP_ID))
            .and(query_param_is_missing("base"))
            .and(query_param("symbols", "EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST_JSON))
            .expect(1)
            .mount(&server)
            .await;

        let rates = client_for(&server).fetch_rates("", &["EUR"]).await.unwrap();
        assert_eq!(rates.base, "USD");
    }

    #[tokio::test]
    async fn test_malformed_rates_response() {
        let server = MockServer::start().await;
        mount_latest(&server, 200, r#"{"base": "USD", "rates": "#).await;

        let err = client_for(&server).fetch_rates("USD", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Decode {
                stage: DecodeStage::RatesBody,
                status: 200,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(LATEST_JSON)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = OpenExchangeRatesClient::with_config(
            ClientConfig::new(APP_ID)
                .with_base_url(&server.uri())
                .with_timeout(Duration::from_millis(50)),
        );
        let err = client.fetch_rates("", &[]).await.unwrap_err();
        assert!(err.is_timeout(), "Expected timeout, got {err:?}");
        assert_eq!(err.payload().message, "timeout");
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let client = OpenExchangeRatesClient::with_config(
            ClientConfig::new(APP_ID).with_base_url("http://127.0.0.1:1"),
        );
        let err = client.fetch_rates("", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { timeout: false, .. }));
    }

    #[test]
    fn test_redacted_url() {
        let client = OpenExchangeRatesClient::new("secret");
        let url = client.latest_url("EUR", &[]).unwrap();
        let shown = client.redacted(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("app_id=REDACTED"));
    }
}
