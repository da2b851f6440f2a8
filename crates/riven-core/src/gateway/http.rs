//! Riven API client for streak state.
//!
//! `GET  {base}/api/streak` returns the stored payload (404 or an empty body
//! when none exists); `PUT {base}/api/streak` replaces it.

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use super::PersistenceGateway;
use crate::error::{ConfigError, GatewayError};
use crate::streak::StreakStateDto;

const STREAK_PATH: &str = "api/streak";

pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpGateway {
    /// Build a client for the API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: "sync.base_url".into(),
            message,
        };
        let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid(format!("'{base_url}' cannot be used as a base URL")));
        }
        // Keep any path prefix ("https://host/v2" -> "https://host/v2/api/streak")
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(STREAK_PATH).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.endpoint.clone());
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn request_error(&self, source: reqwest::Error) -> GatewayError {
        GatewayError::Request {
            url: self.endpoint.to_string(),
            source,
        }
    }
}

#[async_trait]
impl PersistenceGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn load(&self) -> Result<Option<StreakStateDto>, GatewayError> {
        let response = self
            .request(reqwest::Method::GET)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                url: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(body)?))
    }

    async fn save(&self, state: &StreakStateDto) -> Result<(), GatewayError> {
        let response = self
            .request(reqwest::Method::PUT)
            .json(state)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                url: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
