//! Base HTTP client with shared logic

use crate::infrastructure::model::types::ModelError;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Base HTTP client with shared functionality
#[derive(Clone)]
pub struct HttpClientBase {
    pub id: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub http: Client,
}

impl HttpClientBase {
    pub fn new(id: String, endpoint: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            id,
            endpoint,
            api_key,
            timeout,
            http: Client::new(),
        }
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Post JSON with the API key as `?key=` query parameter.
    ///
    /// Non-2xx answers become `ModelError::Api` carrying the provider's own
    /// error message, which later drives error classification.
    pub async fn post_with_query_key<Req, Res>(
        &self,
        url: &str,
        body: &Req,
    ) -> Result<Res, ModelError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let api_key = self.require_api_key()?;

        let response = self
            .http
            .post(url)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::network(&self.id, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::network(&self.id, e))?;

        if !status.is_success() {
            return Err(ModelError::api(
                &self.id,
                status.as_u16(),
                api_error_message(&text),
            ));
        }

        serde_json::from_str(&text).map_err(|e| ModelError::invalid_response(&self.id, e.to_string()))
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::missing_api_key(&self.id))
    }
}

/// `error.status: error.message` from a Google API error body, or the raw
/// body when it has another shape.
fn api_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        let error = value.get("error")?;
        let message = error.get("message")?.as_str()?;
        Some(match error.get("status").and_then(Value::as_str) {
            Some(status) => format!("{status}: {message}"),
            None => message.to_string(),
        })
    });
    parsed.unwrap_or_else(|| body.trim().to_string())
}
