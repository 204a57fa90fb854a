//! HTTP client for the evaluations backend.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::EvaluationApi;
use crate::board::transition::StatusUpdateRequest;
use crate::error::ApiError;
use crate::intake::IntakeFilters;

/// `reqwest`-backed [`EvaluationApi`].
#[derive(Debug, Clone)]
pub struct EvaluationClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl EvaluationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// `{base}/api/evaluations/{segments..}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, ApiError> {
        let invalid = |reason: String| ApiError::Request {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["api", "evaluations"])
            .extend(segments);
        Ok(url)
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            ApiError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    /// Send a request and fail on non-2xx, keeping the body for the error.
    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let resp = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json(&self, url: &str, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let resp = self.send(url, request).await?;
        resp.json::<Value>().await.map_err(|e| ApiError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl EvaluationApi for EvaluationClient {
    async fn list_evaluations(&self, filters: &IntakeFilters) -> Result<Value, ApiError> {
        let url = self.url(&[])?;
        let query = filters.query_pairs();
        debug!(url = %url, ?query, "Fetching evaluations");
        self.get_json(url.as_str(), self.client.get(url.clone()).query(&query))
            .await
    }

    async fn get_evaluation(&self, id: &str) -> Result<Value, ApiError> {
        let url = self.url(&[id])?;
        debug!(url = %url, "Fetching evaluation");
        self.get_json(url.as_str(), self.client.get(url.clone())).await
    }

    async fn update_status(&self, id: &str, request: &StatusUpdateRequest) -> Result<(), ApiError> {
        let url = self.url(&[id, "status"])?;
        debug!(url = %url, status = %request.status, "Updating evaluation status");
        self.send(url.as_str(), self.client.patch(url.clone()).json(request))
            .await?;
        Ok(())
    }
}
