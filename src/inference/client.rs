use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use serde::de::DeserializeOwned;

use crate::error::TransportError;
use crate::sampler::FramePayload;
use crate::session::SessionContext;

use super::types::{AnalyzeResponse, PostureVerdict, SessionSummary, SummaryResponse};

const USER_ID_HEADER: &str = "User-ID";
const ANALYZE_ENDPOINT: &str = "/analyze";
const SUMMARY_ENDPOINT: &str = "/session_summary";

/// Remote posture service. One request per call; retrying is the caller's business.
#[async_trait]
pub trait InferenceApi: Send + Sync {
    async fn analyze(
        &self,
        frame: FramePayload,
        session: &SessionContext,
    ) -> Result<PostureVerdict, TransportError>;

    async fn fetch_summary(&self, session: &SessionContext)
        -> Result<SessionSummary, TransportError>;
}

#[derive(Clone)]
pub struct HttpInferenceClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpInferenceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn classify(&self, endpoint: &'static str, source: reqwest::Error) -> TransportError {
        if source.is_timeout() {
            TransportError::Timeout {
                endpoint,
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            TransportError::Request { endpoint, source }
        }
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        response: Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| self.classify(endpoint, err))?;
        serde_json::from_slice(&body).map_err(|err| TransportError::Decode {
            endpoint,
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl InferenceApi for HttpInferenceClient {
    async fn analyze(
        &self,
        frame: FramePayload,
        session: &SessionContext,
    ) -> Result<PostureVerdict, TransportError> {
        debug!(
            "POST {} ({} bytes, captured {})",
            ANALYZE_ENDPOINT,
            frame.jpeg.len(),
            frame.captured_at
        );
        let response = self
            .http
            .post(self.url(ANALYZE_ENDPOINT))
            .header(USER_ID_HEADER, session.session_id())
            .header(CONTENT_TYPE, "image/jpeg")
            .body(frame.jpeg)
            .send()
            .await
            .map_err(|err| self.classify(ANALYZE_ENDPOINT, err))?;

        let decoded: AnalyzeResponse = self.decode(ANALYZE_ENDPOINT, response).await?;
        Ok(decoded.into())
    }

    async fn fetch_summary(
        &self,
        session: &SessionContext,
    ) -> Result<SessionSummary, TransportError> {
        let response = self
            .http
            .get(self.url(SUMMARY_ENDPOINT))
            .header(USER_ID_HEADER, session.session_id())
            .send()
            .await
            .map_err(|err| self.classify(SUMMARY_ENDPOINT, err))?;

        let decoded: SummaryResponse = self.decode(SUMMARY_ENDPOINT, response).await?;
        Ok(decoded.into())
    }
}
