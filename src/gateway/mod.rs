// src/gateway/mod.rs
// Client for the language-model gateway
//
// One POST per step; the reply is a chunked `data: {"text": ...}` stream
// decoded into text fragments. Credentials come from server-side config.

pub mod sse;

use anyhow::Result;
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CONFIG;
use crate::content::{ContentItem, ContentSummary};
use crate::error::GatewayError;
use sse::StreamDecoder;

/// Which pipeline step a request belongs to. The gateway selects its
/// instruction template from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    RecommendationCheck,
    ContentAnalysis,
    FinalResponse,
    GeneralChat,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::RecommendationCheck => "recommendation_check",
            StepType::ContentAnalysis => "content_analysis",
            StepType::FinalResponse => "final_response",
            StepType::GeneralChat => "general_chat",
        }
    }
}

/// Wire-exact gateway request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub message: String,
    pub user_email: String,
    pub step_type: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_data: Option<Vec<ContentSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_content: Option<Vec<ContentItem>>,
}

impl GatewayRequest {
    pub fn new(
        message: impl Into<String>,
        user_email: impl Into<String>,
        step_type: StepType,
    ) -> Self {
        Self {
            message: message.into(),
            user_email: user_email.into(),
            step_type,
            content_data: None,
            selected_content: None,
        }
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>>;

/// Seam over the gateway so the pipeline can run against a scripted
/// implementation in tests.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Submit a prompt and receive decoded text fragments as they arrive.
    async fn stream(
        &self,
        request: GatewayRequest,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, GatewayError>;

    /// Submit a prompt and accumulate the full streamed reply.
    async fn complete(
        &self,
        request: GatewayRequest,
        cancel: CancellationToken,
    ) -> Result<String, GatewayError> {
        let mut stream = self.stream(request, cancel).await?;
        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            full.push_str(&fragment?);
        }
        Ok(full)
    }
}

/// Production gateway client over HTTP.
pub struct HttpGateway {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONFIG.gateway_connect_timeout))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config() -> Result<Self> {
        Self::new(CONFIG.gateway_url.clone(), CONFIG.gateway_api_key.clone())
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn stream(
        &self,
        request: GatewayRequest,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, GatewayError> {
        debug!(step = request.step_type.as_str(), "posting to gateway");

        let mut builder = self.client.post(&self.url).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = builder.send() => result?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http { status, body });
        }

        let mut body = response.bytes_stream();

        let stream = try_stream! {
            let mut decoder = StreamDecoder::new();
            loop {
                let chunk = tokio::select! {
                    _ = cancel.cancelled() => Err(GatewayError::Cancelled),
                    next = body.next() => Ok(next),
                }?;
                // Transport closing is the only end-of-stream signal
                let Some(chunk) = chunk else { break };
                let chunk = chunk.map_err(GatewayError::Network)?;
                for fragment in decoder.push(&chunk) {
                    yield fragment;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
