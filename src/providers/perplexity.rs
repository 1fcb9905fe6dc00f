//! Perplexity chat-completions client.
//!
//! See: <https://docs.perplexity.ai/api-reference/chat-completions>

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use tokio::sync::{mpsc, oneshot};

use crate::client::{Client, ClientError, StreamingClient};
use crate::http::{add_extra_headers, auth_headers, build_http_client, check_status};
use crate::model::{CompletionRequest, CompletionResponse, Message};
use crate::options::TransportOptions;
use crate::sse::SSEResponseExt;
use crate::stream::{CompletionStream, StreamGuard, DEFAULT_STREAM_CAPACITY};

/// Perplexity client using HTTP transport.
#[derive(Debug, Clone)]
pub struct PerplexityClient {
    transport_options: TransportOptions,
}

impl PerplexityClient {
    pub fn new(transport_options: TransportOptions) -> Self {
        Self { transport_options }
    }

    /// Run a streaming request on a background task.
    ///
    /// The request is checked before the task starts, so argument errors are
    /// returned here. Transport and status errors come out of
    /// [`CompletionStream::finish`]. Must be called inside a tokio runtime.
    pub fn stream(
        &self,
        request: CompletionRequest,
        capacity: usize,
    ) -> Result<CompletionStream, ClientError> {
        check_stream_request(&request)?;

        let (sink, frames) = mpsc::channel(capacity.max(1));
        let (done_tx, done_rx) = oneshot::channel();

        let client = self.clone();
        let producer =
            tokio::spawn(async move { client.request_stream(&request, sink, done_tx).await });

        Ok(CompletionStream::new(frames, done_rx, producer))
    }

    /// Stream a default request around `messages`.
    pub fn chat_stream(&self, messages: Vec<Message>) -> Result<CompletionStream, ClientError> {
        self.stream(
            CompletionRequest::new(messages).with_stream(true),
            DEFAULT_STREAM_CAPACITY,
        )
    }
}

fn check_stream_request(request: &CompletionRequest) -> Result<(), ClientError> {
    if !request.stream {
        return Err(ClientError::Config(
            "streaming must be enabled on the request for a streaming call".to_string(),
        ));
    }
    request.validate()?;
    Ok(())
}

#[async_trait]
impl Client for PerplexityClient {
    async fn request(&self, request: &CompletionRequest) -> Result<CompletionResponse, ClientError> {
        request.validate()?;
        if request.stream {
            return Err(ClientError::Config(
                "streaming must be disabled for a single-shot request".to_string(),
            ));
        }

        let headers = auth_headers(&self.transport_options)?;
        let http_client = build_http_client(&self.transport_options)?;
        let endpoint = self.transport_options.endpoint();

        tracing::debug!(endpoint, model = %request.model, "sending completion request");

        let mut req = http_client
            .post(endpoint)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.transport_options.timeout());

        req = add_extra_headers(req, &self.transport_options.extra_headers);

        let response = req.json(request).send().await?;
        check_status(response.status())?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| ClientError::Parse { source, body })
    }
}

#[async_trait]
impl StreamingClient for PerplexityClient {
    async fn request_stream(
        &self,
        request: &CompletionRequest,
        sink: mpsc::Sender<CompletionResponse>,
        done: oneshot::Sender<()>,
    ) -> Result<(), ClientError> {
        check_stream_request(request)?;
        if sink.is_closed() {
            return Err(ClientError::SinkClosed);
        }
        if done.is_closed() {
            return Err(ClientError::SignalClosed);
        }

        let guard = StreamGuard::new(sink, done);

        let headers = auth_headers(&self.transport_options)?;
        let http_client = build_http_client(&self.transport_options)?;
        let endpoint = self.transport_options.endpoint();

        tracing::debug!(endpoint, model = %request.model, "opening completion stream");

        let mut req = http_client
            .post(endpoint)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .header(CONNECTION, "keep-alive");

        req = add_extra_headers(req, &self.transport_options.extra_headers);

        let idle_timeout = self.transport_options.timeout();
        let response = tokio::time::timeout(idle_timeout, req.json(request).send())
            .await
            .map_err(|_| ClientError::IdleTimeout(idle_timeout))??;
        check_status(response.status())?;

        let mut frames = Box::pin(response.frames::<CompletionResponse>());
        let mut published = 0usize;
        loop {
            let frame = match tokio::time::timeout(idle_timeout, frames.next()).await {
                Ok(Some(frame)) => frame?,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(?idle_timeout, published, "completion stream stalled");
                    return Err(ClientError::IdleTimeout(idle_timeout));
                }
            };
            guard.publish(frame).await?;
            published += 1;
            tracing::trace!(published, "published frame");
        }

        tracing::debug!(published, "completion stream ended");
        Ok(())
    }
}
