//! Core client traits and error types.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::model::{CompletionRequest, CompletionResponse, Message};
use crate::validation::ValidationError;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection failures, timeouts and mid-stream disconnects.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse response body: {source} - body response={body}")]
    Parse {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("unauthorized: check your API key")]
    Unauthorized,

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The consumer side of the response sink is gone.
    #[error("response sink is closed")]
    SinkClosed,

    /// Nobody is waiting on the completion signal.
    #[error("completion signal is closed")]
    SignalClosed,

    /// The stream went quiet for longer than the configured timeout.
    #[error("no data received from the stream for {0:?}")]
    IdleTimeout(Duration),

    #[error("Stream cancelled")]
    StreamCancelled,
}

/// A chat-completions client.
///
/// # Required Methods
/// - `request`: send one request and wait for the full response
///
/// # Provided Methods
/// - `chat`: build a default request around `messages` and send it
#[async_trait]
pub trait Client: Send + Sync {
    /// Single round trip: serialize, POST, map status, deserialize.
    async fn request(&self, request: &CompletionRequest) -> Result<CompletionResponse, ClientError>;

    /// Convenience wrapper around `request` using default parameters.
    async fn chat(&self, messages: Vec<Message>) -> Result<CompletionResponse, ClientError> {
        self.request(&CompletionRequest::new(messages)).await
    }
}

/// Extension trait for streaming support.
///
/// The producer publishes every decoded frame to `sink` in arrival order,
/// awaiting capacity when the sink is full. A gap between reads longer than
/// the configured timeout ends the call with [`ClientError::IdleTimeout`].
/// Once the call is past its
/// argument checks, every exit path closes `sink` and then fires `done`,
/// exactly once. Consumers should drain the sink before awaiting `done`.
///
/// # Example
/// ```rust,ignore
/// let (tx, mut rx) = tokio::sync::mpsc::channel(5);
/// let (done_tx, done_rx) = tokio::sync::oneshot::channel();
///
/// let producer = tokio::spawn(async move { client.request_stream(&request, tx, done_tx).await });
/// while let Some(frame) = rx.recv().await {
///     println!("{}", frame.last_content());
/// }
/// let _ = done_rx.await;
/// producer.await??;
/// ```
#[async_trait]
pub trait StreamingClient: Client {
    async fn request_stream(
        &self,
        request: &CompletionRequest,
        sink: mpsc::Sender<CompletionResponse>,
        done: oneshot::Sender<()>,
    ) -> Result<(), ClientError>;
}
