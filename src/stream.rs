//! Producer/consumer plumbing for streamed completions.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::client::ClientError;
use crate::model::CompletionResponse;

/// Sink capacity used by the `chat_stream` convenience.
pub const DEFAULT_STREAM_CAPACITY: usize = 5;

/// Owns the sink and the completion signal for one streaming call.
///
/// Dropping the guard closes the sink and then fires the signal, so every
/// exit path of the producer, including an aborted task, does both exactly
/// once and in that order.
pub(crate) struct StreamGuard {
    sink: Option<mpsc::Sender<CompletionResponse>>,
    done: Option<oneshot::Sender<()>>,
}

impl StreamGuard {
    pub(crate) fn new(sink: mpsc::Sender<CompletionResponse>, done: oneshot::Sender<()>) -> Self {
        Self {
            sink: Some(sink),
            done: Some(done),
        }
    }

    /// Publish a frame, waiting for room in the sink.
    pub(crate) async fn publish(&self, frame: CompletionResponse) -> Result<(), ClientError> {
        let sink = self.sink.as_ref().ok_or(ClientError::SinkClosed)?;
        sink.send(frame).await.map_err(|_| ClientError::SinkClosed)
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        drop(self.sink.take());
        if let Some(done) = self.done.take() {
            // The waiter may already be gone; nothing left to notify then.
            let _ = done.send(());
        }
        tracing::debug!("response stream closed");
    }
}

/// Frames of a streamed completion, produced by a background task.
///
/// Implements [`Stream`] over the frames in arrival order. After the stream
/// ends, call [`CompletionStream::finish`] to learn whether the producer
/// stopped because the body ended or because of an error.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use pplx::model::Message;
/// use pplx::options::TransportOptions;
/// use pplx::providers::PerplexityClient;
///
/// # async fn run() -> Result<(), pplx::ClientError> {
/// let client = PerplexityClient::new(TransportOptions::from_env()?);
/// let mut stream = client.chat_stream(vec![Message::user("Hello!")])?;
///
/// while let Some(frame) = stream.next().await {
///     println!("{}", frame.last_content());
/// }
/// stream.finish().await?;
/// # Ok(())
/// # }
/// ```
pub struct CompletionStream {
    frames: ReceiverStream<CompletionResponse>,
    done: oneshot::Receiver<()>,
    producer: JoinHandle<Result<(), ClientError>>,
}

impl CompletionStream {
    pub(crate) fn new(
        frames: mpsc::Receiver<CompletionResponse>,
        done: oneshot::Receiver<()>,
        producer: JoinHandle<Result<(), ClientError>>,
    ) -> Self {
        Self {
            frames: ReceiverStream::new(frames),
            done,
            producer,
        }
    }

    /// Wait for the producer and return its outcome.
    ///
    /// Frames not yet consumed are discarded, which also unblocks a producer
    /// waiting on a full sink.
    pub async fn finish(self) -> Result<(), ClientError> {
        drop(self.frames);
        // Released on every exit path of the producer, so this cannot hang.
        let _ = self.done.await;
        match self.producer.await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(error = %e, "stream producer did not complete");
                Err(ClientError::StreamCancelled)
            }
        }
    }

    /// Drain every frame and return the last one, which carries the most
    /// complete view of the response.
    pub async fn last_response(mut self) -> Result<Option<CompletionResponse>, ClientError> {
        let mut last = None;
        while let Some(frame) = self.frames.next().await {
            last = Some(frame);
        }
        self.finish().await?;
        Ok(last)
    }

    /// Stop the producer. The stream then ends after any frames already
    /// buffered, and `finish` reports [`ClientError::StreamCancelled`].
    pub fn abort(&self) {
        self.producer.abort();
    }
}

impl Stream for CompletionStream {
    type Item = CompletionResponse;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.frames).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content: &str) -> CompletionResponse {
        serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_guard_drop_closes_sink_then_signals() {
        let (tx, mut rx) = mpsc::channel(2);
        let (done_tx, mut done_rx) = oneshot::channel();

        let guard = StreamGuard::new(tx, done_tx);
        guard.publish(frame("a")).await.unwrap();
        assert!(done_rx.try_recv().is_err());

        drop(guard);
        assert_eq!(rx.recv().await.unwrap().last_content(), "a");
        assert!(rx.recv().await.is_none());
        assert!(done_rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_after_consumer_hang_up() {
        let (tx, rx) = mpsc::channel(1);
        let (done_tx, _done_rx) = oneshot::channel();
        drop(rx);

        let guard = StreamGuard::new(tx, done_tx);
        assert!(matches!(
            guard.publish(frame("a")).await,
            Err(ClientError::SinkClosed)
        ));
    }

    #[tokio::test]
    async fn test_last_response_keeps_final_frame() {
        let (tx, rx) = mpsc::channel(1);
        let (done_tx, done_rx) = oneshot::channel();

        let producer = tokio::spawn(async move {
            let guard = StreamGuard::new(tx, done_tx);
            for content in ["What's", "What's the capital", "What's the capital of France?"] {
                guard.publish(frame(content)).await?;
            }
            Ok::<(), ClientError>(())
        });

        let stream = CompletionStream::new(rx, done_rx, producer);
        let last = stream.last_response().await.unwrap().unwrap();
        assert_eq!(last.last_content(), "What's the capital of France?");
    }

    #[tokio::test]
    async fn test_abort_still_signals() {
        let (tx, rx) = mpsc::channel(1);
        let (done_tx, done_rx) = oneshot::channel();

        let producer = tokio::spawn(async move {
            let _guard = StreamGuard::new(tx, done_tx);
            futures::future::pending::<()>().await;
            Ok::<(), ClientError>(())
        });

        let mut stream = CompletionStream::new(rx, done_rx, producer);
        stream.abort();
        assert!(stream.next().await.is_none());
        assert!(matches!(
            stream.finish().await,
            Err(ClientError::StreamCancelled)
        ));
    }
}
