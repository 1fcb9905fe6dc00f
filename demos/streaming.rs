//! Streaming completion, printing the answer as it grows.
//!
//! Run with:
//! ```bash
//! export PPLX_API_KEY="your-api-key"
//! cargo run --example streaming
//! ```

use pplx::client::StreamingClient;
use pplx::model::{CompletionRequest, CompletionResponse, Message};
use pplx::options::TransportOptions;
use pplx::providers::PerplexityClient;
use std::io::Write;
use tokio::sync::{mpsc, oneshot};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = PerplexityClient::new(TransportOptions::from_env()?);

    let request = CompletionRequest::new(vec![Message::user("Write a haiku about Rust programming.")])
        .with_stream(true);
    request.validate()?;

    let (sink, mut frames) = mpsc::channel::<CompletionResponse>(5);
    let (done_tx, done_rx) = oneshot::channel();

    // Producer runs on its own task; this task drains the sink
    let producer = tokio::spawn(async move { client.request_stream(&request, sink, done_tx).await });

    let mut last = CompletionResponse::default();
    while let Some(frame) = frames.recv().await {
        if let Some(delta) = frame.choices.last().and_then(|choice| choice.delta.as_ref()) {
            print!("{}", delta.content);
            std::io::stdout().flush()?;
        }
        last = frame;
    }

    // Only after draining
    let _ = done_rx.await;
    producer.await??;

    println!("\n\n=== Stream Complete ===");
    println!("{}", last.last_content());
    for citation in last.citations() {
        println!("- {}", citation);
    }

    Ok(())
}
