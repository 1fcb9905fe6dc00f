//! # pplx - Perplexity chat-completions client
//!
//! A small async client for the Perplexity chat-completions API, covering
//! single-shot requests and server-sent-event streaming.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Builder-style requests with up-front validation
//! - Streaming frames delivered over a bounded channel, with frames split
//!   across network reads reassembled before parsing
//! - Citations, images and related questions on responses
//!
//! ## Architecture
//!
//! - **`Client`** / **`StreamingClient`**: the request seam, implemented by
//!   [`providers::PerplexityClient`]
//! - **`CompletionRequest`** / **`CompletionResponse`**: the wire model
//! - **`TransportOptions`**: endpoint, API key, timeout, pluggable HTTP client
//! - **`sse::FrameDecoder`**: turns raw body chunks into response frames
//!
//! ## Example
//! ```no_run
//! use pplx::client::Client;
//! use pplx::model::{CompletionRequest, Message};
//! use pplx::options::TransportOptions;
//! use pplx::providers::PerplexityClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PerplexityClient::new(TransportOptions::new("your-api-key"));
//!
//!     let request = CompletionRequest::new(vec![Message::user("What's the capital of France?")])
//!         .with_return_related_questions(true);
//!     request.validate()?;
//!
//!     let response = client.request(&request).await?;
//!     println!("{}", response.last_content());
//!     for citation in response.citations() {
//!         println!("{}", citation);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod conversation;
pub mod http;
pub mod model;
pub mod options;
pub mod providers;
pub mod sse;
pub mod stream;
pub mod validation;

// Re-exports for convenience
pub use client::{Client, ClientError, StreamingClient};
pub use conversation::Conversation;
pub use model::{CompletionRequest, CompletionResponse, Message, Role};
pub use options::TransportOptions;
pub use providers::PerplexityClient;
pub use stream::CompletionStream;
pub use validation::ValidationError;
