//! LLM provider implementations.

pub mod perplexity;

// Re-export for convenience
pub use perplexity::PerplexityClient;
