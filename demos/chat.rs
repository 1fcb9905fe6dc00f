//! Single-shot completion with citations.
//!
//! Run with:
//! ```bash
//! export PPLX_API_KEY="your-api-key"
//! cargo run --example chat
//! ```

use pplx::client::Client;
use pplx::conversation::Conversation;
use pplx::model::CompletionRequest;
use pplx::options::TransportOptions;
use pplx::providers::PerplexityClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = PerplexityClient::new(TransportOptions::from_env()?);

    let mut conversation = Conversation::new().with_system_message("Be precise and concise.");
    conversation.add_user_message("What's the capital of France?")?;

    let request = CompletionRequest::new(conversation.messages())
        .with_return_related_questions(true);
    request.validate()?;

    println!("Sending request to Perplexity...");

    let response = client.request(&request).await?;
    println!("\n=== Response ===");
    println!("{}", response.last_content());

    println!(
        "\nPrompt tokens: {}, completion tokens: {}",
        response.usage.prompt_tokens, response.usage.completion_tokens
    );

    for (i, citation) in response.citations().iter().enumerate() {
        println!("Citation {}: {}", i + 1, citation);
    }
    for question in response.related_questions() {
        println!("Related: {}", question);
    }

    // Continue the conversation with the answer
    conversation.add_assistant_message(response.last_content())?;
    conversation.add_user_message("And its population?")?;

    let follow_up = client.chat(conversation.messages()).await?;
    println!("\n=== Follow-up ===");
    println!("{}", follow_up.last_content());

    Ok(())
}
