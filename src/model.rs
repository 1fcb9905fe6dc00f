//! Wire data model for chat-completion requests and responses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::ValidationError;

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "sonar";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_TOP_P: f64 = 0.9;
pub const DEFAULT_TOP_K: u32 = 0;
pub const DEFAULT_MAX_TOKENS: u32 = 0;
pub const DEFAULT_PRESENCE_PENALTY: f64 = 0.0;
pub const DEFAULT_FREQUENCY_PENALTY: f64 = 1.0;

/// Model identifiers accepted by [`CompletionRequest::validate`].
pub const SUPPORTED_MODELS: &[&str] = &[
    "sonar",
    "sonar-pro",
    "sonar-reasoning",
    "sonar-reasoning-pro",
    "sonar-deep-research",
    "r1-1776",
    "llama-3.1-sonar-small-128k-online",
    "llama-3.1-sonar-large-128k-online",
    "llama-3.1-sonar-huge-128k-online",
];

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    #[default]
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Time window for the search behind online models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecencyFilter {
    Month,
    Week,
    Day,
    Hour,
}

impl RecencyFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecencyFilter::Month => "month",
            RecencyFilter::Week => "week",
            RecencyFilter::Day => "day",
            RecencyFilter::Hour => "hour",
        }
    }
}

impl FromStr for RecencyFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(RecencyFilter::Month),
            "week" => Ok(RecencyFilter::Week),
            "day" => Ok(RecencyFilter::Day),
            "hour" => Ok(RecencyFilter::Hour),
            other => Err(ValidationError::RecencyFilter(other.to_string())),
        }
    }
}

impl fmt::Display for RecencyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for the chat-completions endpoint.
///
/// Every field is always serialized; absent optional containers go out as
/// `null`. Build one with [`CompletionRequest::new`] and the `with_*`
/// methods, then check it with [`CompletionRequest::validate`].
///
/// # Example
/// ```rust
/// use pplx::model::{CompletionRequest, Message, RecencyFilter};
///
/// let request = CompletionRequest::new(vec![Message::user("What's the capital of France?")])
///     .with_temperature(0.5)
///     .with_search_recency_filter(RecencyFilter::Week);
///
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// Conversation so far, oldest first
    pub messages: Vec<Message>,

    /// Model identifier, one of [`SUPPORTED_MODELS`]
    pub model: String,

    /// Maximum completion tokens; 0 lets the model run to its stop token
    pub max_tokens: u32,

    /// Sampling temperature, 0 < x < 2
    pub temperature: f64,

    /// Nucleus sampling threshold, 0 < x < 1
    pub top_p: f64,

    /// Up to three domains to restrict (or, prefixed with `-`, exclude) citations
    pub search_domain_filter: Option<Vec<String>>,

    /// Ask online models to return images
    pub return_images: bool,

    /// Ask online models to return related questions
    pub return_related_questions: bool,

    /// Restrict search results to a time window; incompatible with images
    pub search_recency_filter: Option<RecencyFilter>,

    /// Top-k filtering, 0..=2048; 0 disables it
    pub top_k: u32,

    /// Stream the response as server-sent events
    pub stream: bool,

    /// -2.0..=2.0
    pub presence_penalty: f64,

    /// Multiplicative penalty, > 0; 1.0 means no penalty
    pub frequency_penalty: f64,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            search_domain_filter: None,
            return_images: false,
            return_related_questions: false,
            search_recency_filter: None,
            top_k: DEFAULT_TOP_K,
            stream: false,
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
        }
    }
}

impl CompletionRequest {
    /// Create a request with default parameters for the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_search_domain_filter(mut self, domains: Vec<String>) -> Self {
        self.search_domain_filter = Some(domains);
        self
    }

    pub fn with_return_images(mut self, return_images: bool) -> Self {
        self.return_images = return_images;
        self
    }

    pub fn with_return_related_questions(mut self, return_related_questions: bool) -> Self {
        self.return_related_questions = return_related_questions;
        self
    }

    pub fn with_search_recency_filter(mut self, filter: RecencyFilter) -> Self {
        self.search_recency_filter = Some(filter);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Request a server-sent-events response.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_presence_penalty(mut self, presence_penalty: f64) -> Self {
        self.presence_penalty = presence_penalty;
        self
    }

    pub fn with_frequency_penalty(mut self, frequency_penalty: f64) -> Self {
        self.frequency_penalty = frequency_penalty;
        self
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One candidate completion.
///
/// Streaming frames carry the text so far in `message` and the increment
/// in `delta`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Choice {
    pub index: u32,
    pub finish_reason: Option<String>,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Message>,
}

/// Image reference returned when `return_images` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Image {
    pub image_url: String,
    pub origin_url: String,
    pub height: u32,
    pub width: u32,
}

/// A decoded response, or one frame of a streamed response.
///
/// All fields default when absent, so partial frames decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub created: u64,
    pub usage: Usage,
    pub object: String,
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_questions: Option<Vec<String>>,
}

impl CompletionResponse {
    /// Content of the last choice's message, or `""` when there are no choices.
    pub fn last_content(&self) -> &str {
        self.choices
            .last()
            .map_or("", |choice| choice.message.content.as_str())
    }

    /// Citations, empty when the response carried none.
    pub fn citations(&self) -> &[String] {
        self.citations.as_deref().unwrap_or_default()
    }

    pub fn images(&self) -> &[Image] {
        self.images.as_deref().unwrap_or_default()
    }

    pub fn related_questions(&self) -> &[String] {
        self.related_questions.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for CompletionResponse {
    /// Pretty JSON, or nothing at all for an empty response.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == CompletionResponse::default() {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
