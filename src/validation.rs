//! Field-level checks for [`CompletionRequest`].

use itertools::Itertools;
use thiserror::Error;

use crate::model::{CompletionRequest, SUPPORTED_MODELS};

/// Maximum number of entries in `search_domain_filter`.
pub const MAX_SEARCH_DOMAIN_FILTERS: usize = 3;

/// Upper bound for `top_k`.
pub const MAX_TOP_K: u32 = 2048;

/// Reasons a request is rejected before it is sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("messages must not be empty")]
    EmptyMessages,

    #[error("unsupported model {model:?}, expected one of: {supported}")]
    UnsupportedModel { model: String, supported: String },

    #[error("temperature must be between 0 and 2 exclusive, got {0}")]
    Temperature(f64),

    #[error("top_p must be between 0 and 1 exclusive, got {0}")]
    TopP(f64),

    #[error("top_k must be between 0 and 2048 inclusive, got {0}")]
    TopK(u32),

    #[error("presence_penalty must be between -2 and 2 inclusive, got {0}")]
    PresencePenalty(f64),

    #[error("frequency_penalty must be greater than 0, got {0}")]
    FrequencyPenalty(f64),

    #[error("search domain filter must be less than or equal to 3, got {0}")]
    SearchDomainFilter(usize),

    #[error("search recency filter is incompatible with images")]
    RecencyWithImages,

    #[error("search recency filter must be one of month, week, day, hour, got {0:?}")]
    RecencyFilter(String),
}

impl CompletionRequest {
    /// Check the request, returning the first failure found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::EmptyMessages);
        }

        if !SUPPORTED_MODELS.contains(&self.model.as_str()) {
            return Err(ValidationError::UnsupportedModel {
                model: self.model.clone(),
                supported: SUPPORTED_MODELS.iter().join(", "),
            });
        }

        // Negated comparisons so NaN fails too.
        if !(self.temperature > 0.0 && self.temperature < 2.0) {
            return Err(ValidationError::Temperature(self.temperature));
        }

        if !(self.top_p > 0.0 && self.top_p < 1.0) {
            return Err(ValidationError::TopP(self.top_p));
        }

        if self.top_k > MAX_TOP_K {
            return Err(ValidationError::TopK(self.top_k));
        }

        if !(-2.0..=2.0).contains(&self.presence_penalty) {
            return Err(ValidationError::PresencePenalty(self.presence_penalty));
        }

        if !(self.frequency_penalty > 0.0) {
            return Err(ValidationError::FrequencyPenalty(self.frequency_penalty));
        }

        self.validate_search_domain_filter()?;
        self.validate_search_recency_filter()
    }

    pub fn validate_search_domain_filter(&self) -> Result<(), ValidationError> {
        match &self.search_domain_filter {
            Some(domains) if domains.len() > MAX_SEARCH_DOMAIN_FILTERS => {
                Err(ValidationError::SearchDomainFilter(domains.len()))
            }
            _ => Ok(()),
        }
    }

    pub fn validate_search_recency_filter(&self) -> Result<(), ValidationError> {
        if self.return_images && self.search_recency_filter.is_some() {
            return Err(ValidationError::RecencyWithImages);
        }
        Ok(())
    }
}
