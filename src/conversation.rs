//! Conversation history with strict user/assistant alternation.

use thiserror::Error;

use crate::model::{Message, Role};

/// Errors raised when a message would break alternation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("previous message should be an assistant message")]
    ExpectedAssistant,

    #[error("previous message should be a user message")]
    ExpectedUser,

    #[error("first message should be a user message")]
    FirstMessageNotUser,
}

/// Builds the `messages` list for a request: an optional system message
/// followed by alternating user and assistant turns, starting with the user.
///
/// # Example
/// ```rust
/// use pplx::conversation::Conversation;
///
/// let mut conversation = Conversation::new().with_system_message("Be precise.");
/// conversation.add_user_message("What's the capital of France?")?;
/// conversation.add_assistant_message("Paris.")?;
/// assert_eq!(conversation.messages().len(), 3);
/// # Ok::<(), pplx::conversation::ConversationError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    system_message: Option<String>,
    history: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the system message placed in front of the history.
    pub fn with_system_message(mut self, content: impl Into<String>) -> Self {
        self.system_message = Some(content.into());
        self
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        if let Some(last) = self.history.last() {
            if last.role != Role::Assistant {
                return Err(ConversationError::ExpectedAssistant);
            }
        }
        self.history.push(Message::user(content));
        Ok(())
    }

    pub fn add_assistant_message(
        &mut self,
        content: impl Into<String>,
    ) -> Result<(), ConversationError> {
        match self.history.last() {
            None => return Err(ConversationError::FirstMessageNotUser),
            Some(last) if last.role != Role::User => return Err(ConversationError::ExpectedUser),
            Some(_) => {}
        }
        self.history.push(Message::assistant(content));
        Ok(())
    }

    /// Messages ready for a request, system message first.
    pub fn messages(&self) -> Vec<Message> {
        self.system_message
            .iter()
            .map(|content| Message::system(content.as_str()))
            .chain(self.history.iter().cloned())
            .collect()
    }

    /// Number of user and assistant turns, not counting the system message.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_is_empty() {
        let conversation = Conversation::new();
        assert!(conversation.is_empty());
        assert!(conversation.messages().is_empty());
        assert_eq!(conversation.system_message(), None);
    }

    #[test]
    fn test_system_message_comes_first() {
        let mut conversation = Conversation::new().with_system_message("system message");
        conversation.add_user_message("hello").unwrap();

        assert_eq!(conversation.system_message(), Some("system message"));
        assert_eq!(
            conversation.messages(),
            vec![Message::system("system message"), Message::user("hello")]
        );
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_alternation() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("hello").unwrap();
        conversation.add_assistant_message("hi").unwrap();
        conversation.add_user_message("how are you?").unwrap();

        let messages = conversation.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::assistant("hi"));
    }

    #[test]
    fn test_user_twice_rejected() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("hello").unwrap();
        assert_eq!(
            conversation.add_user_message("hello"),
            Err(ConversationError::ExpectedAssistant)
        );
    }

    #[test]
    fn test_assistant_twice_rejected() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("hello").unwrap();
        conversation.add_assistant_message("hello").unwrap();
        assert_eq!(
            conversation.add_assistant_message("hello"),
            Err(ConversationError::ExpectedUser)
        );
    }

    #[test]
    fn test_assistant_first_rejected() {
        let mut conversation = Conversation::new().with_system_message("system");
        assert_eq!(
            conversation.add_assistant_message("hello"),
            Err(ConversationError::FirstMessageNotUser)
        );
    }
}
