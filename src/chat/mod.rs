//! The chat assistant: local commands first, then the reasoning service.

pub mod commands;
pub mod dispatcher;

pub use commands::{AddTaskCommand, CommandMatcher, DeleteTaskCommand};
pub use dispatcher::{FAILURE_REPLY, LlmDispatcher, RATE_LIMIT_REPLY};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::llm::{ChatMessage, ReasoningService};
use crate::store::TaskStore;
use crate::tools::ToolHandler;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Reply to one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub text: String,
    /// Whether the turn changed stored tasks, so views can refresh.
    pub tasks_changed: bool,
}

impl ChatReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tasks_changed: false,
        }
    }

    pub fn changed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tasks_changed: true,
        }
    }
}

/// Conversation history of one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// User and assistant text entries, in order.
    pub fn visible(&self) -> Vec<&ChatMessage> {
        self.messages.iter().filter(|m| m.is_visible()).collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub struct Assistant {
    matchers: Vec<Box<dyn CommandMatcher>>,
    dispatcher: LlmDispatcher,
}

impl Assistant {
    pub fn new(matchers: Vec<Box<dyn CommandMatcher>>, dispatcher: LlmDispatcher) -> Self {
        Self {
            matchers,
            dispatcher,
        }
    }

    /// Assistant with the standard local commands.
    pub fn from_config(
        store: Arc<TaskStore>,
        service: Arc<dyn ReasoningService>,
        config: &Config,
    ) -> Self {
        let matchers: Vec<Box<dyn CommandMatcher>> = vec![
            Box::new(AddTaskCommand::new(store.clone(), config.chat.default_tags.clone())),
            Box::new(DeleteTaskCommand::new(store.clone())),
        ];
        let tools = ToolHandler::new(store, &config.assistant);
        let dispatcher = LlmDispatcher::new(service, tools, config.assistant.system_prompt.clone());
        Self::new(matchers, dispatcher)
    }

    /// Run one chat turn for `owner`.
    ///
    /// The user message is recorded before any work; the reply is recorded
    /// whether the turn succeeded or fell back to a failure message.
    pub async fn respond(
        &self,
        owner: &str,
        transcript: &mut Transcript,
        input: &str,
    ) -> AppResult<ChatReply> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AppError::validation("message", "Message cannot be empty."));
        }

        transcript.push(ChatMessage::user(input));

        let reply = match self.matchers.iter().find(|m| m.handles(input)) {
            Some(matcher) => {
                debug!(owner = %owner, command = matcher.name(), "Local command matched");
                matcher.execute(owner, input)?
            }
            None => self.dispatcher.dispatch(owner, transcript).await,
        };

        transcript.push(ChatMessage::assistant(reply.text.clone()));
        Ok(reply)
    }
}
