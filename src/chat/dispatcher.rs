//! Intent dispatch through the reasoning service.
//!
//! One turn is at most two requests: the first offers the operation catalog
//! with tool choice `auto`; if the model calls operations, their results are
//! fed back in a second request with tool choice `none`.

use super::{ChatReply, Transcript};
use crate::llm::{
    ChatMessage, Completion, CompletionRequest, ReasoningService, ServiceError, ToolChoice,
};
use crate::tools::ToolHandler;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const RATE_LIMIT_REPLY: &str = "I'm experiencing high traffic right now. Please check your OpenAI billing details or try again later.";

pub const FAILURE_REPLY: &str = "An error occurred while contacting the assistant. Please try again.";

/// Result recorded for calls that did not run because storage failed.
const UNAVAILABLE_RESULT: &str = "Error: The task storage is unavailable. The operation was not performed.";

pub struct LlmDispatcher {
    service: Arc<dyn ReasoningService>,
    tools: ToolHandler,
    system_prompt: String,
}

impl LlmDispatcher {
    pub fn new(service: Arc<dyn ReasoningService>, tools: ToolHandler, system_prompt: String) -> Self {
        Self {
            service,
            tools,
            system_prompt,
        }
    }

    fn request(&self, transcript: &Transcript, tool_choice: ToolChoice) -> CompletionRequest {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(transcript.messages().iter().cloned());
        CompletionRequest {
            messages,
            functions: self.tools.get_functions(),
            tool_choice,
        }
    }

    /// Answer the latest user message in `transcript`.
    ///
    /// Function-call and result messages are appended to the transcript; the
    /// final reply is returned for the caller to record.
    pub async fn dispatch(&self, owner: &str, transcript: &mut Transcript) -> ChatReply {
        let first = match self
            .service
            .complete(self.request(transcript, ToolChoice::Auto))
            .await
        {
            Ok(completion) => completion,
            Err(e) => return failure_reply(&e, false),
        };

        if first.tool_calls.is_empty() {
            return reply_text(first, false);
        }

        let calls = first.tool_calls;
        info!(owner = %owner, calls = calls.len(), "Model requested operations");
        transcript.push(ChatMessage::assistant_calls(calls.clone()));

        let mut mutated = false;
        for (index, call) in calls.iter().enumerate() {
            match self.tools.call_json(owner, &call.name, &call.arguments) {
                Ok(outcome) => {
                    debug!(tool = %call.name, call_id = %call.id, mutated = outcome.mutated, "Operation finished");
                    mutated |= outcome.mutated;
                    transcript.push(ChatMessage::tool_result(call.id.clone(), outcome.text));
                }
                Err(e) => {
                    error!(tool = %call.name, call_id = %call.id, error = %e, "Operation failed");
                    // Every call id needs a result or later requests are rejected
                    for skipped in &calls[index..] {
                        transcript.push(ChatMessage::tool_result(
                            skipped.id.clone(),
                            UNAVAILABLE_RESULT,
                        ));
                    }
                    return ChatReply {
                        text: FAILURE_REPLY.to_string(),
                        tasks_changed: mutated,
                    };
                }
            }
        }

        match self
            .service
            .complete(self.request(transcript, ToolChoice::None))
            .await
        {
            Ok(second) => {
                if !second.tool_calls.is_empty() {
                    warn!(owner = %owner, "Ignoring operation calls in final response");
                }
                reply_text(second, mutated)
            }
            Err(e) => failure_reply(&e, mutated),
        }
    }
}

fn reply_text(completion: Completion, tasks_changed: bool) -> ChatReply {
    match completion.content.filter(|c| !c.trim().is_empty()) {
        Some(text) => ChatReply { text, tasks_changed },
        None => {
            warn!("Reasoning service returned an empty reply");
            ChatReply {
                text: FAILURE_REPLY.to_string(),
                tasks_changed,
            }
        }
    }
}

fn failure_reply(err: &ServiceError, tasks_changed: bool) -> ChatReply {
    let text = if err.is_rate_limit() {
        warn!(error = %err, "Reasoning service rate limited");
        RATE_LIMIT_REPLY
    } else {
        error!(error = %err, "Reasoning service request failed");
        FAILURE_REPLY
    };
    ChatReply {
        text: text.to_string(),
        tasks_changed,
    }
}
