//! Integration tests for the chat assistant.
//!
//! The reasoning service is replaced by a scripted double that returns
//! queued completions and records every request it receives.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use taskflow::chat::{Assistant, FAILURE_REPLY, RATE_LIMIT_REPLY, Transcript};
use taskflow::config::Config;
use taskflow::db::Database;
use taskflow::llm::{
    Completion, CompletionRequest, ReasoningService, Role, ServiceError, ToolCall, ToolChoice,
};
use taskflow::store::TaskStore;
use taskflow::types::{NewTask, Priority, parse_due_date};

#[derive(Default)]
struct ScriptedService {
    replies: Mutex<VecDeque<Result<Completion, ServiceError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedService {
    fn new(replies: Vec<Result<Completion, ServiceError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningService for ScriptedService {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ServiceError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::InvalidResponse("script exhausted".into())))
    }
}

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

fn setup(service: Arc<ScriptedService>) -> (Arc<TaskStore>, Assistant) {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    let store = Arc::new(TaskStore::new(Arc::new(db)));
    let assistant = Assistant::from_config(Arc::clone(&store), service, &Config::default());
    (store, assistant)
}

mod local_command_tests {
    use super::*;

    #[tokio::test]
    async fn add_task_command_skips_the_service() {
        let service = ScriptedService::new(vec![]);
        let (store, assistant) = setup(service.clone());
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "add task Water plants")
            .await
            .unwrap();

        assert_eq!(reply.text, "✅ Task 'Water plants' was added successfully!");
        assert!(reply.tasks_changed);
        assert!(service.requests().is_empty());

        let tasks = store.list("alice").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert_eq!(tasks[0].tags, vec!["chatbot"]);

        let visible = transcript.visible();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].role, Role::User);
        assert_eq!(visible[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn delete_task_command_reports_missing_title() {
        let service = ScriptedService::new(vec![]);
        let (store, assistant) = setup(service.clone());
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "delete task Nothing here")
            .await
            .unwrap();
        assert_eq!(reply.text, "❓ Task 'Nothing here' not found.");
        assert!(!reply.tasks_changed);

        assistant
            .respond("alice", &mut transcript, "add task Gym")
            .await
            .unwrap();
        let reply = assistant
            .respond("alice", &mut transcript, "Delete Task gym")
            .await
            .unwrap();
        assert_eq!(reply.text, "🗑️ Task 'Gym' was deleted successfully!");
        assert!(store.list("alice").unwrap().is_empty());
        assert!(service.requests().is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_recording() {
        let (_, assistant) = setup(ScriptedService::new(vec![]));
        let mut transcript = Transcript::new();
        let err = assistant
            .respond("alice", &mut transcript, "   ")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Message cannot be empty.");
        assert!(transcript.is_empty());
    }
}

mod dispatch_tests {
    use super::*;

    #[tokio::test]
    async fn plain_reply_is_relayed() {
        let service = ScriptedService::new(vec![Ok(Completion::text("Hello! How can I help?"))]);
        let (_, assistant) = setup(service.clone());
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "hi")
            .await
            .unwrap();
        assert_eq!(reply.text, "Hello! How can I help?");
        assert!(!reply.tasks_changed);

        let requests = service.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_choice, ToolChoice::Auto);
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert_eq!(requests[0].functions.len(), 4);
    }

    #[tokio::test]
    async fn owner_is_injected_into_operations() {
        let service = ScriptedService::new(vec![
            Ok(Completion::calls(vec![call(
                "call_1",
                "add_task",
                r#"{"title": "Buy milk", "priority": "High", "due_date": "2025-01-10", "owner": "mallory"}"#,
            )])),
            Ok(Completion::text("Added Buy milk for you.")),
        ]);
        let (store, assistant) = setup(service.clone());
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "remind me to buy milk")
            .await
            .unwrap();
        assert_eq!(reply.text, "Added Buy milk for you.");
        assert!(reply.tasks_changed);

        let tasks = store.list("alice").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, Priority::High);
        assert!(store.list("mallory").unwrap().is_empty());

        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].tool_choice, ToolChoice::None);

        let tool_message = requests[1]
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .expect("operation result fed back");
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert!(
            tool_message
                .content
                .as_deref()
                .unwrap()
                .starts_with("Successfully added the task: 'Buy milk'")
        );
    }

    #[tokio::test]
    async fn invalid_enum_never_reaches_the_store() {
        let service = ScriptedService::new(vec![
            Ok(Completion::calls(vec![call(
                "call_1",
                "add_task",
                r#"{"title": "Gym", "priority": "urgent"}"#,
            )])),
            Ok(Completion::text("That priority is not valid.")),
        ]);
        let (store, assistant) = setup(service.clone());
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "add gym as urgent")
            .await
            .unwrap();
        assert_eq!(reply.text, "That priority is not valid.");
        assert!(!reply.tasks_changed);
        assert!(store.list("alice").unwrap().is_empty());

        let requests = service.requests();
        let fed_back = requests[1]
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .and_then(|m| m.content.clone())
            .unwrap();
        assert!(fed_back.contains("Invalid priority 'urgent'"));
    }

    #[tokio::test]
    async fn listing_feeds_formatted_tasks_back() {
        let service = ScriptedService::new(vec![
            Ok(Completion::calls(vec![call("call_1", "get_tasks", "{}")])),
            Ok(Completion::text("You have one task: Buy milk.")),
        ]);
        let (store, assistant) = setup(service.clone());
        store
            .add(
                "alice",
                NewTask::new(
                    "Buy milk",
                    Priority::High,
                    parse_due_date("2025-01-10").unwrap(),
                    vec!["errand".to_string()],
                ),
            )
            .unwrap();
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "what do I have?")
            .await
            .unwrap();
        assert!(!reply.tasks_changed);

        let requests = service.requests();
        let fed_back = requests[1]
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .and_then(|m| m.content.clone())
            .unwrap();
        assert_eq!(
            fed_back,
            "You have 1 task:\n- Buy milk [Pending] priority: High, due: 2025-01-10, tags: errand"
        );
    }

    #[tokio::test]
    async fn rate_limit_keeps_user_message() {
        let service = ScriptedService::new(vec![Err(ServiceError::RateLimited(
            "rate_limit_exceeded".into(),
        ))]);
        let (_, assistant) = setup(service);
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "what's due today?")
            .await
            .unwrap();
        assert_eq!(reply.text, RATE_LIMIT_REPLY);

        let visible = transcript.visible();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].content.as_deref(), Some("what's due today?"));
        assert_eq!(visible[1].content.as_deref(), Some(RATE_LIMIT_REPLY));
    }

    #[tokio::test]
    async fn second_request_failure_still_reports_change() {
        let service = ScriptedService::new(vec![
            Ok(Completion::calls(vec![call(
                "call_1",
                "add_task",
                r#"{"title": "Stretch"}"#,
            )])),
            Err(ServiceError::Timeout),
        ]);
        let (store, assistant) = setup(service);
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "add stretching")
            .await
            .unwrap();
        assert_eq!(reply.text, FAILURE_REPLY);
        assert!(reply.tasks_changed);
        assert_eq!(store.list("alice").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_carries_across_turns() {
        let service = ScriptedService::new(vec![
            Ok(Completion::text("First answer")),
            Ok(Completion::text("Second answer")),
        ]);
        let (_, assistant) = setup(service.clone());
        let mut transcript = Transcript::new();

        assistant
            .respond("alice", &mut transcript, "first")
            .await
            .unwrap();
        assistant
            .respond("alice", &mut transcript, "second")
            .await
            .unwrap();

        let requests = service.requests();
        let contents: Vec<String> = requests[1]
            .messages
            .iter()
            .skip(1)
            .map(|m| m.content.clone().unwrap_or_default())
            .collect();
        assert_eq!(contents, vec!["first", "First answer", "second"]);
    }

    #[tokio::test]
    async fn storage_failure_leaves_a_result_for_every_call() {
        let service = ScriptedService::new(vec![
            Ok(Completion::calls(vec![
                call("call_1", "get_tasks", "{}"),
                call("call_2", "add_task", r#"{"title": "Gym"}"#),
            ])),
            Ok(Completion::text("Storage is back.")),
        ]);
        let (store, assistant) = setup(service.clone());
        store
            .db()
            .with_conn(|conn| {
                conn.execute("DROP TABLE tasks", [])?;
                Ok(())
            })
            .unwrap();
        let mut transcript = Transcript::new();

        let reply = assistant
            .respond("alice", &mut transcript, "what do I have?")
            .await
            .unwrap();
        assert_eq!(reply.text, FAILURE_REPLY);
        assert!(!reply.tasks_changed);

        let reply = assistant
            .respond("alice", &mut transcript, "try again")
            .await
            .unwrap();
        assert_eq!(reply.text, "Storage is back.");

        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        let messages = &requests[1].messages;
        let calls_at = messages
            .iter()
            .position(|m| !m.tool_calls.is_empty())
            .expect("calls message kept in history");
        let answered: Vec<&str> = messages[calls_at + 1..]
            .iter()
            .take_while(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(answered, vec!["call_1", "call_2"]);
    }
}
