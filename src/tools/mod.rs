//! Operation catalog shared by the chat dispatcher and the MCP surface.
//!
//! Every call runs for an owner supplied by the caller; any `owner` or
//! `username` argument from the model is dropped before validation.

pub mod schema;
pub mod tasks;

use crate::config::AssistantConfig;
use crate::error::{AppError, AppResult};
use crate::llm::FunctionSpec;
use crate::store::TaskStore;
use rmcp::model::Tool;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Argument names that would let the caller pick an owner.
const OWNER_ARGUMENTS: [&str; 2] = ["owner", "username"];

/// Result of one operation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Result text returned to the model (or MCP client).
    pub text: String,
    /// Whether the call changed stored tasks.
    pub mutated: bool,
    /// Whether the text describes an expected failure.
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn read(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mutated: false,
            is_error: false,
        }
    }

    pub fn write(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mutated: true,
            is_error: false,
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mutated: false,
            is_error: true,
        }
    }
}

/// Tool handler that executes catalog operations against the task store.
pub struct ToolHandler {
    store: Arc<TaskStore>,
    functions: Vec<FunctionSpec>,
}

impl ToolHandler {
    /// Build the catalog once, applying configured description overrides.
    pub fn new(store: Arc<TaskStore>, config: &AssistantConfig) -> Self {
        let functions = tasks::get_functions()
            .into_iter()
            .map(|mut f| {
                if let Some(description) = config.get_tool_description(&f.name) {
                    f.description = description.to_string();
                }
                f
            })
            .collect();
        Self { store, functions }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Operation catalog in function-calling form.
    pub fn get_functions(&self) -> Vec<FunctionSpec> {
        self.functions.clone()
    }

    /// Operation catalog as MCP tools.
    pub fn get_tools(&self) -> Vec<Tool> {
        self.get_functions().iter().map(make_tool).collect()
    }

    /// Call an operation with a raw JSON argument string, as sent by the model.
    pub fn call_json(&self, owner: &str, name: &str, arguments: &str) -> AppResult<ToolOutcome> {
        let args = if arguments.trim().is_empty() {
            json!({})
        } else {
            match serde_json::from_str::<Value>(arguments) {
                Ok(value) => value,
                Err(e) => {
                    return Ok(ToolOutcome::failed(format!(
                        "Error: arguments are not valid JSON ({})",
                        e
                    )));
                }
            }
        };
        self.call(owner, name, args)
    }

    /// Call an operation for `owner`.
    ///
    /// Expected failures (validation, not found, ambiguous) come back as
    /// result text; storage failures propagate.
    pub fn call(&self, owner: &str, name: &str, mut args: Value) -> AppResult<ToolOutcome> {
        if let Some(map) = args.as_object_mut() {
            for key in OWNER_ARGUMENTS {
                if let Some(supplied) = map.remove(key) {
                    warn!(
                        tool = %name,
                        owner = %owner,
                        supplied = %supplied,
                        "Ignoring caller-supplied owner argument"
                    );
                }
            }
        }

        debug!(tool = %name, owner = %owner, "Calling operation");
        match self.dispatch(owner, name, args) {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.code.is_expected() => {
                debug!(tool = %name, code = ?e.code, "Operation returned expected failure");
                Ok(ToolOutcome::failed(format!("Error: {}", e.message)))
            }
            Err(e) => Err(e),
        }
    }

    fn dispatch(&self, owner: &str, name: &str, args: Value) -> AppResult<ToolOutcome> {
        let spec = self
            .functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| AppError::validation("name", format!("Unknown operation: {}", name)))?;
        schema::validate_arguments(&spec.parameters, &args)?;

        match name {
            "get_tasks" => tasks::get_tasks(&self.store, owner, &args),
            "add_task" => tasks::add_task(&self.store, owner, &args),
            "update_task_by_title" => tasks::update_task_by_title(&self.store, owner, &args),
            "delete_task_by_title" => tasks::delete_task_by_title(&self.store, owner, &args),
            _ => Err(AppError::validation("name", format!("Unknown operation: {}", name))),
        }
    }
}

/// Helper to create a function definition with an object schema.
pub fn make_function(name: &str, description: &str, properties: Value, required: Vec<&str>) -> FunctionSpec {
    FunctionSpec {
        name: name.to_string(),
        description: description.to_string(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

/// Helper to create an MCP tool definition from a function definition.
pub fn make_tool(function: &FunctionSpec) -> Tool {
    let input_schema = function
        .parameters
        .as_object()
        .cloned()
        .unwrap_or_default();

    Tool::new(
        function.name.clone(),
        function.description.clone(),
        input_schema,
    )
}

/// Helper to get a string from arguments.
pub fn get_string(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str().map(String::from))
}

/// Helper to get a string array from arguments.
pub fn get_string_array(args: &Value, key: &str) -> Option<Vec<String>> {
    args.get(key).and_then(|v| {
        v.as_array().map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
    })
}
