//! Layered configuration.
//!
//! Tiers merged field-by-field, lowest to highest priority:
//! 1. **Defaults** - built into the binary
//! 2. **Project** - `$CWD/taskflow/config.yaml`
//! 3. **User** - `~/.taskflow/config.yaml`
//! 4. **Environment** - see below
//!
//! ## Environment Variables
//! - `TASKFLOW_CONFIG_PATH` - Explicit config file (replaces the file tiers)
//! - `TASKFLOW_DB_PATH` - Database path
//! - `TASKFLOW_HOST` / `TASKFLOW_PORT` - HTTP bind address
//! - `TASKFLOW_MODEL` - Reasoning-service model
//! - `TASKFLOW_USER_DIR` - User config dir (default: `~/.taskflow`)
//! - `TASKFLOW_PROJECT_DIR` - Project config dir (default: `./taskflow`)
//! - `OPENAI_API_KEY` - API key (name configurable via `assistant.api_key_env`)

mod loader;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use types::*;
