//! TaskFlow Library
//!
//! This module exports the core components for testing and integration.

pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod llm;
pub mod logging;
pub mod mcp;
pub mod sessions;
pub mod store;
pub mod tools;
pub mod types;
pub mod views;
