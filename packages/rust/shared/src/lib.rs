//! Shared types, error model, and configuration for ResearchKit.
//!
//! This crate is the foundation depended on by all other ResearchKit crates.
//! It provides:
//! - [`ResearchError`] — the unified error type
//! - Domain types ([`Topic`], [`ChatMessage`], [`Completion`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChatConfig, DefaultsConfig, OpenAiConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{ResearchError, Result};
pub use types::{ChatMessage, Completion, Role, TokenUsage, Topic};
