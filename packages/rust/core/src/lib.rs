//! Core pipeline orchestration and domain logic for ResearchKit.
//!
//! This crate ties together prompt building, the completion client, and
//! report output into end-to-end workflows (`research`, chat turns).

pub mod chat;
pub mod pipeline;
pub mod prompt;
