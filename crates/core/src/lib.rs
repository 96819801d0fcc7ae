//! Triage Core Library
//!
//! This crate provides the foundational utilities shared by the triage crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management, including the routing keyword sets

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RoutingKeywords};
pub use error::{AppError, AppResult};
