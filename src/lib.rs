//! egw-library - a local library of religious writings
//!
//! This crate provides:
//! - A SQLite content store with FTS5 full-text search over paragraphs
//! - Book categorization from author/title/type metadata
//! - A paginated PDF renderer with table of contents
//! - Background PDF export jobs with an in-memory job store
//! - An MCP server over stdio exposing search and export tools

pub mod categorize;
pub mod commands;
pub mod config;
pub mod error;
pub mod jobs;
pub mod mcp;
pub mod progress;
pub mod render;
pub mod store;
pub mod text;

pub use config::Config;
pub use error::{Error, Result};
