// src/lib.rs
// Lingshu - medical multimodal model exposed as MCP tools

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod client;
pub mod config;
pub mod error;
pub mod image;
pub mod llm;
pub mod mcp;
pub mod tools;
pub use error::{LingshuError, Result};
