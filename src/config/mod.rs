// src/config/mod.rs
// Configuration and shared constants

pub mod env;

pub use env::{BackendConfig, BackendEnv, DEFAULT_TIMEOUT_SECS, load_dotenv};

/// Default listener host for the MCP server
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default listener port for the MCP server
pub const DEFAULT_PORT: u16 = 4200;
/// Default HTTP path the MCP service is mounted under
pub const DEFAULT_PATH: &str = "/lingshu";
/// Default URL the client connects to
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4200/lingshu";
