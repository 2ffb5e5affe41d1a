// src/mcp/http.rs
// MCP over HTTP (Streamable HTTP transport)

use std::sync::Arc;
use std::time::Duration;

use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tracing::info;

use crate::error::{LingshuError, Result};
use crate::mcp::LingshuServer;
use crate::tools::ToolDispatcher;

/// Create the MCP HTTP service
pub fn create_mcp_service(
    dispatcher: ToolDispatcher,
) -> StreamableHttpService<LingshuServer, LocalSessionManager> {
    // Service factory - one LingshuServer per session, all sharing the backend
    let service_factory = move || Ok(LingshuServer::new(dispatcher.clone()));

    let session_manager = Arc::new(LocalSessionManager::default());

    let config = StreamableHttpServerConfig {
        sse_keep_alive: Some(Duration::from_secs(15)),
        stateful_mode: true,
        ..Default::default()
    };

    StreamableHttpService::new(service_factory, session_manager, config)
}

/// Build the axum router with the MCP service mounted at `path`
pub fn router(dispatcher: ToolDispatcher, path: &str) -> Result<axum::Router> {
    let path = normalize_path(path)?;
    let service = create_mcp_service(dispatcher);
    // axum does not allow nesting at the root
    Ok(if path == "/" {
        axum::Router::new().fallback_service(service)
    } else {
        axum::Router::new().nest_service(&path, service)
    })
}

/// Serve the MCP endpoint until Ctrl-C
pub async fn serve(dispatcher: ToolDispatcher, host: &str, port: u16, path: &str) -> Result<()> {
    let app = router(dispatcher, path)?;

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(
        "Lingshu MCP server listening on http://{}{}",
        listener.local_addr()?,
        normalize_path(path)?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

fn normalize_path(path: &str) -> Result<String> {
    let trimmed = path.trim();
    if !trimmed.starts_with('/') {
        return Err(LingshuError::Config(format!(
            "MCP path must start with '/': {}",
            path
        )));
    }
    let without_slash = trimmed.trim_end_matches('/');
    Ok(if without_slash.is_empty() {
        "/".to_string()
    } else {
        without_slash.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/lingshu").unwrap(), "/lingshu");
        assert_eq!(normalize_path("/lingshu/").unwrap(), "/lingshu");
        assert_eq!(normalize_path("/").unwrap(), "/");
        assert!(normalize_path("lingshu").is_err());
    }
}
