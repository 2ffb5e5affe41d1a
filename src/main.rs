// src/main.rs
// Lingshu - MCP tool server and test client for a medical multimodal model

use anyhow::Result;
use clap::{Parser, Subcommand};
use lingshu::client::{self, DemoOptions, DemoReport, DemoRunner, McpToolClient, StepOutcome, ToolInvoker};
use lingshu::config::{self, BackendConfig, BackendEnv};
use lingshu::llm::{LlmClient, OpenAiCompatClient};
use lingshu::mcp;
use lingshu::tools::ToolDispatcher;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "lingshu")]
#[command(about = "MCP tool server and client for the Lingshu medical multimodal model")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP tool server over streamable HTTP
    Serve {
        #[arg(long, default_value = config::DEFAULT_HOST)]
        host: String,
        #[arg(long, default_value_t = config::DEFAULT_PORT)]
        port: u16,
        /// HTTP path the MCP endpoint is mounted under
        #[arg(long, default_value = config::DEFAULT_PATH)]
        path: String,
    },

    /// Call every tool once with sample inputs
    Demo {
        #[arg(long, default_value = config::DEFAULT_SERVER_URL)]
        url: String,
        /// Sample image; image tools are skipped if it does not exist
        #[arg(long, default_value = client::demo::DEFAULT_SAMPLE_IMAGE)]
        image: PathBuf,
        /// Pass each successful result through the LLM_* backend
        #[arg(long)]
        chain: bool,
        /// Call the LINGSHU_* backend in-process instead of going through MCP
        #[arg(long)]
        local: bool,
        /// Seconds to wait for each MCP tool call
        #[arg(long, default_value_t = client::DEFAULT_CALL_TIMEOUT.as_secs())]
        call_timeout: u64,
    },

    /// Let the LLM_* model answer a query, calling server tools as it decides
    Ask {
        #[arg(long, default_value = config::DEFAULT_SERVER_URL)]
        url: String,
        #[arg(long, default_value = client::agent::DEFAULT_QUERY)]
        query: String,
        /// Seconds to wait for each MCP tool call
        #[arg(long, default_value_t = client::DEFAULT_CALL_TIMEOUT.as_secs())]
        call_timeout: u64,
    },

    /// List the tools the server exposes
    Tools {
        #[arg(long, default_value = config::DEFAULT_SERVER_URL)]
        url: String,
    },
}

fn backend(vars: &BackendEnv) -> Result<Arc<OpenAiCompatClient>> {
    let config = BackendConfig::from_env(vars)?;
    Ok(Arc::new(OpenAiCompatClient::new(Arc::new(config))))
}

async fn run_server(host: String, port: u16, path: String) -> Result<()> {
    let dispatcher = ToolDispatcher::new(backend(&BackendEnv::TOOL_SERVER)?);
    mcp::http::serve(dispatcher, &host, port, &path).await?;
    Ok(())
}

async fn connect(url: &str, call_timeout: u64) -> Result<McpToolClient> {
    Ok(McpToolClient::connect(url)
        .await?
        .with_call_timeout(Duration::from_secs(call_timeout)))
}

async fn run_demo(
    url: String,
    image: PathBuf,
    chain: bool,
    local: bool,
    call_timeout: u64,
) -> Result<bool> {
    let chain_backend: Option<Arc<dyn LlmClient>> = if chain {
        Some(backend(&BackendEnv::CHAIN)?)
    } else {
        None
    };
    let options = DemoOptions {
        image: Some(image),
        ..DemoOptions::default()
    };

    let (report, remote) = if local {
        let dispatcher = ToolDispatcher::new(backend(&BackendEnv::TOOL_SERVER)?);
        (demo_with(&dispatcher, options, chain_backend).await, None)
    } else {
        let remote = connect(&url, call_timeout).await?;
        (demo_with(&remote, options, chain_backend).await, Some(remote))
    };
    if let Some(remote) = remote {
        remote.shutdown().await;
    }

    print_report(&report);
    Ok(!report.any_failed())
}

async fn demo_with(
    invoker: &dyn ToolInvoker,
    options: DemoOptions,
    chain: Option<Arc<dyn LlmClient>>,
) -> DemoReport {
    let mut runner = DemoRunner::new(invoker, options);
    if let Some(chain) = chain {
        runner = runner.with_chain(chain);
    }
    runner.run().await
}

fn print_report(report: &DemoReport) {
    for step in &report.steps {
        println!("{}", "--".repeat(20));
        match &step.outcome {
            StepOutcome::Skipped(reason) => println!("{}: skipped ({})", step.operation, reason),
            StepOutcome::Completed(result) => {
                let json = serde_json::to_string_pretty(result).unwrap_or_default();
                println!("{}:\n{}", step.operation, json);
            }
        }
        if let Some(chained) = &step.chained {
            println!("{} -> chain:\n{}", step.operation, chained);
        }
    }
    println!("{}", "--".repeat(20));
    for failure in &report.failures {
        println!("FAILED {}: {}", failure.operation, failure.error_detail);
    }
}

async fn run_ask(url: String, query: String, call_timeout: u64) -> Result<()> {
    let chain = backend(&BackendEnv::CHAIN)?;
    let remote = connect(&url, call_timeout).await?;

    let tools = client::mcp_tools_to_functions(&remote.list_tools().await?);
    let outcome = client::ask(&remote, &*chain, tools, &query).await;
    remote.shutdown().await;
    let outcome = outcome?;

    if let Some(reply) = outcome.direct_reply {
        println!("Direct reply: {}", reply);
    }
    for (call, result) in &outcome.tool_runs {
        println!("Executed {} {}", call.function.name, call.function.arguments);
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    Ok(())
}

async fn run_tools(url: String) -> Result<()> {
    let remote = McpToolClient::connect(&url).await?;
    let tools = remote.list_tools().await;
    remote.shutdown().await;

    for tool in tools? {
        println!("- {}: {}", tool.name, tool.description.as_deref().unwrap_or_default());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env files (global first, then project - project overrides)
    config::load_dotenv();

    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve { host, port, path } => run_server(host, port, path).await?,
        Commands::Demo {
            url,
            image,
            chain,
            local,
            call_timeout,
        } => {
            if !run_demo(url, image, chain, local, call_timeout).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Ask {
            url,
            query,
            call_timeout,
        } => run_ask(url, query, call_timeout).await?,
        Commands::Tools { url } => run_tools(url).await?,
    }

    Ok(ExitCode::SUCCESS)
}
