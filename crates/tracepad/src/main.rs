//! Tracepad - Interactive Code Tracing Service
//!
//! Runs user JavaScript and Python under instrumentation and serves
//! step-through traces and interactive debug sessions over HTTP.

use clap::Parser;
use eyre::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracepad_common::{env, logging};
use tracepad_engine::{api::ApiServer, EngineConfig};

/// Command-line interface for tracepad.
#[derive(Debug, Parser)]
#[command(name = "tracepad")]
#[command(about = "Code execution and tracing service for step-through visualization")]
#[command(version)]
pub struct Cli {
    /// Port for the HTTP API server
    #[arg(long, env = env::TRACEPAD_PORT, default_value = "8080")]
    pub port: u16,

    /// Interpreter binary used to run the Python tracer
    #[arg(long, env = env::TRACEPAD_PYTHON_BIN, default_value = "python3")]
    pub python_bin: String,

    /// Path to the Python tracer script
    #[arg(long, env = env::TRACEPAD_TRACER_SCRIPT, default_value = "pythonTracer.py")]
    pub tracer_script: PathBuf,

    /// Directory for transient source files handed to the tracer
    #[arg(long, env = env::TRACEPAD_TEMP_DIR, default_value = "temp")]
    pub temp_dir: PathBuf,

    /// Wall-clock budget for a single JavaScript evaluation, in milliseconds
    #[arg(long, default_value = "1000")]
    pub eval_timeout_ms: u64,

    /// Wall-clock budget for a single tracer run, in seconds
    #[arg(long, default_value = "5")]
    pub tracer_timeout_secs: u64,

    /// Maximum number of live debug sessions before the oldest is evicted
    #[arg(long, default_value = "128")]
    pub max_sessions: usize,

    /// Disable logging to a file
    #[arg(long)]
    pub no_file_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logging::init_logging("tracepad", !cli.no_file_log)?;

    let config = EngineConfig {
        port: cli.port,
        python_bin: cli.python_bin,
        tracer_script: cli.tracer_script,
        temp_dir: cli.temp_dir,
        eval_timeout: Duration::from_millis(cli.eval_timeout_ms),
        tracer_timeout: Duration::from_secs(cli.tracer_timeout_secs),
        max_sessions: cli.max_sessions,
    };

    tracing::info!(
        tracer = %config.tracer_script.display(),
        "starting tracepad on port {}",
        config.port
    );

    let handle = ApiServer::new(config).start().await?;
    tracing::info!("listening on http://{}", handle.addr());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.shutdown();

    Ok(())
}
