use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tapwright_engine::backend::Backend;
use tapwright_engine::cli::{self, FileOptions, OutputHandlers, StdinGate};
use tapwright_engine::config::{ConfigLoader, TapwrightConfig};
use tapwright_engine::protocol::Platform;
use tapwright_wd::RemoteBackend;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tapwright", version, about = "Run UI automation scenarios")]
struct Args {
    /// Scenario files or glob patterns
    #[arg(required = true)]
    scenarios: Vec<String>,

    /// Config file (else $TAPWRIGHT_CONFIG, ./tapwright.yaml, ~/.tapwright/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Automation server URL
    #[arg(long)]
    server_url: Option<String>,

    /// Session platform: android or web
    #[arg(long)]
    platform: Option<Platform>,

    /// Keep running scenarios after one fails
    #[arg(long)]
    keep_going: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

async fn load_config(args: &Args) -> anyhow::Result<TapwrightConfig> {
    let mut config = ConfigLoader::load(args.config.as_deref())
        .await
        .context("Failed to load config")?;

    if let Some(url) = &args.server_url {
        config.session.server_url = url.clone();
    }
    if let Some(platform) = args.platform {
        config.session.platform = platform;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; flow reports go to stdout.
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(&args).await?;
    let mut runner = config.flow_runner().with_gate(StdinGate::new());
    let mut backend = RemoteBackend::from_config(&config.session);

    backend
        .launch()
        .await
        .with_context(|| format!("Failed to start session at {}", config.session.server_url))?;

    let output = OutputHandlers {
        out: |msg| println!("{}", msg),
        err: |msg| eprintln!("{}", msg),
    };
    let run = cli::run_files(
        &mut backend,
        &mut runner,
        output,
        &args.scenarios,
        FileOptions {
            stop_on_error: !args.keep_going,
        },
    )
    .await;

    if let Err(e) = backend.close().await {
        error!("Failed to close session: {}", e);
    }

    let summary = run.context("Failed to load scenarios")?;
    info!(
        "{} passed, {} failed, {} not run",
        summary.passed, summary.failed, summary.not_run
    );
    if !summary.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
