//! drone-portainer CLI Entry Point
//!
//! This is the main entry point for the drone-portainer binary.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use drone_portainer::{Args, Settings};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // `.env` in the working directory never overrides variables already set
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        println!("Exited with error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args)?;
    init_logging(settings.debug)?;

    debug!(
        repo = ?settings.build.repo,
        commit = ?settings.build.commit_sha,
        branch = ?settings.build.commit_branch,
        build = ?settings.build.build_number,
        event = ?settings.build.build_event,
        "CI metadata"
    );
    debug!(
        portainer = ?settings.portainer,
        stack = %settings.stack.name,
        endpoint = %settings.portainer.endpoint,
        env_count = settings.stack.environment.len(),
        secrets = settings.secrets.len(),
        policy = ?settings.policy,
        "Settings resolved"
    );

    let outcome = drone_portainer::exec(&settings).await?;
    info!(stack = %outcome.stack, action = ?outcome.action, "Done");

    Ok(())
}

/// Diagnostics go to stderr so they don't interleave with progress lines.
/// `RUST_LOG` takes precedence over the debug flag.
fn init_logging(debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(debug)
        .with_line_number(debug)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
