use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "surfcast", about = "Surf recommendation chat assistant")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/surfcast.toml")]
    config: String,

    /// Read the chat request JSON from a file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the reply
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = surfcast::load_config(&cli.config)?;

    let body = if let Some(input_path) = &cli.input {
        std::fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input: {input_path}"))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    };

    let runner = surfcast::build_runner(&config).context("Failed to build workflow runner")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling request");
            on_signal.cancel();
        }
    });

    let reply = surfcast::respond_until(&runner, &body, &cancel)
        .await
        .context("Rejected chat request")?;

    let output = serde_json::json!({ "response": reply });
    let output = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{output}");

    Ok(())
}
