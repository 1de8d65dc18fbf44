use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use eventline_pipe::config::{Config, LoggingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.logging);

    tracing::info!(
        max_len = config.buffer.max_len,
        json_field = %config.buffer.json_field,
        flush_interval_ms = config.buffer.flush_interval_ms,
        "Starting eventline-pipe"
    );

    // stdout carries the events, logs go to stderr
    let stats = eventline_pipe::run(tokio::io::stdin(), std::io::stdout(), &config).await?;

    tracing::info!(
        bytes_read = stats.bytes_read,
        bytes_buffered = stats.bytes_buffered,
        "Input closed, exiting"
    );

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
