use std::sync::Arc;
use anyhow::Context;
use copilot_ask::analytics::SystemClock;
use copilot_ask::driver::{Driver, IngestCommand};
use copilot_ask::{AnalyticsConfig, ReportView};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries report lines only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AnalyticsConfig::from_env().context("invalid analytics configuration")?;
    tracing::info!(
        data_source = %config.recorder.data_source,
        persist = config.persistence.enabled,
        path = %config.persistence.path.display(),
        "analytics ingest starting"
    );

    let store = Arc::new(config.build_store(Arc::new(SystemClock)));
    let driver = Driver::new(store, config.io_timeout);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match IngestCommand::parse(line) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed ingest line");
                continue;
            }
        };
        if let Some(report) = driver.handle(command).await {
            emit(&mut stdout, &report).await?;
        }
    }

    // Final report at EOF
    if let Some(report) = driver.report().await {
        emit(&mut stdout, &report).await?;
    }
    Ok(())
}

async fn emit(out: &mut tokio::io::Stdout, report: &ReportView) -> anyhow::Result<()> {
    let mut json = serde_json::to_string(report)?;
    json.push('\n');
    out.write_all(json.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}
