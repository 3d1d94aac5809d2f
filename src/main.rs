use std::sync::Arc;

use interests_migrate::config::MigrationConfig;
use interests_migrate::contacts::{ContactDirectory, HttpContactDirectory};
use interests_migrate::pipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = MigrationConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export OMNISEND_API_KEY=...");
        std::process::exit(1);
    });

    eprintln!("📇 interests-migrate v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Input: {}", config.input_path.display());
    eprintln!("   API: {} ({})", config.api_base, config.remote_name);
    eprintln!("   Attempts per request: {}", config.retry.max_attempts());

    let directory: Arc<dyn ContactDirectory> =
        Arc::new(HttpContactDirectory::from_config(&config)?);

    let report = match pipeline::migrate(&config, directory).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let summary = &report.summary;
    let elapsed = summary.finished_at - summary.started_at;
    eprintln!(
        "\n   Processed {} rows in {}s: {} updated, {} skipped",
        summary.total,
        elapsed.num_seconds(),
        summary.updated,
        summary.skipped
    );
    eprintln!("   Changed contacts written to {}", report.logs.changed.display());
    eprintln!("   Skipped contacts written to {}", report.logs.skipped.display());

    Ok(())
}
