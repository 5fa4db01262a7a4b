use merch_loadgen::{Config, HttpTarget, Runner};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when a threshold failed
const EXIT_THRESHOLDS_FAILED: u8 = 1;

/// Exit status when the run could not be carried out
const EXIT_FATAL: u8 = 2;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received");
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merch_loadgen=info,merch_loadgen::target=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: target={}, scenario={}, rps={}",
        config.target.base_url,
        config.scenario.as_deref().unwrap_or("(none)"),
        config.load.rps
    );

    // Prometheus exporter (must be installed before any metrics are recorded)
    if let Some(addr) = config.output.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus metrics listening on {}", addr);
    }

    let target = HttpTarget::new(&config.target.base_url, config.target.request_timeout)?;
    let summary_path = config.output.summary_path.clone();

    let runner = match Runner::from_config(config, Arc::new(target)) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Ok(ExitCode::from(EXIT_FATAL));
        }
    };

    let report = match runner.run(shutdown_signal()).await {
        Ok(report) => report,
        Err(e) => {
            error!("Run failed: {}", e);
            return Ok(ExitCode::from(EXIT_FATAL));
        }
    };

    report.print_summary();
    if let Some(path) = summary_path {
        report.write_json(&path)?;
        info!("Summary written to {:?}", path);
    }

    if report.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            "{} threshold(s) failed",
            report.failed_thresholds().count()
        );
        Ok(ExitCode::from(EXIT_THRESHOLDS_FAILED))
    }
}
