//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::error::ensure_config_exists;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    ensure_config_exists(&args.config)?;

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        interfaces = blueprint.interfaces.len(),
        queue_capacity = blueprint.distributor.queue_capacity,
        policy = blueprint.distributor.policy.label(),
        packets_per_sec = blueprint.capture.packets_per_sec,
        "Configuration loaded"
    );

    for warning in config_loader::ConfigLoader::warnings(&blueprint) {
        warn!(%warning, "Configuration warning");
    }

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_packets: (args.max_packets > 0).then_some(args.max_packets),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline...");

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        packets_published = stats.packets_published,
        duration_secs = stats.duration.as_secs_f64(),
        pps = format!("{:.2}", stats.pps()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("pktfeed finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// If a handler cannot be installed that branch never resolves, and the
/// run ends through its packet or time limit instead.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping pipeline...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::FeedBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Distributor:");
    println!("  Queue capacity: {}", blueprint.distributor.queue_capacity);
    println!("  Policy: {:?}", blueprint.distributor.policy);
    println!("\nCapture:");
    println!("  Rate: {} pkt/s per interface", blueprint.capture.packets_per_sec);
    println!("  Frame size: {} bytes", blueprint.capture.payload_bytes);

    let specs = blueprint.subscriber_specs();
    println!("\nInterfaces ({}):", specs.len());
    for spec in &specs {
        println!(
            "  - {} -> {} (queue {}, {})",
            spec.interface,
            spec.handler.label(),
            spec.queue_capacity,
            spec.policy.label()
        );
    }

    println!();
}
