//! Pipeline orchestrator - wires capture sources, distributor and subscribers.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use capture::{MockCaptureConfig, MockCaptureSource};
use contracts::FeedBlueprint;
use distributor::{spawn_subscribers, Distributor, SubscriberHandle};
use observability::FeedMetricsAggregator;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::stats::{PipelineStats, SubscriberStats};
use crate::error::CliError;

/// How long a subscriber gets to drain its queue on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The feed configuration
    pub blueprint: FeedBlueprint,

    /// Packets per interface (None = unlimited)
    pub max_packets: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until every source hits its packet limit, the timeout expires,
    /// or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let distributor = Arc::new(Distributor::new());

        // Consumers first, so the first captured frame already has somewhere to go
        let specs = blueprint.subscriber_specs();
        let handles = spawn_subscribers(&specs, &distributor)
            .await
            .map_err(|e| CliError::pipeline_execution(e.to_string()))
            .context("Failed to start subscribers")?;

        info!(subscribers = handles.len(), "Subscribers started");

        let sources: Vec<MockCaptureSource> = blueprint
            .interface_ids()
            .into_iter()
            .map(|iface| {
                MockCaptureSource::new(MockCaptureConfig::from_settings(iface, &blueprint.capture))
            })
            .collect();

        let tasks: Vec<JoinHandle<u64>> = sources
            .iter()
            .map(|source| source.start(Arc::clone(&distributor), self.config.max_packets))
            .collect();

        info!(
            sources = sources.len(),
            max_packets = ?self.config.max_packets,
            "Capture running"
        );

        let mut producers = tokio::spawn(join_producers(tasks));
        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let finished = tokio::select! {
            joined = &mut producers => Some(joined),
            _ = deadline => {
                warn!("Pipeline timed out");
                None
            }
            _ = shutdown => None,
        };

        // Shutdown
        info!("Shutting down pipeline...");
        let joined = match finished {
            Some(joined) => joined,
            None => {
                for source in &sources {
                    source.stop();
                }
                producers.await
            }
        };
        let packets_published = joined.context("Capture task panicked")?;

        let subscribers = shutdown_subscribers(handles).await;

        let mut feed = FeedMetricsAggregator::new();
        let mut bytes_published = 0;
        for source in &sources {
            feed.merge(&source.feed_metrics());
            bytes_published += source.metrics().snapshot().bytes_captured;
        }

        let stats = PipelineStats {
            packets_published,
            bytes_published,
            duration: start_time.elapsed(),
            interfaces: sources.len(),
            subscribers,
            feed,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            pps = format!("{:.2}", stats.pps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Wait for every capture loop and sum what they sent
async fn join_producers(tasks: Vec<JoinHandle<u64>>) -> u64 {
    let mut total = 0;
    for task in tasks {
        match task.await {
            Ok(sent) => total += sent,
            Err(e) => warn!(error = %e, "Capture task failed"),
        }
    }
    total
}

/// Stop every subscriber, letting queued envelopes drain first
async fn shutdown_subscribers(handles: Vec<SubscriberHandle>) -> Vec<SubscriberStats> {
    let mut stats = Vec::with_capacity(handles.len());
    for handle in handles {
        let name = handle.name().to_string();
        let metrics = Arc::clone(handle.metrics());

        if !handle.shutdown_within(SHUTDOWN_GRACE).await {
            warn!(subscriber = %name, "Subscriber did not drain in time, stats are partial");
        }

        stats.push(SubscriberStats {
            name,
            metrics: metrics.snapshot(),
        });
    }
    stats
}
