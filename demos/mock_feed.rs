//! Mock Feed Example
//!
//! Builds a distributor by hand, attaches a counting subscriber per
//! interface and runs mock capture on every interface.
//! No network hardware required.
//!
//! Run with: cargo run -p feed_demos --bin mock_feed [feed.toml]

use std::sync::Arc;

use capture::{MockCaptureConfig, MockCaptureSource};
use config_loader::ConfigLoader;
use contracts::{CaptureSettings, DeliveryPolicy, InterfaceId};
use distributor::{CountingHandler, CountingProbe, Distributor, SubscriberHandle};

const PACKETS_PER_INTERFACE: u64 = 20;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // ==== Stage 1: interfaces from a config file, or a fixed trio ====
    let (interfaces, settings) = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading feed config");
        let blueprint = ConfigLoader::load_from_path(std::path::Path::new(&path))?;
        (blueprint.interface_ids(), blueprint.capture)
    } else {
        (
            vec!["eth0".into(), "eth1".into(), "eth2".into()],
            CaptureSettings::default(),
        )
    };

    // ==== Stage 2: one counting subscriber per interface ====
    let distributor = Arc::new(Distributor::new());
    let mut subscribers: Vec<(InterfaceId, CountingProbe, SubscriberHandle)> = Vec::new();
    for iface in &interfaces {
        let (handler, probe) = CountingHandler::new(format!("{iface}-counting"), iface.clone());
        let handle = SubscriberHandle::spawn(handler, &distributor, 256, DeliveryPolicy::Block);
        subscribers.push((iface.clone(), probe, handle));
    }

    // ==== Stage 3: capture on every interface ====
    let sources: Vec<MockCaptureSource> = interfaces
        .iter()
        .map(|iface| {
            MockCaptureSource::new(MockCaptureConfig::from_settings(iface.clone(), &settings))
        })
        .collect();
    let tasks: Vec<_> = sources
        .iter()
        .map(|s| s.start(Arc::clone(&distributor), Some(PACKETS_PER_INTERFACE)))
        .collect();

    for task in tasks {
        let sent = task.await?;
        tracing::info!(sent, "Capture finished");
    }

    // ==== Stage 4: drain and report ====
    for (iface, probe, handle) in subscribers {
        handle.shutdown().await;
        tracing::info!(
            interface = %iface,
            forwarded = probe.count(),
            "Subscriber done"
        );
        for other in interfaces.iter().filter(|other| **other != iface) {
            tracing::info!(
                interface = %iface,
                from = %other,
                packets = probe.sequences_from(other).len(),
                "  per source"
            );
        }
    }

    Ok(())
}
