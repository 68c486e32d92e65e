//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    distributor: DistributorInfo,
    capture: CaptureInfo,
    interfaces: Vec<InterfaceInfo>,
}

#[derive(Serialize)]
struct DistributorInfo {
    queue_capacity: usize,
    policy: contracts::DeliveryPolicy,
}

#[derive(Serialize)]
struct CaptureInfo {
    packets_per_sec: f64,
    payload_bytes: usize,
}

#[derive(Serialize)]
struct InterfaceInfo {
    name: String,
    handler: String,
    queue_capacity: usize,
    policy: contracts::DeliveryPolicy,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    ensure_config_exists(&args.config)?;

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::FeedBlueprint, args: &InfoArgs) -> ConfigInfo {
    let interfaces = blueprint
        .subscriber_specs()
        .into_iter()
        .map(|spec| InterfaceInfo {
            name: spec.interface.to_string(),
            handler: spec.handler.label().to_string(),
            queue_capacity: spec.queue_capacity,
            policy: spec.policy,
            params: if args.params {
                spec.params
            } else {
                HashMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        distributor: DistributorInfo {
            queue_capacity: blueprint.distributor.queue_capacity,
            policy: blueprint.distributor.policy,
        },
        capture: CaptureInfo {
            packets_per_sec: blueprint.capture.packets_per_sec,
            payload_bytes: blueprint.capture.payload_bytes,
        },
        interfaces,
    }
}

fn print_config_info(info: &ConfigInfo, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  pktfeed Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📦 Distributor");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Queue capacity: {}", info.distributor.queue_capacity);
    println!("   └─ Policy: {}", info.distributor.policy.label());

    println!("\n📡 Capture");
    println!("   ├─ Rate: {} pkt/s per interface", info.capture.packets_per_sec);
    println!("   └─ Frame size: {} bytes", info.capture.payload_bytes);

    println!("\n🔌 Interfaces ({})", info.interfaces.len());
    for (i, iface) in info.interfaces.iter().enumerate() {
        let is_last = i == info.interfaces.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} -> {} (queue {}, {})",
            prefix,
            iface.name,
            iface.handler,
            iface.queue_capacity,
            iface.policy.label()
        );

        if args.params {
            let mut params: Vec<_> = iface.params.iter().collect();
            params.sort();
            for (key, value) in params {
                println!("   {}  · {} = {}", child_prefix, key, value);
            }
        }
    }

    println!();
}
