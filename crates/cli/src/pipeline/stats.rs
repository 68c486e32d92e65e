//! Pipeline statistics.

use std::time::Duration;

use distributor::MetricsSnapshot;
use observability::FeedMetricsAggregator;

/// Final counters of one subscriber
#[derive(Debug, Clone)]
pub struct SubscriberStats {
    pub name: String,
    pub metrics: MetricsSnapshot,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames broadcast across all interfaces
    pub packets_published: u64,

    /// Bytes broadcast across all interfaces
    pub bytes_published: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of capture sources
    pub interfaces: usize,

    /// Per-subscriber counters, in registration order
    pub subscribers: Vec<SubscriberStats>,

    /// Aggregated delivery reports
    pub feed: FeedMetricsAggregator,
}

impl PipelineStats {
    /// Packets broadcast per second
    pub fn pps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.packets_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Packets published: {}", self.packets_published);
        println!("   ├─ Bytes published: {}", self.bytes_published);
        println!("   ├─ PPS: {:.2}", self.pps());
        println!("   └─ Interfaces: {}", self.interfaces);

        let summary = self.feed.summary();

        println!("\n📈 Delivery");
        println!("   ├─ Envelopes delivered: {}", summary.total_delivered);
        println!("   ├─ Dropped (queue full): {}", summary.total_dropped);
        println!("   ├─ Timed out: {}", summary.total_timed_out);
        println!("   ├─ Loss rate: {:.2}%", summary.loss_rate);
        println!("   └─ Fan-out: {}", summary.fanout);

        if !self.subscribers.is_empty() {
            println!("\n🔌 Subscribers");
            for (i, sub) in self.subscribers.iter().enumerate() {
                let prefix = if i == self.subscribers.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                let m = &sub.metrics;
                println!(
                    "   {} {}: handled={} skipped_own={} failed={} lost={}",
                    prefix,
                    sub.name,
                    m.handled_count,
                    m.self_skipped_count,
                    m.failure_count,
                    m.lost()
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pps() {
        let stats = PipelineStats {
            packets_published: 500,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.pps() - 250.0).abs() < 1e-9);
        assert_eq!(PipelineStats::default().pps(), 0.0);
    }
}
