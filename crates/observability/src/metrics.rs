//! 分发指标收集模块
//!
//! 记录 Prometheus 指标，并在内存中聚合每次广播的 DeliveryReport。
//! 未安装 recorder 时，所有 `record_*` 调用都是空操作。

use contracts::DeliveryReport;
use metrics::{counter, gauge, histogram};

/// 记录一次广播（每个源接口一个计数器）
pub fn record_packet_published(source: &str, bytes: usize) {
    counter!(
        "pktfeed_packets_published_total",
        "source" => source.to_string()
    )
    .increment(1);
    histogram!("pktfeed_packet_bytes").record(bytes as f64);
}

/// 记录单个订阅者的投递结果
///
/// `outcome` 取值: delivered / dropped / timed_out / closed
pub fn record_delivery(subscriber: &str, outcome: &str) {
    counter!(
        "pktfeed_deliveries_total",
        "subscriber" => subscriber.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录当前注册的订阅者数量
pub fn record_subscriber_count(count: usize) {
    gauge!("pktfeed_subscribers").set(count as f64);
}

/// 记录订阅者队列深度
pub fn record_queue_depth(subscriber: &str, depth: usize) {
    gauge!(
        "pktfeed_queue_depth",
        "subscriber" => subscriber.to_string()
    )
    .set(depth as f64);
}

/// 记录消费端处理结果
pub fn record_packet_handled(subscriber: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "pktfeed_packets_handled_total",
        "subscriber" => subscriber.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 广播指标聚合器
///
/// 在内存中聚合 DeliveryReport，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FeedMetricsAggregator {
    /// 广播次数
    pub total_packets: u64,

    /// 成功入队的信封数
    pub total_delivered: u64,

    /// 队列满丢弃数
    pub total_dropped: u64,

    /// 超时丢弃数
    pub total_timed_out: u64,

    /// 发现已关闭的订阅者次数
    pub total_closed: u64,

    /// 至少有一个订阅者丢包的广播数
    pub incomplete_packets: u64,

    /// 每次广播的订阅者数量
    pub fanout_stats: RunningStats,
}

impl FeedMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, report: &DeliveryReport) {
        self.total_packets += 1;
        self.total_delivered += report.delivered as u64;
        self.total_dropped += report.dropped as u64;
        self.total_timed_out += report.timed_out as u64;
        self.total_closed += report.closed as u64;

        if report.lost() > 0 {
            self.incomplete_packets += 1;
        }

        self.fanout_stats.push(report.subscribers as f64);
    }

    /// 合并另一个聚合器（多个生产者各自统计时使用）
    pub fn merge(&mut self, other: &FeedMetricsAggregator) {
        self.total_packets += other.total_packets;
        self.total_delivered += other.total_delivered;
        self.total_dropped += other.total_dropped;
        self.total_timed_out += other.total_timed_out;
        self.total_closed += other.total_closed;
        self.incomplete_packets += other.incomplete_packets;
        self.fanout_stats.merge(&other.fanout_stats);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> FeedSummary {
        let attempted = self.total_delivered + self.total_dropped + self.total_timed_out;
        FeedSummary {
            total_packets: self.total_packets,
            total_delivered: self.total_delivered,
            total_dropped: self.total_dropped,
            total_timed_out: self.total_timed_out,
            total_closed: self.total_closed,
            loss_rate: if attempted > 0 {
                (self.total_dropped + self.total_timed_out) as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            incomplete_rate: if self.total_packets > 0 {
                self.incomplete_packets as f64 / self.total_packets as f64 * 100.0
            } else {
                0.0
            },
            fanout: StatsSummary::from(&self.fanout_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct FeedSummary {
    pub total_packets: u64,
    pub total_delivered: u64,
    pub total_dropped: u64,
    pub total_timed_out: u64,
    pub total_closed: u64,
    pub loss_rate: f64,
    pub incomplete_rate: f64,
    pub fanout: StatsSummary,
}

impl std::fmt::Display for FeedSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Feed Metrics Summary ===")?;
        writeln!(f, "Packets published: {}", self.total_packets)?;
        writeln!(f, "Envelopes delivered: {}", self.total_delivered)?;
        writeln!(
            f,
            "Envelopes lost: {} dropped, {} timed out ({:.2}%)",
            self.total_dropped, self.total_timed_out, self.loss_rate
        )?;
        writeln!(
            f,
            "Packets with loss: {:.2}%",
            self.incomplete_rate
        )?;
        writeln!(f, "Closed subscribers seen: {}", self.total_closed)?;
        writeln!(f, "Fan-out: {}", self.fanout)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 合并两组样本 (Chan et al. 并行公式)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * (self.count as f64 * other.count as f64) / count as f64;

        self.count = count;
        self.mean = mean;
        self.m2 = m2;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_running_stats_merge_matches_sequential() {
        let mut left = RunningStats::default();
        let mut right = RunningStats::default();
        let mut all = RunningStats::default();
        for v in [1.0, 2.0, 3.0] {
            left.push(v);
            all.push(v);
        }
        for v in [4.0, 5.0] {
            right.push(v);
            all.push(v);
        }

        left.merge(&right);

        assert_eq!(left.count(), all.count());
        assert!((left.mean() - all.mean()).abs() < 1e-10);
        assert!((left.variance() - all.variance()).abs() < 1e-10);
        assert!((left.min() - 1.0).abs() < 1e-10);
        assert!((left.max() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = FeedMetricsAggregator::new();

        aggregator.update(&DeliveryReport {
            subscribers: 3,
            delivered: 3,
            ..DeliveryReport::default()
        });
        aggregator.update(&DeliveryReport {
            subscribers: 3,
            delivered: 1,
            dropped: 1,
            timed_out: 1,
            closed: 0,
        });

        assert_eq!(aggregator.total_packets, 2);
        assert_eq!(aggregator.total_delivered, 4);
        assert_eq!(aggregator.total_dropped, 1);
        assert_eq!(aggregator.total_timed_out, 1);
        assert_eq!(aggregator.incomplete_packets, 1);

        let summary = aggregator.summary();
        assert!((summary.loss_rate - 100.0 / 3.0).abs() < 1e-9);
        assert!((summary.incomplete_rate - 50.0).abs() < 1e-9);
        assert!((summary.fanout.mean - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_summary() {
        let summary = FeedMetricsAggregator::new().summary();
        assert_eq!(summary.total_packets, 0);
        assert_eq!(summary.loss_rate, 0.0);
        assert_eq!(format!("{}", summary.fanout), "N/A");
    }

    #[test]
    fn test_summary_display() {
        let summary = FeedSummary {
            total_packets: 100,
            total_delivered: 195,
            total_dropped: 5,
            loss_rate: 2.5,
            ..FeedSummary::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Packets published: 100"));
        assert!(output.contains("2.50%"));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_packet_published("eth0", 64);
        record_delivery("eth1-log", "delivered");
        record_subscriber_count(2);
        record_queue_depth("eth1-log", 0);
        record_packet_handled("eth1-log", true);
    }
}
