//! Mock 抓包源
//!
//! 用于无真实网卡环境的运行与测试：按固定速率生成合成帧并直接广播。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use contracts::{CaptureSettings, InterfaceId, Packet};
use distributor::Distributor;
use observability::FeedMetricsAggregator;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::frame::synthetic_frame;
use crate::metrics::CaptureMetrics;

/// 速率非法时的回退发包间隔
const FALLBACK_INTERVAL: Duration = Duration::from_millis(10);

/// Mock 抓包源配置
#[derive(Debug, Clone)]
pub struct MockCaptureConfig {
    /// 网卡名 (即广播中的 source)
    pub interface: InterfaceId,

    /// 发包速率 (packets/s)
    pub packets_per_sec: f64,

    /// 每帧字节数 (含以太网头)
    pub frame_len: usize,
}

impl MockCaptureConfig {
    pub fn new(interface: impl Into<InterfaceId>, packets_per_sec: f64, frame_len: usize) -> Self {
        Self {
            interface: interface.into(),
            packets_per_sec,
            frame_len,
        }
    }

    /// 由配置文件中的 `[capture]` 段构造
    pub fn from_settings(interface: impl Into<InterfaceId>, settings: &CaptureSettings) -> Self {
        Self::new(interface, settings.packets_per_sec, settings.payload_bytes)
    }

    fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.packets_per_sec)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(FALLBACK_INTERVAL)
    }
}

/// Mock 抓包源
///
/// 每个实例代表一块网卡；`start` 产生的任务就是该网卡的抓包循环。
pub struct MockCaptureSource {
    config: MockCaptureConfig,
    running: Arc<AtomicBool>,
    metrics: Arc<CaptureMetrics>,
    feed: Arc<Mutex<FeedMetricsAggregator>>,
}

impl MockCaptureSource {
    /// 创建新的 Mock 抓包源
    pub fn new(config: MockCaptureConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(CaptureMetrics::new()),
            feed: Arc::default(),
        }
    }

    pub fn interface(&self) -> &InterfaceId {
        &self.config.interface
    }

    pub fn metrics(&self) -> &Arc<CaptureMetrics> {
        &self.metrics
    }

    /// 本源所有广播结果的聚合 (拷贝)
    pub fn feed_metrics(&self) -> FeedMetricsAggregator {
        self.feed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 启动抓包循环，返回发送帧数
    ///
    /// # Arguments
    /// * `distributor` - 广播目标
    /// * `max_packets` - 发送上限 (None = 直到 `stop`)
    pub fn start(&self, distributor: Arc<Distributor>, max_packets: Option<u64>) -> JoinHandle<u64> {
        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let metrics = Arc::clone(&self.metrics);
        let feed = Arc::clone(&self.feed);

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut sequence: u64 = 0;

            debug!(
                interface = %config.interface,
                packets_per_sec = config.packets_per_sec,
                frame_len = config.frame_len,
                "mock capture source started"
            );

            while running.load(Ordering::Relaxed) && max_packets.map_or(true, |max| sequence < max) {
                ticker.tick().await;
                if !running.load(Ordering::Relaxed) {
                    break;
                }

                sequence += 1;
                let data = synthetic_frame(&config.interface, sequence, config.frame_len);
                let len = data.len();
                let packet = Packet::new(data, now_us(), sequence);

                let report = distributor.send(packet, config.interface.clone()).await;
                metrics.record(len, &report);
                feed.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .update(&report);

                trace!(
                    interface = %config.interface,
                    sequence,
                    delivered = report.delivered,
                    "mock packet sent"
                );
            }

            running.store(false, Ordering::SeqCst);
            debug!(interface = %config.interface, sent = sequence, "mock capture source stopped");
            sequence
        })
    }

    /// 停止抓包循环 (当前帧广播完成后退出)
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 检查是否正在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
