//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 分发语义测试（无丢包、顺序、迟到注册、来源即数据）
//! - 多生产者/多注册者并发压力测试
//! - 配置 -> 抓包 -> 分发 -> 处理器 的端到端测试

#[cfg(test)]
mod contract_tests {
    use contracts::{DeliveryPolicy, FeedBlueprint};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_blueprint_json_snapshot() {
        let blueprint: FeedBlueprint = serde_json::from_str(
            r#"{
                "distributor": { "policy": { "mode": "timeout", "timeout_ms": 25 } },
                "interfaces": [ { "name": "eth0" }, { "name": "eth1", "handler": "counting" } ]
            }"#,
        )
        .unwrap();

        let specs = blueprint.subscriber_specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].policy, DeliveryPolicy::Timeout { timeout_ms: 25 });
        assert_eq!(specs[0].queue_capacity, 1024);
        assert_eq!(specs[1].handler.label(), "counting");
    }
}

/// Helpers shared by the distribution tests
#[cfg(test)]
mod support {
    use contracts::{Envelope, Packet};
    use tokio::sync::mpsc;

    pub fn packet(seq: u64) -> Packet {
        Packet::new(vec![(seq & 0xff) as u8; 64], seq, seq)
    }

    /// Everything currently queued, as `(source, sequence)`
    pub fn drain(rx: &mut mpsc::Receiver<Envelope>) -> Vec<(String, u64)> {
        let mut out = Vec::new();
        while let Ok(env) = rx.try_recv() {
            out.push((env.source().to_string(), env.packet().meta.sequence));
        }
        out
    }
}

#[cfg(test)]
mod distribution_tests {
    use std::time::{Duration, Instant};

    use contracts::DeliveryPolicy;
    use distributor::{CountingHandler, Distributor, Endpoint, SubscriberHandle};

    use crate::support::{drain, packet};

    /// 三个订阅者 A/B/C 分别代表 eth0/eth1/eth2；
    /// P1 来自 eth0，P2 来自 eth1。
    #[tokio::test]
    async fn test_three_interface_scenario() {
        let distributor = Distributor::new();
        let mut probes = Vec::new();
        let mut handles = Vec::new();
        for iface in ["eth0", "eth1", "eth2"] {
            let (handler, probe) = CountingHandler::new(format!("{iface}-counting"), iface);
            handles.push(SubscriberHandle::spawn(
                handler,
                &distributor,
                8,
                DeliveryPolicy::Block,
            ));
            probes.push(probe);
        }

        let p1 = distributor.send(packet(1), "eth0").await;
        let p2 = distributor.send(packet(2), "eth1").await;
        assert_eq!(p1.delivered, 3);
        assert_eq!(p2.delivered, 3);

        let metrics: Vec<_> = handles.iter().map(|h| h.metrics().clone()).collect();
        for handle in handles {
            handle.shutdown().await;
        }

        // Every queue got both packets, in publish order
        for m in &metrics {
            assert_eq!(m.delivered_count(), 2);
        }

        // A skips P1, B skips P2, C forwards both
        assert_eq!(probes[0].sequences_from("eth1"), vec![2]);
        assert_eq!(probes[0].count(), 1);
        assert_eq!(probes[1].sequences_from("eth0"), vec![1]);
        assert_eq!(probes[1].count(), 1);
        let c: Vec<u64> = probes[2].received().iter().map(|r| r.sequence).collect();
        assert_eq!(c, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_no_loss_and_order_with_room_in_queues() {
        let distributor = Distributor::new();
        let mut probes = Vec::new();
        let mut handles = Vec::new();
        for i in 0..4 {
            let iface = format!("eth{}", i + 1);
            let (handler, probe) = CountingHandler::new(format!("{iface}-counting"), iface);
            // Block: a slow worker throttles the producer instead of losing packets
            handles.push(SubscriberHandle::spawn(
                handler,
                &distributor,
                16,
                DeliveryPolicy::Block,
            ));
            probes.push(probe);
        }

        for seq in 1..=1_000 {
            let report = distributor.send(packet(seq), "eth0").await;
            assert!(report.is_complete());
        }

        for handle in handles {
            handle.shutdown().await;
        }

        let expected: Vec<u64> = (1..=1_000).collect();
        for probe in &probes {
            assert_eq!(probe.sequences_from("eth0"), expected);
        }
    }

    #[tokio::test]
    async fn test_late_registration_sees_only_later_packets() {
        let distributor = Distributor::new();
        let (early, mut early_rx) = Endpoint::channel("early", 64, DeliveryPolicy::Block);
        distributor.register(early);

        for seq in 1..=10 {
            distributor.send(packet(seq), "eth0").await;
        }

        let (late, mut late_rx) = Endpoint::channel("late", 64, DeliveryPolicy::Block);
        distributor.register(late);

        for seq in 11..=15 {
            distributor.send(packet(seq), "eth0").await;
        }

        let early_seqs: Vec<u64> = drain(&mut early_rx).into_iter().map(|(_, s)| s).collect();
        let late_seqs: Vec<u64> = drain(&mut late_rx).into_iter().map(|(_, s)| s).collect();
        assert_eq!(early_seqs, (1..=15).collect::<Vec<_>>());
        assert_eq!(late_seqs, (11..=15).collect::<Vec<_>>());
    }

    /// 分发器不按来源过滤：自身接口的包照常入队，由消费端丢弃
    #[tokio::test]
    async fn test_origin_is_data() {
        let distributor = Distributor::new();
        let (raw, mut raw_rx) = Endpoint::channel("eth0-raw", 4, DeliveryPolicy::Block);
        distributor.register(raw);

        let (handler, probe) = CountingHandler::new("eth0-counting", "eth0");
        let handle = SubscriberHandle::spawn(handler, &distributor, 4, DeliveryPolicy::Block);

        let report = distributor.send(packet(1), "eth0").await;
        assert_eq!(report.delivered, 2);

        let queued = drain(&mut raw_rx);
        assert_eq!(queued, vec![("eth0".to_string(), 1)]);

        let metrics = handle.metrics().clone();
        handle.shutdown().await;
        assert_eq!(metrics.delivered_count(), 1);
        assert_eq!(metrics.self_skipped_count(), 1);
        assert_eq!(probe.count(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_only_for_that_subscriber() {
        let distributor = Distributor::new();
        let (stuck, _stuck_rx) = Endpoint::channel("stuck", 2, DeliveryPolicy::DropOnFull);
        let stuck_metrics = stuck.metrics().clone();
        distributor.register(stuck);

        let (handler, probe) = CountingHandler::new("eth1-counting", "eth1");
        let handle = SubscriberHandle::spawn(handler, &distributor, 32, DeliveryPolicy::Block);

        let mut lost = 0;
        for seq in 1..=10 {
            lost += distributor.send(packet(seq), "eth0").await.lost();
        }
        handle.shutdown().await;

        assert_eq!(lost, 8);
        assert_eq!(stuck_metrics.delivered_count(), 2);
        assert_eq!(stuck_metrics.dropped_count(), 8);
        assert_eq!(probe.sequences_from("eth0"), (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_timeout_policy_bounds_the_wait() {
        let distributor = Distributor::new();
        let (stuck, _stuck_rx) = Endpoint::channel(
            "stuck",
            1,
            DeliveryPolicy::timeout(Duration::from_millis(20)),
        );
        distributor.register(stuck);

        let first = distributor.send(packet(1), "eth0").await;
        assert_eq!(first.delivered, 1);

        let started = Instant::now();
        let second = distributor.send(packet(2), "eth0").await;
        assert_eq!(second.timed_out, 1);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_departed_subscriber_is_retired() {
        let distributor = Distributor::new();
        let (handler, _probe) = CountingHandler::new("eth1-counting", "eth1");
        let handle = SubscriberHandle::spawn(handler, &distributor, 4, DeliveryPolicy::Block);
        let (stay, mut stay_rx) = Endpoint::channel("stay", 8, DeliveryPolicy::Block);
        distributor.register(stay);

        handle.shutdown().await;

        let report = distributor.send(packet(1), "eth0").await;
        assert_eq!(report.closed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(distributor.subscriber_count(), 1);

        let report = distributor.send(packet(2), "eth0").await;
        assert_eq!(report.subscribers, 1);
        assert_eq!(drain(&mut stay_rx).len(), 2);
    }
}

#[cfg(test)]
mod concurrency_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::DeliveryPolicy;
    use distributor::{Distributor, Endpoint};

    use crate::support::{drain, packet};

    const PRODUCERS: usize = 2;
    const REGISTRANTS: usize = 8;
    const PACKETS_PER_PRODUCER: u64 = 500;

    /// Each list must be a suffix of the global publish order, so any two
    /// lists agree: the shorter one is the tail of the longer one.
    fn assert_common_order(a: &[(String, u64)], b: &[(String, u64)]) {
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        assert_eq!(short, &long[long.len() - short.len()..]);
    }

    /// Per source, sequences are consecutive and run to the last packet
    fn assert_per_source_suffix(received: &[(String, u64)], source: &str) {
        let seqs: Vec<u64> = received
            .iter()
            .filter(|(s, _)| s == source)
            .map(|(_, seq)| *seq)
            .collect();
        if let Some(&first) = seqs.first() {
            let expected: Vec<u64> = (first..=PACKETS_PER_PRODUCER).collect();
            assert_eq!(seqs, expected, "gap or reorder from {source}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_and_broadcast() {
        let distributor = Arc::new(Distributor::new());

        // One subscriber that is there from the start
        let capacity = PRODUCERS * PACKETS_PER_PRODUCER as usize;
        let (first, mut first_rx) = Endpoint::channel("first", capacity, DeliveryPolicy::Block);
        distributor.register(first);

        let mut producers = Vec::new();
        for p in 0..PRODUCERS {
            let distributor = Arc::clone(&distributor);
            producers.push(tokio::spawn(async move {
                let source = format!("eth{p}");
                for seq in 1..=PACKETS_PER_PRODUCER {
                    distributor.send(packet(seq), source.as_str()).await;
                    if seq % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }

        let mut registrants = Vec::new();
        for r in 0..REGISTRANTS {
            let distributor = Arc::clone(&distributor);
            registrants.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_micros(250 * r as u64)).await;
                let (endpoint, rx) =
                    Endpoint::channel(format!("late-{r}"), capacity, DeliveryPolicy::Block);
                distributor.register(endpoint);
                rx
            }));
        }

        for producer in producers {
            producer.await.unwrap();
        }
        let mut receivers = Vec::new();
        for registrant in registrants {
            receivers.push(registrant.await.unwrap());
        }

        assert_eq!(distributor.subscriber_count(), 1 + REGISTRANTS);

        // The first subscriber saw everything
        let all = drain(&mut first_rx);
        assert_eq!(all.len(), capacity);
        for p in 0..PRODUCERS {
            assert_per_source_suffix(&all, &format!("eth{p}"));
        }

        for rx in &mut receivers {
            let received = drain(rx);
            for p in 0..PRODUCERS {
                assert_per_source_suffix(&received, &format!("eth{p}"));
            }
            assert_common_order(&all, &received);
        }
    }

    /// 生产者可以是普通 OS 线程，通过运行时句柄驱动 send
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_os_thread_producers() {
        let distributor = Arc::new(Distributor::new());
        let (endpoint, mut rx) = Endpoint::channel("sink", 1024, DeliveryPolicy::Block);
        distributor.register(endpoint);

        let runtime = tokio::runtime::Handle::current();
        let threads: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let distributor = Arc::clone(&distributor);
                let runtime = runtime.clone();
                std::thread::spawn(move || {
                    let source = format!("eth{p}");
                    for seq in 1..=200 {
                        runtime.block_on(distributor.send(packet(seq), source.as_str()));
                    }
                })
            })
            .collect();

        tokio::task::spawn_blocking(move || {
            for thread in threads {
                thread.join().unwrap();
            }
        })
        .await
        .unwrap();

        let received = drain(&mut rx);
        assert_eq!(received.len(), PRODUCERS * 200);
        for p in 0..PRODUCERS {
            let source = format!("eth{p}");
            let seqs: Vec<u64> = received
                .iter()
                .filter(|(s, _)| *s == source)
                .map(|(_, seq)| *seq)
                .collect();
            assert_eq!(seqs, (1..=200).collect::<Vec<_>>());
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;

    use capture::{MockCaptureConfig, MockCaptureSource};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{DeliveryPolicy, Envelope, Packet, PacketHandler};
    use distributor::{spawn_subscribers, Distributor, NetworkHandler, NetworkHandlerConfig};
    use tempfile::tempdir;
    use tokio::net::UdpSocket;

    /// End-to-end test: config -> MockCaptureSource -> Distributor -> FileHandler
    #[tokio::test]
    async fn test_e2e_config_to_files() {
        let dir = tempdir().unwrap();
        let toml = format!(
            r#"
version = "V1"

[distributor]
queue_capacity = 64
policy = {{ mode = "block" }}

[capture]
packets_per_sec = 1000.0
payload_bytes = 60

[[interfaces]]
name = "eth0"
handler = "file"
params = {{ path = "{eth0}" }}

[[interfaces]]
name = "eth1"
handler = "file"
params = {{ path = "{eth1}" }}
"#,
            eth0 = dir.path().join("eth0.jsonl").display(),
            eth1 = dir.path().join("eth1.jsonl").display(),
        );
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let distributor = Arc::new(Distributor::new());
        let handles = spawn_subscribers(&blueprint.subscriber_specs(), &distributor)
            .await
            .unwrap();

        let sources: Vec<MockCaptureSource> = blueprint
            .interface_ids()
            .into_iter()
            .map(|iface| {
                MockCaptureSource::new(MockCaptureConfig::from_settings(iface, &blueprint.capture))
            })
            .collect();
        let tasks: Vec<_> = sources
            .iter()
            .map(|s| s.start(Arc::clone(&distributor), Some(5)))
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), 5);
        }
        for handle in handles {
            handle.shutdown().await;
        }

        for (file, other) in [("eth0.jsonl", "eth1"), ("eth1.jsonl", "eth0")] {
            let content = fs::read_to_string(dir.path().join(file)).unwrap();
            let records: Vec<serde_json::Value> = content
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect();
            assert_eq!(records.len(), 5, "{file}");
            let seqs: Vec<u64> = records
                .iter()
                .map(|r| {
                    assert_eq!(r["source"], other);
                    assert_eq!(r["captured_len"], 60);
                    r["sequence"].as_u64().unwrap()
                })
                .collect();
            assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        }
    }

    #[tokio::test]
    async fn test_e2e_network_forwarding() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let handler = NetworkHandler::new(
            "eth1-network",
            "eth1",
            NetworkHandlerConfig {
                addr: receiver.local_addr().unwrap(),
                max_packet_size: 1500,
            },
        )
        .await
        .unwrap();

        let distributor = Distributor::new();
        let handle =
            distributor::SubscriberHandle::spawn(handler, &distributor, 8, DeliveryPolicy::Block);

        let frame = capture::synthetic_frame("eth0", 7, 80);
        distributor
            .send(Packet::new(frame.clone(), 0, 7), "eth0")
            .await;
        // Own traffic is not echoed back out
        distributor
            .send(Packet::new(capture::synthetic_frame("eth1", 1, 80), 0, 1), "eth1")
            .await;

        let mut buf = [0u8; 2048];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], &frame[..]);

        let metrics = handle.metrics().clone();
        handle.shutdown().await;
        assert_eq!(metrics.handled_count(), 1);
        assert_eq!(metrics.self_skipped_count(), 1);
    }

    #[tokio::test]
    async fn test_handler_driven_directly() {
        let (mut handler, probe) = distributor::CountingHandler::new("direct", "eth3");
        let envelope = Envelope::new(Arc::new(Packet::new(vec![1u8; 20], 0, 9)), "eth0".into());
        handler.handle(&envelope).await.unwrap();
        handler.close().await.unwrap();
        assert_eq!(probe.sequences_from("eth0"), vec![9]);
    }
}
