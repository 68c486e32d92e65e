//! FeedBlueprint - Config Loader 输出
//!
//! 描述完整的分发配置：默认投递策略、模拟抓包参数、参与桥接的网卡及其处理器。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{DeliveryPolicy, InterfaceId};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的分发配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 分发器默认设置
    #[serde(default)]
    pub distributor: DistributorSettings,

    /// 模拟抓包参数
    #[serde(default)]
    pub capture: CaptureSettings,

    /// 网卡定义列表
    pub interfaces: Vec<InterfaceConfig>,
}

/// 分发器默认设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributorSettings {
    /// 每个订阅端点的默认队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 默认投递策略
    #[serde(default)]
    pub policy: DeliveryPolicy,
}

impl Default for DistributorSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            policy: DeliveryPolicy::default(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

/// 模拟抓包参数 (每个网卡一个抓包源)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// 每个网卡的发包速率 (packets/s)
    #[serde(default = "default_packets_per_sec")]
    pub packets_per_sec: f64,

    /// 每帧字节数
    #[serde(default = "default_payload_bytes")]
    pub payload_bytes: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            packets_per_sec: default_packets_per_sec(),
            payload_bytes: default_payload_bytes(),
        }
    }
}

fn default_packets_per_sec() -> f64 {
    100.0
}

fn default_payload_bytes() -> usize {
    64
}

/// 单个网卡配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// 网卡名称 (e.g., "eth0")
    pub name: InterfaceId,

    /// 处理器类型
    #[serde(default = "default_handler_type")]
    pub handler: HandlerType,

    /// 队列容量 (覆盖默认值)
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    /// 投递策略 (覆盖默认值)
    #[serde(default)]
    pub policy: Option<DeliveryPolicy>,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_handler_type() -> HandlerType {
    HandlerType::Log
}

/// 处理器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    /// 日志输出
    Log,
    /// 文件输出 (JSON Lines)
    File,
    /// 网络转发 (UDP)
    Network,
    /// 仅计数
    Counting,
}

impl HandlerType {
    /// 配置文件中的名称
    pub fn label(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::File => "file",
            Self::Network => "network",
            Self::Counting => "counting",
        }
    }
}

/// 解析后的订阅者参数：默认值已合并
#[derive(Debug, Clone)]
pub struct SubscriberSpec {
    pub interface: InterfaceId,
    pub handler: HandlerType,
    pub queue_capacity: usize,
    pub policy: DeliveryPolicy,
    pub params: HashMap<String, String>,
}

impl FeedBlueprint {
    /// Resolve every interface against the distributor defaults
    pub fn subscriber_specs(&self) -> Vec<SubscriberSpec> {
        self.interfaces
            .iter()
            .map(|iface| SubscriberSpec {
                interface: iface.name.clone(),
                handler: iface.handler,
                queue_capacity: iface
                    .queue_capacity
                    .unwrap_or(self.distributor.queue_capacity),
                policy: iface.policy.unwrap_or(self.distributor.policy),
                params: iface.params.clone(),
            })
            .collect()
    }

    /// Names of all configured interfaces, in declaration order
    pub fn interface_ids(&self) -> Vec<InterfaceId> {
        self.interfaces.iter().map(|i| i.name.clone()).collect()
    }

    /// True if any subscriber can hold up a broadcast
    pub fn has_stalling_subscriber(&self) -> bool {
        self.subscriber_specs()
            .iter()
            .any(|spec| spec.policy.may_stall())
    }
}
