//! Packet - Capture 输出
//!
//! 原始抓包帧结构。分发器不解析其内容，只移交引用。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 抓包帧
///
/// 从网卡捕获的一帧原始数据及其元数据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// 帧数据 (零拷贝)
    pub data: Bytes,

    /// 捕获元数据
    pub meta: PacketMeta,
}

/// 捕获元数据
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketMeta {
    /// 捕获时间戳 (微秒, UNIX epoch)
    pub timestamp_us: u64,

    /// 实际捕获长度
    pub captured_len: u32,

    /// 线上原始长度 (可能大于 captured_len)
    pub original_len: u32,

    /// 捕获源内的序号 (单调递增，用于诊断/排序校验)
    pub sequence: u64,
}

impl Packet {
    /// 由原始字节构造，长度字段取自数据本身
    pub fn new(data: impl Into<Bytes>, timestamp_us: u64, sequence: u64) -> Self {
        let data = data.into();
        let len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            data,
            meta: PacketMeta {
                timestamp_us,
                captured_len: len,
                original_len: len,
                sequence,
            },
        }
    }

    /// 帧长度 (字节)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空帧
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 是否被截断 (snaplen 小于线上长度)
    pub fn is_truncated(&self) -> bool {
        self.meta.captured_len < self.meta.original_len
    }
}
