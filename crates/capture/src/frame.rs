//! 合成以太网帧
//!
//! 帧格式: 广播目的 MAC | 由接口名派生的源 MAC | EtherType | 序号 (BE) | 填充

use bytes::{BufMut, Bytes, BytesMut};

/// 以太网头长度
pub const ETH_HEADER_LEN: usize = 14;

/// 本地实验用 EtherType (IEEE 802 Local Experimental 1)
pub const ETHERTYPE_FEED: u16 = 0x88B5;

const BROADCAST_MAC: [u8; 6] = [0xff; 6];

/// 构造一帧长度为 `frame_len` 的合成帧
///
/// `frame_len` 小于以太网头长度时按头长度处理；序号只在空间足够时写入。
pub fn synthetic_frame(interface: &str, sequence: u64, frame_len: usize) -> Bytes {
    let frame_len = frame_len.max(ETH_HEADER_LEN);
    let mut buf = BytesMut::with_capacity(frame_len);

    buf.put_slice(&BROADCAST_MAC);
    buf.put_slice(&source_mac(interface));
    buf.put_u16(ETHERTYPE_FEED);

    let body = frame_len - ETH_HEADER_LEN;
    if body >= 8 {
        buf.put_u64(sequence);
        buf.put_bytes((sequence & 0xff) as u8, body - 8);
    } else {
        buf.put_bytes(0, body);
    }

    buf.freeze()
}

/// 本地管理地址 (02:xx:..)，低 5 字节取自接口名的 FNV-1a 散列
fn source_mac(interface: &str) -> [u8; 6] {
    let hash = interface
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        })
        .to_be_bytes();

    [0x02, hash[3], hash[4], hash[5], hash[6], hash[7]]
}
