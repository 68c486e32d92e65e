//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the feed:
//! packets, envelopes, delivery policies, the configuration blueprint
//! and the consumer-side handler trait.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Ownership Model
//! - A captured `Packet` is wrapped in an `Arc` once per broadcast; every
//!   subscriber's `Envelope` shares it, payload bytes are never copied
//! - The source interface travels as data; nothing here filters on it

mod blueprint;
mod envelope;
mod error;
mod handler;
mod interface_id;
mod packet;
mod policy;
mod report;

pub use blueprint::*;
pub use envelope::Envelope;
pub use error::*;
pub use handler::*;
pub use interface_id::InterfaceId;
pub use packet::*;
pub use policy::DeliveryPolicy;
pub use report::DeliveryReport;
