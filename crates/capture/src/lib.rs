//! # Capture
//!
//! Producer side of the feed.
//!
//! Responsibilities:
//! - Generate synthetic Ethernet frames for one interface
//! - Timestamp and sequence every frame
//! - Hand each frame to `Distributor::send` and tally the outcome
//!
//! ## Usage Example
//!
//! ```ignore
//! use capture::MockCaptureSource;
//!
//! let source = MockCaptureSource::new(MockCaptureConfig::new("eth0", 100.0, 64));
//! let task = source.start(Arc::clone(&distributor), Some(1_000));
//! let sent = task.await?;
//! ```

mod frame;
mod metrics;
mod mock;

// Re-exports
pub use frame::{synthetic_frame, ETHERTYPE_FEED, ETH_HEADER_LEN};
pub use metrics::{CaptureMetrics, CaptureSnapshot};
pub use mock::{MockCaptureConfig, MockCaptureSource};
