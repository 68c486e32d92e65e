//! Handler implementations
//!
//! Contains LogHandler, FileHandler, NetworkHandler, and CountingHandler.

mod counting;
mod file;
mod log;
mod network;

pub use self::counting::{CountingHandler, CountingProbe, Received};
pub use self::file::{FileHandler, FileHandlerConfig};
pub use self::log::LogHandler;
pub use self::network::{NetworkHandler, NetworkHandlerConfig};
