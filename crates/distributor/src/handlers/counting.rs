//! CountingHandler - counts what it was handed, for tests and soak runs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, Envelope, InterfaceId, PacketHandler};

/// One handled packet as seen by a counting handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub source: InterfaceId,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy)]
struct SourceTally {
    count: u64,
    last_sequence: u64,
}

/// Per-source counters, plus the full log when recording is on.
///
/// Without the log the size is bounded by the number of distinct sources.
#[derive(Debug, Default)]
struct Tally {
    total: u64,
    sources: HashMap<InterfaceId, SourceTally>,
    log: Option<Vec<Received>>,
}

type Shared = Arc<Mutex<Tally>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Tally> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handler that counts handled packets per source interface
pub struct CountingHandler {
    name: String,
    interface: InterfaceId,
    tally: Shared,
    closed: bool,
}

/// Read side of a [`CountingHandler`], usable after the handler moved into its worker
#[derive(Debug, Clone)]
pub struct CountingProbe {
    tally: Shared,
}

impl CountingHandler {
    /// Handler that also records `(source, sequence)` of every packet
    pub fn new(name: impl Into<String>, interface: impl Into<InterfaceId>) -> (Self, CountingProbe) {
        Self::build(name.into(), interface.into(), true)
    }

    /// Create from params (for factory). Keeps only per-source counters
    /// unless `record = "true"`.
    pub fn from_params(
        name: impl Into<String>,
        interface: InterfaceId,
        params: &HashMap<String, String>,
    ) -> (Self, CountingProbe) {
        let record = params
            .get("record")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        Self::build(name.into(), interface, record)
    }

    fn build(name: String, interface: InterfaceId, record: bool) -> (Self, CountingProbe) {
        let tally: Shared = Arc::new(Mutex::new(Tally {
            log: record.then(Vec::new),
            ..Tally::default()
        }));
        let handler = Self {
            name,
            interface,
            tally: Arc::clone(&tally),
            closed: false,
        };
        (handler, CountingProbe { tally })
    }
}

impl CountingProbe {
    /// Packets handled so far
    pub fn count(&self) -> usize {
        lock(&self.tally).total as usize
    }

    /// Packets handled from one source
    pub fn count_from(&self, source: &str) -> u64 {
        lock(&self.tally).sources.get(source).map_or(0, |t| t.count)
    }

    /// Sequence number of the latest packet handled from one source
    pub fn last_sequence_from(&self, source: &str) -> Option<u64> {
        lock(&self.tally).sources.get(source).map(|t| t.last_sequence)
    }

    /// Entries held in the log, zero for a counters-only handler
    pub fn retained(&self) -> usize {
        lock(&self.tally).log.as_ref().map_or(0, Vec::len)
    }

    /// Everything handled so far, in handling order. Empty unless recording.
    pub fn received(&self) -> Vec<Received> {
        lock(&self.tally).log.clone().unwrap_or_default()
    }

    /// Sequence numbers handled from one source, in handling order. Empty unless recording.
    pub fn sequences_from(&self, source: &str) -> Vec<u64> {
        lock(&self.tally)
            .log
            .iter()
            .flatten()
            .filter(|r| r.source == source)
            .map(|r| r.sequence)
            .collect()
    }
}

impl PacketHandler for CountingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn interface(&self) -> &InterfaceId {
        &self.interface
    }

    async fn handle(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        if self.closed {
            return Err(ContractError::handler_write(&self.name, "handler closed"));
        }
        let source = envelope.source();
        let sequence = envelope.packet().meta.sequence;

        let mut guard = lock(&self.tally);
        let tally = &mut *guard;
        tally.total += 1;
        tally
            .sources
            .entry(source.clone())
            .and_modify(|t| {
                t.count += 1;
                t.last_sequence = sequence;
            })
            .or_insert(SourceTally {
                count: 1,
                last_sequence: sequence,
            });
        if let Some(log) = tally.log.as_mut() {
            log.push(Received {
                source: source.clone(),
                sequence,
            });
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.closed = true;
        Ok(())
    }
}
