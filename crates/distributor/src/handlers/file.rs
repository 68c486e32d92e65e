//! FileHandler - appends one JSON line per forwarded packet

use contracts::{ContractError, Envelope, InterfaceId, PacketHandler};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileHandler
#[derive(Debug, Clone)]
pub struct FileHandlerConfig {
    /// Output file (JSON Lines)
    pub path: PathBuf,
}

impl FileHandlerConfig {
    /// Create config from params map, defaulting to `./<interface>.jsonl`
    pub fn from_params(interface: &InterfaceId, params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("./{interface}.jsonl")));

        Self { path }
    }
}

/// One line of the capture log
#[derive(Debug, Serialize)]
struct PacketRecord<'a> {
    out: &'a str,
    source: &'a str,
    sequence: u64,
    timestamp_us: u64,
    captured_len: u32,
    original_len: u32,
}

/// Handler that records forwarded packets to a JSON Lines file
pub struct FileHandler {
    name: String,
    interface: InterfaceId,
    config: FileHandlerConfig,
    writer: Option<BufWriter<File>>,
}

impl FileHandler {
    /// Create a new FileHandler, creating parent directories as needed
    pub fn new(
        name: impl Into<String>,
        interface: impl Into<InterfaceId>,
        config: FileHandlerConfig,
    ) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            interface: interface.into(),
            config,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        interface: InterfaceId,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileHandlerConfig::from_params(&interface, params);
        Self::new(name, interface, config)
    }

    /// Output path
    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    fn write_record(&mut self, envelope: &Envelope) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file handler already closed"))?;

        let meta = &envelope.packet().meta;
        let record = PacketRecord {
            out: &self.interface,
            source: envelope.source(),
            sequence: meta.sequence,
            timestamp_us: meta.timestamp_us,
            captured_len: meta.captured_len,
            original_len: meta.original_len,
        };

        serde_json::to_writer(&mut *writer, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")
    }

    fn persist(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        self.write_record(envelope).map_err(|e| {
            error!(
                handler = %self.name,
                sequence = envelope.packet().meta.sequence,
                error = %e,
                "Write failed"
            );
            ContractError::handler_write(&self.name, e.to_string())
        })
    }
}

impl PacketHandler for FileHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn interface(&self) -> &InterfaceId {
        &self.interface
    }

    #[instrument(
        name = "file_handler_handle",
        skip(self, envelope),
        fields(handler = %self.name, sequence = envelope.packet().meta.sequence)
    )]
    async fn handle(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        self.persist(envelope)
    }

    #[instrument(name = "file_handler_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    #[instrument(name = "file_handler_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        debug!(handler = %self.name, path = %self.config.path.display(), "FileHandler closed");
        Ok(())
    }
}
