//! Output message types
//!
//! The downstream protocol is consumed through a narrow sink interface: one
//! RECORD message per item, one STATE message per batch, serialized as JSON
//! lines.

use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

/// A message emitted to the downstream loader
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "RECORD")]
    Record { stream: String, record: Value },
    #[serde(rename = "STATE")]
    State { value: Value },
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, record: Value) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
        }
    }

    /// Create a state message
    pub fn state(value: Value) -> Self {
        Self::State { value }
    }
}

/// Sink for output messages
pub trait MessageWriter {
    fn write(&mut self, message: Message) -> Result<()>;
}

/// Writes one JSON object per line to any `io::Write`
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> MessageWriter for JsonLinesWriter<W> {
    fn write(&mut self, message: Message) -> Result<()> {
        let line = serde_json::to_string(&message)?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

/// Collects messages in memory; used by tests and embedders
#[derive(Debug, Default)]
pub struct VecWriter {
    pub messages: Vec<Message>,
}

impl MessageWriter for VecWriter {
    fn write(&mut self, message: Message) -> Result<()> {
        self.messages.push(message);
        Ok(())
    }
}
