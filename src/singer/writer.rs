//! Message writer
//!
//! Serializes messages as JSON lines. Production output goes to stdout;
//! tests write into any `Write` buffer.

use crate::error::{Error, Result};
use crate::singer::Message;
use std::io::Write;

/// JSON-lines message writer
pub struct MessageWriter<W: Write> {
    out: W,
    messages_written: usize,
    records_written: usize,
}

impl<W: Write> MessageWriter<W> {
    /// Create a writer over the given sink
    pub fn new(out: W) -> Self {
        Self {
            out,
            messages_written: 0,
            records_written: 0,
        }
    }

    /// Write one message as a JSON line.
    ///
    /// Flushes after every message so downstream loaders see records as
    /// they are produced.
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        let line = serde_json::to_string(message)?;
        writeln!(self.out, "{line}").map_err(write_error)?;
        self.out.flush().map_err(write_error)?;
        self.messages_written += 1;
        if message.is_record() {
            self.records_written += 1;
        }
        Ok(())
    }

    /// Write a standalone document (the catalog or about output)
    /// pretty-printed.
    pub fn write_document(&mut self, value: &serde_json::Value) -> Result<()> {
        let text = serde_json::to_string_pretty(value)?;
        writeln!(self.out, "{text}").map_err(write_error)?;
        self.out.flush().map_err(write_error)?;
        Ok(())
    }

    /// Write raw text followed by a newline.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}").map_err(write_error)?;
        self.out.flush().map_err(write_error)?;
        Ok(())
    }

    /// Total messages written so far
    pub fn messages_written(&self) -> usize {
        self.messages_written
    }

    /// Record messages written so far
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Consume the writer, returning the underlying sink
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn write_error(e: std::io::Error) -> Error {
    Error::output(format!("Failed to write message: {e}"))
}
