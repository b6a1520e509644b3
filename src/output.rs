//! Record lines printed by the consumer loop and the producer burst.

use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AppResult;
use crate::record::Record;

/// How record lines are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<OutputFormat, String> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum RecordEvent<'a> {
    Consumed {
        topic: &'a str,
        partition: i32,
        offset: i64,
        key: &'a str,
        value: &'a str,
    },
    Sent {
        topic: &'a str,
        partition: i32,
        offset: i64,
        key: &'a str,
        value: &'a str,
    },
    SendFailed {
        topic: &'a str,
        error: &'a str,
    },
}

/// Writes record lines to `W`, one line per event.
pub struct RecordPrinter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> RecordPrinter<W> {
    pub fn new(out: W, format: OutputFormat) -> RecordPrinter<W> {
        RecordPrinter { out, format }
    }

    /// Prints a record delivered by a poll.
    pub fn consumed(&mut self, record: &Record) -> AppResult<()> {
        let key = record.key_lossy();
        let value = record.value_lossy();
        match self.format {
            OutputFormat::Text => writeln!(
                self.out,
                "Message consumed: topic: {} ({}|{}), key: {}, Value: {}",
                record.topic, record.partition, record.offset, key, value
            )?,
            OutputFormat::Json => self.json(&RecordEvent::Consumed {
                topic: &record.topic,
                partition: record.partition,
                offset: record.offset,
                key: &key,
                value: &value,
            })?,
        }
        Ok(())
    }

    /// Prints a record acknowledged by the broker.
    pub fn sent(&mut self, record: &Record) -> AppResult<()> {
        let key = record.key_lossy();
        let value = record.value_lossy();
        match self.format {
            OutputFormat::Text => writeln!(
                self.out,
                "Message sent: topic: {}, offset: {}, value: {}",
                record.topic, record.offset, value
            )?,
            OutputFormat::Json => self.json(&RecordEvent::Sent {
                topic: &record.topic,
                partition: record.partition,
                offset: record.offset,
                key: &key,
                value: &value,
            })?,
        }
        Ok(())
    }

    /// Prints a send that the broker did not acknowledge.
    pub fn send_failed(&mut self, topic: &str, error: &dyn std::fmt::Display) -> AppResult<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.out, "Error sending synchronous message: {}", error)?
            }
            OutputFormat::Json => self.json(&RecordEvent::SendFailed {
                topic,
                error: &error.to_string(),
            })?,
        }
        Ok(())
    }

    fn json(&mut self, event: &RecordEvent) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
