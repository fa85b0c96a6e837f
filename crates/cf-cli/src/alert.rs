// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CliError;
use cf_core::ScoredSample;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One score destined for a monitoring trapper item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub hostname: String,
    pub key: String,
    /// Score rendered with ten decimals.
    pub value: String,
    pub timestamp: i64,
}

impl DataPoint {
    pub fn from_scored(hostname: &str, item_key: &str, prefix: &str, sample: &ScoredSample) -> Self {
        Self {
            hostname: hostname.to_string(),
            key: format!("{prefix}.{item_key}"),
            value: format!("{:.10}", sample.score),
            timestamp: sample.timestamp,
        }
    }
}

/// Destination for selected data points.
pub trait AlertSink {
    /// Delivers `points`, returning how many were accepted.
    fn send(&mut self, points: &[DataPoint]) -> Result<usize, CliError>;
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> AlertSink for JsonLinesSink<W> {
    fn send(&mut self, points: &[DataPoint]) -> Result<usize, CliError> {
        for point in points {
            serde_json::to_writer(&mut self.writer, point)
                .map_err(|source| CliError::json("failed to encode data point", source))?;
            self.writer
                .write_all(b"\n")
                .map_err(|source| CliError::io("failed to write data point", source))?;
        }
        self.writer
            .flush()
            .map_err(|source| CliError::io("failed to flush data points", source))?;
        Ok(points.len())
    }
}

/// Reports data points through `tracing` only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn send(&mut self, points: &[DataPoint]) -> Result<usize, CliError> {
        if points.is_empty() {
            tracing::info!("no data points to send");
            return Ok(0);
        }
        for point in points {
            tracing::info!(
                host = %point.hostname,
                key = %point.key,
                value = %point.value,
                timestamp = point.timestamp,
                "data point selected"
            );
        }
        Ok(points.len())
    }
}
