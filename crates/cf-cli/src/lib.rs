// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Boundary helpers for feeding metric series into the scorer and forwarding
//! recent scores as alert data points.

pub mod alert;
pub mod error;
pub mod interval;
pub mod series;
pub mod window;

pub use alert::{AlertSink, DataPoint, JsonLinesSink, LogSink};
pub use error::CliError;
pub use interval::{LookbackWindow, SamplingInterval, lookback_start};
pub use series::{
    LoadedSeries, SeriesRecord, load_series, parse_series_csv, parse_series_records, score_series,
};
pub use window::TrailingWindow;
