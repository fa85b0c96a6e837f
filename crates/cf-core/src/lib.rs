// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types, numeric utilities and the online scorer contract.

pub mod detectors;
pub mod error;
pub mod numeric;
pub mod sample;

pub use detectors::OnlineScorer;
pub use error::CfError;
pub use numeric::{
    LOG_2PI, LevinsonSummary, VAR_FLOOR, YuleWalkerFit, gaussian_neg_log_likelihood,
    levinson_durbin, levinson_durbin_into, normalize_variance,
};
pub use sample::{Sample, ScoredSample, Watermark};
