// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Online SDAR models and the two-stage ChangeFinder scorer.

pub mod changefinder;
pub mod sdar;
pub mod smoothing;

pub use changefinder::{
    ChangeFinder, ChangeFinderConfig, ChangeFinderState, ChangeFinderStep,
    DEFAULT_REPEAT_SCORE_CEILING, RepeatGuard, RepeatMatch,
};
pub use sdar::{SdarConfig, SdarModel, SdarState, SdarStep};
pub use smoothing::SmoothingBuffer;
