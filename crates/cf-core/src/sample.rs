// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CfError;

/// One observation of a scalar metric.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Unix epoch seconds.
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub const fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A sample paired with the score produced for it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredSample {
    pub timestamp: i64,
    pub value: f64,
    pub score: f64,
}

impl ScoredSample {
    pub const fn new(sample: Sample, score: f64) -> Self {
        Self {
            timestamp: sample.timestamp,
            value: sample.value,
            score,
        }
    }
}

/// Highest timestamp admitted so far; later samples must strictly exceed it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Watermark {
    latest: Option<i64>,
}

impl Watermark {
    pub const fn new() -> Self {
        Self { latest: None }
    }

    pub const fn latest(&self) -> Option<i64> {
        self.latest
    }

    /// Fails with `InvalidInput` unless `timestamp` is strictly after the watermark.
    pub fn check(&self, timestamp: i64) -> Result<(), CfError> {
        match self.latest {
            Some(latest) if timestamp <= latest => Err(CfError::invalid_input(format!(
                "samples must be strictly ordered by timestamp: t={timestamp} is not after watermark={latest}"
            ))),
            _ => Ok(()),
        }
    }

    pub fn advance(&mut self, timestamp: i64) {
        self.latest = Some(self.latest.map_or(timestamp, |w| w.max(timestamp)));
    }

    pub fn reset(&mut self) {
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{Sample, ScoredSample, Watermark};

    #[test]
    fn fresh_watermark_admits_any_timestamp() {
        let watermark = Watermark::new();
        assert_eq!(watermark.latest(), None);
        watermark.check(i64::MIN).expect("empty watermark admits anything");
        watermark.check(0).expect("empty watermark admits anything");
    }

    #[test]
    fn watermark_rejects_equal_and_earlier_timestamps() {
        let mut watermark = Watermark::new();
        watermark.advance(1_700_000_000);
        watermark.check(1_700_000_060).expect("later timestamp is admitted");

        let err = watermark
            .check(1_700_000_000)
            .expect_err("duplicate timestamp must fail");
        assert!(err.to_string().contains("strictly ordered"));

        let err = watermark
            .check(1_699_999_940)
            .expect_err("earlier timestamp must fail");
        assert!(err.to_string().contains("watermark=1700000000"));
    }

    #[test]
    fn advance_never_moves_backwards_and_reset_clears() {
        let mut watermark = Watermark::new();
        watermark.advance(10);
        watermark.advance(5);
        assert_eq!(watermark.latest(), Some(10));
        watermark.reset();
        assert_eq!(watermark.latest(), None);
    }

    #[test]
    fn scored_sample_carries_sample_fields() {
        let scored = ScoredSample::new(Sample::new(42, 1.5), 0.25);
        assert_eq!(scored.timestamp, 42);
        assert_eq!(scored.value, 1.5);
        assert_eq!(scored.score, 0.25);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn scored_sample_serializes_flat() {
        let scored = ScoredSample::new(Sample::new(60, 2.0), 0.5);
        let encoded = serde_json::to_value(scored).expect("serialize scored sample");
        assert_eq!(
            encoded,
            serde_json::json!({"timestamp": 60, "value": 2.0, "score": 0.5})
        );
    }
}
