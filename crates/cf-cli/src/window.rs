// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cf_core::ScoredSample;

/// Selects the scored samples recent enough to be forwarded as alerts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrailingWindow {
    pub width_secs: i64,
}

impl TrailingWindow {
    pub const fn new(width_secs: i64) -> Self {
        Self { width_secs }
    }

    /// Keeps samples with `timestamp > reference - width_secs`.
    ///
    /// `reference` defaults to the latest timestamp in `scored`.
    pub fn select(&self, scored: &[ScoredSample], reference: Option<i64>) -> Vec<ScoredSample> {
        let Some(reference) =
            reference.or_else(|| scored.iter().map(|sample| sample.timestamp).max())
        else {
            return Vec::new();
        };
        let cutoff = reference.saturating_sub(self.width_secs);
        scored
            .iter()
            .filter(|sample| sample.timestamp > cutoff)
            .copied()
            .collect()
    }
}
