// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CliError;

/// A sampling interval in seconds, parsed from monitoring-style suffixed text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SamplingInterval {
    secs: i64,
}

impl SamplingInterval {
    pub fn from_secs(secs: i64) -> Result<Self, CliError> {
        if secs <= 0 {
            return Err(CliError::invalid_input(format!(
                "sampling interval must be > 0 seconds; got {secs}"
            )));
        }
        Ok(Self { secs })
    }

    /// Parses `"300"`, `"30s"`, `"5m"`, `"1h"`, `"1d"` or `"1w"`.
    pub fn parse(raw: &str) -> Result<Self, CliError> {
        let trimmed = raw.trim();
        let (count, multiplier) = match trimmed.char_indices().last() {
            None => {
                return Err(CliError::invalid_input("sampling interval is empty"));
            }
            Some((idx, unit)) if unit.is_ascii_alphabetic() => {
                let multiplier = match unit {
                    's' => 1,
                    'm' => 60,
                    'h' => 60 * 60,
                    'd' => 60 * 60 * 24,
                    'w' => 60 * 60 * 24 * 7,
                    other => {
                        return Err(CliError::invalid_input(format!(
                            "invalid sampling interval '{raw}': unknown unit suffix '{other}'; expected one of: s, m, h, d, w"
                        )));
                    }
                };
                (&trimmed[..idx], multiplier)
            }
            Some(_) => (trimmed, 1),
        };

        let count = count.parse::<i64>().map_err(|_| {
            CliError::invalid_input(format!(
                "invalid sampling interval '{raw}': expected a positive integer with an optional unit suffix"
            ))
        })?;
        let secs = count.checked_mul(multiplier).ok_or_else(|| {
            CliError::invalid_input(format!("sampling interval '{raw}' overflows i64 seconds"))
        })?;
        Self::from_secs(secs)
    }

    pub const fn as_secs(self) -> i64 {
        self.secs
    }
}

impl std::fmt::Display for SamplingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.secs)
    }
}

/// Earliest timestamp covered by `num` intervals ending at `now`.
pub fn lookback_start(now: i64, interval: SamplingInterval, num: u32) -> Result<i64, CliError> {
    interval
        .as_secs()
        .checked_mul(i64::from(num))
        .and_then(|span| now.checked_sub(span))
        .ok_or_else(|| {
            CliError::invalid_input(format!(
                "lookback of {num} x {interval} from t={now} overflows i64 seconds"
            ))
        })
}

/// Closed range `[start, end]` of timestamps fetched for scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookbackWindow {
    pub start: i64,
    pub end: i64,
}

impl LookbackWindow {
    pub fn ending_at(now: i64, interval: SamplingInterval, num: u32) -> Result<Self, CliError> {
        Ok(Self {
            start: lookback_start(now, interval, num)?,
            end: now,
        })
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}
