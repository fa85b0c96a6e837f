// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cf_core::CfError;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of first-stage scores with an arithmetic mean.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothingBuffer {
    capacity: usize,
    scores: VecDeque<f64>,
}

impl SmoothingBuffer {
    pub fn new(capacity: usize) -> Result<Self, CfError> {
        if capacity == 0 {
            return Err(CfError::invalid_parameter(
                "smoothing window must be >= 1; got 0",
            ));
        }
        Ok(Self {
            capacity,
            scores: VecDeque::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.scores.iter().copied()
    }

    /// Appends `score`, returning the evicted oldest entry once full.
    pub fn push(&mut self, score: f64) -> Option<f64> {
        let evicted = if self.scores.len() == self.capacity {
            self.scores.pop_front()
        } else {
            None
        };
        self.scores.push_back(score);
        evicted
    }

    /// Mean of the retained scores; `None` while empty.
    pub fn mean(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        Some(self.scores.iter().sum::<f64>() / self.scores.len() as f64)
    }

    /// Checks a loaded buffer against the configured window.
    pub(crate) fn validate(&self, expected_capacity: usize) -> Result<(), CfError> {
        if self.capacity == 0 || self.capacity != expected_capacity {
            return Err(CfError::invalid_input(format!(
                "smoothing buffer capacity {} does not match smooth_window {expected_capacity}",
                self.capacity
            )));
        }
        if self.scores.len() > self.capacity {
            return Err(CfError::invalid_input(format!(
                "smoothing buffer holds {} scores; capacity is {}",
                self.scores.len(),
                self.capacity
            )));
        }
        if let Some(score) = self.scores.iter().find(|score| !score.is_finite()) {
            return Err(CfError::invalid_input(format!(
                "smoothing buffer holds a non-finite score: {score}"
            )));
        }
        Ok(())
    }

    /// The value [`SmoothingBuffer::mean`] would return after `push(score)`.
    pub fn mean_after_push(&self, score: f64) -> f64 {
        let skip = (self.scores.len() + 1).saturating_sub(self.capacity);
        let retained = (self.scores.len() + 1 - skip).max(1);
        let sum = self.scores.iter().skip(skip).sum::<f64>() + score;
        sum / retained as f64
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }
}
