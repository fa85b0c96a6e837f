// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{CfError, Sample, ScoredSample};

/// Online scorer contract: one score per observation, fed strictly in order.
pub trait OnlineScorer {
    type State: Clone + std::fmt::Debug;

    fn reset(&mut self);

    /// Scores one raw value.
    fn update(&mut self, x: f64) -> Result<f64, CfError>;

    /// Scores one timestamped sample, rejecting timestamps that do not advance.
    fn update_sample(&mut self, sample: Sample) -> Result<ScoredSample, CfError>;

    fn save_state(&self) -> Self::State;
    fn load_state(&mut self, state: &Self::State);

    /// Scores an ordered batch on top of `update_sample`.
    ///
    /// Stops at the first failing sample; samples scored before it stay applied.
    fn score_samples(&mut self, samples: &[Sample]) -> Result<Vec<ScoredSample>, CfError> {
        let mut out = Vec::with_capacity(samples.len());
        for sample in samples {
            out.push(self.update_sample(*sample)?);
        }
        Ok(out)
    }
}
