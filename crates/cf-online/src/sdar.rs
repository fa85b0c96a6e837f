// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cf_core::{CfError, VAR_FLOOR, gaussian_neg_log_likelihood, levinson_durbin_into};
use std::collections::VecDeque;

/// SDAR model configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SdarConfig {
    /// Number of autoregressive lags.
    pub order: usize,
    /// Per-update forgetting factor in `(0, 1)`.
    pub discount: f64,
}

impl Default for SdarConfig {
    fn default() -> Self {
        Self {
            order: 5,
            discount: 0.02,
        }
    }
}

impl SdarConfig {
    pub fn validate(&self) -> Result<(), CfError> {
        if self.order == 0 {
            return Err(CfError::invalid_parameter(format!(
                "SDAR order must be >= 1; got {}",
                self.order
            )));
        }
        if !(self.discount.is_finite() && 0.0 < self.discount && self.discount < 1.0) {
            return Err(CfError::invalid_parameter(format!(
                "SDAR discount must be finite and in (0,1); got {}",
                self.discount
            )));
        }
        Ok(())
    }
}

/// Running SDAR statistics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SdarState {
    pub mean: f64,
    pub variance: f64,
    /// `C[0..=k]`.
    pub autocov: Vec<f64>,
    /// `a[1..=k]`, stored at indices `0..k`.
    pub coefficients: Vec<f64>,
    /// Raw values, most recent first; at most `k` entries.
    pub history: VecDeque<f64>,
}

impl SdarState {
    fn new(order: usize) -> Self {
        Self {
            mean: 0.0,
            variance: 1.0,
            autocov: vec![0.0; order + 1],
            coefficients: vec![0.0; order],
            history: VecDeque::with_capacity(order),
        }
    }

    pub(crate) fn validate(&self, order: usize) -> Result<(), CfError> {
        if self.autocov.len() != order + 1 || self.coefficients.len() != order {
            return Err(CfError::invalid_input(format!(
                "SDAR state shape mismatch for order {order}: autocov={}, coefficients={}",
                self.autocov.len(),
                self.coefficients.len()
            )));
        }
        if self.history.len() > order {
            return Err(CfError::invalid_input(format!(
                "SDAR state history holds {} values; order is {order}",
                self.history.len()
            )));
        }
        if !self.mean.is_finite() || !self.variance.is_finite() || self.variance <= 0.0 {
            return Err(CfError::invalid_input(format!(
                "SDAR state requires finite mean and positive finite variance; got mean={}, variance={}",
                self.mean, self.variance
            )));
        }
        Ok(())
    }
}

/// Everything one SDAR update computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SdarStep {
    /// Negative log-likelihood of the observation.
    pub score: f64,
    /// One-step prediction `x̂`.
    pub prediction: f64,
    /// Running mean after folding in the observation.
    pub mean: f64,
    /// Running residual variance after folding in the observation.
    pub variance: f64,
    /// AR order the Levinson–Durbin solve actually fitted.
    pub fitted_order: usize,
}

#[derive(Clone, Debug)]
struct Scratch {
    autocov: Vec<f64>,
    coefficients: Vec<f64>,
    levinson: Vec<f64>,
}

impl Scratch {
    fn new(order: usize) -> Self {
        Self {
            autocov: vec![0.0; order + 1],
            coefficients: vec![0.0; order],
            levinson: vec![0.0; order],
        }
    }
}

/// Sequentially discounted autoregressive density estimator.
///
/// Each update folds the observation into exponentially discounted mean and
/// autocovariance estimates, refits the AR coefficients with Levinson–Durbin,
/// and scores the observation by its negative log-likelihood under the
/// Gaussian one-step predictive density.
#[derive(Clone, Debug)]
pub struct SdarModel {
    config: SdarConfig,
    state: SdarState,
    scratch: Scratch,
}

impl SdarModel {
    pub fn new(config: SdarConfig) -> Result<Self, CfError> {
        config.validate()?;
        Ok(Self {
            config,
            state: SdarState::new(config.order),
            scratch: Scratch::new(config.order),
        })
    }

    pub fn with_params(order: usize, discount: f64) -> Result<Self, CfError> {
        Self::new(SdarConfig { order, discount })
    }

    pub fn config(&self) -> &SdarConfig {
        &self.config
    }

    pub fn order(&self) -> usize {
        self.config.order
    }

    pub fn discount(&self) -> f64 {
        self.config.discount
    }

    pub fn state(&self) -> &SdarState {
        &self.state
    }

    pub fn mean(&self) -> f64 {
        self.state.mean
    }

    pub fn variance(&self) -> f64 {
        self.state.variance
    }

    pub fn autocovariance(&self) -> &[f64] {
        &self.state.autocov
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.state.coefficients
    }

    /// Most recent value first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.state.history.iter().copied()
    }

    pub fn reset(&mut self) {
        self.state = SdarState::new(self.config.order);
    }

    pub fn load_state(&mut self, state: &SdarState) {
        self.state = state.clone();
    }

    /// Scores `x` and folds it into the model.
    pub fn update(&mut self, x: f64) -> Result<f64, CfError> {
        self.update_detailed(x).map(|step| step.score)
    }

    pub fn update_detailed(&mut self, x: f64) -> Result<SdarStep, CfError> {
        let step = self.stage(x)?;
        self.commit(x, &step);
        Ok(step)
    }

    /// Computes the update for `x` into scratch buffers without touching the state.
    pub(crate) fn stage(&mut self, x: f64) -> Result<SdarStep, CfError> {
        if !x.is_finite() {
            return Err(CfError::invalid_input(format!(
                "SDAR observation must be finite; got {x}"
            )));
        }
        let order = self.config.order;
        self.state.validate(order)?;

        let r = self.config.discount;
        let keep = 1.0 - r;
        let mean = keep * self.state.mean + r * x;
        let centered = x - mean;

        let autocov = &mut self.scratch.autocov;
        autocov[0] = keep * self.state.autocov[0] + r * centered * centered;
        for lag in 1..=order {
            let lagged = self
                .state
                .history
                .get(lag - 1)
                .map_or(0.0, |past| past - mean);
            autocov[lag] = keep * self.state.autocov[lag] + r * centered * lagged;
        }

        let summary = levinson_durbin_into(
            autocov,
            &mut self.scratch.coefficients,
            &mut self.scratch.levinson,
        );

        let prediction = mean
            + self
                .scratch
                .coefficients
                .iter()
                .zip(self.state.history.iter())
                .map(|(a, past)| a * (past - mean))
                .sum::<f64>();
        let residual = x - prediction;
        let variance = (keep * self.state.variance + r * residual * residual).max(VAR_FLOOR);
        let score = gaussian_neg_log_likelihood(x, prediction, variance);

        let finite = mean.is_finite()
            && prediction.is_finite()
            && variance.is_finite()
            && score.is_finite()
            && self.scratch.autocov.iter().all(|c| c.is_finite());
        if !finite {
            return Err(CfError::numerical_issue(format!(
                "SDAR update overflowed for x={x} (mean={mean}, prediction={prediction}, variance={variance})"
            )));
        }

        Ok(SdarStep {
            score,
            prediction,
            mean,
            variance,
            fitted_order: summary.fitted_order,
        })
    }

    /// Applies the most recent [`SdarModel::stage`] result.
    pub(crate) fn commit(&mut self, x: f64, step: &SdarStep) {
        self.state.mean = step.mean;
        self.state.variance = step.variance;
        std::mem::swap(&mut self.state.autocov, &mut self.scratch.autocov);
        std::mem::swap(&mut self.state.coefficients, &mut self.scratch.coefficients);
        self.state.history.push_front(x);
        self.state.history.truncate(self.config.order);
    }
}
