// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::sdar::{SdarConfig, SdarModel, SdarState};
use crate::smoothing::SmoothingBuffer;
use cf_core::{CfError, OnlineScorer, Sample, ScoredSample, Watermark};

/// Scores below this are eligible for the repeat shortcut.
pub const DEFAULT_REPEAT_SCORE_CEILING: f64 = 3.0;

/// How an incoming value is compared with the previous one.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RepeatMatch {
    /// IEEE `==` on the raw values.
    Exact,
    /// `|x - last| <= tolerance`.
    Within(f64),
}

impl RepeatMatch {
    fn matches(self, x: f64, last: f64) -> bool {
        match self {
            Self::Exact => x == last,
            Self::Within(tolerance) => (x - last).abs() <= tolerance,
        }
    }
}

/// Short-circuits repeated values while the last score is low.
///
/// When the incoming value matches the previous one and the previous score is
/// below `score_ceiling`, the previous score is returned and no model state is
/// touched.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepeatGuard {
    pub score_ceiling: f64,
    pub matching: RepeatMatch,
}

impl Default for RepeatGuard {
    fn default() -> Self {
        Self {
            score_ceiling: DEFAULT_REPEAT_SCORE_CEILING,
            matching: RepeatMatch::Exact,
        }
    }
}

impl RepeatGuard {
    pub fn within(tolerance: f64) -> Self {
        Self {
            matching: RepeatMatch::Within(tolerance),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), CfError> {
        if !self.score_ceiling.is_finite() || self.score_ceiling < 0.0 {
            return Err(CfError::invalid_parameter(format!(
                "repeat guard score_ceiling must be finite and >= 0; got {}",
                self.score_ceiling
            )));
        }
        if let RepeatMatch::Within(tolerance) = self.matching {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(CfError::invalid_parameter(format!(
                    "repeat guard tolerance must be finite and >= 0; got {tolerance}"
                )));
            }
        }
        Ok(())
    }

    fn holds(&self, x: f64, last_value: Option<f64>, last_score: f64) -> bool {
        last_value.is_some_and(|last| self.matching.matches(x, last))
            && last_score < self.score_ceiling
    }
}

/// Two-stage change scorer configuration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeFinderConfig {
    pub outlier_order: usize,
    pub outlier_discount: f64,
    pub change_order: usize,
    pub change_discount: f64,
    pub smooth_window: usize,
    /// `None` disables the repeat shortcut.
    pub repeat_guard: Option<RepeatGuard>,
}

impl Default for ChangeFinderConfig {
    fn default() -> Self {
        Self {
            outlier_order: 5,
            outlier_discount: 0.02,
            change_order: 5,
            change_discount: 0.02,
            smooth_window: 5,
            repeat_guard: Some(RepeatGuard::default()),
        }
    }
}

impl ChangeFinderConfig {
    pub fn outlier(&self) -> SdarConfig {
        SdarConfig {
            order: self.outlier_order,
            discount: self.outlier_discount,
        }
    }

    pub fn change(&self) -> SdarConfig {
        SdarConfig {
            order: self.change_order,
            discount: self.change_discount,
        }
    }

    pub fn validate(&self) -> Result<(), CfError> {
        self.outlier()
            .validate()
            .map_err(|err| prefix_parameter_error("outlier stage", err))?;
        self.change()
            .validate()
            .map_err(|err| prefix_parameter_error("change stage", err))?;
        if self.smooth_window == 0 {
            return Err(CfError::invalid_parameter(
                "smooth_window must be >= 1; got 0",
            ));
        }
        if let Some(guard) = &self.repeat_guard {
            guard.validate()?;
        }
        Ok(())
    }
}

fn prefix_parameter_error(stage: &str, err: CfError) -> CfError {
    match err {
        CfError::InvalidParameter(message) => {
            CfError::invalid_parameter(format!("{stage}: {message}"))
        }
        other => other,
    }
}

/// Snapshot of every piece of mutable scorer state.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeFinderState {
    pub outlier: SdarState,
    pub change: SdarState,
    pub smoothing: SmoothingBuffer,
    /// `None` until the first full update.
    pub last_value: Option<f64>,
    pub last_score: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub watermark: Watermark,
}

/// Breakdown of one scored observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChangeFinderStep {
    /// Final change score.
    pub score: f64,
    /// First-stage score; `None` when the repeat guard answered.
    pub outlier_score: Option<f64>,
    /// Smoothed input fed to the second stage; `None` when the repeat guard answered.
    pub smoothed: Option<f64>,
    pub guarded: bool,
}

/// Two-stage online change scorer.
///
/// Stage one scores raw values with an SDAR model, a moving average over the
/// last `smooth_window` stage-one scores is fed to a second SDAR model, and the
/// second model's score is the change score.
#[derive(Clone, Debug)]
pub struct ChangeFinder {
    config: ChangeFinderConfig,
    outlier: SdarModel,
    change: SdarModel,
    smoothing: SmoothingBuffer,
    last_value: Option<f64>,
    last_score: f64,
    watermark: Watermark,
}

impl ChangeFinder {
    pub fn new(config: ChangeFinderConfig) -> Result<Self, CfError> {
        config.validate()?;
        Ok(Self {
            outlier: SdarModel::new(config.outlier())?,
            change: SdarModel::new(config.change())?,
            smoothing: SmoothingBuffer::new(config.smooth_window)?,
            last_value: None,
            last_score: 0.0,
            watermark: Watermark::new(),
            config,
        })
    }

    /// Builds a scorer with the default repeat guard.
    pub fn with_params(
        outlier_order: usize,
        outlier_discount: f64,
        change_order: usize,
        change_discount: f64,
        smooth_window: usize,
    ) -> Result<Self, CfError> {
        Self::new(ChangeFinderConfig {
            outlier_order,
            outlier_discount,
            change_order,
            change_discount,
            smooth_window,
            ..ChangeFinderConfig::default()
        })
    }

    pub fn config(&self) -> &ChangeFinderConfig {
        &self.config
    }

    pub fn outlier_model(&self) -> &SdarModel {
        &self.outlier
    }

    pub fn change_model(&self) -> &SdarModel {
        &self.change
    }

    pub fn smoothing(&self) -> &SmoothingBuffer {
        &self.smoothing
    }

    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    pub fn last_score(&self) -> f64 {
        self.last_score
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Scores `x`; on error nothing is mutated.
    pub fn update_detailed(&mut self, x: f64) -> Result<ChangeFinderStep, CfError> {
        if !x.is_finite() {
            return Err(CfError::invalid_input(format!(
                "observation must be finite; got {x}"
            )));
        }

        if let Some(guard) = &self.config.repeat_guard {
            if guard.holds(x, self.last_value, self.last_score) {
                tracing::trace!(
                    value = x,
                    score = self.last_score,
                    "repeat guard returned previous score"
                );
                return Ok(ChangeFinderStep {
                    score: self.last_score,
                    outlier_score: None,
                    smoothed: None,
                    guarded: true,
                });
            }
        }

        self.smoothing.validate(self.config.smooth_window)?;
        let outlier_step = self.outlier.stage(x)?;
        let smoothed = self.smoothing.mean_after_push(outlier_step.score);
        let change_step = self.change.stage(smoothed)?;

        self.outlier.commit(x, &outlier_step);
        self.smoothing.push(outlier_step.score);
        self.change.commit(smoothed, &change_step);
        self.last_value = Some(x);
        self.last_score = change_step.score;

        Ok(ChangeFinderStep {
            score: change_step.score,
            outlier_score: Some(outlier_step.score),
            smoothed: Some(smoothed),
            guarded: false,
        })
    }
}

impl OnlineScorer for ChangeFinder {
    type State = ChangeFinderState;

    fn reset(&mut self) {
        self.outlier.reset();
        self.change.reset();
        self.smoothing.clear();
        self.last_value = None;
        self.last_score = 0.0;
        self.watermark.reset();
    }

    fn update(&mut self, x: f64) -> Result<f64, CfError> {
        self.update_detailed(x).map(|step| step.score)
    }

    fn update_sample(&mut self, sample: Sample) -> Result<ScoredSample, CfError> {
        self.watermark.check(sample.timestamp)?;
        let score = self.update(sample.value)?;
        self.watermark.advance(sample.timestamp);
        Ok(ScoredSample::new(sample, score))
    }

    fn save_state(&self) -> Self::State {
        ChangeFinderState {
            outlier: self.outlier.state().clone(),
            change: self.change.state().clone(),
            smoothing: self.smoothing.clone(),
            last_value: self.last_value,
            last_score: self.last_score,
            watermark: self.watermark,
        }
    }

    fn load_state(&mut self, state: &Self::State) {
        self.outlier.load_state(&state.outlier);
        self.change.load_state(&state.change);
        self.smoothing = state.smoothing.clone();
        self.last_value = state.last_value;
        self.last_score = state.last_score;
        self.watermark = state.watermark;
    }
}
