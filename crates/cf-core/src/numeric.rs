// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CfError;

/// Smallest variance (and prediction-error power) the scorers will use.
pub const VAR_FLOOR: f64 = f64::EPSILON * 1e6;
/// `ln(2π)`.
pub const LOG_2PI: f64 = 1.837_877_066_409_345_3;

/// Clamps a raw variance estimate into `[VAR_FLOOR, f64::MAX]`, mapping NaN to the floor.
pub fn normalize_variance(raw_var: f64) -> f64 {
    if raw_var.is_nan() || raw_var <= VAR_FLOOR {
        VAR_FLOOR
    } else if raw_var == f64::INFINITY {
        f64::MAX
    } else {
        raw_var
    }
}

/// Negative log-density of `x` under `Normal(mean, variance)`.
///
/// `variance` is expected to be positive; callers floor it with [`normalize_variance`].
pub fn gaussian_neg_log_likelihood(x: f64, mean: f64, variance: f64) -> f64 {
    let residual = x - mean;
    0.5 * (LOG_2PI + variance.ln()) + residual * residual / (2.0 * variance)
}

/// Outcome of a Levinson–Durbin solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevinsonSummary {
    /// Order the caller asked for.
    pub requested_order: usize,
    /// Highest order whose reflection coefficient was stable; coefficients past it are zero.
    pub fitted_order: usize,
    /// One-step prediction-error power at `fitted_order`, floored at [`VAR_FLOOR`].
    pub error_power: f64,
}

impl LevinsonSummary {
    pub fn is_truncated(&self) -> bool {
        self.fitted_order < self.requested_order
    }
}

/// Owned Yule–Walker fit returned by [`levinson_durbin`].
#[derive(Clone, Debug, PartialEq)]
pub struct YuleWalkerFit {
    /// `a[1..=k]`, stored at indices `0..k`.
    pub coefficients: Vec<f64>,
    pub summary: LevinsonSummary,
}

/// Solves the Yule–Walker equations for `autocov[0..=order]`, allocating the result.
pub fn levinson_durbin(autocov: &[f64], order: usize) -> Result<YuleWalkerFit, CfError> {
    if autocov.len() <= order {
        return Err(CfError::invalid_input(format!(
            "levinson-durbin needs {} autocovariance lags for order {order}; got {}",
            order + 1,
            autocov.len()
        )));
    }
    let mut coefficients = vec![0.0; order];
    let mut scratch = vec![0.0; order];
    let summary = levinson_durbin_into(autocov, &mut coefficients, &mut scratch);
    Ok(YuleWalkerFit {
        coefficients,
        summary,
    })
}

/// Levinson–Durbin recursion writing `a[1..=k]` into `coefficients` (`k = coefficients.len()`).
///
/// Degenerate autocovariances never fail: a non-positive or non-finite `autocov[0]`
/// yields all-zero coefficients, an unstable reflection coefficient (non-finite or
/// `|κ| >= 1`) keeps the last stable order, and the recursion stops once the
/// prediction-error power reaches [`VAR_FLOOR`].
///
/// # Panics
///
/// Panics when `autocov.len() <= coefficients.len()` or `scratch` is shorter than
/// `coefficients`.
pub fn levinson_durbin_into(
    autocov: &[f64],
    coefficients: &mut [f64],
    scratch: &mut [f64],
) -> LevinsonSummary {
    let order = coefficients.len();
    assert!(
        autocov.len() > order,
        "levinson-durbin needs {} autocovariance lags; got {}",
        order + 1,
        autocov.len()
    );
    assert!(
        scratch.len() >= order,
        "levinson-durbin scratch too short: {} < {order}",
        scratch.len()
    );

    coefficients.fill(0.0);
    let r0 = autocov[0];
    if !(r0.is_finite() && r0 > VAR_FLOOR) {
        return LevinsonSummary {
            requested_order: order,
            fitted_order: 0,
            error_power: normalize_variance(r0),
        };
    }

    let mut error_power = r0;
    for m in 1..=order {
        let mut acc = autocov[m];
        for j in 1..m {
            acc -= coefficients[j - 1] * autocov[m - j];
        }
        let reflection = acc / error_power;
        if !reflection.is_finite() || reflection.abs() >= 1.0 {
            tracing::debug!(
                order,
                stopped_at = m,
                reflection,
                "levinson-durbin truncated on unstable reflection coefficient"
            );
            return LevinsonSummary {
                requested_order: order,
                fitted_order: m - 1,
                error_power,
            };
        }

        scratch[..m - 1].copy_from_slice(&coefficients[..m - 1]);
        coefficients[m - 1] = reflection;
        for j in 1..m {
            coefficients[j - 1] = scratch[j - 1] - reflection * scratch[m - j - 1];
        }

        error_power *= 1.0 - reflection * reflection;
        if !(error_power > VAR_FLOOR) {
            tracing::debug!(
                order,
                stopped_at = m,
                "levinson-durbin stopped on exhausted prediction-error power"
            );
            return LevinsonSummary {
                requested_order: order,
                fitted_order: m,
                error_power: VAR_FLOOR,
            };
        }
    }

    LevinsonSummary {
        requested_order: order,
        fitted_order: order,
        error_power,
    }
}
