// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic signal generators shared by the benchmarks.

use cf_core::Sample;

pub fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Uniform noise in `[-amplitude, amplitude)`.
pub fn noise_series(seed: u64, len: usize, amplitude: f64) -> Vec<f64> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            let unit = (lcg_next(&mut state) >> 11) as f64 / (1u64 << 53) as f64;
            (unit - 0.5) * 2.0 * amplitude
        })
        .collect()
}

/// Noise with a level shift of `shift` every `period` samples.
pub fn piecewise_series(seed: u64, len: usize, period: usize, shift: f64) -> Vec<f64> {
    noise_series(seed, len, 1.0)
        .into_iter()
        .enumerate()
        .map(|(idx, noise)| noise + shift * (idx / period.max(1)) as f64)
        .collect()
}

/// Samples one minute apart starting at `start`.
pub fn as_samples(values: &[f64], start: i64) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| Sample::new(start + 60 * idx as i64, *value))
        .collect()
}
