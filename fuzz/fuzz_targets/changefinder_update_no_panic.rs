// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use cf_core::{CfError, OnlineScorer, Sample};
use cf_online::{ChangeFinder, ChangeFinderConfig, RepeatGuard};
use libfuzzer_sys::fuzz_target;

fn build_discount(seed: u8) -> f64 {
    // Spans 0.0 through 1.275, so invalid discounts are reachable.
    f64::from(seed) / 200.0
}

fn build_guard(mode_seed: u8, tolerance_seed: u8) -> Option<RepeatGuard> {
    match mode_seed % 3 {
        0 => None,
        1 => Some(RepeatGuard::default()),
        _ => Some(RepeatGuard::within(f64::from(tolerance_seed) / 64.0)),
    }
}

fn build_value(cursor: &mut common::ByteCursor<'_>, last: f64) -> f64 {
    match cursor.next_u8() % 8 {
        0 => last,
        1 => f64::from(cursor.next_i16()) / 16.0,
        2 => 0.0,
        3 => cursor.next_f64(),
        4 => f64::NAN,
        5 => f64::INFINITY,
        6 => f64::from(cursor.next_i16()) * 1e150,
        _ => f64::from(cursor.next_i16()),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);

    let config = ChangeFinderConfig {
        outlier_order: common::bounded(cursor.next_u8(), 0, 12),
        outlier_discount: build_discount(cursor.next_u8()),
        change_order: common::bounded(cursor.next_u8(), 0, 12),
        change_discount: build_discount(cursor.next_u8()),
        smooth_window: common::bounded(cursor.next_u8(), 0, 16),
        repeat_guard: build_guard(cursor.next_u8(), cursor.next_u8()),
    };

    let Ok(mut finder) = ChangeFinder::new(config) else {
        return;
    };

    let mut last = 0.0;
    let mut timestamp = i64::from(cursor.next_i16());
    let steps = common::bounded(cursor.next_u8(), 1, 128);

    for _ in 0..steps {
        let op_seed = cursor.next_u8();

        if op_seed % 13 == 0 {
            finder.reset();
            continue;
        }

        if op_seed % 11 == 0 {
            let snapshot = finder.save_state();
            finder.load_state(&snapshot);
            assert_eq!(finder.save_state(), snapshot);
            continue;
        }

        let x = build_value(&mut cursor, last);
        let before = finder.save_state();
        let outcome = if op_seed % 2 == 0 {
            timestamp = timestamp.saturating_add(i64::from(cursor.next_i16() % 4));
            finder.update_sample(Sample::new(timestamp, x)).map(|s| s.score)
        } else {
            finder.update(x)
        };

        match outcome {
            Ok(score) => {
                assert!(score.is_finite());
                last = x;
            }
            Err(CfError::InvalidInput(_) | CfError::NumericalIssue(_)) => {
                assert_eq!(finder.save_state(), before);
            }
            Err(CfError::InvalidParameter(message)) => {
                panic!("validated scorer reported a parameter error: {message}");
            }
        }
    }
});
