// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cf_cli::{
    AlertSink, DataPoint, JsonLinesSink, LookbackWindow, SamplingInterval, TrailingWindow,
    load_series, score_series,
};
use cf_online::ChangeFinderConfig;
use std::fs;
use std::path::PathBuf;
use std::process;

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

fn temp_csv(stem: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cf-cli-{stem}-{}", process::id()));
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    let path = dir.join(format!("{stem}.csv"));
    fs::write(&path, contents).expect("temp csv should be writable");
    path
}

fn step_csv(len: usize, change_at: usize) -> String {
    let mut state = 0x5eed_u64;
    let mut csv = String::from("clock,value\n");
    for idx in 0..len {
        let noise = ((lcg_next(&mut state) >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 0.2;
        let value = if idx >= change_at { noise + 10.0 } else { noise };
        csv.push_str(format!("{},{value}\n", 1_700_000_000 + 300 * idx as i64).as_str());
    }
    csv
}

#[test]
fn csv_to_alerts_end_to_end() {
    let path = temp_csv("net.if.in", step_csv(100, 50).as_str());
    let series = load_series(&path).expect("csv should load");
    assert_eq!(series.samples.len(), 100);
    assert_eq!(series.item_key(), "net.if.in");

    let scored = score_series(&ChangeFinderConfig::default(), &series.samples)
        .expect("series should score");
    let peak_idx = scored
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.score.total_cmp(&b.1.score))
        .map(|(idx, _)| idx)
        .expect("non-empty scores");
    assert!((50..=60).contains(&peak_idx), "peak at {peak_idx}");

    let selected = TrailingWindow::new(900).select(&scored, None);
    assert_eq!(selected.len(), 3);
    let points = selected
        .iter()
        .map(|sample| DataPoint::from_scored("edge-01", &series.item_key(), "anomaly", sample))
        .collect::<Vec<_>>();

    let mut sink = JsonLinesSink::new(Vec::new());
    assert_eq!(sink.send(&points).expect("sink accepts points"), 3);
    let written = String::from_utf8(sink.into_inner()).expect("utf-8 output");
    for line in written.lines() {
        let decoded: DataPoint = serde_json::from_str(line).expect("line decodes");
        assert_eq!(decoded.key, "anomaly.net.if.in");
        assert_eq!(decoded.hostname, "edge-01");
        let (_, decimals) = decoded.value.split_once('.').expect("fixed-point value");
        assert_eq!(decimals.len(), 10);
    }

    fs::remove_file(&path).expect("temp csv should be removable");
}

#[test]
fn lookback_window_limits_scored_history() {
    let path = temp_csv("lookback", step_csv(40, 40).as_str());
    let series = load_series(&path).expect("csv should load");
    let latest = series
        .samples
        .last()
        .map(|sample| sample.timestamp)
        .expect("non-empty series");

    let interval = SamplingInterval::parse("5m").expect("interval should parse");
    let window = LookbackWindow::ending_at(latest, interval, 10).expect("in range");
    let recent = series
        .samples
        .iter()
        .filter(|sample| window.contains(sample.timestamp))
        .copied()
        .collect::<Vec<_>>();
    assert_eq!(recent.len(), 11);

    let scored = score_series(&ChangeFinderConfig::default(), &recent).expect("series should score");
    assert_eq!(scored.first().map(|s| s.timestamp), Some(window.start));

    fs::remove_file(&path).expect("temp csv should be removable");
}

#[test]
fn missing_and_malformed_files_report_stable_codes() {
    let missing = std::env::temp_dir().join(format!("cf-cli-missing-{}.csv", process::id()));
    let err = load_series(&missing).expect_err("missing file must fail");
    assert_eq!(err.code(), "io_error");
    assert!(err.to_string().contains("failed to read"));

    let path = temp_csv("malformed", "clock,value\n60,1.0\n120\n");
    let err = load_series(&path).expect_err("short row must fail");
    assert_eq!(err.code(), "invalid_input");
    assert!(err.to_string().contains("malformed.csv"));
    assert!(err.to_string().contains("CSV row 3"));

    fs::remove_file(&path).expect("temp csv should be removable");
}
