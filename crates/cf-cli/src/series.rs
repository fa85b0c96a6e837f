// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CliError;
use cf_core::{OnlineScorer, Sample, ScoredSample};
use cf_online::{ChangeFinder, ChangeFinderConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// A `timestamp,value` series read from disk.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedSeries {
    pub path: PathBuf,
    pub samples: Vec<Sample>,
    /// Value cells as written in the file, aligned with `samples`.
    pub value_text: Vec<String>,
}

impl LoadedSeries {
    /// File stem, used as the default item key.
    pub fn item_key(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// The value cell for sample `idx`, falling back to the parsed value.
    pub fn value_text(&self, idx: usize) -> String {
        match self.value_text.get(idx) {
            Some(text) => text.clone(),
            None => self
                .samples
                .get(idx)
                .map(|sample| sample.value.to_string())
                .unwrap_or_default(),
        }
    }
}

/// One parsed CSV row.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesRecord {
    pub sample: Sample,
    pub value_text: String,
}

pub fn load_series(path: &Path) -> Result<LoadedSeries, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    let records = parse_series_records(raw.as_str()).map_err(|err| match err {
        CliError::InvalidInput(msg) => {
            CliError::invalid_input(format!("{}: {msg}", path.display()))
        }
        other => other,
    })?;
    let (samples, value_text) = records
        .into_iter()
        .map(|record| (record.sample, record.value_text))
        .unzip();
    Ok(LoadedSeries {
        path: path.to_path_buf(),
        samples,
        value_text,
    })
}

/// Parses `timestamp,value` rows, skipping a single header row when present.
pub fn parse_series_csv(raw: &str) -> Result<Vec<Sample>, CliError> {
    parse_series_records(raw).map(|records| records.into_iter().map(|r| r.sample).collect())
}

/// Like [`parse_series_csv`], keeping each value cell's original text.
pub fn parse_series_records(raw: &str) -> Result<Vec<SeriesRecord>, CliError> {
    let rows = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return Err(CliError::invalid_input("CSV input is empty"));
    }

    match parse_series_rows(rows.as_slice(), 1) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            if rows.len() > 1 && first_row_looks_like_header(rows[0], rows[1]) {
                return parse_series_rows(&rows[1..], 2);
            }
            Err(err)
        }
    }
}

fn parse_series_rows(
    rows: &[&str],
    first_row_number: usize,
) -> Result<Vec<SeriesRecord>, CliError> {
    let mut records = Vec::with_capacity(rows.len());
    for (offset, row) in rows.iter().enumerate() {
        let row_number = first_row_number + offset;
        let cells = row.split(',').map(str::trim).collect::<Vec<_>>();
        let [timestamp, value] = cells.as_slice() else {
            return Err(CliError::invalid_input(format!(
                "CSV row {row_number} has {} columns but expected 2 (timestamp,value)",
                cells.len()
            )));
        };

        let timestamp = timestamp.parse::<i64>().map_err(|_| {
            CliError::invalid_input(format!(
                "CSV row {row_number} timestamp is not an integer: '{timestamp}'"
            ))
        })?;
        let parsed = value
            .parse::<f64>()
            .ok()
            .filter(|parsed| parsed.is_finite())
            .ok_or_else(|| {
                CliError::invalid_input(format!(
                    "CSV row {row_number} value is not a finite float: '{value}'"
                ))
            })?;
        records.push(SeriesRecord {
            sample: Sample::new(timestamp, parsed),
            value_text: (*value).to_string(),
        });
    }
    Ok(records)
}

fn first_row_looks_like_header(first_row: &str, second_row: &str) -> bool {
    let first_cells = first_row.split(',').map(str::trim).collect::<Vec<_>>();
    let second_cells = second_row.split(',').map(str::trim).collect::<Vec<_>>();

    if first_cells.len() != second_cells.len()
        || first_cells.iter().any(|cell| cell.is_empty())
        || second_cells.iter().any(|cell| cell.is_empty())
    {
        return false;
    }

    let first_all_non_numeric = first_cells.iter().all(|cell| cell.parse::<f64>().is_err());
    let second_all_numeric = second_cells.iter().all(|cell| cell.parse::<f64>().is_ok());

    first_all_non_numeric && second_all_numeric
}

/// Scores `samples` with a fresh scorer built from `config`.
pub fn score_series(
    config: &ChangeFinderConfig,
    samples: &[Sample],
) -> Result<Vec<ScoredSample>, CliError> {
    let mut finder = ChangeFinder::new(config.clone())?;
    let scored = finder.score_samples(samples)?;
    tracing::debug!(
        samples = scored.len(),
        last_score = finder.last_score(),
        "series scored"
    );
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::{LoadedSeries, parse_series_csv, parse_series_records, score_series};
    use cf_core::Sample;
    use std::path::PathBuf;
    use cf_online::ChangeFinderConfig;

    #[test]
    fn csv_parser_reads_timestamp_value_rows() {
        let raw = "1700000000,1.5\n1700000060,2.0\n\n1700000120, -0.25\n";
        let samples = parse_series_csv(raw).expect("csv should parse");
        assert_eq!(
            samples,
            vec![
                Sample::new(1_700_000_000, 1.5),
                Sample::new(1_700_000_060, 2.0),
                Sample::new(1_700_000_120, -0.25),
            ]
        );
    }

    #[test]
    fn csv_records_keep_value_cells_verbatim() {
        let records = parse_series_records("value,clock\n60, 1.50\n120,2e3\n")
            .expect("csv with header should parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sample, Sample::new(60, 1.5));
        assert_eq!(records[0].value_text, "1.50");
        assert_eq!(records[1].value_text, "2e3");
    }

    #[test]
    fn value_text_falls_back_to_parsed_value() {
        let series = LoadedSeries {
            path: PathBuf::from("cpu.csv"),
            samples: vec![Sample::new(60, 1.5), Sample::new(120, 2.0)],
            value_text: vec!["1.50".to_string()],
        };
        assert_eq!(series.value_text(0), "1.50");
        assert_eq!(series.value_text(1), "2");
        assert_eq!(series.value_text(2), "");
    }

    #[test]
    fn csv_parser_skips_single_header_row_when_present() {
        let raw = "clock,value\n60,1.0\n120,2.0\n";
        let samples = parse_series_csv(raw).expect("csv with header should parse");
        assert_eq!(samples, vec![Sample::new(60, 1.0), Sample::new(120, 2.0)]);
    }

    #[test]
    fn csv_parser_reports_rows_after_header_with_file_numbering() {
        let raw = "clock,value\n60,1.0\n120,oops\n";
        let err = parse_series_csv(raw).expect_err("bad value must fail");
        assert!(err.to_string().contains("CSV row 3"), "{err}");
    }

    #[test]
    fn csv_parser_rejects_malformed_first_row_instead_of_dropping_it() {
        let raw = "60,1.0,\n120,2.0\n";
        let err = parse_series_csv(raw).expect_err("malformed first data row should fail");
        assert!(err.to_string().contains("CSV row 1"), "{err}");
    }

    #[test]
    fn csv_parser_rejects_empty_and_non_finite_input() {
        let err = parse_series_csv(" \n\n").expect_err("empty csv must fail");
        assert!(err.to_string().contains("empty"));

        let err = parse_series_csv("60,NaN\n").expect_err("NaN must fail");
        assert!(err.to_string().contains("not a finite float"));

        let err = parse_series_csv("60.5,1.0\n").expect_err("fractional timestamp must fail");
        assert!(err.to_string().contains("not an integer"));
    }

    #[test]
    fn score_series_emits_one_score_per_sample() {
        let samples = (0..20)
            .map(|idx| Sample::new(idx * 60, if idx < 10 { 0.0 } else { 5.0 }))
            .collect::<Vec<_>>();
        let scored =
            score_series(&ChangeFinderConfig::default(), &samples).expect("series should score");
        assert_eq!(scored.len(), samples.len());
        assert!(scored.iter().all(|s| s.score.is_finite()));
        assert_eq!(scored[19].timestamp, 19 * 60);
    }

    #[test]
    fn score_series_surfaces_ordering_and_config_errors() {
        let err = score_series(
            &ChangeFinderConfig::default(),
            &[Sample::new(120, 1.0), Sample::new(60, 1.0)],
        )
        .expect_err("unordered samples must fail");
        assert_eq!(err.code(), "invalid_input");

        let err = score_series(
            &ChangeFinderConfig {
                smooth_window: 0,
                ..ChangeFinderConfig::default()
            },
            &[],
        )
        .expect_err("invalid config must fail");
        assert_eq!(err.code(), "invalid_parameter");
    }
}
