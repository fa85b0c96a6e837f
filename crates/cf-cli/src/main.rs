// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cf_cli::{
    AlertSink, CliError, DataPoint, JsonLinesSink, LoadedSeries, LogSink, LookbackWindow,
    SamplingInterval, TrailingWindow, load_series, score_series,
};
use cf_core::ScoredSample;
use cf_online::{ChangeFinderConfig, RepeatGuard};
use rayon::prelude::*;
use serde::Serialize;
use std::env;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use tracing_subscriber::prelude::*;

#[derive(Debug)]
struct Cli {
    command: Command,
    verbose: bool,
}

#[derive(Debug)]
enum Command {
    Score(ScoreArgs),
}

#[derive(Debug)]
struct ScoreArgs {
    inputs: Vec<PathBuf>,
    config: ChangeFinderConfig,
    repeat_tolerance: Option<f64>,
    no_repeat_guard: bool,
    delay: Option<SamplingInterval>,
    num: u32,
    interval_secs: i64,
    now: Option<i64>,
    host: String,
    key: Option<String>,
    prefix: String,
    format: OutputFormat,
    output: Option<PathBuf>,
    alerts: Option<PathBuf>,
}

impl Default for ScoreArgs {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            config: ChangeFinderConfig::default(),
            repeat_tolerance: None,
            no_repeat_guard: false,
            delay: None,
            num: 30,
            interval_secs: 300,
            now: None,
            host: "localhost".to_string(),
            key: None,
            prefix: "anomaly".to_string(),
            format: OutputFormat::Tsv,
            output: None,
            alerts: None,
        }
    }
}

impl ScoreArgs {
    fn scorer_config(&self) -> ChangeFinderConfig {
        let repeat_guard = if self.no_repeat_guard {
            None
        } else if let Some(tolerance) = self.repeat_tolerance {
            Some(RepeatGuard::within(tolerance))
        } else {
            self.config.repeat_guard
        };
        ChangeFinderConfig {
            repeat_guard,
            ..self.config.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Tsv,
    Json,
}

impl OutputFormat {
    fn parse(raw: &str) -> Result<Self, CliError> {
        match raw.to_ascii_lowercase().as_str() {
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            _ => Err(CliError::invalid_input(format!(
                "invalid --format '{raw}'; expected one of: tsv, json"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct SeriesOutput {
    input: String,
    item_key: String,
    samples_in_lookback: usize,
    scores: Vec<ScoredSample>,
    /// Input value cells, aligned with `scores`.
    #[serde(skip)]
    value_text: Vec<String>,
    alerts: Vec<DataPoint>,
}

#[derive(Serialize)]
struct ScoreOutput<'a> {
    command: &'static str,
    config: &'a ChangeFinderConfig,
    series: &'a [SeriesOutput],
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };
    init_tracing(cli.verbose);

    match cli.command {
        Command::Score(args) => handle_score(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    parse_cli(args.as_slice())
}

fn parse_cli(args: &[String]) -> Result<Option<Cli>, CliError> {
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].as_str();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name)?;
        return Ok(None);
    }

    let verbose = rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-v" | "--verbose"));
    let rest = rest
        .iter()
        .filter(|arg| !matches!(arg.as_str(), "-v" | "--verbose"))
        .cloned()
        .collect::<Vec<_>>();

    let command = match command_name {
        "score" => Command::Score(parse_score_args(rest.as_slice())?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected: score"
            )));
        }
    };

    Ok(Some(Cli { command, verbose }))
}

fn parse_score_args(tokens: &[String]) -> Result<ScoreArgs, CliError> {
    let mut args = ScoreArgs::default();
    let mut reader = FlagReader::new(tokens);
    while let Some((flag, inline_value)) = reader.next_flag()? {
        match flag {
            "--input" => args
                .inputs
                .push(PathBuf::from(reader.value(flag, inline_value)?)),
            "--outlier-order" => {
                args.config.outlier_order =
                    reader.parsed(flag, inline_value, "a non-negative integer")?;
            }
            "--outlier-discount" => {
                args.config.outlier_discount = reader.parsed(flag, inline_value, "a number")?;
            }
            "--change-order" => {
                args.config.change_order =
                    reader.parsed(flag, inline_value, "a non-negative integer")?;
            }
            "--change-discount" => {
                args.config.change_discount = reader.parsed(flag, inline_value, "a number")?;
            }
            "--smooth-window" => {
                args.config.smooth_window =
                    reader.parsed(flag, inline_value, "a non-negative integer")?;
            }
            "--repeat-tolerance" => {
                args.repeat_tolerance = Some(reader.parsed(flag, inline_value, "a number")?);
            }
            "--no-repeat-guard" => {
                reject_inline_value(flag, inline_value)?;
                args.no_repeat_guard = true;
            }
            "--delay" => {
                args.delay = Some(SamplingInterval::parse(reader.value(flag, inline_value)?)?);
            }
            "--num" => {
                args.num = reader.parsed(flag, inline_value, "a non-negative integer")?;
            }
            "--interval" => {
                args.interval_secs =
                    SamplingInterval::parse(reader.value(flag, inline_value)?)?.as_secs();
            }
            "--now" => {
                args.now = Some(reader.parsed(flag, inline_value, "an integer")?);
            }
            "--host" => args.host = reader.value(flag, inline_value)?.to_string(),
            "--key" => args.key = Some(reader.value(flag, inline_value)?.to_string()),
            "--prefix" => args.prefix = reader.value(flag, inline_value)?.to_string(),
            "--format" => args.format = OutputFormat::parse(reader.value(flag, inline_value)?)?,
            "--output" => args.output = Some(PathBuf::from(reader.value(flag, inline_value)?)),
            "--alerts" => args.alerts = Some(PathBuf::from(reader.value(flag, inline_value)?)),
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown score option '{other}'"
                )));
            }
        }
    }

    if args.inputs.is_empty() {
        return Err(CliError::invalid_input(
            "score requires at least one --input <path>",
        ));
    }
    if args.no_repeat_guard && args.repeat_tolerance.is_some() {
        return Err(CliError::invalid_input(
            "--repeat-tolerance cannot be combined with --no-repeat-guard",
        ));
    }
    if args.key.is_some() && args.inputs.len() > 1 {
        return Err(CliError::invalid_input(
            "--key applies to a single --input; omit it to key each series by file name",
        ));
    }
    args.scorer_config().validate()?;

    Ok(args)
}

/// Walks `--flag value` and `--flag=value` tokens.
struct FlagReader<'a> {
    tokens: &'a [String],
    next: usize,
}

impl<'a> FlagReader<'a> {
    fn new(tokens: &'a [String]) -> Self {
        Self { tokens, next: 0 }
    }

    fn next_flag(&mut self) -> Result<Option<(&'a str, Option<&'a str>)>, CliError> {
        let Some(token) = self.tokens.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        let Some(body) = token.strip_prefix("--") else {
            return Err(CliError::invalid_input(format!(
                "unexpected positional argument '{token}'; expected --flag value"
            )));
        };
        Ok(Some(match body.split_once('=') {
            Some((name, value)) => (&token[..name.len() + 2], Some(value)),
            None => (token.as_str(), None),
        }))
    }

    fn value(&mut self, flag: &str, inline_value: Option<&'a str>) -> Result<&'a str, CliError> {
        if let Some(value) = inline_value {
            return Ok(value);
        }
        match self.tokens.get(self.next) {
            Some(value) if value.starts_with("--") => Err(CliError::invalid_input(format!(
                "{flag} requires a value, but got option '{value}'"
            ))),
            Some(value) => {
                self.next += 1;
                Ok(value.as_str())
            }
            None => Err(CliError::invalid_input(format!("{flag} requires a value"))),
        }
    }

    fn parsed<T: FromStr>(
        &mut self,
        flag: &str,
        inline_value: Option<&'a str>,
        expected: &str,
    ) -> Result<T, CliError> {
        let raw = self.value(flag, inline_value)?;
        raw.parse::<T>()
            .map_err(|_| CliError::invalid_input(format!("{flag} expects {expected}, got '{raw}'")))
    }
}

fn reject_inline_value(flag: &str, inline_value: Option<&str>) -> Result<(), CliError> {
    match inline_value {
        Some(_) => Err(CliError::invalid_input(format!(
            "{flag} does not accept a value"
        ))),
        None => Ok(()),
    }
}

fn print_version() {
    println!("cf {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "cf {}\n\nUSAGE:\n  cf <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  score    Score timestamp,value series and select recent alert data points\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n  -v, --verbose   Log at info level (RUST_LOG overrides)\n\nRun 'cf <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "score" => {
            println!(
                "USAGE:\n  cf score --input <path> [--input <path> ...] [OPTIONS]\n\nOPTIONS:\n  --input <path>               Required timestamp,value CSV; repeat to score several series\n  --outlier-order <usize>      Default: 5\n  --outlier-discount <float>   Default: 0.02\n  --change-order <usize>       Default: 5\n  --change-discount <float>    Default: 0.02\n  --smooth-window <usize>      Default: 5\n  --repeat-tolerance <float>   Treat values within tolerance as repeats\n  --no-repeat-guard            Score every value, including repeats\n  --delay <interval>           Sampling interval (300, 5m, 1h, 1d, 1w); enables lookback\n  --num <u32>                  Lookback length in intervals. Default: 30\n  --interval <interval>        Trailing alert window. Default: 300\n  --now <epoch>                Reference time. Default: latest sample\n  --host <name>                Default: localhost\n  --key <item key>             Default: input file stem\n  --prefix <prefix>            Default: anomaly\n  --format <tsv|json>          Default: tsv\n  --output <path>              Write scores to file\n  --alerts <path>              Write selected data points as JSON lines"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected: score"
        ))),
    }
}

fn handle_score(args: ScoreArgs) -> Result<(), CliError> {
    let config = args.scorer_config();
    let loaded = args
        .inputs
        .iter()
        .map(|path| load_series(path.as_path()))
        .collect::<Result<Vec<_>, _>>()?;

    let outputs = loaded
        .par_iter()
        .map(|series| score_loaded_series(&args, &config, series))
        .collect::<Result<Vec<_>, _>>()?;

    let rendered = match args.format {
        OutputFormat::Tsv => render_tsv(&outputs),
        OutputFormat::Json => render_json(&ScoreOutput {
            command: "score",
            config: &config,
            series: &outputs,
        })?,
    };
    write_output(rendered.as_str(), args.output.as_deref())?;

    let points = outputs
        .iter()
        .flat_map(|series| series.alerts.iter().cloned())
        .collect::<Vec<_>>();
    let sent = match args.alerts.as_deref() {
        Some(path) => {
            let file = File::create(path).map_err(|source| {
                CliError::io(format!("failed to create '{}'", path.display()), source)
            })?;
            JsonLinesSink::new(BufWriter::new(file)).send(&points)?
        }
        None => LogSink.send(&points)?,
    };
    tracing::info!(series = outputs.len(), data_points = sent, "scoring finished");
    Ok(())
}

fn score_loaded_series(
    args: &ScoreArgs,
    config: &ChangeFinderConfig,
    series: &LoadedSeries,
) -> Result<SeriesOutput, CliError> {
    let reference = args
        .now
        .or_else(|| series.samples.iter().map(|sample| sample.timestamp).max());

    let window = match (args.delay, reference) {
        (Some(delay), Some(now)) => Some(LookbackWindow::ending_at(now, delay, args.num)?),
        _ => None,
    };
    let (samples, value_text): (Vec<_>, Vec<_>) = series
        .samples
        .iter()
        .enumerate()
        .filter(|(_, sample)| window.is_none_or(|window| window.contains(sample.timestamp)))
        .map(|(idx, sample)| (*sample, series.value_text(idx)))
        .unzip();
    if samples.is_empty() {
        tracing::warn!(input = %series.path.display(), "no samples to score");
    }

    let scores = score_series(config, &samples)?;
    let item_key = args.key.clone().unwrap_or_else(|| series.item_key());
    let alerts = TrailingWindow::new(args.interval_secs)
        .select(&scores, reference)
        .iter()
        .map(|sample| DataPoint::from_scored(&args.host, &item_key, &args.prefix, sample))
        .collect::<Vec<_>>();

    tracing::info!(
        input = %series.path.display(),
        scored = scores.len(),
        alerts = alerts.len(),
        "series scored"
    );

    Ok(SeriesOutput {
        input: series.path.display().to_string(),
        item_key,
        samples_in_lookback: samples.len(),
        scores,
        value_text,
        alerts,
    })
}

fn render_tsv(outputs: &[SeriesOutput]) -> String {
    let mut rendered = String::new();
    for series in outputs {
        if outputs.len() > 1 {
            rendered.push_str(format!("# {}\n", series.input).as_str());
        }
        for (idx, sample) in series.scores.iter().enumerate() {
            let value = match series.value_text.get(idx) {
                Some(text) => text.clone(),
                None => sample.value.to_string(),
            };
            rendered.push_str(
                format!("{}\t{value}\t{:.6}\n", sample.timestamp, sample.score).as_str(),
            );
        }
    }
    rendered
}

fn render_json<T: Serialize>(payload: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(payload)
        .map(|encoded| format!("{encoded}\n"))
        .map_err(|source| CliError::json("failed to serialize JSON output", source))
}

fn write_output(rendered: &str, output_path: Option<&Path>) -> Result<(), CliError> {
    if let Some(path) = output_path {
        fs::write(path, rendered)
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        print!("{rendered}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = serde_json::json!({
        "error": {
            "code": err.code(),
            "message": err.to_string(),
        }
    });
    eprintln!("{envelope:#}");
}
