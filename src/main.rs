//! Purpose: `csvframe` CLI entry point.
//! Role: Binary crate root; parses args, initializes logging, runs commands, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout; diagnostics and progress go to stderr.
//! Invariants: Errors are text on a terminal (or with `--color always`), else one JSON object.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use csvframe::api::{Error, ErrorKind, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `csvframe --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command)
        .map_err(add_corrupt_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "csvframe",
    version,
    about = "Convert delimited text into binary frames and infer column types",
    after_help = r#"EXAMPLES
  $ csvframe ingest data.csv cache/data.frame --schema n,c,c,b
  $ csvframe infer data.csv cache/tmp.frame --report
  $ csvframe scan cache/data.frame.json --limit 5

NOTES
  - Frame files carry no schema or row count; the JSON descriptor does.
  - Progress is logged every 10000 rows; tune logging with RUST_LOG."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Errors: auto (text on a terminal, else JSON), always (colored text), never (no color)"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Encode a delimited text file into a binary frame",
        long_about = r#"Encode a delimited text file into a binary frame.

The first line supplies column names. Each schema entry types one column:
n|numeric (8-byte double; unparseable text becomes NaN), c|categorical
(length-prefixed UTF-8), b|binary (one byte; 1/true/t/yes/y are true).
Lines with fewer or more fields than the schema are truncated silently."#
    )]
    Ingest {
        #[arg(help = "Source text file", value_hint = ValueHint::FilePath)]
        src: PathBuf,
        #[arg(help = "Destination frame file", value_hint = ValueHint::FilePath)]
        dst: PathBuf,
        #[arg(long, help = "Comma-separated column types, e.g. n,c,b")]
        schema: String,
        #[arg(
            long,
            help = "Where to write the JSON descriptor (default: <DST>.json)",
            value_hint = ValueHint::FilePath
        )]
        descriptor: Option<PathBuf>,
        #[command(flatten)]
        split: SplitArgs,
    },
    #[command(
        arg_required_else_help = true,
        about = "Ingest as all-categorical, then infer numeric vs categorical columns",
        long_about = r#"Ingest SRC into DST with every column categorical, then scan DST once
and classify each column. Prints the refined schema; re-ingest with it to
get a typed frame."#
    )]
    Infer {
        #[arg(help = "Source text file", value_hint = ValueHint::FilePath)]
        src: PathBuf,
        #[arg(help = "Scratch frame file", value_hint = ValueHint::FilePath)]
        dst: PathBuf,
        #[arg(long, help = "Include per-column counts in the output")]
        report: bool,
        #[arg(
            long,
            default_value_t = csvframe::core::infer::DEFAULT_DISTINCT_CAP,
            help = "Stop counting distinct values per column after this many"
        )]
        distinct_cap: usize,
        #[arg(
            long,
            help = "Where to write the JSON descriptor (default: <DST>.json)",
            value_hint = ValueHint::FilePath
        )]
        descriptor: Option<PathBuf>,
        #[command(flatten)]
        split: SplitArgs,
    },
    #[command(
        arg_required_else_help = true,
        about = "Decode a frame and print rows as JSON arrays"
    )]
    Scan {
        #[arg(help = "Frame descriptor JSON", value_hint = ValueHint::FilePath)]
        descriptor: PathBuf,
        #[arg(long, help = "Stop after this many rows")]
        limit: Option<u64>,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Clone, Debug)]
struct SplitArgs {
    #[arg(long, default_value_t = ',', help = "Field delimiter (one ASCII character)")]
    delimiter: char,
    #[arg(long, default_value_t = '"', help = "Quote character trimmed from fields")]
    quote: char,
    #[arg(long, help = "Use the strict parser: delimiters inside quotes are kept")]
    quoted: bool,
    #[arg(
        long,
        default_value_t = csvframe::api::DEFAULT_HEARTBEAT_ROWS,
        help = "Log progress every N rows (0 disables)"
    )]
    heartbeat: u64,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn emit_json(value: Value) {
    let json = serde_json::to_string(&value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

const RED: &str = "31";
const YELLOW: &str = "33";

fn paint(label: &str, code: &str, enabled: bool) -> String {
    if enabled {
        format!("\u{1b}[{code}m{label}\u{1b}[0m")
    } else {
        label.to_string()
    }
}

/// How an error reaches stderr: `None` is one JSON object, `Some(color)` is text.
fn error_style(color_mode: ColorMode, is_tty: bool) -> Option<bool> {
    match color_mode {
        ColorMode::Always => Some(true),
        _ if is_tty => Some(color_mode.use_color(is_tty)),
        _ => None,
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    match error_style(color_mode, io::stderr().is_terminal()) {
        Some(use_color) => eprintln!("{}", error_text(err, use_color)),
        None => {
            let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
                "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}"
                    .to_string()
            });
            eprintln!("{json}");
        }
    }
}

fn error_message(err: &Error) -> String {
    let fallback = match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::NotFound => "not found",
        ErrorKind::Permission => "permission denied",
        ErrorKind::Corrupt => "corrupt data",
        ErrorKind::Truncated => "unexpected end of frame",
        ErrorKind::Io => "i/o error",
    };
    err.message().unwrap_or(fallback).to_string()
}

fn error_causes(err: &Error) -> Vec<String> {
    std::iter::successors(err.source(), |&source| source.source())
        .map(ToString::to_string)
        .collect()
}

/// Optional context shared by both renderings, in display order.
fn error_context(err: &Error) -> Vec<(&'static str, Value)> {
    let mut context = Vec::new();
    if let Some(hint) = err.hint() {
        context.push(("hint", json!(hint)));
    }
    if let Some(path) = err.path() {
        context.push(("path", json!(path.display().to_string())));
    }
    if let Some(row) = err.row() {
        context.push(("row", json!(row)));
    }
    if let Some(column) = err.column() {
        context.push(("column", json!(column)));
    }
    if let Some(offset) = err.offset() {
        context.push(("offset", json!(offset)));
    }
    context
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    for (key, value) in error_context(err) {
        inner.insert(key.to_string(), value);
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }
    json!({ "error": inner })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        paint("error:", RED, use_color),
        error_message(err)
    )];
    for (key, value) in error_context(err) {
        let shown = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        lines.push(format!("{} {shown}", paint(&format!("{key}:"), YELLOW, use_color)));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("{} {cause}", paint("caused by:", YELLOW, use_color)));
    }
    lines.join("\n")
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::NotFound => err.with_hint("Check that the path exists."),
        ErrorKind::Permission => {
            err.with_hint("Permission denied. Check file and directory permissions.")
        }
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        _ => err,
    }
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Corrupt | ErrorKind::Truncated => err.with_hint(
            "The frame does not match its descriptor. Re-ingest from the source file.",
        ),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() == ErrorKind::Internal && err.hint().is_none() {
        err.with_hint("This is a bug in csvframe. Rerun with RUST_BACKTRACE=1 and report it.")
    } else {
        err
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

#[cfg(test)]
mod tests {
    use super::{Cli, ColorMode, Command, add_corrupt_hint, error_json, error_style, error_text};
    use clap::Parser;
    use csvframe::api::{Error, ErrorKind};

    #[test]
    fn ingest_args_parse() {
        let cli = Cli::try_parse_from([
            "csvframe",
            "ingest",
            "in.csv",
            "out.frame",
            "--schema",
            "n,c",
            "--delimiter",
            ";",
            "--quoted",
        ])
        .expect("parse");
        match cli.command {
            Command::Ingest { schema, split, .. } => {
                assert_eq!(schema, "n,c");
                assert_eq!(split.delimiter, ';');
                assert_eq!(split.quote, '"');
                assert!(split.quoted);
                assert_eq!(split.heartbeat, 10_000);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn error_json_carries_context() {
        let err = add_corrupt_hint(
            Error::new(ErrorKind::Truncated)
                .with_message("frame ended early")
                .with_path("/tmp/x.frame")
                .with_row(3),
        );
        let value = error_json(&err);
        let inner = &value["error"];
        assert_eq!(inner["kind"], "Truncated");
        assert_eq!(inner["message"], "frame ended early");
        assert_eq!(inner["path"], "/tmp/x.frame");
        assert_eq!(inner["row"], 3);
        assert!(inner["hint"].as_str().is_some());
    }

    #[test]
    fn color_always_renders_text_off_terminal() {
        assert_eq!(error_style(ColorMode::Always, false), Some(true));
        assert_eq!(error_style(ColorMode::Auto, false), None);
        assert_eq!(error_style(ColorMode::Never, false), None);
        assert_eq!(error_style(ColorMode::Auto, true), Some(true));
        assert_eq!(error_style(ColorMode::Never, true), Some(false));
    }

    #[test]
    fn error_text_lists_context() {
        let err = Error::new(ErrorKind::Corrupt)
            .with_message("bad prefix")
            .with_path("f.frame")
            .with_column(2);
        let text = error_text(&err, false);
        assert_eq!(text, "error: bad prefix\npath: f.frame\ncolumn: 2");
        assert!(error_text(&err, true).contains("\u{1b}[31merror:\u{1b}[0m"));
    }
}
