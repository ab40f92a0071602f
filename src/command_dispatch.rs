//! Purpose: Hold top-level CLI command dispatch for `csvframe`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Ingestion fully completes (frame flushed, descriptor written) before any scan.
//! Invariants: Frame descriptors are persisted only here, never by the library implicitly.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use super::*;
use csvframe::api::{
    ColumnType, Frame, FrameValue, InferOptions, IngestOptions, Schema, SplitMode, infer_report,
    ingest_csv, read_header,
};

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::aot::generate(shell, &mut cmd, "csvframe", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Ingest {
            src,
            dst,
            schema,
            descriptor,
            split,
        } => {
            let started = Instant::now();
            let schema: Schema = schema.parse()?;
            let options = ingest_options(&split)?;
            prepare_destination(&dst)?;

            let frame = ingest_csv(&src, &dst, &schema, options)?;
            let descriptor = descriptor.unwrap_or_else(|| default_descriptor_path(&dst));
            frame.save_descriptor(&descriptor)?;
            info!(
                rows = frame.count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "ingest done"
            );

            emit_json(json!({
                "frame": frame_json(&frame),
                "descriptor": descriptor.display().to_string(),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Infer {
            src,
            dst,
            report,
            distinct_cap,
            descriptor,
            split,
        } => {
            let started = Instant::now();
            let options = ingest_options(&split)?;
            let header = read_header(&src, options)?;
            let schema = Schema::uniform(ColumnType::Categorical, header.len());
            prepare_destination(&dst)?;

            let frame = ingest_csv(&src, &dst, &schema, options)?;
            let descriptor = descriptor.unwrap_or_else(|| default_descriptor_path(&dst));
            frame.save_descriptor(&descriptor)?;

            let infer_options = InferOptions {
                heartbeat_every: split.heartbeat,
                distinct_cap,
            };
            let inferred = infer_report(&frame, infer_options)?;
            info!(
                rows = inferred.rows,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "infer done"
            );

            let mut output = json!({
                "schema": inferred.schema,
                "letters": inferred.schema.letters(),
            });
            if report {
                output["rows"] = json!(inferred.rows);
                output["columns"] = json!(inferred.columns);
            }
            emit_json(output);
            Ok(RunOutcome::ok())
        }
        Command::Scan { descriptor, limit } => {
            let frame = Frame::load_descriptor(&descriptor)?;
            let limit = limit.unwrap_or(u64::MAX);
            for row in frame.rows()?.take(usize::try_from(limit).unwrap_or(usize::MAX)) {
                emit_json(row_json(&row?));
            }
            Ok(RunOutcome::ok())
        }
    }
}

fn ingest_options(split: &SplitArgs) -> Result<IngestOptions, Error> {
    let delimiter = u8::try_from(split.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("delimiter `{}` is not ASCII", split.delimiter))
                .with_hint("Use a single ASCII character such as `,`, `;`, or a tab.")
        })?;
    let mode = if split.quoted {
        SplitMode::Quoted
    } else {
        SplitMode::Naive
    };
    Ok(IngestOptions::default()
        .with_delimiter(delimiter)
        .with_quote(split.quote)
        .with_split(mode)
        .with_heartbeat_every(split.heartbeat))
}

fn prepare_destination(dst: &Path) -> Result<(), Error> {
    let Some(parent) = dst.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).map_err(|err| {
        csvframe::core::error::io_error(err, "failed to create destination directory")
            .with_path(parent)
    })
}

fn default_descriptor_path(dst: &Path) -> PathBuf {
    let mut name = OsString::from(dst.as_os_str());
    name.push(".json");
    PathBuf::from(name)
}

fn frame_json(frame: &Frame) -> Value {
    json!({
        "path": frame.path().display().to_string(),
        "columns": frame.column_names(),
        "schema": frame.schema(),
        "count": frame.count(),
    })
}

fn row_json(row: &[FrameValue]) -> Value {
    let cells = row
        .iter()
        .map(|value| match value {
            FrameValue::Number(number) => serde_json::Number::from_f64(*number)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FrameValue::Binary(flag) => Value::Bool(*flag),
            FrameValue::Category(text) => Value::String(text.clone()),
        })
        .collect();
    Value::Array(cells)
}
