//! Purpose: Classify frame columns as numeric or categorical from one forward scan.
//! Exports: `InferOptions`, `ColumnProfile`, `InferReport`, `infer`, `infer_report`,
//! `infer_rows`, `INTEGRAL_CATEGORY_THRESHOLD`.
//! Role: Advisory schema refinement over an all-categorical frame; never re-encodes.
//! Invariants: Only categorical cells are counted; other cells are skipped.
//! Invariants: Decision order is integral==total, then numeric==total with the
//! integral-count threshold, then categorical.
//! Invariants: The distinct-value count is reported only; it never affects the decision.
use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use crate::core::error::Error;
use crate::core::frame::Frame;
use crate::core::ingest::DEFAULT_HEARTBEAT_ROWS;
use crate::core::value::{ColumnType, FrameValue, Schema};

/// All-numeric columns with fewer integral observations than this stay categorical.
pub const INTEGRAL_CATEGORY_THRESHOLD: u64 = 30;

pub const DEFAULT_DISTINCT_CAP: usize = 1024;

#[derive(Clone, Copy, Debug)]
pub struct InferOptions {
    pub heartbeat_every: u64,
    pub distinct_cap: usize,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            heartbeat_every: DEFAULT_HEARTBEAT_ROWS,
            distinct_cap: DEFAULT_DISTINCT_CAP,
        }
    }
}

/// Running statistics for one column during a single scan.
#[derive(Clone, Debug, Default)]
struct ColumnAccumulator {
    numeric: u64,
    integral: u64,
    total: u64,
    distinct: HashSet<String>,
    distinct_capped: bool,
}

impl ColumnAccumulator {
    fn observe(&mut self, value: &str, distinct_cap: usize) {
        if let Ok(number) = value.trim().parse::<f64>() {
            self.numeric += 1;
            if number.round() == number {
                self.integral += 1;
            }
        }
        self.total += 1;

        if !self.distinct_capped && !self.distinct.contains(value) {
            if self.distinct.len() < distinct_cap {
                self.distinct.insert(value.to_string());
            } else {
                self.distinct_capped = true;
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub name: Option<String>,
    pub numeric: u64,
    pub integral: u64,
    pub total: u64,
    pub distinct: usize,
    pub distinct_capped: bool,
    pub column_type: ColumnType,
}

impl ColumnProfile {
    /// Applies the fixed decision order to the counts.
    pub fn classify(numeric: u64, integral: u64, total: u64) -> ColumnType {
        if integral == total {
            ColumnType::Numeric
        } else if numeric == total {
            if integral < INTEGRAL_CATEGORY_THRESHOLD {
                ColumnType::Categorical
            } else {
                ColumnType::Numeric
            }
        } else {
            ColumnType::Categorical
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InferReport {
    pub rows: u64,
    pub schema: Schema,
    pub columns: Vec<ColumnProfile>,
}

pub fn infer(frame: &Frame) -> Result<Schema, Error> {
    infer_report(frame, InferOptions::default()).map(|report| report.schema)
}

pub fn infer_report(frame: &Frame, options: InferOptions) -> Result<InferReport, Error> {
    let mut report = infer_rows(frame.schema().len(), frame.rows()?, options)?;
    for (profile, name) in report.columns.iter_mut().zip(frame.column_names()) {
        profile.name = Some(name.clone());
    }
    Ok(report)
}

/// Accumulates over any decoded row stream with `width` columns.
pub fn infer_rows<I>(width: usize, rows: I, options: InferOptions) -> Result<InferReport, Error>
where
    I: IntoIterator<Item = Result<Vec<FrameValue>, Error>>,
{
    let mut accumulators = vec![ColumnAccumulator::default(); width];
    let mut count = 0u64;

    for row in rows {
        let row = row?;
        count += 1;
        if options.heartbeat_every > 0 && count % options.heartbeat_every == 0 {
            info!(stage = "infer", rows = count, "progress");
        }
        for (accumulator, value) in accumulators.iter_mut().zip(&row) {
            if let Some(text) = value.as_category() {
                accumulator.observe(text, options.distinct_cap);
            }
        }
    }

    let columns = accumulators
        .into_iter()
        .map(|accumulator| ColumnProfile {
            name: None,
            numeric: accumulator.numeric,
            integral: accumulator.integral,
            total: accumulator.total,
            distinct: accumulator.distinct.len(),
            distinct_capped: accumulator.distinct_capped,
            column_type: ColumnProfile::classify(
                accumulator.numeric,
                accumulator.integral,
                accumulator.total,
            ),
        })
        .collect::<Vec<_>>();
    let schema = columns
        .iter()
        .map(|profile| profile.column_type)
        .collect::<Vec<_>>()
        .into();

    Ok(InferReport {
        rows: count,
        schema,
        columns,
    })
}
