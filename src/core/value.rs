//! Purpose: Column-type tags, decoded cell values, and the per-frame schema.
//! Exports: `ColumnType`, `FrameValue`, `Schema`.
//! Role: Shared vocabulary for the codec, ingestor, and inferencer.
//! Invariants: `FrameValue` is closed over exactly three cases; every match is exhaustive.
//! Invariants: A schema is fixed for the lifetime of a frame.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Categorical,
    Numeric,
    Binary,
}

impl ColumnType {
    /// One-letter form used by the compact schema syntax (`c,n,b`).
    pub fn letter(self) -> char {
        match self {
            ColumnType::Categorical => 'c',
            ColumnType::Numeric => 'n',
            ColumnType::Binary => 'b',
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Categorical => "categorical",
            ColumnType::Numeric => "numeric",
            ColumnType::Binary => "binary",
        };
        f.write_str(name)
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "c" | "categorical" => Ok(ColumnType::Categorical),
            "n" | "numeric" => Ok(ColumnType::Numeric),
            "b" | "binary" => Ok(ColumnType::Binary),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown column type `{other}`"))
                .with_hint("Use n|numeric, c|categorical, or b|binary.")),
        }
    }
}

/// A single decoded cell.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameValue {
    Number(f64),
    Binary(bool),
    Category(String),
}

impl FrameValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            FrameValue::Number(_) => ColumnType::Numeric,
            FrameValue::Binary(_) => ColumnType::Binary,
            FrameValue::Category(_) => ColumnType::Categorical,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FrameValue::Category(value) => Some(value),
            FrameValue::Number(_) | FrameValue::Binary(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(Vec<ColumnType>);

impl Schema {
    pub fn new(columns: Vec<ColumnType>) -> Self {
        Self(columns)
    }

    pub fn uniform(column_type: ColumnType, len: usize) -> Self {
        Self(vec![column_type; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> &[ColumnType] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnType> {
        self.0.iter()
    }

    /// Compact letter form, e.g. `ncc`.
    pub fn letters(&self) -> String {
        self.0.iter().map(|column| column.letter()).collect()
    }
}

impl From<Vec<ColumnType>> for Schema {
    fn from(columns: Vec<ColumnType>) -> Self {
        Self(columns)
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a ColumnType;
    type IntoIter = std::slice::Iter<'a, ColumnType>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromStr for Schema {
    type Err = Error;

    /// Parses a comma-separated list such as `n,c,binary`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        value
            .split(',')
            .map(ColumnType::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .0
            .iter()
            .map(|column| column.letter().to_string())
            .collect::<Vec<_>>();
        f.write_str(&parts.join(","))
    }
}
