use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::processor::{ParseError, Value};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Str,
    Date,
}

/// One typed column of the listings table.
///
/// Typed cells that were empty or failed to parse are stored as `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Str(Vec<String>),
    Date(Vec<Option<NaiveDate>>),
}

/// Borrowed view of a single present cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Int(i64),
    Float(f64),
    Str(&'a str),
    Date(NaiveDate),
}

impl Cell<'_> {
    /// Compare against a predicate value; `None` when the kinds are incompatible
    pub fn compare(&self, value: &Value) -> Option<Ordering> {
        match (self, value) {
            (Cell::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Cell::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Cell::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Cell::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Cell::Str(a), Value::Str(b)) => Some((*a).cmp(b.as_str())),
            (Cell::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl Column {
    /// Parse raw text cells into a typed column.
    ///
    /// `lines` holds the source line of each cell and is only used for error
    /// reporting. Empty cells are missing values, not parse errors.
    pub fn parse(
        ty: ColumnType,
        header: &str,
        cells: Vec<String>,
        lines: &[u64],
    ) -> (Column, Vec<ParseError>) {
        let mut errors = Vec::new();
        let mut report = |idx: usize, raw: &str, error: String| {
            errors.push(ParseError {
                row: lines.get(idx).copied().unwrap_or_default(),
                column: header.to_string(),
                value: raw.to_string(),
                error: Some(error),
            });
        };

        let column = match ty {
            ColumnType::Str => Column::Str(cells),
            ColumnType::Int64 => Column::Int64(
                cells
                    .iter()
                    .enumerate()
                    .map(|(idx, raw)| {
                        let raw = raw.trim();
                        if raw.is_empty() {
                            return None;
                        }
                        match atoi_simd::parse::<i64>(raw.as_bytes()) {
                            Ok(v) => Some(v),
                            Err(e) => {
                                report(idx, raw, e.to_string());
                                None
                            }
                        }
                    })
                    .collect(),
            ),
            ColumnType::Float64 => Column::Float64(
                cells
                    .iter()
                    .enumerate()
                    .map(|(idx, raw)| {
                        let raw = raw.trim();
                        if raw.is_empty() {
                            return None;
                        }
                        match fast_float::parse::<f64, _>(raw) {
                            Ok(v) if v.is_finite() => Some(v),
                            Ok(v) => {
                                report(idx, raw, format!("non-finite value {v}"));
                                None
                            }
                            Err(e) => {
                                report(idx, raw, e.to_string());
                                None
                            }
                        }
                    })
                    .collect(),
            ),
            ColumnType::Date => Column::Date(
                cells
                    .iter()
                    .enumerate()
                    .map(|(idx, raw)| {
                        let raw = raw.trim();
                        if raw.is_empty() {
                            return None;
                        }
                        match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                            Ok(d) => Some(d),
                            Err(e) => {
                                report(idx, raw, e.to_string());
                                None
                            }
                        }
                    })
                    .collect(),
            ),
        };

        (column, errors)
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
            Column::Str(_) => ColumnType::Str,
            Column::Date(_) => ColumnType::Date,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present cell at `row`; empty strings count as missing
    pub fn cell(&self, row: usize) -> Option<Cell<'_>> {
        match self {
            Column::Int64(v) => v.get(row).copied().flatten().map(Cell::Int),
            Column::Float64(v) => v.get(row).copied().flatten().map(Cell::Float),
            Column::Str(v) => v
                .get(row)
                .filter(|s| !s.is_empty())
                .map(|s| Cell::Str(s.as_str())),
            Column::Date(v) => v.get(row).copied().flatten().map(Cell::Date),
        }
    }

    /// Raw group key at `row` (string columns only)
    pub fn str_at(&self, row: usize) -> Option<&str> {
        match self {
            Column::Str(v) => v.get(row).map(String::as_str),
            _ => None,
        }
    }

    /// Numeric value at `row`, widening integers
    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match self.cell(row)? {
            Cell::Int(v) => Some(v as f64),
            Cell::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn date_at(&self, row: usize) -> Option<NaiveDate> {
        match self.cell(row)? {
            Cell::Date(d) => Some(d),
            _ => None,
        }
    }
}
