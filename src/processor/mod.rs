use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use chrono::NaiveDate;
use thiserror::Error;

use crate::processor::column::{Cell, ColumnType};

pub mod aggregator;
pub mod column;
pub mod listing_table;
pub mod query_builder;
pub mod trend;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Schema/parse error: {0}")]
    Parse(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column {column} does not support {operation}")]
    TypeMismatch { column: String, operation: String },
}

#[derive(Debug, Default)]
pub struct ParseSummary {
    pub rows_processed: usize,
    pub errors: Vec<ParseError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// 1-based line in the source file
    pub row: u64,
    pub column: String,
    pub value: String,
    pub error: Option<String>,
}

/// Listing columns the aggregator knows how to type and filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    NeighbourhoodGroup,
    Neighbourhood,
    RoomType,
    Price,
    MinimumNights,
    LastReview,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::NeighbourhoodGroup,
        Field::Neighbourhood,
        Field::RoomType,
        Field::Price,
        Field::MinimumNights,
        Field::LastReview,
    ];

    /// Header name in the listings CSV
    pub fn column_name(self) -> &'static str {
        match self {
            Field::NeighbourhoodGroup => "neighbourhood_group",
            Field::Neighbourhood => "neighbourhood",
            Field::RoomType => "room_type",
            Field::Price => "price",
            Field::MinimumNights => "minimum_nights",
            Field::LastReview => "last_review",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column_name() == name)
    }

    pub fn column_type(self) -> ColumnType {
        match self {
            Field::NeighbourhoodGroup | Field::Neighbourhood | Field::RoomType => ColumnType::Str,
            Field::Price => ColumnType::Float64,
            Field::MinimumNights => ColumnType::Int64,
            Field::LastReview => ColumnType::Date,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Value helper for predicates (owned for simplicity)
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Whether a column of type `ty` can be compared against this value
    pub fn fits(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (Value::Int(_) | Value::Float(_), ColumnType::Int64 | ColumnType::Float64)
                | (Value::Str(_), ColumnType::Str)
                | (Value::Date(_), ColumnType::Date)
        )
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
        }
    }
}

/// Filter predicate
///
/// A row whose cell is missing or failed to parse never satisfies a
/// predicate, `NotEquals` included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterPredicate {
    Equals(Value),
    NotEquals(Value),
    GreaterThan(Value),
    GreaterOrEqual(Value),
    LessThan(Value),
    /// Inclusive on both ends
    Between(Value, Value),
    IsPresent,
}

impl FilterPredicate {
    pub fn matches(&self, cell: Option<Cell<'_>>) -> bool {
        let Some(cell) = cell else {
            return false;
        };

        match self {
            FilterPredicate::Equals(v) => cell.compare(v) == Some(Ordering::Equal),
            FilterPredicate::NotEquals(v) => {
                matches!(cell.compare(v), Some(Ordering::Less | Ordering::Greater))
            }
            FilterPredicate::GreaterThan(v) => cell.compare(v) == Some(Ordering::Greater),
            FilterPredicate::GreaterOrEqual(v) => {
                matches!(cell.compare(v), Some(Ordering::Greater | Ordering::Equal))
            }
            FilterPredicate::LessThan(v) => cell.compare(v) == Some(Ordering::Less),
            FilterPredicate::Between(lo, hi) => {
                matches!(cell.compare(lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(cell.compare(hi), Some(Ordering::Less | Ordering::Equal))
            }
            FilterPredicate::IsPresent => true,
        }
    }

    pub fn supports(&self, ty: ColumnType) -> bool {
        match self {
            FilterPredicate::Equals(v)
            | FilterPredicate::NotEquals(v)
            | FilterPredicate::GreaterThan(v)
            | FilterPredicate::GreaterOrEqual(v)
            | FilterPredicate::LessThan(v) => v.fits(ty),
            FilterPredicate::Between(lo, hi) => lo.fits(ty) && hi.fits(ty),
            FilterPredicate::IsPresent => true,
        }
    }
}

/// A predicate bound to the column it tests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    pub field: Field,
    pub predicate: FilterPredicate,
}

impl Filter {
    pub fn new(field: Field, predicate: FilterPredicate) -> Self {
        Filter { field, predicate }
    }

    pub fn equals(field: Field, value: impl Into<String>) -> Self {
        Filter::new(field, FilterPredicate::Equals(Value::str(value)))
    }

    pub fn not_equals(field: Field, value: impl Into<String>) -> Self {
        Filter::new(field, FilterPredicate::NotEquals(Value::str(value)))
    }

    pub fn present(field: Field) -> Self {
        Filter::new(field, FilterPredicate::IsPresent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cell_never_matches() {
        let pred = FilterPredicate::NotEquals(Value::str("Staten Island"));
        assert!(!pred.matches(None));
        assert!(pred.matches(Some(Cell::Str("Queens"))));
        assert!(!pred.matches(Some(Cell::Str("Staten Island"))));
    }

    #[test]
    fn test_numeric_predicates_mix_int_and_float() {
        let lt = FilterPredicate::LessThan(Value::Int(8));
        assert!(lt.matches(Some(Cell::Int(5))));
        assert!(!lt.matches(Some(Cell::Int(30))));
        assert!(lt.matches(Some(Cell::Float(7.5))));

        let between = FilterPredicate::Between(Value::Float(100.0), Value::Int(200));
        assert!(between.matches(Some(Cell::Float(100.0))));
        assert!(between.matches(Some(Cell::Int(200))));
        assert!(!between.matches(Some(Cell::Float(200.5))));
    }

    #[test]
    fn test_date_predicate() {
        let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        let pred = FilterPredicate::GreaterOrEqual(Value::Date(start));
        assert!(pred.matches(Some(Cell::Date(start))));
        assert!(!pred.matches(Some(Cell::Date(
            NaiveDate::from_ymd_opt(2013, 12, 31).unwrap()
        ))));
    }

    #[test]
    fn test_predicate_column_type_support() {
        assert!(FilterPredicate::LessThan(Value::Int(8)).supports(ColumnType::Float64));
        assert!(!FilterPredicate::LessThan(Value::Int(8)).supports(ColumnType::Str));
        assert!(!FilterPredicate::Equals(Value::str("x")).supports(ColumnType::Date));
        assert!(FilterPredicate::IsPresent.supports(ColumnType::Date));
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_column_name(field.column_name()), Some(field));
        }
        assert_eq!(Field::from_column_name("host_name"), None);
    }
}
