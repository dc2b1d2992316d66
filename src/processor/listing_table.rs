use std::{fs::File, path::Path};

use chrono::NaiveDate;
use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, warn};

use crate::processor::{
    Field, Filter, FilterPredicate, ParseError, ParseSummary, ProcessorError,
    column::{Column, ColumnType},
};

/// In-memory columnar listings table
///
/// # Examples
///
/// ```rust,no_run
/// # use listings_aggregator::processor::listing_table::ListingTable;
/// let mut table = ListingTable::new();
/// let summary = table.load_csv("NYC-Airbnb-2023.csv".as_ref()).unwrap();
/// println!("{} rows, {} bad cells", summary.rows_processed, summary.errors.len());
/// ```
#[derive(Debug, Default, Clone)]
pub struct ListingTable {
    columns: Vec<Column>,
    headers: Vec<String>,
    row_count: usize,
}

/// One listing, already typed. Used to build tables without a CSV file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Listing {
    pub neighbourhood_group: String,
    pub neighbourhood: String,
    pub room_type: String,
    pub price: Option<f64>,
    pub minimum_nights: Option<i64>,
    pub last_review: Option<NaiveDate>,
}

impl Listing {
    pub fn new(neighbourhood_group: &str, neighbourhood: &str, price: f64) -> Self {
        Listing {
            neighbourhood_group: neighbourhood_group.to_string(),
            neighbourhood: neighbourhood.to_string(),
            room_type: "Entire home/apt".to_string(),
            price: Some(price),
            minimum_nights: Some(1),
            last_review: None,
        }
    }

    pub fn room_type(mut self, room_type: &str) -> Self {
        self.room_type = room_type.to_string();
        self
    }

    pub fn minimum_nights(mut self, nights: i64) -> Self {
        self.minimum_nights = Some(nights);
        self
    }

    pub fn last_review(mut self, date: NaiveDate) -> Self {
        self.last_review = Some(date);
        self
    }
}

impl ListingTable {
    /// Create an empty table
    pub fn new() -> Self {
        ListingTable {
            columns: Vec::new(),
            headers: Vec::new(),
            row_count: 0,
        }
    }

    /// Build a table holding exactly the known listing columns
    pub fn from_listings(listings: impl IntoIterator<Item = Listing>) -> Self {
        let listings: Vec<Listing> = listings.into_iter().collect();

        let columns = Field::ALL
            .iter()
            .map(|field| match field {
                Field::NeighbourhoodGroup => Column::Str(
                    listings
                        .iter()
                        .map(|l| l.neighbourhood_group.clone())
                        .collect(),
                ),
                Field::Neighbourhood => {
                    Column::Str(listings.iter().map(|l| l.neighbourhood.clone()).collect())
                }
                Field::RoomType => {
                    Column::Str(listings.iter().map(|l| l.room_type.clone()).collect())
                }
                Field::Price => Column::Float64(
                    listings
                        .iter()
                        .map(|l| l.price.filter(|p| p.is_finite()))
                        .collect(),
                ),
                Field::MinimumNights => {
                    Column::Int64(listings.iter().map(|l| l.minimum_nights).collect())
                }
                Field::LastReview => Column::Date(listings.iter().map(|l| l.last_review).collect()),
            })
            .collect();

        ListingTable {
            columns,
            headers: Field::ALL
                .iter()
                .map(|f| f.column_name().to_string())
                .collect(),
            row_count: listings.len(),
        }
    }

    /// Loads a listings CSV through a memory map
    ///
    /// Known listing columns are typed (see [`Field::column_type`]); every
    /// other column stays text.
    ///
    /// # Errors
    /// Returns a [`ProcessorError`] if:
    /// - File cannot be opened or mapped
    /// - File is empty or the header cannot be read
    pub fn load_csv(&mut self, path: &Path) -> Result<ParseSummary, ProcessorError> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(ProcessorError::Parse("Missing header line".into()));
        }
        let mmap = unsafe { Mmap::map(&file)? };

        let summary = self.load_bytes(&mmap[..])?;
        info!(
            path = %path.display(),
            rows = summary.rows_processed,
            parse_errors = summary.errors.len(),
            "loaded listings"
        );
        Ok(summary)
    }

    /// Loads CSV text already in memory. Replaces any previous contents.
    pub fn load_bytes(&mut self, buf: &[u8]) -> Result<ParseSummary, ProcessorError> {
        // line count is an upper bound on records; quoted newlines only shrink it
        let estimated_rows = memchr_iter(b'\n', buf).count();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(buf);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(ProcessorError::Parse("Missing header line".into()));
        }

        let mut raw: Vec<Vec<String>> = headers
            .iter()
            .map(|_| Vec::with_capacity(estimated_rows))
            .collect();
        let mut lines: Vec<u64> = Vec::with_capacity(estimated_rows);
        let mut errors = Vec::new();
        let mut record = csv::StringRecord::new();

        loop {
            match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    if record.len() != headers.len() {
                        errors.push(ParseError {
                            row: line,
                            column: "".to_string(),
                            value: format!(
                                "Expected {} fields, got {}",
                                headers.len(),
                                record.len()
                            ),
                            error: None,
                        });
                        continue;
                    }
                    for (col, field) in raw.iter_mut().zip(record.iter()) {
                        col.push(field.to_string());
                    }
                    lines.push(line);
                }
                Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                    errors.push(ParseError {
                        row: e.position().map(|p| p.line()).unwrap_or_default(),
                        column: "".to_string(),
                        value: "".to_string(),
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let row_count = lines.len();

        // Parse columns in parallel
        let parsed: Vec<(Column, Vec<ParseError>)> = raw
            .into_par_iter()
            .zip(headers.clone())
            .map(|(cells, header)| {
                let ty = Field::from_column_name(&header)
                    .map(Field::column_type)
                    .unwrap_or(ColumnType::Str);
                Column::parse(ty, &header, cells, &lines)
            })
            .collect();

        let mut columns = Vec::with_capacity(parsed.len());
        for (column, column_errors) in parsed {
            errors.extend(column_errors);
            columns.push(column);
        }

        if !errors.is_empty() {
            warn!(count = errors.len(), "listings contained unparseable cells");
            for e in &errors {
                debug!(row = e.row, column = %e.column, value = %e.value, error = ?e.error, "parse error");
            }
        }

        self.columns = columns;
        self.headers = headers;
        self.row_count = row_count;

        Ok(ParseSummary {
            rows_processed: row_count,
            errors,
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn get_col(&self, col_name: &str) -> Result<&Column, ProcessorError> {
        let col_pos = self
            .headers
            .iter()
            .position(|cn| cn == col_name)
            .ok_or_else(|| ProcessorError::MissingColumn(col_name.to_string()))?;

        self.columns
            .get(col_pos)
            .ok_or_else(|| ProcessorError::MissingColumn(col_name.to_string()))
    }

    /// Typed column for a known listing field
    pub fn field(&self, field: Field) -> Result<&Column, ProcessorError> {
        let col = self.get_col(field.column_name())?;
        if col.column_type() != field.column_type() {
            return Err(ProcessorError::TypeMismatch {
                column: field.column_name().to_string(),
                operation: format!("{:?} access", field.column_type()),
            });
        }
        Ok(col)
    }

    /// Row indices (ascending) whose `field` satisfies `predicate`
    pub fn filter(
        &self,
        field: Field,
        predicate: &FilterPredicate,
    ) -> Result<Vec<usize>, ProcessorError> {
        let col = self.field(field)?;

        if !predicate.supports(col.column_type()) {
            return Err(ProcessorError::TypeMismatch {
                column: field.column_name().to_string(),
                operation: format!("{predicate:?}"),
            });
        }

        Ok((0..self.row_count)
            .into_par_iter()
            .filter(|&row| predicate.matches(col.cell(row)))
            .collect())
    }

    /// Conjunction of all filters; every row when `filters` is empty
    pub fn apply_filters(&self, filters: &[Filter]) -> Result<Vec<usize>, ProcessorError> {
        let mut filtered_rows: Option<Vec<usize>> = None;

        for Filter { field, predicate } in filters {
            let current = self.filter(*field, predicate)?;
            filtered_rows = Some(match filtered_rows {
                None => current,
                Some(existing) => intersect_sorted_vecs(&existing, &current),
            });
        }

        Ok(filtered_rows.unwrap_or_else(|| (0..self.row_count).collect()))
    }
}

/// Intersect two ascending index lists
fn intersect_sorted_vecs(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(a.len().min(b.len()));
    let mut i = 0;
    let mut j = 0;

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }

    result
}
