//! # listings-aggregator
//!
//! Turns the NYC Airbnb listings CSV into the small record sets the
//! dashboard charts draw: one record per neighbourhood (group) with its
//! listing count, average nightly price and share of the total, small
//! groups folded into `"Other"`.
//!
//! # Features
//!
//! - **Columnar loading**: memory-mapped CSV, quoted fields, parallel typing of
//!   `price`, `minimum_nights` and `last_review`
//! - **Filtering**: equals, not-equals, greater/less-than, between, presence
//! - **Group-by** on neighbourhood group or neighbourhood with threshold bucketing
//! - **Trend**: average price per review year alongside hotel and rent baselines
//! - **Views**: the dashboard's overview and drill-down pages, selected by
//!   URL-style navigation parameters
//! - **Cached queries** through an LRU keyed by the full query
//!
//! # Example
//!
//! ```rust,no_run
//! use listings_aggregator::processor::{Field, Filter, aggregator::aggregate};
//! use listings_aggregator::processor::listing_table::ListingTable;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut table = ListingTable::new();
//!     table.load_csv(Path::new("NYC-Airbnb-2023.csv"))?;
//!
//!     let filters = [Filter::equals(Field::NeighbourhoodGroup, "Queens")];
//!     for record in aggregate(&table, &filters, Field::Neighbourhood, 50)? {
//!         println!("{} => {} listings @ ${:.2}", record.key, record.count, record.average_price);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod processor;
pub mod view;

pub use processor::aggregator::{AggregateRecord, DEFAULT_BUCKET_THRESHOLD, OTHER_KEY, aggregate};
pub use processor::listing_table::{Listing, ListingTable};
pub use processor::{Field, Filter, FilterPredicate, ProcessorError, Value};
