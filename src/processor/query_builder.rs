use lru::LruCache;
use tracing::debug;

use crate::processor::aggregator::{AggregateRecord, DEFAULT_BUCKET_THRESHOLD, aggregate};
use crate::processor::listing_table::ListingTable;
use crate::processor::trend::{TrendPoint, yearly_trend};
use crate::processor::{Field, Filter, FilterPredicate, ProcessorError};
use std::cell::RefCell;

/// Everything that determines an aggregation result
#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub struct QueryKey {
    filters: Vec<Filter>,
    group_by: Field,
    bucket_threshold: usize,
}

use std::num::NonZeroUsize;
use std::rc::Rc;

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(n) => n,
    None => unreachable!(),
};

/// LRU of recent aggregation results, owned by the view that issues queries
#[derive(Debug)]
pub struct QueryCache {
    cache: RefCell<LruCache<QueryKey, Vec<AggregateRecord>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<Vec<AggregateRecord>> {
        self.cache.borrow_mut().get(key).cloned()
    }

    pub fn put(&self, key: QueryKey, value: Vec<AggregateRecord>) {
        self.cache.borrow_mut().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent front end over [`aggregate`] and [`yearly_trend`]
///
/// ```rust
/// # use std::rc::Rc;
/// # use listings_aggregator::processor::{Field, FilterPredicate, Value};
/// # use listings_aggregator::processor::listing_table::{Listing, ListingTable};
/// let table = Rc::new(ListingTable::from_listings(vec![
///     Listing::new("Queens", "Astoria", 80.0).minimum_nights(2),
/// ]));
/// let records = table
///     .query()
///     .filter(Field::MinimumNights, FilterPredicate::LessThan(Value::Int(8)))
///     .group_by(Field::Neighbourhood)
///     .bucket_threshold(0)
///     .execute()
///     .unwrap();
/// assert_eq!(records[0].key, "Astoria");
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: Rc<ListingTable>,
    cache: Option<Rc<QueryCache>>,
    filters: Vec<Filter>,
    group_by: Option<Field>,
    bucket_threshold: usize,
}

impl QueryBuilder {
    pub fn new(table: Rc<ListingTable>, cache: Option<Rc<QueryCache>>) -> Self {
        Self {
            table,
            cache,
            filters: Vec::new(),
            group_by: None,
            bucket_threshold: DEFAULT_BUCKET_THRESHOLD,
        }
    }

    /// Add a filter condition
    pub fn filter(mut self, field: Field, predicate: FilterPredicate) -> Self {
        self.filters.push(Filter::new(field, predicate));
        self
    }

    /// Add multiple filter conditions
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn group_by(mut self, field: Field) -> Self {
        self.group_by = Some(field);
        self
    }

    pub fn bucket_threshold(mut self, threshold: usize) -> Self {
        self.bucket_threshold = threshold;
        self
    }

    /// Bypass the cache for this query
    pub fn no_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Run the grouped aggregation, consulting the cache when present
    pub fn execute(self) -> Result<Vec<AggregateRecord>, ProcessorError> {
        let group_by = self
            .group_by
            .ok_or_else(|| ProcessorError::Parse("query has no group-by field".into()))?;

        let key = QueryKey {
            filters: self.filters,
            group_by,
            bucket_threshold: self.bucket_threshold,
        };

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                debug!(group_by = %group_by, filters = key.filters.len(), "query cache hit");
                return Ok(hit);
            }
        }

        let records = aggregate(&self.table, &key.filters, group_by, key.bucket_threshold)?;
        debug!(
            group_by = %group_by,
            filters = key.filters.len(),
            groups = records.len(),
            "aggregated listings"
        );

        if let Some(cache) = &self.cache {
            cache.put(key, records.clone());
        }
        Ok(records)
    }

    /// Yearly price trend over the filtered rows; ignores group-by and threshold
    pub fn trend(self) -> Result<Vec<TrendPoint>, ProcessorError> {
        yearly_trend(&self.table, &self.filters)
    }
}

impl ListingTable {
    pub fn query(self: &Rc<Self>) -> QueryBuilder {
        QueryBuilder::new(self.clone(), None)
    }

    pub fn query_with_cache(self: &Rc<Self>, cache: &Rc<QueryCache>) -> QueryBuilder {
        QueryBuilder::new(self.clone(), Some(cache.clone()))
    }
}
