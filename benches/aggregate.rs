use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use listings_aggregator::processor::query_builder::QueryCache;
use listings_aggregator::processor::{Field, Filter, FilterPredicate, Value};
use listings_aggregator::{Listing, ListingTable, aggregate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

const ROWS: usize = 1_000_000;

fn synthetic_table() -> ListingTable {
    let groups = ["Manhattan", "Brooklyn", "Queens", "Bronx", "Staten Island"];
    let mut rng = StdRng::seed_from_u64(7);
    ListingTable::from_listings((0..ROWS).map(|_| {
        let g = rng.random_range(0..groups.len());
        let n = rng.random_range(0..40);
        Listing::new(groups[g], &format!("{}-{n}", groups[g]), rng.random_range(30.0..900.0))
            .minimum_nights(rng.random_range(1..60))
    }))
}

fn aggregate_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("ListingTable");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ROWS as u64));

    let table = Rc::new(synthetic_table());
    let drill_down = [
        Filter::equals(Field::NeighbourhoodGroup, "Brooklyn"),
        Filter::new(Field::MinimumNights, FilterPredicate::LessThan(Value::Int(8))),
    ];

    group.bench_function("overview_by_group", |b| {
        b.iter(|| aggregate(&table, &[], Field::NeighbourhoodGroup, 0).unwrap())
    });

    group.bench_function("short_stay_drill_down", |b| {
        b.iter(|| aggregate(&table, &drill_down, Field::Neighbourhood, 50).unwrap())
    });

    group.bench_function("short_stay_drill_down_cached", |b| {
        let cache = Rc::new(QueryCache::new());
        b.iter(|| {
            table
                .query_with_cache(&cache)
                .filters(drill_down.clone())
                .group_by(Field::Neighbourhood)
                .execute()
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, aggregate_benches);
criterion_main!(benches);
