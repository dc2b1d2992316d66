//! Per-year price series for the trend line chart.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::processor::{
    Field, Filter, ProcessorError, aggregator::GroupTotals, listing_table::ListingTable,
};

/// First review year plotted by the trend view
pub const TREND_START_YEAR: i32 = 2014;

/// Average NYC hotel nightly rate, USD
pub const HOTEL_NIGHTLY_PRICES: [(i32, f64); 10] = [
    (2014, 171.00),
    (2015, 174.60),
    (2016, 170.21),
    (2017, 153.73),
    (2018, 132.23),
    (2019, 114.93),
    (2020, 90.92),
    (2021, 139.84),
    (2022, 148.83),
    (2023, 212.00),
];

/// Average NYC monthly rent, USD
pub const MONTHLY_RENT: [(i32, f64); 10] = [
    (2014, 3700.0),
    (2015, 3805.0),
    (2016, 4215.0),
    (2017, 4330.0),
    (2018, 4432.0),
    (2019, 4636.0),
    (2020, 4360.0),
    (2021, 4000.0),
    (2022, 3657.0),
    (2023, 3657.0),
];

const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub year: i32,
    pub count: usize,
    pub average_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePoint {
    pub year: i32,
    pub nightly_price: f64,
}

/// Average listing price per year of last review, ascending by year.
///
/// Only rows with both a review date and a price are counted.
pub fn yearly_trend(
    table: &ListingTable,
    filters: &[Filter],
) -> Result<Vec<TrendPoint>, ProcessorError> {
    let reviews = table.field(Field::LastReview)?;
    let prices = table.field(Field::Price)?;

    let mut all_filters = filters.to_vec();
    all_filters.push(Filter::present(Field::LastReview));
    all_filters.push(Filter::present(Field::Price));
    let rows = table.apply_filters(&all_filters)?;

    let mut years: BTreeMap<i32, GroupTotals> = BTreeMap::new();
    for row in rows {
        let (Some(date), Some(price)) = (reviews.date_at(row), prices.f64_at(row)) else {
            continue;
        };
        years.entry(date.year()).or_default().add(price);
    }

    Ok(years
        .into_iter()
        .map(|(year, totals)| TrendPoint {
            year,
            count: totals.count,
            average_price: totals.average(),
        })
        .collect())
}

pub fn hotel_reference() -> Vec<ReferencePoint> {
    HOTEL_NIGHTLY_PRICES
        .iter()
        .map(|&(year, nightly_price)| ReferencePoint {
            year,
            nightly_price,
        })
        .collect()
}

/// Monthly rent spread over a 30-night month
pub fn rent_reference() -> Vec<ReferencePoint> {
    MONTHLY_RENT
        .iter()
        .map(|&(year, monthly)| ReferencePoint {
            year,
            nightly_price: monthly / DAYS_PER_MONTH,
        })
        .collect()
}
