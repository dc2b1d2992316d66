//! Chart views and the navigation parameters that select them.
//!
//! Each view is a fixed set of filters plus a group-by field; drill-down
//! views narrow the table to the neighbourhood group named in the
//! navigation query string.

use std::convert::Infallible;
use std::rc::Rc;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

use crate::processor::aggregator::{AggregateRecord, DEFAULT_BUCKET_THRESHOLD, OTHER_KEY};
use crate::processor::listing_table::ListingTable;
use crate::processor::query_builder::QueryCache;
use crate::processor::trend::{
    ReferencePoint, TREND_START_YEAR, TrendPoint, hotel_reference, rent_reference,
};
use crate::processor::{Field, Filter, FilterPredicate, ProcessorError, Value};

/// Listings with a longer minimum stay count as long-term rentals
pub const LONG_STAY_MIN_NIGHTS: i64 = 30;
/// Short-stay drill-down keeps listings bookable for under a week
pub const SHORT_STAY_MAX_NIGHTS: i64 = 8;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("missing navigation parameter: {0}")]
    MissingParam(&'static str),

    #[error("unknown view: {0}")]
    UnknownView(String),

    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Room-type dropdown value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoomTypeSelection {
    #[default]
    Both,
    Only(String),
}

impl RoomTypeSelection {
    pub fn filter(&self) -> Option<Filter> {
        match self {
            RoomTypeSelection::Both => None,
            RoomTypeSelection::Only(room_type) => Some(Filter::equals(Field::RoomType, room_type)),
        }
    }
}

impl FromStr for RoomTypeSelection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.is_empty() || s.eq_ignore_ascii_case("both") {
            RoomTypeSelection::Both
        } else {
            RoomTypeSelection::Only(s.to_string())
        })
    }
}

/// Parameters carried by a drill-down link, e.g.
/// `?neighbourhood_group=Staten%20Island&room_type=Private+room`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationParams {
    pub neighbourhood_group: Option<String>,
    pub room_type: RoomTypeSelection,
}

impl NavigationParams {
    /// Decode a URL query string; unknown keys are ignored, the last
    /// occurrence of a repeated key wins
    pub fn parse(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut params = NavigationParams::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "neighbourhood_group" if !value.trim().is_empty() => {
                    params.neighbourhood_group = Some(value.trim().to_string());
                }
                "room_type" => {
                    params.room_type = value.parse().unwrap_or_default();
                }
                _ => {}
            }
        }

        params
    }

    /// Encode as a query string; `parse` reads it back unchanged
    pub fn to_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(group) = &self.neighbourhood_group {
            query.append_pair("neighbourhood_group", group);
        }
        if let RoomTypeSelection::Only(room_type) = &self.room_type {
            query.append_pair("room_type", room_type);
        }
        query.finish()
    }

    fn require_group(&self) -> Result<String, ViewError> {
        self.neighbourhood_group
            .clone()
            .ok_or(ViewError::MissingParam("neighbourhood_group"))
    }
}

/// Which page of the dashboard is being computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    Overview,
    #[value(alias = "long_stay")]
    LongStay,
    #[value(alias = "short_stay")]
    ShortStay,
    #[value(alias = "drill_down")]
    DrillDown,
    Trend,
}

impl FromStr for ViewKind {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" => Ok(ViewKind::Overview),
            "long-stay" | "long_stay" => Ok(ViewKind::LongStay),
            "short-stay" | "short_stay" => Ok(ViewKind::ShortStay),
            "drill-down" | "drill_down" => Ok(ViewKind::DrillDown),
            "trend" => Ok(ViewKind::Trend),
            other => Err(ViewError::UnknownView(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartView {
    /// Every priced listing by neighbourhood group
    Overview,
    /// Long-term rentals by neighbourhood group
    LongStay,
    /// Short stays inside one neighbourhood group, by neighbourhood
    ShortStayDrillDown {
        group: String,
        room_type: RoomTypeSelection,
    },
    /// Every listing inside one neighbourhood group, by neighbourhood
    DrillDown { group: String },
    /// Average price per review year
    PriceTrend { room_type: RoomTypeSelection },
}

/// Data handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "chart", rename_all = "camelCase")]
pub enum ViewOutput {
    #[serde(rename_all = "camelCase")]
    Pie {
        records: Vec<AggregateRecord>,
        price_extent: Option<PriceExtent>,
    },
    #[serde(rename_all = "camelCase")]
    Line {
        points: Vec<TrendPoint>,
        hotel: Vec<ReferencePoint>,
        rent: Vec<ReferencePoint>,
    },
}

/// Rounded range of per-slice average prices, used for the colour legend
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceExtent {
    pub min: f64,
    pub max: f64,
}

impl PriceExtent {
    pub fn caption(&self) -> String {
        format!("${} to ${}", self.min, self.max)
    }
}

pub fn price_extent(records: &[AggregateRecord]) -> Option<PriceExtent> {
    let mut prices = records.iter().map(|r| r.average_price);
    let first = prices.next()?;
    let (min, max) = prices.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
    Some(PriceExtent {
        min: min.round(),
        max: max.round(),
    })
}

impl ChartView {
    pub fn from_navigation(kind: ViewKind, params: &NavigationParams) -> Result<Self, ViewError> {
        Ok(match kind {
            ViewKind::Overview => ChartView::Overview,
            ViewKind::LongStay => ChartView::LongStay,
            ViewKind::ShortStay => ChartView::ShortStayDrillDown {
                group: params.require_group()?,
                room_type: params.room_type.clone(),
            },
            ViewKind::DrillDown => ChartView::DrillDown {
                group: params.require_group()?,
            },
            ViewKind::Trend => ChartView::PriceTrend {
                room_type: params.room_type.clone(),
            },
        })
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            ChartView::Overview => ViewKind::Overview,
            ChartView::LongStay => ViewKind::LongStay,
            ChartView::ShortStayDrillDown { .. } => ViewKind::ShortStay,
            ChartView::DrillDown { .. } => ViewKind::DrillDown,
            ChartView::PriceTrend { .. } => ViewKind::Trend,
        }
    }

    /// Parameters that reopen this view through [`Self::from_navigation`]
    pub fn navigation(&self) -> NavigationParams {
        match self {
            ChartView::Overview | ChartView::LongStay => NavigationParams::default(),
            ChartView::ShortStayDrillDown { group, room_type } => NavigationParams {
                neighbourhood_group: Some(group.clone()),
                room_type: room_type.clone(),
            },
            ChartView::DrillDown { group } => NavigationParams {
                neighbourhood_group: Some(group.clone()),
                room_type: RoomTypeSelection::Both,
            },
            ChartView::PriceTrend { room_type } => NavigationParams {
                neighbourhood_group: None,
                room_type: room_type.clone(),
            },
        }
    }

    /// View opened by clicking the slice `key`.
    ///
    /// Overview slices open the short-stay drill-down, long-stay slices the
    /// plain drill-down. Drill-downs, the trend chart and the `"Other"`
    /// slice lead nowhere.
    pub fn drill_target(&self, key: &str) -> Option<ChartView> {
        if key == OTHER_KEY {
            return None;
        }
        match self {
            ChartView::Overview => Some(ChartView::ShortStayDrillDown {
                group: key.to_string(),
                room_type: RoomTypeSelection::Both,
            }),
            ChartView::LongStay => Some(ChartView::DrillDown {
                group: key.to_string(),
            }),
            ChartView::ShortStayDrillDown { .. }
            | ChartView::DrillDown { .. }
            | ChartView::PriceTrend { .. } => None,
        }
    }

    pub fn filters(&self) -> Vec<Filter> {
        match self {
            ChartView::Overview => Vec::new(),
            ChartView::LongStay => vec![Filter::new(
                Field::MinimumNights,
                FilterPredicate::GreaterThan(Value::Int(LONG_STAY_MIN_NIGHTS)),
            )],
            ChartView::ShortStayDrillDown { group, room_type } => {
                let mut filters = vec![
                    Filter::equals(Field::NeighbourhoodGroup, group),
                    Filter::new(
                        Field::MinimumNights,
                        FilterPredicate::LessThan(Value::Int(SHORT_STAY_MAX_NIGHTS)),
                    ),
                ];
                filters.extend(room_type.filter());
                filters
            }
            ChartView::DrillDown { group } => {
                vec![Filter::equals(Field::NeighbourhoodGroup, group)]
            }
            ChartView::PriceTrend { room_type } => {
                let start = NaiveDate::from_ymd_opt(TREND_START_YEAR, 1, 1)
                    .unwrap_or(NaiveDate::MIN);
                let mut filters = vec![Filter::new(
                    Field::LastReview,
                    FilterPredicate::GreaterOrEqual(Value::Date(start)),
                )];
                filters.extend(room_type.filter());
                filters
            }
        }
    }

    /// `None` for the line chart
    pub fn group_by(&self) -> Option<Field> {
        match self {
            ChartView::Overview | ChartView::LongStay => Some(Field::NeighbourhoodGroup),
            ChartView::ShortStayDrillDown { .. } | ChartView::DrillDown { .. } => {
                Some(Field::Neighbourhood)
            }
            ChartView::PriceTrend { .. } => None,
        }
    }

    /// Overview pies show every borough; drill-downs bucket small neighbourhoods
    pub fn default_threshold(&self) -> usize {
        match self {
            ChartView::ShortStayDrillDown { .. } | ChartView::DrillDown { .. } => {
                DEFAULT_BUCKET_THRESHOLD
            }
            ChartView::Overview | ChartView::LongStay | ChartView::PriceTrend { .. } => 0,
        }
    }

    /// Compute the view's data. `threshold` overrides [`Self::default_threshold`].
    pub fn compute(
        &self,
        table: &Rc<ListingTable>,
        cache: Option<&Rc<QueryCache>>,
        threshold: Option<usize>,
    ) -> Result<ViewOutput, ViewError> {
        let query = match cache {
            Some(cache) => table.query_with_cache(cache),
            None => table.query(),
        }
        .filters(self.filters());

        match self.group_by() {
            Some(field) => {
                let records = query
                    .group_by(field)
                    .bucket_threshold(threshold.unwrap_or_else(|| self.default_threshold()))
                    .execute()?;
                let price_extent = price_extent(&records);
                Ok(ViewOutput::Pie {
                    records,
                    price_extent,
                })
            }
            None => Ok(ViewOutput::Line {
                points: query.trend()?,
                hotel: hotel_reference(),
                rent: rent_reference(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::listing_table::Listing;

    #[test]
    fn test_parse_navigation_query() {
        let params =
            NavigationParams::parse("?neighbourhood_group=Staten%20Island&room_type=Private+room");
        assert_eq!(params.neighbourhood_group.as_deref(), Some("Staten Island"));
        assert_eq!(
            params.room_type,
            RoomTypeSelection::Only("Private room".into())
        );
    }

    #[test]
    fn test_parse_navigation_defaults() {
        let params = NavigationParams::parse("room_type=both&utm_source=x");
        assert_eq!(params.neighbourhood_group, None);
        assert_eq!(params.room_type, RoomTypeSelection::Both);
        assert_eq!(NavigationParams::parse(""), NavigationParams::default());
    }

    #[test]
    fn test_navigation_query_round_trip() {
        let params = NavigationParams {
            neighbourhood_group: Some("Staten Island".into()),
            room_type: RoomTypeSelection::Only("Private room".into()),
        };
        let query = params.to_query();
        assert_eq!(
            query,
            "neighbourhood_group=Staten+Island&room_type=Private+room"
        );
        assert_eq!(NavigationParams::parse(&query), params);
        assert_eq!(NavigationParams::default().to_query(), "");
    }

    #[test]
    fn test_drill_targets() {
        assert_eq!(
            ChartView::Overview.drill_target("Staten Island"),
            Some(ChartView::ShortStayDrillDown {
                group: "Staten Island".into(),
                room_type: RoomTypeSelection::Both,
            })
        );
        assert_eq!(
            ChartView::LongStay.drill_target("Bronx"),
            Some(ChartView::DrillDown {
                group: "Bronx".into()
            })
        );
        assert_eq!(ChartView::Overview.drill_target(OTHER_KEY), None);
        let drill = ChartView::DrillDown {
            group: "Bronx".into(),
        };
        assert_eq!(drill.drill_target("Fordham"), None);
        let trend = ChartView::PriceTrend {
            room_type: RoomTypeSelection::Both,
        };
        assert_eq!(trend.drill_target("2019"), None);
    }

    #[test]
    fn test_drill_target_link_reopens_view() {
        let target = ChartView::Overview.drill_target("Staten Island").unwrap();
        let params = NavigationParams::parse(&target.navigation().to_query());
        assert_eq!(
            ChartView::from_navigation(target.kind(), &params).unwrap(),
            target
        );
    }

    #[test]
    fn test_overview_counts_only_priced_listings() {
        let mut unpriced = Listing::new("Manhattan", "Harlem", 0.0);
        unpriced.price = None;
        let table = Rc::new(ListingTable::from_listings(vec![
            Listing::new("Manhattan", "Harlem", 100.0),
            Listing::new("Manhattan", "Chelsea", 300.0),
            unpriced,
            Listing::new("Bronx", "Fordham", 60.0),
        ]));

        let ViewOutput::Pie { records, .. } = ChartView::Overview.compute(&table, None, None).unwrap()
        else {
            panic!("Expected pie output");
        };
        assert_eq!(records[0].key, "Manhattan");
        assert_eq!(records[0].count, 2);
        assert_eq!(records[0].average_price, 200.0);
        let total: usize = records.iter().map(|r| r.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_drill_down_requires_group() {
        let err = ChartView::from_navigation(ViewKind::DrillDown, &NavigationParams::default())
            .unwrap_err();
        assert!(matches!(err, ViewError::MissingParam("neighbourhood_group")));
    }

    #[test]
    fn test_view_kind_from_str() {
        assert_eq!("long-stay".parse::<ViewKind>().unwrap(), ViewKind::LongStay);
        assert_eq!("Trend".parse::<ViewKind>().unwrap(), ViewKind::Trend);
        assert!(matches!(
            "scatter".parse::<ViewKind>(),
            Err(ViewError::UnknownView(_))
        ));
    }

    #[test]
    fn test_short_stay_filters() {
        let view = ChartView::ShortStayDrillDown {
            group: "Queens".into(),
            room_type: RoomTypeSelection::Only("Shared room".into()),
        };
        let filters = view.filters();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[0], Filter::equals(Field::NeighbourhoodGroup, "Queens"));
        assert_eq!(filters[2], Filter::equals(Field::RoomType, "Shared room"));
        assert_eq!(view.default_threshold(), DEFAULT_BUCKET_THRESHOLD);
    }

    #[test]
    fn test_price_extent_rounds() {
        let record = |p: f64| AggregateRecord {
            key: "k".into(),
            count: 1,
            average_price: p,
            percentage: 0.0,
        };
        let extent = price_extent(&[record(81.4), record(212.6), record(150.0)]).unwrap();
        assert_eq!(extent, PriceExtent { min: 81.0, max: 213.0 });
        assert_eq!(extent.caption(), "$81 to $213");
        assert_eq!(price_extent(&[]), None);
    }

    #[test]
    fn test_long_stay_view_computes_pie() {
        let table = Rc::new(ListingTable::from_listings(vec![
            Listing::new("Manhattan", "Harlem", 100.0).minimum_nights(31),
            Listing::new("Manhattan", "Harlem", 300.0).minimum_nights(60),
            Listing::new("Bronx", "Fordham", 50.0).minimum_nights(30),
        ]));

        let output = ChartView::LongStay.compute(&table, None, None).unwrap();
        match output {
            ViewOutput::Pie {
                records,
                price_extent,
            } => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].key, "Manhattan");
                assert_eq!(records[0].average_price, 200.0);
                assert_eq!(price_extent, Some(PriceExtent { min: 200.0, max: 200.0 }));
            }
            other => panic!("Expected pie output, got {other:?}"),
        }
    }

    #[test]
    fn test_trend_view_skips_old_reviews() {
        let date = |y| NaiveDate::from_ymd_opt(y, 3, 1).unwrap();
        let table = Rc::new(ListingTable::from_listings(vec![
            Listing::new("Queens", "Astoria", 90.0).last_review(date(2013)),
            Listing::new("Queens", "Astoria", 110.0).last_review(date(2014)),
            Listing::new("Queens", "Astoria", 130.0)
                .room_type("Private room")
                .last_review(date(2014)),
        ]));

        let view = ChartView::PriceTrend {
            room_type: RoomTypeSelection::Both,
        };
        let ViewOutput::Line { points, hotel, rent } = view.compute(&table, None, None).unwrap()
        else {
            panic!("Expected line output");
        };
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].year, 2014);
        assert_eq!(points[0].count, 2);
        assert_eq!(points[0].average_price, 120.0);
        assert_eq!(hotel.len(), rent.len());
    }
}
