//! the wrangler-flavored GTFS feed: an interrelated set of transit tables.

pub mod convert;
pub mod frequencies;
pub mod routes;
pub mod segments;
pub mod shapes;
pub mod stop_times;
pub mod stops;
pub mod tables;
pub mod trips;

pub use tables::{Agency, Frequency, Route, ShapePoint, Stop, StopTime, Trip};

use std::collections::HashSet;

use crate::error::TransitError;
use switchyard_core::table::{check_fk_values, db_hash, table_hash, validate_rows};
use switchyard_core::time::Time;

/// the raw tables of a feed, used to construct a [`Feed`].
#[derive(Debug, Clone, Default)]
pub struct FeedTables {
    pub agencies: Vec<Agency>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub shapes: Vec<ShapePoint>,
    pub stops: Vec<Stop>,
    pub stop_times: Vec<StopTime>,
    pub frequencies: Vec<Frequency>,
}

/// a transit feed. tables are only replaced through the `commit_*` methods,
/// which validate the incoming table, check foreign keys in both directions,
/// and recompute the content hash. the agencies table is optional; all other
/// tables are required (but may be empty).
#[derive(Debug, Clone, Default)]
pub struct Feed {
    agencies: Vec<Agency>,
    routes: Vec<Route>,
    trips: Vec<Trip>,
    shapes: Vec<ShapePoint>,
    stops: Vec<Stop>,
    stop_times: Vec<StopTime>,
    frequencies: Vec<Frequency>,
    hash: String,
}

impl Feed {
    /// build a feed from raw tables. tables are committed in dependency
    /// order so that foreign keys can be checked as each table lands.
    pub fn new(tables: FeedTables) -> Result<Feed, TransitError> {
        let mut feed = Feed::default();
        feed.commit_agencies(tables.agencies)?;
        feed.commit_routes(tables.routes)?;
        feed.commit_stops(tables.stops)?;
        feed.commit_shapes(tables.shapes)?;
        feed.commit_trips(tables.trips)?;
        feed.commit_stop_times(tables.stop_times)?;
        feed.commit_frequencies(tables.frequencies)?;
        Ok(feed)
    }

    pub fn agencies(&self) -> &[Agency] {
        &self.agencies
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn shapes(&self) -> &[ShapePoint] {
        &self.shapes
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop_times(&self) -> &[StopTime] {
        &self.stop_times
    }

    pub fn frequencies(&self) -> &[Frequency] {
        &self.frequencies
    }

    /// content hash over all tables, in the feed's fixed table order.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// the tables of this feed, by value.
    pub fn to_tables(&self) -> FeedTables {
        FeedTables {
            agencies: self.agencies.clone(),
            routes: self.routes.clone(),
            trips: self.trips.clone(),
            shapes: self.shapes.clone(),
            stops: self.stops.clone(),
            stop_times: self.stop_times.clone(),
            frequencies: self.frequencies.clone(),
        }
    }

    /// deep copy of the feed. all tables are duplicated by value.
    pub fn deepcopy(&self) -> Feed {
        self.clone()
    }

    fn shape_ids(&self) -> HashSet<String> {
        self.shapes.iter().map(|s| s.shape_id.clone()).collect()
    }

    fn trip_ids(&self) -> HashSet<String> {
        self.trips.iter().map(|t| t.trip_id.clone()).collect()
    }

    pub fn commit_agencies(&mut self, agencies: Vec<Agency>) -> Result<(), TransitError> {
        validate_rows(&agencies)?;
        if agencies.is_empty() {
            if self.routes.iter().any(|r| r.agency_id.is_some()) {
                log::warn!("no agencies table set but routes reference agency_ids; skipping fk validation");
            }
        } else {
            let agency_ids: HashSet<String> =
                agencies.iter().map(|a| a.agency_id.clone()).collect();
            check_fk_values(
                "routes",
                "agency_id",
                "agencies",
                "agency_id",
                self.routes.iter().filter_map(|r| r.agency_id.clone()),
                &agency_ids,
            )?;
        }
        self.agencies = agencies;
        self.rehash();
        Ok(())
    }

    pub fn commit_routes(&mut self, routes: Vec<Route>) -> Result<(), TransitError> {
        validate_rows(&routes)?;
        if self.agencies.is_empty() {
            if routes.iter().any(|r| r.agency_id.is_some()) {
                log::warn!("routes reference agency_ids but no agencies table is set; skipping fk validation");
            }
        } else {
            let agency_ids: HashSet<String> =
                self.agencies.iter().map(|a| a.agency_id.clone()).collect();
            check_fk_values(
                "routes",
                "agency_id",
                "agencies",
                "agency_id",
                routes.iter().filter_map(|r| r.agency_id.clone()),
                &agency_ids,
            )?;
        }
        let route_ids: HashSet<String> = routes.iter().map(|r| r.route_id.clone()).collect();
        check_fk_values(
            "trips",
            "route_id",
            "routes",
            "route_id",
            self.trips.iter().map(|t| t.route_id.clone()),
            &route_ids,
        )?;
        self.routes = routes;
        self.rehash();
        Ok(())
    }

    pub fn commit_trips(&mut self, trips: Vec<Trip>) -> Result<(), TransitError> {
        validate_rows(&trips)?;
        let route_ids: HashSet<String> = self.routes.iter().map(|r| r.route_id.clone()).collect();
        check_fk_values(
            "trips",
            "route_id",
            "routes",
            "route_id",
            trips.iter().map(|t| t.route_id.clone()),
            &route_ids,
        )?;
        let shape_ids = self.shape_ids();
        check_fk_values(
            "trips",
            "shape_id",
            "shapes",
            "shape_id",
            trips.iter().map(|t| t.shape_id.clone()),
            &shape_ids,
        )?;
        let trip_ids: HashSet<String> = trips.iter().map(|t| t.trip_id.clone()).collect();
        check_fk_values(
            "stop_times",
            "trip_id",
            "trips",
            "trip_id",
            self.stop_times.iter().map(|st| st.trip_id.clone()),
            &trip_ids,
        )?;
        check_fk_values(
            "frequencies",
            "trip_id",
            "trips",
            "trip_id",
            self.frequencies.iter().map(|f| f.trip_id.clone()),
            &trip_ids,
        )?;
        self.trips = trips;
        self.rehash();
        Ok(())
    }

    pub fn commit_shapes(&mut self, shapes: Vec<ShapePoint>) -> Result<(), TransitError> {
        validate_rows(&shapes)?;
        let shape_ids: HashSet<String> = shapes.iter().map(|s| s.shape_id.clone()).collect();
        check_fk_values(
            "trips",
            "shape_id",
            "shapes",
            "shape_id",
            self.trips.iter().map(|t| t.shape_id.clone()),
            &shape_ids,
        )?;
        self.shapes = shapes;
        self.rehash();
        Ok(())
    }

    pub fn commit_stops(&mut self, stops: Vec<Stop>) -> Result<(), TransitError> {
        validate_rows(&stops)?;
        let stop_ids: HashSet<i64> = stops.iter().map(|s| s.stop_id).collect();
        check_fk_values(
            "stop_times",
            "stop_id",
            "stops",
            "stop_id",
            self.stop_times.iter().map(|st| st.stop_id),
            &stop_ids,
        )?;
        self.stops = stops;
        self.rehash();
        Ok(())
    }

    pub fn commit_stop_times(&mut self, stop_times: Vec<StopTime>) -> Result<(), TransitError> {
        let stop_times = normalize_unspecified_times(stop_times);
        validate_rows(&stop_times)?;
        check_fk_values(
            "stop_times",
            "trip_id",
            "trips",
            "trip_id",
            stop_times.iter().map(|st| st.trip_id.clone()),
            &self.trip_ids(),
        )?;
        let stop_ids: HashSet<i64> = self.stops.iter().map(|s| s.stop_id).collect();
        check_fk_values(
            "stop_times",
            "stop_id",
            "stops",
            "stop_id",
            stop_times.iter().map(|st| st.stop_id),
            &stop_ids,
        )?;
        self.stop_times = stop_times;
        self.rehash();
        Ok(())
    }

    pub fn commit_frequencies(&mut self, frequencies: Vec<Frequency>) -> Result<(), TransitError> {
        validate_rows(&frequencies)?;
        check_fk_values(
            "frequencies",
            "trip_id",
            "trips",
            "trip_id",
            frequencies.iter().map(|f| f.trip_id.clone()),
            &self.trip_ids(),
        )?;
        self.frequencies = frequencies;
        self.rehash();
        Ok(())
    }

    fn rehash(&mut self) {
        let hashes = [
            table_hash(&self.agencies),
            table_hash(&self.frequencies),
            table_hash(&self.routes),
            table_hash(&self.shapes),
            table_hash(&self.stops),
            table_hash(&self.trips),
            table_hash(&self.stop_times),
        ];
        self.hash = db_hash(hashes.iter().map(|h| h.as_str()));
    }
}

impl PartialEq for Feed {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

/// a 00:00:00 arrival and departure pair means "unspecified" and is stored
/// as null.
fn normalize_unspecified_times(mut stop_times: Vec<StopTime>) -> Vec<StopTime> {
    let midnight = Time::from_secs(0);
    for stop_time in stop_times.iter_mut() {
        if stop_time.arrival_time == Some(midnight) && stop_time.departure_time == Some(midnight) {
            stop_time.arrival_time = None;
            stop_time.departure_time = None;
        }
    }
    stop_times
}


#[cfg(test)]
mod test {
    use super::*;
    use switchyard_core::table::TableError;

    #[test]
    fn test_feed_construction_and_hash() {
        let feed = testfeed::feed_with_trips(&[("t1", "s1", vec![1, 2, 3])]);
        assert_eq!(feed.trips().len(), 1);
        assert_eq!(feed.stops().len(), 3);
        let copy = feed.deepcopy();
        assert_eq!(copy, feed);
    }

    #[test]
    fn test_stop_times_require_known_trip() {
        let mut feed = testfeed::feed_with_trips(&[("t1", "s1", vec![1, 2, 3])]);
        let mut stop_times = feed.stop_times().to_vec();
        stop_times.push(StopTime::new("ghost", 1, 1));
        assert!(matches!(
            feed.commit_stop_times(stop_times),
            Err(TransitError::Table(TableError::ForeignKeyValue { .. }))
        ));
    }

    #[test]
    fn test_trip_deletion_blocked_by_referencing_stop_times() {
        let mut feed = testfeed::feed_with_trips(&[("t1", "s1", vec![1, 2, 3])]);
        assert!(feed.commit_trips(vec![]).is_err());
    }

    #[test]
    fn test_unspecified_times_normalized() {
        let mut feed = testfeed::feed_with_trips(&[("t1", "s1", vec![1, 2])]);
        let mut stop_times = feed.stop_times().to_vec();
        stop_times[0].arrival_time = Some(Time::from_secs(0));
        stop_times[0].departure_time = Some(Time::from_secs(0));
        stop_times[1].arrival_time = Some(Time::from_hms(6, 10, 0));
        stop_times[1].departure_time = Some(Time::from_hms(6, 11, 0));
        feed.commit_stop_times(stop_times).unwrap();
        assert_eq!(feed.stop_times()[0].arrival_time, None);
        assert_eq!(feed.stop_times()[1].arrival_time, Some(Time::from_hms(6, 10, 0)));
    }

    #[test]
    fn test_invalid_frequency_rejected() {
        let mut feed = testfeed::feed_with_trips(&[("t1", "s1", vec![1, 2])]);
        let mut frequencies = feed.frequencies().to_vec();
        frequencies[0].headway_secs = 0;
        assert!(feed.commit_frequencies(frequencies).is_err());
    }

    #[test]
    fn test_hash_changes_on_edit() {
        let mut feed = testfeed::feed_with_trips(&[("t1", "s1", vec![1, 2])]);
        let before = feed.hash().to_string();
        let mut frequencies = feed.frequencies().to_vec();
        frequencies[0].headway_secs = 300;
        feed.commit_frequencies(frequencies).unwrap();
        assert_ne!(feed.hash(), before);
    }
}
