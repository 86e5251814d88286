//! emission and ingestion of scenario networks.
//!
//! roadway tables round-trip through geojson (geometry as features,
//! list-like columns preserved as JSON arrays in properties) and emit to
//! csv with geometry as WKT. transit tables round-trip through
//! csv/txt. a scenario write also emits a manifest listing the applied
//! projects in order.

use std::fs;
use std::path::{Path, PathBuf};

use geo::{LineString, Point};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::OutputScenarioConfig;
use crate::scenario::Scenario;
use switchyard_core::scope::ScopedValueItem;
use switchyard_roadway::{RoadLink, RoadNode, RoadShape, RoadwayError, RoadwayNetwork};
use switchyard_transit::feed::{Feed, FeedTables};
use switchyard_transit::TransitError;

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Geojson(#[from] geojson::Error),
    #[error(transparent)]
    Roadway(#[from] RoadwayError),
    #[error(transparent)]
    Transit(#[from] TransitError),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("output file already exists and overwrite is disabled: {0:?}")]
    Exists(PathBuf),
    #[error("malformed input in {path:?}: {message}")]
    Malformed { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadwayFileFormat {
    #[default]
    Geojson,
    Csv,
    Parquet,
    Shp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitFileFormat {
    #[default]
    Txt,
    Csv,
    Parquet,
}

fn check_overwrite(path: &Path, overwrite: bool) -> Result<(), IoError> {
    if !overwrite && path.exists() {
        return Err(IoError::Exists(path.to_path_buf()));
    }
    Ok(())
}

// ---------------------------------------------------------------------
// geojson emission / ingestion
// ---------------------------------------------------------------------

fn linestring_geometry(geometry: &LineString<f64>) -> Geometry {
    Geometry::new(geojson::Value::LineString(
        geometry.0.iter().map(|c| vec![c.x, c.y]).collect(),
    ))
}

fn point_geometry(point: &Point<f64>) -> Geometry {
    Geometry::new(geojson::Value::Point(vec![point.x(), point.y()]))
}

/// a feature whose properties are every record column except the geometry.
fn record_feature<T: Serialize>(record: &T, geometry: Geometry) -> Result<Feature, IoError> {
    let mut properties = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        other => {
            return Err(IoError::Malformed {
                path: PathBuf::new(),
                message: format!("record did not serialize to an object: {other}"),
            })
        }
    };
    properties.remove("geometry");
    Ok(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

fn write_feature_collection(features: Vec<Feature>, path: &Path) -> Result<(), IoError> {
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    fs::write(path, GeoJson::from(collection).to_string())?;
    Ok(())
}

fn read_feature_collection(path: &Path) -> Result<FeatureCollection, IoError> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    FeatureCollection::try_from(geojson).map_err(IoError::from)
}

fn coords_to_serde_linestring(coords: &[Vec<f64>]) -> Value {
    Value::Array(
        coords
            .iter()
            .map(|c| serde_json::json!({"x": c[0], "y": c[1]}))
            .collect(),
    )
}

/// rebuild a record from a feature: properties plus the geometry column in
/// the record's native serde shape.
fn feature_to_record<T: for<'de> Deserialize<'de>>(
    feature: &Feature,
    path: &Path,
) -> Result<T, IoError> {
    let mut map = feature.properties.clone().unwrap_or_default();
    let geometry = feature.geometry.as_ref().ok_or_else(|| IoError::Malformed {
        path: path.to_path_buf(),
        message: "feature is missing a geometry".to_string(),
    })?;
    let geometry_value = match &geometry.value {
        geojson::Value::LineString(coords) => coords_to_serde_linestring(coords),
        geojson::Value::Point(coord) => serde_json::json!({"x": coord[0], "y": coord[1]}),
        other => {
            return Err(IoError::Malformed {
                path: path.to_path_buf(),
                message: format!("unsupported geometry type: {other:?}"),
            })
        }
    };
    map.insert("geometry".to_string(), geometry_value);
    Ok(serde_json::from_value(Value::Object(map))?)
}

// ---------------------------------------------------------------------
// csv emission (roadway links/nodes/shapes are flattened; geometry as WKT)
// ---------------------------------------------------------------------

fn linestring_wkt(geometry: &LineString<f64>) -> String {
    let coords = geometry
        .0
        .iter()
        .map(|c| format!("{} {}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(", ");
    format!("LINESTRING ({coords})")
}

fn scoped_json(items: &[ScopedValueItem]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Serialize)]
struct LinkCsvRow {
    model_link_id: i64,
    #[serde(rename = "A")]
    a: i64,
    #[serde(rename = "B")]
    b: i64,
    name: String,
    #[serde(rename = "ref")]
    ref_: Option<String>,
    roadway: String,
    distance: f64,
    lanes: i64,
    price: f64,
    drive_access: bool,
    bike_access: bool,
    walk_access: bool,
    bus_only: bool,
    rail_only: bool,
    truck_access: bool,
    managed: i8,
    shape_id: Option<String>,
    osm_link_id: Option<String>,
    projects: String,
    sc_lanes: String,
    sc_price: String,
    #[serde(rename = "ML_lanes")]
    ml_lanes: Option<i64>,
    #[serde(rename = "ML_price")]
    ml_price: Option<f64>,
    #[serde(rename = "ML_access_point")]
    ml_access_point: bool,
    #[serde(rename = "ML_egress_point")]
    ml_egress_point: bool,
    #[serde(rename = "ML_projects")]
    ml_projects: String,
    #[serde(rename = "ML_geometry")]
    ml_geometry: Option<String>,
    #[serde(rename = "sc_ML_lanes")]
    sc_ml_lanes: String,
    #[serde(rename = "sc_ML_price")]
    sc_ml_price: String,
    geometry: String,
}

impl From<&RoadLink> for LinkCsvRow {
    fn from(link: &RoadLink) -> Self {
        LinkCsvRow {
            model_link_id: link.model_link_id,
            a: link.a,
            b: link.b,
            name: link.name.clone(),
            ref_: link.ref_.clone(),
            roadway: link.roadway.clone(),
            distance: link.distance,
            lanes: link.lanes,
            price: link.price,
            drive_access: link.drive_access,
            bike_access: link.bike_access,
            walk_access: link.walk_access,
            bus_only: link.bus_only,
            rail_only: link.rail_only,
            truck_access: link.truck_access,
            managed: link.managed,
            shape_id: link.shape_id.clone(),
            osm_link_id: link.osm_link_id.clone(),
            projects: link.projects.clone(),
            sc_lanes: scoped_json(&link.sc_lanes),
            sc_price: scoped_json(&link.sc_price),
            ml_lanes: link.ml_lanes,
            ml_price: link.ml_price,
            ml_access_point: link.ml_access_point,
            ml_egress_point: link.ml_egress_point,
            ml_projects: link.ml_projects.clone(),
            ml_geometry: link.ml_geometry.as_ref().map(linestring_wkt),
            sc_ml_lanes: scoped_json(&link.sc_ml_lanes),
            sc_ml_price: scoped_json(&link.sc_ml_price),
            geometry: linestring_wkt(&link.geometry),
        }
    }
}

#[derive(Serialize)]
struct NodeCsvRow {
    model_node_id: i64,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
    osm_node_id: Option<String>,
    projects: String,
}

#[derive(Serialize)]
struct ShapeCsvRow {
    shape_id: String,
    projects: String,
    geometry: String,
}

fn write_csv_rows<T: Serialize>(rows: impl IntoIterator<Item = T>, path: &Path) -> Result<(), IoError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------
// roadway
// ---------------------------------------------------------------------

/// write a roadway network as `{prefix}link.*`, `{prefix}node.*` and
/// `{prefix}shape.*` in the requested format.
pub fn write_roadway(
    net: &RoadwayNetwork,
    out_dir: &Path,
    prefix: &str,
    format: RoadwayFileFormat,
    overwrite: bool,
) -> Result<(), IoError> {
    fs::create_dir_all(out_dir)?;
    match format {
        RoadwayFileFormat::Geojson => {
            let link_path = out_dir.join(format!("{prefix}link.geojson"));
            check_overwrite(&link_path, overwrite)?;
            let links: Vec<Feature> = net
                .links()
                .iter()
                .map(|l| record_feature(l, linestring_geometry(&l.geometry)))
                .collect::<Result<_, _>>()?;
            write_feature_collection(links, &link_path)?;

            let node_path = out_dir.join(format!("{prefix}node.geojson"));
            check_overwrite(&node_path, overwrite)?;
            let nodes: Vec<Feature> = net
                .nodes()
                .iter()
                .map(|n| record_feature(n, point_geometry(&n.geometry)))
                .collect::<Result<_, _>>()?;
            write_feature_collection(nodes, &node_path)?;

            let shape_path = out_dir.join(format!("{prefix}shape.geojson"));
            check_overwrite(&shape_path, overwrite)?;
            let shapes: Vec<Feature> = net
                .shapes()
                .iter()
                .map(|s| record_feature(s, linestring_geometry(&s.geometry)))
                .collect::<Result<_, _>>()?;
            write_feature_collection(shapes, &shape_path)?;
        }
        RoadwayFileFormat::Csv => {
            let link_path = out_dir.join(format!("{prefix}link.csv"));
            check_overwrite(&link_path, overwrite)?;
            write_csv_rows(net.links().iter().map(LinkCsvRow::from), &link_path)?;

            let node_path = out_dir.join(format!("{prefix}node.csv"));
            check_overwrite(&node_path, overwrite)?;
            write_csv_rows(
                net.nodes().iter().map(|n| NodeCsvRow {
                    model_node_id: n.model_node_id,
                    x: n.x,
                    y: n.y,
                    osm_node_id: n.osm_node_id.clone(),
                    projects: n.projects.clone(),
                }),
                &node_path,
            )?;

            let shape_path = out_dir.join(format!("{prefix}shape.csv"));
            check_overwrite(&shape_path, overwrite)?;
            write_csv_rows(
                net.shapes().iter().map(|s| ShapeCsvRow {
                    shape_id: s.shape_id.clone(),
                    projects: s.projects.clone(),
                    geometry: linestring_wkt(&s.geometry),
                }),
                &shape_path,
            )?;
        }
        other => {
            return Err(IoError::UnsupportedFormat(format!("{other:?}")));
        }
    }
    log::info!("wrote roadway network to {out_dir:?} as {format:?}");
    Ok(())
}

/// load a roadway network written as geojson by [`write_roadway`].
pub fn load_roadway_geojson(
    dir: &Path,
    prefix: &str,
    read_in_shapes: bool,
) -> Result<RoadwayNetwork, IoError> {
    let link_path = dir.join(format!("{prefix}link.geojson"));
    let links: Vec<RoadLink> = read_feature_collection(&link_path)?
        .features
        .iter()
        .map(|f| feature_to_record(f, &link_path))
        .collect::<Result<_, _>>()?;

    let node_path = dir.join(format!("{prefix}node.geojson"));
    let nodes: Vec<RoadNode> = read_feature_collection(&node_path)?
        .features
        .iter()
        .map(|f| feature_to_record(f, &node_path))
        .collect::<Result<_, _>>()?;

    let shape_path = dir.join(format!("{prefix}shape.geojson"));
    let shapes: Vec<RoadShape> = if read_in_shapes && shape_path.exists() {
        read_feature_collection(&shape_path)?
            .features
            .iter()
            .map(|f| feature_to_record(f, &shape_path))
            .collect::<Result<_, _>>()?
    } else {
        vec![]
    };

    Ok(RoadwayNetwork::new(links, nodes, shapes)?)
}

// ---------------------------------------------------------------------
// transit
// ---------------------------------------------------------------------

fn transit_extension(format: TransitFileFormat) -> Result<&'static str, IoError> {
    match format {
        TransitFileFormat::Txt => Ok("txt"),
        TransitFileFormat::Csv => Ok("csv"),
        TransitFileFormat::Parquet => Err(IoError::UnsupportedFormat("parquet".to_string())),
    }
}

/// write a transit feed as one delimited file per table.
pub fn write_transit(
    feed: &Feed,
    out_dir: &Path,
    prefix: &str,
    format: TransitFileFormat,
    overwrite: bool,
) -> Result<(), IoError> {
    fs::create_dir_all(out_dir)?;
    let ext = transit_extension(format)?;

    let write_table = |name: &str, write: &dyn Fn(&Path) -> Result<(), IoError>| {
        let path = out_dir.join(format!("{prefix}{name}.{ext}"));
        check_overwrite(&path, overwrite)?;
        write(&path)
    };

    write_table("agencies", &|p| write_csv_rows(feed.agencies(), p))?;
    write_table("routes", &|p| write_csv_rows(feed.routes(), p))?;
    write_table("trips", &|p| write_csv_rows(feed.trips(), p))?;
    write_table("shapes", &|p| write_csv_rows(feed.shapes(), p))?;
    write_table("stops", &|p| write_csv_rows(feed.stops(), p))?;
    write_table("stop_times", &|p| write_csv_rows(feed.stop_times(), p))?;
    write_table("frequencies", &|p| write_csv_rows(feed.frequencies(), p))?;
    log::info!("wrote transit feed to {out_dir:?} as {format:?}");
    Ok(())
}

fn read_csv_table<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, IoError> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let mut reader = csv::Reader::from_path(path)?;
    reader.deserialize().collect::<Result<Vec<T>, csv::Error>>().map_err(IoError::from)
}

/// load a transit feed written by [`write_transit`].
pub fn load_transit(dir: &Path, prefix: &str, format: TransitFileFormat) -> Result<Feed, IoError> {
    let ext = transit_extension(format)?;
    let table_path = |name: &str| dir.join(format!("{prefix}{name}.{ext}"));
    let tables = FeedTables {
        agencies: read_csv_table(&table_path("agencies"))?,
        routes: read_csv_table(&table_path("routes"))?,
        trips: read_csv_table(&table_path("trips"))?,
        shapes: read_csv_table(&table_path("shapes"))?,
        stops: read_csv_table(&table_path("stops"))?,
        stop_times: read_csv_table(&table_path("stop_times"))?,
        frequencies: read_csv_table(&table_path("frequencies"))?,
    };
    Ok(Feed::new(tables)?)
}

// ---------------------------------------------------------------------
// scenario
// ---------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    applied_projects: Vec<String>,
}

/// write the manifest of applied projects, in application order.
pub fn write_manifest(
    applied_projects: &[String],
    out_dir: &Path,
    prefix: &str,
    overwrite: bool,
) -> Result<(), IoError> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{prefix}manifest.json"));
    check_overwrite(&path, overwrite)?;
    let manifest = Manifest {
        applied_projects: applied_projects.to_vec(),
    };
    fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
    Ok(())
}

/// read back a manifest written by [`write_manifest`].
pub fn read_manifest(dir: &Path, prefix: &str) -> Result<Vec<String>, IoError> {
    let path = dir.join(format!("{prefix}manifest.json"));
    let manifest: Manifest = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(manifest.applied_projects)
}

/// write a scenario's networks and manifest per the output configuration.
pub fn write_scenario(scenario: &Scenario, output: &OutputScenarioConfig) -> Result<(), IoError> {
    if let Some(roadway) = &output.roadway {
        write_roadway(
            &scenario.road_net,
            &output.path.join(&roadway.out_dir),
            &roadway.prefix,
            roadway.file_format,
            output.overwrite,
        )?;
    }
    if let Some(transit) = &output.transit {
        write_transit(
            scenario.transit_net.feed(),
            &output.path.join(&transit.out_dir),
            &transit.prefix,
            transit.file_format,
            output.overwrite,
        )?;
    }
    write_manifest(
        scenario.applied_projects(),
        &output.path,
        "",
        output.overwrite,
    )?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use switchyard_core::scope::ScopedValueItem;
    use switchyard_core::time::{Time, Timespan};
    use switchyard_core::value::PropertyValue;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("switchyard-io-tests")
            .join(format!("{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn roadway() -> RoadwayNetwork {
        let nodes = vec![
            RoadNode::new(1, 0.0, 0.0),
            RoadNode::new(2, 0.01, 0.0),
            RoadNode::new(3, 0.02, 0.01),
        ];
        let mut link = RoadLink::test_link(10, 1, 2);
        link.sc_lanes = vec![ScopedValueItem::new(
            "any",
            Timespan::new(Time::from_hms(6, 0, 0), Time::from_hms(9, 0, 0)),
            PropertyValue::Int(2),
        )];
        RoadwayNetwork::new(vec![link, RoadLink::test_link(20, 2, 3)], nodes, vec![]).unwrap()
    }

    #[test]
    fn test_roadway_geojson_roundtrip_preserves_hash() {
        let dir = test_dir("roadway-geojson");
        let net = roadway();
        write_roadway(&net, &dir, "test_", RoadwayFileFormat::Geojson, true).unwrap();
        let read = load_roadway_geojson(&dir, "test_", true).unwrap();
        assert_eq!(read.hash(), net.hash());
        assert_eq!(read.link(10).unwrap().sc_lanes.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_roadway_csv_emission() {
        let dir = test_dir("roadway-csv");
        write_roadway(&roadway(), &dir, "", RoadwayFileFormat::Csv, true).unwrap();
        let content = fs::read_to_string(dir.join("link.csv")).unwrap();
        assert!(content.contains("LINESTRING"));
        assert!(content.lines().count() > 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unsupported_roadway_format() {
        let dir = test_dir("roadway-parquet");
        assert!(matches!(
            write_roadway(&roadway(), &dir, "", RoadwayFileFormat::Parquet, true),
            Err(IoError::UnsupportedFormat(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_transit_roundtrip_preserves_hash() {
        use switchyard_transit::feed::{Frequency, Route, ShapePoint, Stop, StopTime, Trip};
        let dir = test_dir("transit");
        let tables = FeedTables {
            routes: vec![Route {
                route_id: "r1".to_string(),
                agency_id: None,
                route_short_name: Some("1".to_string()),
                route_long_name: None,
                route_type: 3,
                projects: String::new(),
            }],
            trips: vec![Trip {
                trip_id: "t1".to_string(),
                route_id: "r1".to_string(),
                shape_id: "s1".to_string(),
                service_id: None,
                direction_id: Some(0),
                trip_headsign: None,
                trip_short_name: None,
                projects: String::new(),
            }],
            shapes: (1..=3)
                .map(|i| ShapePoint {
                    shape_id: "s1".to_string(),
                    shape_pt_sequence: i as u32,
                    shape_model_node_id: i,
                    shape_pt_lat: Some(0.0),
                    shape_pt_lon: Some(0.001 * i as f64),
                    projects: String::new(),
                })
                .collect(),
            stops: (1..=3)
                .map(|i| Stop {
                    stop_id: i,
                    stop_id_gtfs: None,
                    stop_lat: Some(0.0),
                    stop_lon: Some(0.001 * i as f64),
                    stop_name: None,
                    projects: String::new(),
                })
                .collect(),
            stop_times: (1..=3)
                .map(|i| {
                    let mut stop_time = StopTime::new("t1", i as u32, i);
                    stop_time.arrival_time = Some(Time::from_hms(6, 10 * i as u32, 0));
                    stop_time.departure_time = stop_time.arrival_time;
                    stop_time
                })
                .collect(),
            frequencies: vec![Frequency {
                trip_id: "t1".to_string(),
                start_time: Time::from_hms(6, 0, 0),
                end_time: Time::from_hms(9, 0, 0),
                headway_secs: 600,
                projects: String::new(),
            }],
            ..Default::default()
        };
        let feed = Feed::new(tables).unwrap();
        write_transit(&feed, &dir, "", TransitFileFormat::Txt, true).unwrap();
        let read = load_transit(&dir, "", TransitFileFormat::Txt).unwrap();
        assert_eq!(read.hash(), feed.hash());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_overwrite_protection() {
        let dir = test_dir("overwrite");
        let net = roadway();
        write_roadway(&net, &dir, "", RoadwayFileFormat::Geojson, true).unwrap();
        assert!(matches!(
            write_roadway(&net, &dir, "", RoadwayFileFormat::Geojson, false),
            Err(IoError::Exists(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = test_dir("manifest");
        let applied = vec!["first".to_string(), "second".to_string()];
        write_manifest(&applied, &dir, "", true).unwrap();
        assert_eq!(read_manifest(&dir, "").unwrap(), applied);
        let _ = fs::remove_dir_all(&dir);
    }
}
