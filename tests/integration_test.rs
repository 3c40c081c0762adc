//! End-to-end tests for the ingest, edit and read-back pipelines.
//!
//! These tests:
//! 1. Ingest small generated feature collections into temporary databases
//! 2. Read them back as documents and vector tiles
//! 3. Check catalog and physical table stay in lockstep on every failure path
//!
//! Run with:
//! ```sh
//! cargo test --test integration_test
//! ```

use geodata::schema::table_columns;
use geodata::{
    ColumnType, Coordinate, DatasetEdit, DatasetError, DatasetStore, ErrorKind, GeometryKind,
    NewDataset, SilentProgress, TileCoord,
};
use geozero::mvt::{Message, Tile};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

// =============================================================================
// Test Configuration
// =============================================================================

/// Random seed for reproducible shuffles
const RANDOM_SEED: u64 = 42;

/// Number of shuffled orderings tried by the order-independence test
const SHUFFLE_ROUNDS: usize = 8;

/// Number of generated points in the shared city fixture
const CITY_COUNT: usize = 200;

// =============================================================================
// Fixtures
// =============================================================================

fn feature(geometry: Value, properties: Value) -> Value {
    json!({"type": "Feature", "geometry": geometry, "properties": properties})
}

fn point(lon: f64, lat: f64) -> Value {
    json!({"type": "Point", "coordinates": [lon, lat]})
}

fn line(coords: &[(f64, f64)]) -> Value {
    let coords: Vec<Value> = coords.iter().map(|(x, y)| json!([x, y])).collect();
    json!({"type": "LineString", "coordinates": coords})
}

fn square(lon: f64, lat: f64, size: f64) -> Value {
    json!({"type": "Polygon", "coordinates": [[
        [lon, lat], [lon + size, lat], [lon + size, lat + size], [lon, lat + size], [lon, lat]
    ]]})
}

fn collection(features: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({"type": "FeatureCollection", "features": features}))
        .expect("fixture serializes")
}

/// Scattered points around Java with mixed property types
static CITIES: Lazy<Vec<Value>> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
    (0..CITY_COUNT)
        .map(|i| {
            let lon = rng.gen_range(105.0..115.0);
            let lat = rng.gen_range(-8.5..-6.0);
            let population = if i % 3 == 0 {
                json!(format!("{}", rng.gen_range(1_000..100_000)))
            } else {
                json!(rng.gen_range(1_000.0..100_000.0))
            };
            feature(
                point(lon, lat),
                json!({"name": format!("city_{}", i), "population": population, "capital": i == 0}),
            )
        })
        .collect()
});

fn rivers_upload() -> Vec<u8> {
    collection(vec![
        feature(line(&[(106.8, -6.2), (106.9, -6.1)]), json!({"length": 12.5})),
        feature(line(&[(107.0, -6.9), (107.1, -6.8)]), json!({"length": "7"})),
    ])
}

fn zones_upload() -> Vec<u8> {
    collection(vec![
        feature(square(106.0, -7.0, 0.5), json!({"name": "A"})),
        feature(square(107.0, -7.0, 0.5), json!({"name": 42})),
    ])
}

fn ingest(store: &mut DatasetStore, name: &str, kind: GeometryKind, upload: &[u8]) -> usize {
    store
        .ingest(&NewDataset::new(name, kind, "#3388ff"), upload, "tester", &mut SilentProgress::new())
        .unwrap_or_else(|e| panic!("ingest of {} failed: {}", name, e))
}

fn property(store: &DatasetStore, name: &str, key: &str) -> Vec<Value> {
    store
        .document(name)
        .unwrap()
        .features
        .iter()
        .map(|f| f.properties.as_ref().and_then(|p| p.get(key)).cloned().unwrap_or(Value::Null))
        .collect()
}

fn schema_object_exists(store: &DatasetStore, name: &str) -> bool {
    store
        .connection()
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE lower(name) = lower(?1))",
            [name],
            |row| row.get(0),
        )
        .unwrap()
}

/// XYZ tile containing a lon/lat position
fn tile_for(lon: f64, lat: f64, z: u8) -> TileCoord {
    let n = f64::from(1u32 << z);
    let x = ((lon + 180.0) / 360.0 * n).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor();
    TileCoord::new(i64::from(z), x as i64, y as i64).unwrap()
}

// =============================================================================
// Typing Scenarios
// =============================================================================

#[test]
fn test_rivers_numeric_strings_reconcile_to_float() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    assert_eq!(ingest(&mut store, "rivers", GeometryKind::LineString, &rivers_upload()), 2);

    let columns = table_columns(store.connection(), "rivers").unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].col_type, ColumnType::Float);
    assert_eq!(property(&store, "rivers", "length"), vec![json!(12.5), json!(7.0)]);
}

#[test]
fn test_zones_mixed_values_reconcile_to_text() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "zones", GeometryKind::Polygon, &zones_upload());

    let columns = table_columns(store.connection(), "zones").unwrap();
    assert_eq!(columns[0].col_type, ColumnType::Text);
    assert_eq!(property(&store, "zones", "name"), vec![json!("A"), json!("42")]);
}

#[test]
fn test_column_types_independent_of_feature_order() {
    let mut features = vec![
        feature(point(0.0, 0.0), json!({"a": 1.5, "b": true, "c": 1, "d": true})),
        feature(point(1.0, 0.0), json!({"a": "3", "b": false, "c": "x"})),
        feature(point(2.0, 0.0), json!({"a": 2, "d": 1})),
        feature(point(3.0, 0.0), json!({"b": null, "e": [1, 2]})),
        feature(point(4.0, 0.0), json!({})),
    ];
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
    let mut store = DatasetStore::open_in_memory().unwrap();

    let mut schemas = Vec::new();
    for round in 0..SHUFFLE_ROUNDS {
        features.shuffle(&mut rng);
        let name = format!("shuffled_{}", round);
        ingest(&mut store, &name, GeometryKind::Point, &collection(features.clone()));
        schemas.push(table_columns(store.connection(), &name).unwrap());
    }

    let first = &schemas[0];
    let types: Vec<(String, ColumnType)> =
        first.iter().map(|c| (c.name.clone(), c.col_type)).collect();
    assert_eq!(
        types,
        vec![
            ("a".to_string(), ColumnType::Float),
            ("b".to_string(), ColumnType::Text),
            ("c".to_string(), ColumnType::Text),
            ("d".to_string(), ColumnType::Text),
            ("e".to_string(), ColumnType::Text),
        ]
    );
    assert!(schemas.iter().all(|s| s == first));
}

#[test]
fn test_order_independence_keeps_narrow_types() {
    let mut features = vec![
        feature(point(0.0, 0.0), json!({"depth": 3.5, "open": true})),
        feature(point(1.0, 0.0), json!({"depth": "12", "open": false})),
        feature(point(2.0, 0.0), json!({"depth": 7, "open": true})),
        feature(point(3.0, 0.0), json!({"depth": "-0.5"})),
    ];
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);

    for _ in 0..SHUFFLE_ROUNDS {
        features.shuffle(&mut rng);
        let mut store = DatasetStore::open_in_memory().unwrap();
        ingest(&mut store, "lakes", GeometryKind::Point, &collection(features.clone()));
        let columns = table_columns(store.connection(), "lakes").unwrap();
        assert_eq!(columns[0].col_type, ColumnType::Float, "depth");
        assert_eq!(columns[1].col_type, ColumnType::Boolean, "open");
    }
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_document_round_trip_preserves_features() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    let count = ingest(&mut store, "cities", GeometryKind::Point, &collection(CITIES.clone()));
    assert_eq!(count, CITY_COUNT);

    let document = store.document("cities").unwrap();
    assert_eq!(document.features.len(), CITY_COUNT);

    for (stored, original) in document.features.iter().zip(CITIES.iter()) {
        let props = stored.properties.as_ref().unwrap();
        assert_eq!(props["name"], original["properties"]["name"]);
        assert_eq!(props["capital"], original["properties"]["capital"]);

        let expected = match &original["properties"]["population"] {
            Value::String(s) => s.parse::<f64>().unwrap(),
            other => other.as_f64().unwrap(),
        };
        assert_eq!(props["population"].as_f64(), Some(expected));

        let geometry = serde_json::to_value(stored.geometry.as_ref().unwrap()).unwrap();
        assert_eq!(geometry, original["geometry"]);
    }
}

#[test]
fn test_document_preserves_float_bits() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    let upload = br#"{"type": "FeatureCollection", "features": [{"type": "Feature",
        "geometry": {"type": "Point", "coordinates": [114.90084689724367, 1.0]},
        "properties": {"v": 114.90084689724367}}]}"#;
    ingest(&mut store, "gauges", GeometryKind::Point, upload);

    let expected: f64 = "114.90084689724367".parse().unwrap();
    let document = store.document("gauges").unwrap();
    let feature = &document.features[0];
    assert_eq!(feature.properties.as_ref().unwrap()["v"].as_f64(), Some(expected));
    match &feature.geometry.as_ref().unwrap().value {
        geojson::Value::Point(position) => assert_eq!(position[0], expected),
        other => panic!("expected a point, got {:?}", other),
    }
}

#[test]
fn test_document_ids_follow_insert_order() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "zones", GeometryKind::Polygon, &zones_upload());
    let ids: Vec<Value> = store
        .document("zones")
        .unwrap()
        .features
        .iter()
        .map(|f| serde_json::to_value(f.id.as_ref().unwrap()).unwrap())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(2)]);
}

#[test]
fn test_dataset_survives_reopen() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut store = DatasetStore::open(file.path()).unwrap();
        ingest(&mut store, "rivers", GeometryKind::LineString, &rivers_upload());
    }
    let store = DatasetStore::open(file.path()).unwrap();
    assert_eq!(store.get_dataset("rivers").unwrap().created_by, "tester");
    assert_eq!(property(&store, "rivers", "length"), vec![json!(12.5), json!(7.0)]);
}

// =============================================================================
// Atomicity
// =============================================================================

#[test]
fn test_failure_mid_collection_leaves_nothing_behind() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    let mut features: Vec<Value> = (0..5)
        .map(|i| feature(line(&[(0.0, f64::from(i)), (1.0, f64::from(i))]), json!({"n": i})))
        .collect();
    features[3] = feature(json!({"type": "LineString", "coordinates": []}), json!({"n": 3}));

    let err = store
        .ingest(
            &NewDataset::new("broken", GeometryKind::LineString, "red"),
            &collection(features),
            "tester",
            &mut SilentProgress::new(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("feature 3"));

    assert!(store.list_datasets().unwrap().is_empty());
    assert!(!schema_object_exists(&store, "broken"));

    // Re-ingestion under the same name succeeds rather than AlreadyExists.
    assert_eq!(ingest(&mut store, "broken", GeometryKind::LineString, &rivers_upload()), 2);
}

#[test]
fn test_malformed_upload_is_invalid_input() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    let err = store
        .ingest(
            &NewDataset::new("junk", GeometryKind::Point, "red"),
            b"{\"type\": \"FeatureCollection\"",
            "tester",
            &mut SilentProgress::new(),
        )
        .unwrap_err();
    assert!(matches!(err, DatasetError::InvalidInput(_)));
    assert!(store.list_datasets().unwrap().is_empty());
    assert!(!schema_object_exists(&store, "junk"));
}

#[test]
fn test_name_colliding_with_unrelated_table_is_already_exists() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    store
        .connection()
        .execute_batch("CREATE TABLE Roads (id INTEGER PRIMARY KEY)")
        .unwrap();
    let err = store
        .ingest(
            &NewDataset::new("roads", GeometryKind::LineString, "red"),
            &rivers_upload(),
            "tester",
            &mut SilentProgress::new(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(store.list_datasets().unwrap().is_empty());
}

#[test]
fn test_second_store_sees_committed_dataset() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let mut first = DatasetStore::open(file.path()).unwrap();
    let mut second = DatasetStore::open(file.path()).unwrap();

    ingest(&mut first, "rivers", GeometryKind::LineString, &rivers_upload());
    let err = second
        .ingest(
            &NewDataset::new("rivers", GeometryKind::LineString, "red"),
            &rivers_upload(),
            "other",
            &mut SilentProgress::new(),
        )
        .unwrap_err();
    assert!(matches!(err, DatasetError::AlreadyExists(_)));
    assert_eq!(second.document("rivers").unwrap().features.len(), 2);
}

// =============================================================================
// Replace-on-Edit
// =============================================================================

#[test]
fn test_edit_with_file_replaces_rows() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "rivers", GeometryKind::LineString, &rivers_upload());

    let replacement = collection(vec![
        feature(line(&[(110.0, -7.0), (110.5, -7.5)]), json!({"length": "3.25", "extra": "dropped"})),
        feature(line(&[(111.0, -7.0), (111.5, -7.5)]), json!({"length": 9})),
        feature(line(&[(112.0, -7.0), (112.5, -7.5)]), json!({})),
    ]);
    let loaded = store
        .edit("rivers", &DatasetEdit::default(), Some(&replacement), "editor", &mut SilentProgress::new())
        .unwrap();
    assert_eq!(loaded, Some(3));

    assert_eq!(
        property(&store, "rivers", "length"),
        vec![json!(3.25), json!(9.0), Value::Null]
    );
    let document = store.document("rivers").unwrap();
    assert!(document.features[0].properties.as_ref().unwrap().get("extra").is_none());
    assert_eq!(table_columns(store.connection(), "rivers").unwrap().len(), 1);
    assert_eq!(store.get_dataset("rivers").unwrap().updated_by, "editor");
}

#[test]
fn test_edit_without_file_keeps_rows() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "zones", GeometryKind::Polygon, &zones_upload());
    let before = store.get_dataset("zones").unwrap();

    let loaded = store
        .edit("zones", &DatasetEdit::default(), None, "editor", &mut SilentProgress::new())
        .unwrap();
    assert_eq!(loaded, None);

    let after = store.get_dataset("zones").unwrap();
    assert_eq!(store.document("zones").unwrap().features.len(), 2);
    assert_eq!(after.updated_by, "editor");
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(after.created_at, before.created_at);
}

#[test]
fn test_edit_coercion_failure_rolls_back() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "rivers", GeometryKind::LineString, &rivers_upload());

    let replacement = collection(vec![
        feature(line(&[(0.0, 0.0), (1.0, 1.0)]), json!({"length": 1})),
        feature(line(&[(0.0, 0.0), (1.0, 1.0)]), json!({"length": "very long"})),
    ]);
    let edit = DatasetEdit {
        table_name: Some("streams".into()),
        ..DatasetEdit::default()
    };
    let err = store
        .edit("rivers", &edit, Some(&replacement), "editor", &mut SilentProgress::new())
        .unwrap_err();
    assert!(matches!(err, DatasetError::Coercion { feature: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::Internal);

    // Rename, truncate and reload were all rolled back.
    assert!(!schema_object_exists(&store, "streams"));
    assert_eq!(property(&store, "rivers", "length"), vec![json!(12.5), json!(7.0)]);
    assert_eq!(store.get_dataset("rivers").unwrap().updated_by, "tester");
}

#[test]
fn test_rename_onto_unrelated_table_fails_and_keeps_original() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "rivers", GeometryKind::LineString, &rivers_upload());
    store
        .connection()
        .execute_batch("CREATE TABLE roads (id INTEGER PRIMARY KEY)")
        .unwrap();

    let err = store
        .edit("rivers", &DatasetEdit::rename("roads"), None, "editor", &mut SilentProgress::new())
        .unwrap_err();
    assert!(matches!(err, DatasetError::AlreadyExists(name) if name == "roads"));
    assert_eq!(store.document("rivers").unwrap().features.len(), 2);
}

#[test]
fn test_rename_onto_other_dataset_fails() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "rivers", GeometryKind::LineString, &rivers_upload());
    ingest(&mut store, "zones", GeometryKind::Polygon, &zones_upload());

    let err = store
        .edit("rivers", &DatasetEdit::rename("ZONES"), None, "editor", &mut SilentProgress::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn test_rename_with_replacement_loads_renamed_table() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "rivers", GeometryKind::LineString, &rivers_upload());

    let replacement = collection(vec![feature(line(&[(0.0, 0.0), (1.0, 1.0)]), json!({"length": 1}))]);
    let edit = DatasetEdit {
        table_name: Some("streams".into()),
        color: Some("navy".into()),
        coordinate: Some(Coordinate::new(0.5, 0.5).unwrap()),
    };
    store
        .edit("rivers", &edit, Some(&replacement), "editor", &mut SilentProgress::new())
        .unwrap();

    assert!(!schema_object_exists(&store, "rivers"));
    let entry = store.get_dataset("streams").unwrap();
    assert_eq!(entry.color, "navy");
    assert_eq!(entry.coordinate, Some(Coordinate { lon: 0.5, lat: 0.5 }));
    assert_eq!(property(&store, "streams", "length"), vec![json!(1.0)]);
}

#[test]
fn test_edit_missing_dataset_is_not_found() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    let err = store
        .edit("ghost", &DatasetEdit::default(), None, "editor", &mut SilentProgress::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_index_shaped_names_are_invalid() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    let err = store
        .ingest(
            &NewDataset::new("idx_b_bbox", GeometryKind::Polygon, "red"),
            &zones_upload(),
            "tester",
            &mut SilentProgress::new(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    ingest(&mut store, "b", GeometryKind::Polygon, &zones_upload());
    let err = store
        .edit("b", &DatasetEdit::rename("idx_a_bbox"), None, "editor", &mut SilentProgress::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(schema_object_exists(&store, "idx_b_bbox"));
}

#[test]
fn test_taken_index_name_reports_already_exists() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "a", GeometryKind::Polygon, &zones_upload());
    store
        .connection()
        .execute_batch("CREATE TABLE idx_c_bbox (id INTEGER PRIMARY KEY)")
        .unwrap();

    let err = store
        .edit("a", &DatasetEdit::rename("c"), None, "editor", &mut SilentProgress::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(store.document("a").unwrap().features.len(), 2);

    let err = store
        .ingest(
            &NewDataset::new("c", GeometryKind::Polygon, "red"),
            &zones_upload(),
            "tester",
            &mut SilentProgress::new(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(!schema_object_exists(&store, "c"));
}

// =============================================================================
// Tiles
// =============================================================================

fn zigzag(value: u32) -> i64 {
    i64::from(value >> 1) ^ -i64::from(value & 1)
}

/// Surveyor's-formula area of every ring in an MVT polygon geometry
fn ring_areas(commands: &[u32]) -> Vec<f64> {
    let (mut x, mut y) = (0i64, 0i64);
    let mut ring: Vec<(f64, f64)> = Vec::new();
    let mut areas = Vec::new();
    let mut i = 0;
    while i < commands.len() {
        let (id, count) = (commands[i] & 0x7, commands[i] >> 3);
        i += 1;
        match id {
            1 | 2 => {
                for _ in 0..count {
                    x += zigzag(commands[i]);
                    y += zigzag(commands[i + 1]);
                    i += 2;
                    if id == 1 {
                        ring.clear();
                    }
                    ring.push((x as f64, y as f64));
                }
            }
            7 => {
                let n = ring.len();
                let twice: f64 = (0..n)
                    .map(|k| {
                        let (a, b) = (ring[k], ring[(k + 1) % n]);
                        a.0 * b.1 - b.0 * a.1
                    })
                    .sum();
                areas.push(twice / 2.0);
            }
            other => panic!("unexpected command {}", other),
        }
    }
    areas
}

#[test]
fn test_tile_without_overlap_is_empty() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "rivers", GeometryKind::LineString, &rivers_upload());

    // Far side of the world from Java.
    let bytes = store.tile("rivers", tile_for(-70.0, 40.0, 8)).unwrap();
    assert!(bytes.is_empty());
    let decoded = Tile::decode(bytes.as_slice()).unwrap();
    assert!(decoded.layers.is_empty());
}

#[test]
fn test_tile_carries_ids_and_properties() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "zones", GeometryKind::Polygon, &zones_upload());

    let bytes = store.tile("zones", tile_for(106.25, -6.75, 4)).unwrap();
    let decoded = Tile::decode(bytes.as_slice()).unwrap();
    assert_eq!(decoded.layers.len(), 1);

    let layer = &decoded.layers[0];
    assert_eq!(layer.name, "zones");
    assert_eq!(layer.version, 2);
    assert_eq!(layer.extent, Some(4096));
    assert_eq!(layer.keys, vec!["name".to_string()]);

    let ids: Vec<Option<u64>> = layer.features.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2)]);
    for feature in &layer.features {
        assert_eq!(feature.tags.len(), 2);
        assert!(!feature.geometry.is_empty());
    }
    let names: Vec<Option<String>> = layer.values.iter().map(|v| v.string_value.clone()).collect();
    assert_eq!(names, vec![Some("A".to_string()), Some("42".to_string())]);
}

#[test]
fn test_tile_is_deterministic() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "cities", GeometryKind::Point, &collection(CITIES.clone()));
    let coord = tile_for(110.0, -7.0, 4);
    let first = store.tile("cities", coord).unwrap();
    assert!(!first.is_empty());
    assert_eq!(store.tile("cities", coord).unwrap(), first);
}

#[test]
fn test_tile_skips_null_properties() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    let upload = collection(vec![
        feature(point(10.0, 10.0), json!({"label": "x", "depth": 2})),
        feature(point(10.1, 10.1), json!({"depth": null})),
    ]);
    ingest(&mut store, "wells", GeometryKind::Point, &upload);

    let bytes = store.tile("wells", tile_for(10.05, 10.05, 5)).unwrap();
    let layer = &Tile::decode(bytes.as_slice()).unwrap().layers[0];
    assert_eq!(layer.features.len(), 2);
    assert_eq!(layer.features[0].tags.len(), 4);
    assert!(layer.features[1].tags.is_empty());
}

#[test]
fn test_tile_polygons_use_mvt_winding() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    let clockwise = json!({"type": "Polygon", "coordinates": [[
        [20.0, 20.0], [20.0, 21.0], [21.0, 21.0], [21.0, 20.0], [20.0, 20.0]
    ]]});
    let with_hole = json!({"type": "Polygon", "coordinates": [
        [[22.0, 20.0], [24.0, 20.0], [24.0, 22.0], [22.0, 22.0], [22.0, 20.0]],
        [[22.5, 20.5], [22.5, 21.5], [23.5, 21.5], [23.5, 20.5], [22.5, 20.5]]
    ]});
    let upload = collection(vec![
        feature(square(20.0, 22.0, 1.0), json!({})),
        feature(clockwise, json!({})),
        feature(with_hole, json!({})),
    ]);
    ingest(&mut store, "parcels", GeometryKind::Polygon, &upload);

    let bytes = store.tile("parcels", tile_for(22.0, 21.0, 3)).unwrap();
    let layer = &Tile::decode(bytes.as_slice()).unwrap().layers[0];
    assert_eq!(layer.features.len(), 3);

    for feature in &layer.features[..2] {
        let areas = ring_areas(&feature.geometry);
        assert_eq!(areas.len(), 1);
        assert!(areas[0] > 0.0, "exterior area {}", areas[0]);
    }
    let areas = ring_areas(&layer.features[2].geometry);
    assert_eq!(areas.len(), 2);
    assert!(areas[0] > 0.0 && areas[1] < 0.0, "ring areas {:?}", areas);
}

#[test]
fn test_reads_of_missing_dataset_are_not_found() {
    let store = DatasetStore::open_in_memory().unwrap();
    assert_eq!(store.document("ghost").unwrap_err().kind(), ErrorKind::NotFound);
    let coord = TileCoord::new(0, 0, 0).unwrap();
    assert_eq!(store.tile("ghost", coord).unwrap_err().kind(), ErrorKind::NotFound);
}

// =============================================================================
// Catalog Operations
// =============================================================================

#[test]
fn test_list_and_layers() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "zones", GeometryKind::Polygon, &zones_upload());
    store
        .ingest(
            &NewDataset::new("river_lines", GeometryKind::LineString, "blue")
                .with_coordinate(Coordinate::new(106.8, -6.2).unwrap()),
            &rivers_upload(),
            "tester",
            &mut SilentProgress::new(),
        )
        .unwrap();

    let names: Vec<String> = store
        .list_datasets()
        .unwrap()
        .into_iter()
        .map(|e| e.table_name)
        .collect();
    assert_eq!(names, vec!["river_lines".to_string(), "zones".to_string()]);

    let layers = store.map_layers("https://maps.example.org").unwrap();
    assert_eq!(layers[0].name, "River Lines");
    assert_eq!(layers[0].coordinate, Some(Coordinate { lon: 106.8, lat: -6.2 }));
    assert_eq!(
        layers[0].layer["source"]["tiles"],
        "https://maps.example.org/mvt/river_lines/{z}/{x}/{y}"
    );
    assert_eq!(layers[1].layer["type"], "fill");
    assert_eq!(layers[1].coordinate, None);
}

#[test]
fn test_delete_then_reingest() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    ingest(&mut store, "zones", GeometryKind::Polygon, &zones_upload());
    store.delete_dataset("zones").unwrap();

    assert!(!schema_object_exists(&store, "zones"));
    assert_eq!(store.get_dataset("zones").unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(ingest(&mut store, "zones", GeometryKind::Polygon, &zones_upload()), 2);
}

#[test]
fn test_unsafe_names_are_rejected() {
    let mut store = DatasetStore::open_in_memory().unwrap();
    for name in ["select", "spatial_data", "sqlite_master", "a\"b", "1abc", "zones;drop"] {
        let err = store
            .ingest(
                &NewDataset::new(name, GeometryKind::Point, "red"),
                &zones_upload(),
                "tester",
                &mut SilentProgress::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{} should be rejected", name);
    }
    assert!(store.list_datasets().unwrap().is_empty());
}
