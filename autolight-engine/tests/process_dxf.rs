use std::path::PathBuf;

use autolight_core::catalog::sample_catalog;
use autolight_core::drawing::{DrawingStatus, NewDrawing};
use autolight_engine::illuminance::RoomAnalysis;
use autolight_engine::pipeline::{Pipeline, ProcessOutcome};
use autolight_io::DxfExtractor;
use autolight_store::{ProjectStore, SqliteStore};

fn io_fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../autolight-io/tests/data");
    path.push(name);
    path
}

fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("open store");
    for entry in sample_catalog() {
        store.upsert_catalog_entry(&entry).expect("seed catalog");
    }
    store
}

#[test]
fn office_plan_is_processed_end_to_end() {
    let store = seeded_store();
    let drawing = store
        .create_drawing(
            &NewDrawing::new("demo", "office_two_rooms.dxf", io_fixture("office_two_rooms.dxf"))
                .with_project_name("Office"),
        )
        .unwrap();
    let extractor = DxfExtractor::new();

    let outcome = Pipeline::new(&store, &extractor).run(drawing.id, None);
    let ProcessOutcome::Completed(summary) = outcome else {
        panic!("processing failed: {outcome:?}");
    };
    assert_eq!(summary.rooms, 2);
    assert_eq!(summary.fixtures, 2);
    assert_eq!(summary.unresolved, vec!["UNKNOWN_SYMBOL".to_string()]);

    let rooms = store.rooms(drawing.id).unwrap();
    assert_eq!(rooms[0].name, "Main Area");
    assert!((rooms[0].area - 50.0).abs() < 1e-9);
    assert_eq!(rooms[1].name, "Room 1");

    let symbols: Vec<(&str, u32)> = rooms[0]
        .fixtures
        .iter()
        .map(|f| (f.catalog.symbol_name.as_str(), f.quantity))
        .collect();
    // PANEL_A 通过前缀 "pan" 匹配到 LED_PANEL_600X600
    assert_eq!(symbols, vec![("DOWNLIGHT_12W", 3), ("LED_PANEL_600X600", 1)]);

    // (3 * 1200 + 4000) * 0.7 / 50 = 106.4
    let analysis = RoomAnalysis::of(&rooms[0]);
    assert_eq!(analysis.current_lux, 106.4);
    assert!(!analysis.adequate);

    let stored = store.drawing(drawing.id).unwrap().unwrap();
    assert_eq!(stored.status, DrawingStatus::Completed);
    assert_eq!(stored.project_name, "Office");
}

#[test]
fn malformed_dxf_fails_the_drawing() {
    let store = seeded_store();
    let drawing = store
        .create_drawing(&NewDrawing::new(
            "demo",
            "malformed_insert.dxf",
            io_fixture("malformed_insert.dxf"),
        ))
        .unwrap();
    let extractor = DxfExtractor::new();

    let outcome = Pipeline::new(&store, &extractor).run(drawing.id, None);
    assert!(!outcome.succeeded());

    let stored = store.drawing(drawing.id).unwrap().unwrap();
    assert_eq!(stored.status, DrawingStatus::Failed);
    assert!(stored.error_message.is_some());
    assert!(store.rooms(drawing.id).unwrap().is_empty());
}

#[test]
fn degenerate_outline_is_skipped_without_failing_the_drawing() {
    let store = seeded_store();
    let drawing = store
        .create_drawing(&NewDrawing::new(
            "demo",
            "stray_outline.dxf",
            io_fixture("stray_outline.dxf"),
        ))
        .unwrap();
    let extractor = DxfExtractor::new();

    let outcome = Pipeline::new(&store, &extractor).run(drawing.id, None);
    let ProcessOutcome::Completed(summary) = outcome else {
        panic!("processing failed: {outcome:?}");
    };
    assert_eq!(summary.rooms, 1);
    assert_eq!(summary.skipped_outlines, 1);

    let rooms = store.rooms(drawing.id).unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].name, "Main Area");
    assert!((rooms[0].area - 50.0).abs() < 1e-9);
    assert_eq!(rooms[0].fixtures[0].catalog.symbol_name, "DOWNLIGHT_12W");
    assert_eq!(
        store.drawing(drawing.id).unwrap().unwrap().status,
        DrawingStatus::Completed
    );
}
