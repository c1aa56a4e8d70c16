use std::io::Write;
use std::path::PathBuf;

use autolight_core::geometry::Point3;
use autolight_io::{DxfExtractor, ExtractError, GeometryExtractor};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn office_plan_yields_model_space_inserts_and_closed_rooms() {
    let extraction = DxfExtractor::new()
        .extract(&fixture("office_two_rooms.dxf"))
        .expect("读取 DXF 失败");

    assert_eq!(extraction.total_rooms(), 2, "仅闭合多段线应计为房间");
    let areas: Vec<f64> = extraction.polygons.iter().map(|p| p.area).collect();
    assert!((areas[0] - 50.0).abs() < 1e-9);
    assert!((areas[1] - 30.0).abs() < 1e-9);
    assert!(extraction.polygons.iter().all(|p| p.layer == "ROOMS"));

    // BLOCKS 段中的嵌套 INSERT 与图纸空间中的 INSERT 都不应出现
    let names: Vec<&str> = extraction.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "DOWNLIGHT_12W",
            "DOWNLIGHT_12W",
            "DOWNLIGHT_12W",
            "PANEL_A",
            "UNKNOWN_SYMBOL"
        ]
    );

    let first = &extraction.blocks[0];
    assert_eq!(first.position, Point3::new(2.0, 2.5, 0.0));
    assert!((first.rotation - 90.0).abs() < 1e-9);
    assert_eq!(first.layer, "LIGHTING");

    let panel = &extraction.blocks[3];
    assert!((panel.position.z() - 2.7).abs() < 1e-9);
}

#[test]
fn drawing_without_closed_polylines_has_no_rooms() {
    let extraction = DxfExtractor::new()
        .extract(&fixture("fixtures_only.dxf"))
        .expect("读取 DXF 失败");
    assert_eq!(extraction.total_rooms(), 0);
    assert_eq!(extraction.total_blocks(), 3);
}

#[test]
fn malformed_coordinate_is_reported_with_context() {
    let err = DxfExtractor::new()
        .extract(&fixture("malformed_insert.dxf"))
        .unwrap_err();
    match err {
        ExtractError::InvalidDocument(message) => {
            assert!(message.contains("INSERT 插入点 X"), "message: {message}");
        }
        other => panic!("expected invalid document, got {other:?}"),
    }
}

#[test]
fn missing_file_is_a_read_error() {
    let err = DxfExtractor::new()
        .extract(&fixture("does_not_exist.dxf"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::ReadError { .. }));
}

#[test]
fn non_utf8_text_is_decoded_lossily() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(b"  0\nSECTION\n  2\nENTITIES\n  0\nINSERT\n  8\nLUZ\xe9\n  2\nSPOT\n 10\n1\n 20\n2\n  0\nENDSEC\n  0\nEOF\n")
        .unwrap();
    let extraction = DxfExtractor::new()
        .extract(file.path())
        .expect("latin-1 layer names should not abort parsing");
    assert_eq!(extraction.blocks.len(), 1);
    assert!(extraction.blocks[0].layer.starts_with("LUZ"));
}

#[test]
fn extraction_serializes_for_diagnostics() {
    let extraction = DxfExtractor::new()
        .extract(&fixture("fixtures_only.dxf"))
        .expect("读取 DXF 失败");
    let value = serde_json::to_value(&extraction).expect("serialize extraction");
    assert_eq!(value["blocks"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["blocks"][0]["name"], "LED_PANEL_600X600");
}
