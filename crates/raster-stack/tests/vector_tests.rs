//! Proximity and attribute rasterization against template files.

use geo::{line_string, Point};
use geotiff_io::read_raster;
use raster_stack::vector::{select_proximity_features, ExtentRelation};
use raster_stack::{
    rasterize_vector_to_file, vector_proximity_raster, Crs, FeatureSet, StackConfig, StackError,
    VectorFeature,
};
use test_utils::{assert_approx_eq, unit_template, write_template_mask};

fn utm(features: Vec<VectorFeature>) -> FeatureSet {
    FeatureSet::new(Crs::from_epsg(32613), features)
}

fn scratch_config(dir: &std::path::Path) -> StackConfig {
    StackConfig {
        scratch_dir: dir.to_path_buf(),
        ..StackConfig::default()
    }
}

#[test]
fn test_within_extent_center_point() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template_mask(dir.path(), "template.tif", &unit_template(10), None);
    let features = utm(vec![VectorFeature::new(Point::new(5.0, 5.0))]);

    let path = vector_proximity_raster(&features, &template, &scratch_config(dir.path())).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("proximity_raster") && name.ends_with(".tif"));
    assert_eq!(path.parent().unwrap(), dir.path());

    let raster = read_raster(&path).unwrap();
    assert_eq!((raster.template.width, raster.template.height), (10, 10));
    let d = &raster.bands[0].data;

    // The four pixels around the point are inside the buffer.
    for (col, row) in [(4, 4), (5, 4), (4, 5), (5, 5)] {
        assert_eq!(d[row * 10 + col], 0.0);
    }
    // Non-decreasing moving away along the row and column through the point.
    for col in 5..9 {
        assert!(d[4 * 10 + col + 1] >= d[4 * 10 + col]);
        assert!(d[(col + 1) * 10 + 4] >= d[col * 10 + 4]);
    }
    for col in (1..=4).rev() {
        assert!(d[4 * 10 + col - 1] >= d[4 * 10 + col]);
    }
    assert!(d[0] > 0.0);
    assert!(d.iter().all(|&v| v >= 0.0 && v.is_finite()));
}

#[test]
fn test_beyond_extent_corner_fallback_is_bounded() {
    let template = unit_template(10);
    let far: Vec<VectorFeature> = (0..40)
        .map(|i| VectorFeature::new(Point::new(5_000.0 + i as f64 * 10.0, 5_000.0 - i as f64 * 3.0)))
        .collect();
    let selection = select_proximity_features(&utm(far), &template, 5).unwrap();
    assert_eq!(selection.relation, ExtentRelation::Beyond);
    assert!(!selection.features.is_empty());
    assert!(selection.features.len() <= 20);
}

#[test]
fn test_beyond_extent_writes_expanded_grid() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template_mask(dir.path(), "template.tif", &unit_template(10), None);
    let features = utm(vec![VectorFeature::new(
        line_string![(x: 12.0, y: -3.0), (x: 12.0, y: 8.0)],
    )]);

    let path = vector_proximity_raster(&features, &template, &scratch_config(dir.path())).unwrap();
    let raster = read_raster(&path).unwrap();
    let grid = raster.template;
    assert!(grid.width >= 12);
    assert!(grid.height >= 13);
    assert_approx_eq!(grid.transform.origin_x, 0.0, 1e-9);
    assert_approx_eq!(grid.transform.origin_y, 10.0, 1e-9);
    assert!(raster.bands[0].data.iter().any(|&v| v == 0.0));
    assert!(raster.bands[0].data[0] > 0.0);
}

#[test]
fn test_empty_proximity_input() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template_mask(dir.path(), "template.tif", &unit_template(4), None);
    let err = vector_proximity_raster(&utm(Vec::new()), &template, &scratch_config(dir.path()))
        .unwrap_err();
    assert!(matches!(err, StackError::EmptyFeatureSet(_)));
}

#[test]
fn test_rasterize_attribute_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template_mask(dir.path(), "template.tif", &unit_template(4), None);
    let geojson = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32613"}},
        "features": [
            {"type": "Feature", "properties": {"au": 2.5},
             "geometry": {"type": "Point", "coordinates": [0.5, 3.5]}},
            {"type": "Feature", "properties": {"au": "7"},
             "geometry": {"type": "Point", "coordinates": [3.5, 0.5]}},
            {"type": "Feature", "properties": {"au": "trace"},
             "geometry": {"type": "Point", "coordinates": [1.5, 1.5]}}
        ]
    }"#;
    let features = FeatureSet::from_geojson_str(geojson).unwrap();
    let out = dir.path().join("au.tif");

    rasterize_vector_to_file(&features, &template, Some("au"), &out, &StackConfig::default())
        .unwrap();
    let raster = read_raster(&out).unwrap();
    let d = &raster.bands[0].data;
    assert_eq!(raster.descriptions(), vec!["au"]);
    assert_eq!(d[0], 2.5);
    assert_eq!(d[15], 7.0);
    assert_eq!(d[2 * 4 + 1], f32::MIN);
    assert_eq!(d.iter().filter(|&&v| v != f32::MIN).count(), 2);
}
