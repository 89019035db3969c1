#![cfg(all(feature = "geometry", feature = "serialization"))]

use geo::{Intersects, polygon};
use std::sync::Arc;
use zjoin::{
    Duplicates, GeometryObject, MutableRecord, Point, Record, SerializedIndex, Space,
    SpatialIndex, SpatialJoin, StableRecord, try_filter,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn triangle(x: f64, y: f64, size: f64) -> GeometryObject {
    GeometryObject::new(polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x, y: y + size),
        (x: x, y: y),
    ])
    .with_max_z(12)
}

#[test]
fn test_serialized_geometries_join_points() {
    init_logging();
    let space = Arc::new(Space::new(&[0.0, 0.0], &[1000.0, 1000.0], &[16, 16]).unwrap());

    let mut areas: SpatialIndex<MutableRecord<GeometryObject>, SerializedIndex<_>> =
        SpatialIndex::new(space.clone(), SerializedIndex::new());
    let mut factory = MutableRecord::<GeometryObject>::factory();
    let triangles = [triangle(100.0, 100.0, 200.0), triangle(600.0, 600.0, 300.0)];
    for t in &triangles {
        areas.add(&mut t.clone(), &mut factory).unwrap();
    }
    assert!(areas.index().size_bytes() > 0);

    let mut sites: SpatialIndex<StableRecord<Point>> = SpatialIndex::in_memory(space);
    let mut factory = StableRecord::<Point>::factory();
    let coords = [
        (110.0, 110.0), // in the first triangle
        (290.0, 290.0), // in its bounding box, outside the triangle
        (650.0, 700.0), // in the second triangle
        (50.0, 900.0),
    ];
    for (x, y) in coords {
        sites.add(&mut Point::new(x, y), &mut factory).unwrap();
    }

    let join = SpatialJoin::new(
        Duplicates::Exclude,
        try_filter(|area: &MutableRecord<GeometryObject>, site: &StableRecord<Point>| {
            let point = geo::Point::new(site.spatial_object().x(), site.spatial_object().y());
            Ok(area.spatial_object().geometry()?.intersects(&point))
        }),
    );
    let mut pairs: Vec<_> = join
        .iterator(&areas, &sites)
        .unwrap()
        .map(|p| {
            let p = p.unwrap();
            // Decoded from WKB and parsed only when the filter needed it.
            assert!(p.left.spatial_object().is_materialized());
            (p.left.soid(), p.right.soid())
        })
        .collect();
    pairs.sort_unstable();
    assert_eq!(pairs, vec![(0, 0), (1, 2)]);
}

#[test]
fn test_geometry_query_from_geojson() {
    init_logging();
    let space = Arc::new(Space::new(&[0.0, 0.0], &[100.0, 100.0], &[12, 12]).unwrap());
    let mut index: SpatialIndex<StableRecord<Point>> = SpatialIndex::in_memory(space);
    let mut factory = StableRecord::<Point>::factory();
    for i in 0..10 {
        let v = i as f64 * 10.0 + 5.0;
        index.add(&mut Point::new(v, v), &mut factory).unwrap();
    }

    let query = GeometryObject::from_geojson(
        r#"{"type":"Polygon","coordinates":[[[0,0],[40,0],[40,40],[0,40],[0,0]]]}"#,
    )
    .unwrap();
    let join = SpatialJoin::new(
        Duplicates::Exclude,
        try_filter(|q: &StableRecord<GeometryObject>, p: &StableRecord<Point>| {
            let point = geo::Point::new(p.spatial_object().x(), p.spatial_object().y());
            Ok(q.spatial_object().geometry()?.intersects(&point))
        }),
    );
    let mut found: Vec<_> = join
        .query(&query, &index)
        .unwrap()
        .map(|r| r.unwrap().soid())
        .collect();
    found.sort_unstable();
    assert_eq!(found, vec![0, 1, 2, 3]);
}
