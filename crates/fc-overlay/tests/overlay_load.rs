use fc_core::Coord;
use fc_overlay::fixture::{FieldSpec, ShapefileFixture, square, zip_members};
use fc_overlay::*;
use proptest::prelude::*;

#[test]
fn click_inside_district_returns_its_attributes() {
    let zip = ShapefileFixture::sample_districts().to_zip("result");
    let overlay = Overlay::from_archive(&zip).unwrap();
    let hit = overlay.feature_at(Coord::new(114.18, 22.28), 0.0).unwrap();
    assert_eq!(
        hit.attribute("NAME"),
        Some(&AttributeValue::Text("Wan Chai".into()))
    );
    assert!(hit.popup_text().contains("DEPTH: 1.25"));
    assert!(overlay.feature_at(Coord::new(0.0, 0.0), 0.0).is_none());
}

#[test]
fn mixed_records_keep_their_kinds() {
    let mut fixture = ShapefileFixture::new(vec![FieldSpec::text("KIND", 8)]);
    fixture
        .push_polyline(
            vec![
                vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0)],
                vec![Coord::new(2.0, 2.0), Coord::new(3.0, 3.0)],
            ],
            vec![AttributeValue::Text("river".into())],
        )
        .push_null(vec![AttributeValue::Null]);
    let overlay = Overlay::from_archive(&fixture.to_zip("lines")).unwrap();
    let kinds: Vec<_> = overlay.features().iter().map(|f| f.geometry.kind()).collect();
    assert_eq!(kinds, ["MultiLineString", "Null"]);
    assert_eq!(overlay.bbox().unwrap().max_x, 3.0);
}

#[test]
fn row_count_mismatch_is_rejected() {
    let three = ShapefileFixture::sample_districts();
    let mut one = ShapefileFixture::new(vec![FieldSpec::text("NAME", 16), FieldSpec::number("DEPTH", 8, 2)]);
    one.push_polygon(
        vec![square(0.0, 0.0, 1.0)],
        vec![AttributeValue::Text("x".into()), AttributeValue::Number(1.0)],
    );
    let zip = zip_members(&[
        ("r.shp", three.shp_bytes()),
        ("r.shx", three.shx_bytes()),
        ("r.dbf", one.dbf_bytes()),
    ]);
    assert!(matches!(
        Overlay::from_archive(&zip),
        Err(OverlayError::CountMismatch { shapes: 3, rows: 1 })
    ));
}

#[test]
fn empty_shapefile_loads_as_empty_overlay() {
    let fixture = ShapefileFixture::new(vec![FieldSpec::text("NAME", 8)]);
    let overlay = Overlay::from_archive(&fixture.to_zip("empty")).unwrap();
    assert!(overlay.is_empty());
    assert!(overlay.bbox().is_none());
}

proptest! {
    #[test]
    fn square_hit_matches_bounds(
        x0 in -170.0f64..170.0,
        y0 in -80.0f64..80.0,
        size in 0.01f64..5.0,
        fx in 0.0f64..1.0,
        fy in 0.0f64..1.0,
    ) {
        let mut fixture = ShapefileFixture::new(vec![FieldSpec::logical("WET")]);
        fixture.push_polygon(vec![square(x0, y0, size)], vec![AttributeValue::Bool(true)]);
        let overlay = Overlay::from_archive(&fixture.to_zip("sq")).unwrap();
        let inside = Coord::new(x0 + size * (0.05 + 0.9 * fx), y0 + size * (0.05 + 0.9 * fy));
        prop_assert!(overlay.feature_at(inside, 0.0).is_some());
        let outside = Coord::new(x0 + size * 1.5, y0 + size * fy);
        prop_assert!(overlay.feature_at(outside, 0.0).is_none());
        let bbox = overlay.fit_bounds().unwrap();
        prop_assert!(bbox.contains(inside));
    }
}
