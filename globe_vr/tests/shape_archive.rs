use std::io::{Cursor, Write};

use globe_vr::geo::LatLon;
use globe_vr::shapes::{
    extrude_buildings, read_airspaces, AirspaceKind, AirspaceRegistry, BUILDING_HEIGHT,
};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn location(lat: f64, lon: f64) -> String {
    format!(
        r#"<stateObject name="location"><stateObject name="latitudeDegrees">{lat}</stateObject><stateObject name="longitudeDegrees">{lon}</stateObject></stateObject>"#
    )
}

fn polygon_state(points: &[(f64, f64)]) -> String {
    let locations: String = points.iter().map(|&(lat, lon)| location(lat, lon)).collect();
    format!(
        r#"<restorableState><stateObject name="altitudes"><stateObject name="lower">0</stateObject><stateObject name="upper">40</stateObject></stateObject><stateObject name="locations">{locations}</stateObject></restorableState>"#
    )
}

const CYLINDER: &str = r#"<restorableState><stateObject name="center"><stateObject name="latitudeDegrees">38.85</stateObject><stateObject name="longitudeDegrees">-77.04</stateObject></stateObject><stateObject name="outerRadius">3000</stateObject></restorableState>"#;

fn archive(entries: &[(&str, String)]) -> Cursor<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .add_directory("shapes/", SimpleFileOptions::default())
        .unwrap();
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    let mut cursor = writer.finish().unwrap();
    cursor.set_position(0);
    cursor
}

#[test]
fn loads_valid_entries_and_skips_the_rest() {
    let square = [
        (38.8836, -77.1072),
        (38.8836, -77.1066),
        (38.8840, -77.1066),
        (38.8840, -77.1072),
    ];
    let triangle = [(38.88, -77.10), (38.88, -77.09), (38.89, -77.095)];
    let zip = archive(&[
        ("README.txt", "not a shape".to_string()),
        ("airspaces.Polygon-Tower.xml", polygon_state(&square) + "\nignored second line"),
        ("shapes/airspaces.Polygon-Annex-North.xml", polygon_state(&triangle)),
        ("airspaces.Box-Crate.xml", polygon_state(&square)),
        ("airspaces.Polygon-Broken.xml", "<restorableState><stateObject".to_string()),
        ("airspaces.Polygon-Empty.xml", String::new()),
        ("airspaces.CappedCylinder-Approach.xml", CYLINDER.to_string()),
    ]);

    let airspaces = read_airspaces(zip, &AirspaceRegistry::default()).unwrap();

    let names: Vec<Option<&str>> = airspaces.iter().map(|a| a.display_name.as_deref()).collect();
    assert_eq!(names, vec![Some("Tower"), Some("Annex-North"), Some("Approach")]);

    let AirspaceKind::Polygon(tower) = &airspaces[0].kind else {
        panic!("expected a polygon");
    };
    assert_eq!(tower.locations.len(), 4);
    assert_eq!(tower.locations[0], LatLon::from_degrees(38.8836, -77.1072));
    assert_eq!(tower.altitudes.upper, 40.0);
    assert!(matches!(airspaces[2].kind, AirspaceKind::CappedCylinder(_)));
}

#[test]
fn registry_limits_known_types() {
    let mut registry = AirspaceRegistry::empty();
    registry.register("airspaces.Polygon", || {
        AirspaceKind::Polygon(Default::default())
    });
    let zip = archive(&[
        ("airspaces.Polygon-Only.xml", polygon_state(&[(1.0, 1.0), (1.0, 2.0), (2.0, 2.0)])),
        ("airspaces.CappedCylinder-Skipped.xml", CYLINDER.to_string()),
    ]);

    let airspaces = read_airspaces(zip, &registry).unwrap();
    assert_eq!(airspaces.len(), 1);
    assert_eq!(airspaces[0].display_name.as_deref(), Some("Only"));
}

#[test]
fn polygons_become_buildings() {
    let square = [
        (38.8836, -77.1072),
        (38.8836, -77.1066),
        (38.8840, -77.1066),
        (38.8840, -77.1072),
    ];
    let triangle = [(38.88, -77.10), (38.88, -77.09), (38.89, -77.095)];
    let zip = archive(&[
        ("airspaces.Polygon-Tower.xml", polygon_state(&square)),
        ("airspaces.Polygon-Wedge.xml", polygon_state(&triangle)),
        ("airspaces.CappedCylinder-Approach.xml", CYLINDER.to_string()),
    ]);
    let airspaces = read_airspaces(zip, &AirspaceRegistry::default()).unwrap();

    let buildings = extrude_buildings(&airspaces);
    assert_eq!(buildings.len(), 2);
    let sides: usize = buildings.iter().map(|b| b.side_count()).sum();
    assert_eq!(sides, 7);

    let tower = &buildings[0];
    assert_eq!(tower.name.as_deref(), Some("Tower"));
    assert_eq!(tower.height, BUILDING_HEIGHT);
    assert!(tower.cap_image.is_some());
    assert!(buildings[1].cap_image.is_none());

    let geometry = tower.tessellate().unwrap();
    assert_eq!(geometry.sides.indices.len(), 4 * 6);
    assert_eq!(geometry.cap.indices.len(), 2 * 3);
}
