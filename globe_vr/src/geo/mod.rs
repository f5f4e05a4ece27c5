//! Geographic positions on a spherical globe and their mapping into scene space.
//!
//! World axes follow Bevy: +Y through the north pole, +Z through (0°, 0°),
//! +X through (0°, 90°E). Scene translations are taken relative to a floating
//! [`SceneOrigin`] so f32 transforms stay precise near the viewer.

use bevy::math::{DVec2, DVec3};
use bevy::prelude::*;
use bevy::transform::TransformSystem;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Re-center the scene once the viewer drifts this far from the origin.
const REBASE_DISTANCE: f64 = 50_000.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub const fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn at_altitude(self, altitude: f64) -> GeoPosition {
        GeoPosition {
            latlon: self,
            altitude,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeoPosition {
    pub latlon: LatLon,
    /// Metres above the globe surface.
    pub altitude: f64,
}

impl GeoPosition {
    pub const fn from_degrees(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latlon: LatLon::from_degrees(latitude, longitude),
            altitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latlon.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.latlon.longitude
    }

    /// Globe-centered cartesian coordinates in metres.
    pub fn to_cartesian(&self) -> DVec3 {
        let lat = self.latlon.latitude.to_radians();
        let lon = self.latlon.longitude.to_radians();
        let r = EARTH_RADIUS + self.altitude;
        DVec3::new(
            r * lat.cos() * lon.sin(),
            r * lat.sin(),
            r * lat.cos() * lon.cos(),
        )
    }

    pub fn from_cartesian(point: DVec3) -> Self {
        let r = point.length();
        if r == 0.0 {
            return Self::default();
        }
        let latitude = (point.y / r).clamp(-1.0, 1.0).asin().to_degrees();
        let longitude = point.x.atan2(point.z).to_degrees();
        Self::from_degrees(latitude, longitude, r - EARTH_RADIUS)
    }

    pub fn frame(&self) -> LocalFrame {
        LocalFrame::at(self.latlon)
    }
}

/// East/north/up unit vectors at a point on the globe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalFrame {
    pub east: DVec3,
    pub north: DVec3,
    pub up: DVec3,
}

impl LocalFrame {
    pub fn at(latlon: LatLon) -> Self {
        let lat = latlon.latitude.to_radians();
        let lon = latlon.longitude.to_radians();
        let up = DVec3::new(lat.cos() * lon.sin(), lat.sin(), lat.cos() * lon.cos());
        let east = DVec3::new(lon.cos(), 0.0, -lon.sin());
        let north = up.cross(east);
        Self { east, north, up }
    }
}

/// Approximate east/north offset in metres of `target` from `origin`.
/// Accurate for building-sized extents.
pub fn local_offset(origin: LatLon, target: LatLon) -> DVec2 {
    let dlat = (target.latitude - origin.latitude).to_radians();
    let dlon = (target.longitude - origin.longitude).to_radians();
    DVec2::new(
        dlon * EARTH_RADIUS * origin.latitude.to_radians().cos(),
        dlat * EARTH_RADIUS,
    )
}

/// Inverse of [`local_offset`].
pub fn offset_location(origin: LatLon, offset: DVec2) -> LatLon {
    let cos_lat = origin.latitude.to_radians().cos().max(1e-9);
    LatLon::from_degrees(
        origin.latitude + (offset.y / EARTH_RADIUS).to_degrees(),
        origin.longitude + (offset.x / (EARTH_RADIUS * cos_lat)).to_degrees(),
    )
}

/// Cartesian point the scene is currently centered on.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct SceneOrigin(pub DVec3);

impl SceneOrigin {
    pub fn to_scene(&self, cartesian: DVec3) -> Vec3 {
        (cartesian - self.0).as_vec3()
    }

    pub fn from_scene(&self, scene: Vec3) -> DVec3 {
        self.0 + scene.as_dvec3()
    }
}

/// Places an entity at a fixed cartesian point; its translation follows the
/// scene origin.
#[derive(Component, Clone, Copy, Debug)]
pub struct GeoAnchor(pub DVec3);

pub fn geo_plugin(app: &mut App) {
    app.init_resource::<SceneOrigin>()
        .add_systems(PostUpdate, apply_geo_anchors.before(TransformSystem::TransformPropagate));
}

/// Moves the origin under the viewer when it strays too far.
pub fn rebase_origin_near(origin: &mut SceneOrigin, viewer: DVec3) -> bool {
    if viewer.distance(origin.0) <= REBASE_DISTANCE {
        return false;
    }
    origin.0 = viewer;
    true
}

#[allow(clippy::type_complexity)]
fn apply_geo_anchors(
    origin: Res<SceneOrigin>,
    mut anchored: ParamSet<(
        Query<(&GeoAnchor, &mut Transform)>,
        Query<(&GeoAnchor, &mut Transform), Added<GeoAnchor>>,
    )>,
) {
    if origin.is_changed() {
        for (anchor, mut transform) in &mut anchored.p0() {
            transform.translation = origin.to_scene(anchor.0);
        }
    } else {
        for (anchor, mut transform) in &mut anchored.p1() {
            transform.translation = origin.to_scene(anchor.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: DVec3, b: DVec3, tol: f64) {
        assert!(a.distance(b) < tol, "{a} != {b}");
    }

    #[test]
    fn cardinal_points() {
        assert_close(
            GeoPosition::from_degrees(0.0, 0.0, 0.0).to_cartesian(),
            DVec3::new(0.0, 0.0, EARTH_RADIUS),
            1e-6,
        );
        assert_close(
            GeoPosition::from_degrees(0.0, 90.0, 0.0).to_cartesian(),
            DVec3::new(EARTH_RADIUS, 0.0, 0.0),
            1e-6,
        );
        assert_close(
            GeoPosition::from_degrees(90.0, 0.0, 100.0).to_cartesian(),
            DVec3::new(0.0, EARTH_RADIUS + 100.0, 0.0),
            1e-6,
        );
    }

    #[test]
    fn cartesian_conversion_inverts() {
        let p = GeoPosition::from_degrees(45.0, -120.0, 2000.0);
        let back = GeoPosition::from_cartesian(p.to_cartesian());
        assert!((back.latitude() - 45.0).abs() < 1e-9);
        assert!((back.longitude() + 120.0).abs() < 1e-9);
        assert!((back.altitude - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn local_frame_is_right_handed_and_orthonormal() {
        let frame = LocalFrame::at(LatLon::from_degrees(38.88, -77.1));
        assert!((frame.east.length() - 1.0).abs() < 1e-12);
        assert!((frame.north.length() - 1.0).abs() < 1e-12);
        assert!(frame.east.dot(frame.north).abs() < 1e-12);
        assert_close(frame.east.cross(frame.north), frame.up, 1e-12);
        assert!(frame.north.y > 0.0);
    }

    #[test]
    fn offsets_round_trip() {
        let origin = LatLon::from_degrees(38.8826, -77.1059);
        let target = LatLon::from_degrees(38.8830, -77.1050);
        let offset = local_offset(origin, target);
        assert!(offset.x > 0.0 && offset.y > 0.0);
        let back = offset_location(origin, offset);
        assert!((back.latitude - target.latitude).abs() < 1e-12);
        assert!((back.longitude - target.longitude).abs() < 1e-12);
    }

    #[test]
    fn rebase_only_past_threshold() {
        let mut origin = SceneOrigin(DVec3::ZERO);
        assert!(!rebase_origin_near(&mut origin, DVec3::new(1000.0, 0.0, 0.0)));
        assert!(rebase_origin_near(&mut origin, DVec3::new(REBASE_DISTANCE + 1.0, 0.0, 0.0)));
        assert_eq!(origin.0.x, REBASE_DISTANCE + 1.0);
    }

    #[test]
    fn anchors_follow_origin() {
        let mut app = App::new();
        app.add_plugins(geo_plugin);
        let entity = app
            .world_mut()
            .spawn((GeoAnchor(DVec3::new(10.0, 20.0, 30.0)), Transform::default()))
            .id();
        app.update();
        let t = app.world().get::<Transform>(entity).unwrap().translation;
        assert_eq!(t, Vec3::new(10.0, 20.0, 30.0));

        app.world_mut().resource_mut::<SceneOrigin>().0 = DVec3::new(10.0, 0.0, 0.0);
        app.update();
        let t = app.world().get::<Transform>(entity).unwrap().translation;
        assert_eq!(t, Vec3::new(0.0, 20.0, 30.0));
    }
}
