//! Globe body and lighting.

use bevy::math::DVec3;
use bevy::prelude::*;

use crate::geo::{GeoAnchor, EARTH_RADIUS};

const GLOBE_SECTORS: u32 = 256;
const GLOBE_STACKS: u32 = 128;

/// Marker for the earth sphere.
#[derive(Component)]
pub struct Globe;

pub fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Globe,
        Mesh3d(meshes.add(Sphere::new(EARTH_RADIUS as f32).mesh().uv(GLOBE_SECTORS, GLOBE_STACKS))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.16, 0.32, 0.22),
            perceptual_roughness: 0.95,
            ..default()
        })),
        GeoAnchor(DVec3::ZERO),
        Transform::default(),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_xyz(1.0, 2.0, 3.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_scene_spawns_globe_and_light() {
        let mut app = App::new();
        app.init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .add_systems(Startup, setup_scene);

        app.update();

        let world = app.world_mut();
        assert_eq!(world.query::<&Globe>().iter(world).count(), 1);
        assert!(world.query::<&DirectionalLight>().iter(world).count() >= 1);
        assert!(world.get_resource::<AmbientLight>().is_some());
    }
}
