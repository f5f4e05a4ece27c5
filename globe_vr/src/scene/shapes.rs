//! Spawns the extruded demo buildings and draws their outlines.

use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;

use crate::config::ViewerConfig;
use crate::geo::GeoAnchor;
use crate::shapes::{
    extrude_buildings, load_airspaces_from_path, AirspaceRegistry, ExtrudedPolygon, MeshData,
};

/// Outline segments of one extruded shape, relative to its anchor.
#[derive(Component, Clone, Debug)]
pub struct ShapeOutline {
    pub segments: Vec<[Vec3; 2]>,
    pub color: Color,
}

/// Shape name shown for picked buildings.
#[derive(Component, Clone, Debug)]
pub struct DemoShape {
    pub name: Option<String>,
}

/// Shapes and sides spawned at startup.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShapeSummary {
    pub shapes: usize,
    pub sides: usize,
}

pub fn shapes_plugin(app: &mut App) {
    app.init_resource::<ShapeSummary>()
        .add_systems(Startup, spawn_demo_shapes)
        .add_systems(Update, draw_shape_outlines);
}

pub fn mesh_from_data(data: &MeshData) -> Mesh {
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, data.uvs.clone())
        .with_inserted_indices(Indices::U32(data.indices.clone()))
}

pub fn spawn_demo_shapes(
    mut commands: Commands,
    config: Res<ViewerConfig>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut summary: ResMut<ShapeSummary>,
) {
    let airspaces = load_airspaces_from_path(&config.shapes_archive, &AirspaceRegistry::default());
    for shape in extrude_buildings(&airspaces) {
        if spawn_extruded(&mut commands, &asset_server, &mut meshes, &mut materials, &shape) {
            summary.shapes += 1;
            summary.sides += shape.side_count();
        }
    }
    info!(
        "worldvr: {} extruded shapes, {} sides",
        summary.shapes, summary.sides
    );
}

fn spawn_extruded(
    commands: &mut Commands,
    asset_server: &AssetServer,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    shape: &ExtrudedPolygon,
) -> bool {
    let geometry = match shape.tessellate() {
        Ok(geometry) => geometry,
        Err(err) => {
            warn!(
                "worldvr: skipping shape {}: {err}",
                shape.name.as_deref().unwrap_or("<unnamed>")
            );
            return false;
        }
    };

    // All sides share one facade texture.
    let side_texture = shape
        .side_textures
        .first()
        .map(|path| asset_server.load(path.clone()));
    let side_material = materials.add(StandardMaterial {
        base_color: shape.side_attributes.interior,
        base_color_texture: side_texture,
        double_sided: true,
        cull_mode: None,
        ..default()
    });
    let cap_material = materials.add(StandardMaterial {
        base_color: shape.cap_attributes.interior,
        base_color_texture: shape
            .cap_image
            .as_ref()
            .map(|image| asset_server.load(image.source.clone())),
        double_sided: true,
        cull_mode: None,
        ..default()
    });

    commands
        .spawn((
            DemoShape {
                name: shape.name.clone(),
            },
            ShapeOutline {
                segments: geometry.outline,
                color: shape.side_attributes.outline,
            },
            GeoAnchor(geometry.anchor),
            Transform::default(),
            Visibility::default(),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh3d(meshes.add(mesh_from_data(&geometry.sides))),
                MeshMaterial3d(side_material),
            ));
            parent.spawn((
                Mesh3d(meshes.add(mesh_from_data(&geometry.cap))),
                MeshMaterial3d(cap_material),
            ));
        });
    true
}

fn draw_shape_outlines(mut gizmos: Gizmos, outlines: Query<(&ShapeOutline, &GlobalTransform)>) {
    for (outline, transform) in &outlines {
        for [start, end] in &outline.segments {
            gizmos.line(
                transform.transform_point(*start),
                transform.transform_point(*end),
                outline.color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::render::mesh::VertexAttributeValues;

    #[test]
    fn mesh_keeps_all_attributes() {
        let data = MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            indices: vec![0, 1, 2],
        };
        let mesh = mesh_from_data(&data);
        assert_eq!(mesh.count_vertices(), 3);
        assert!(matches!(
            mesh.attribute(Mesh::ATTRIBUTE_UV_0),
            Some(VertexAttributeValues::Float32x2(uvs)) if uvs.len() == 3
        ));
        assert_eq!(mesh.indices().map(Indices::len), Some(3));
    }
}
