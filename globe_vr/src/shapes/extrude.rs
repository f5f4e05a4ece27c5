//! Extruded polygons: textured side walls from the ground to a fixed height and
//! a cap tessellated with lyon.

use bevy::color::palettes::css;
use bevy::math::{DVec2, DVec3};
use bevy::prelude::*;
use lyon_tessellation::math::point;
use lyon_tessellation::path::Path as LyonPath;
use lyon_tessellation::{BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers};
use thiserror::Error;

use crate::geo::{local_offset, offset_location, LatLon, LocalFrame};
use crate::shapes::airspace::{Airspace, PolygonAirspace};

/// Height of the demo buildings in metres.
pub const BUILDING_HEIGHT: f64 = 40.0;
pub const SIDE_TEXTURE: &str = "images/facade.png";
pub const CAP_IMAGE: &str = "images/cap_icon.png";
/// Cap texture coordinates for four-sided polygons, one pair per corner.
pub const QUAD_CAP_TEX_COORDS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];

const COINCIDENT_EPSILON: f32 = 0.01;

#[derive(Debug, Error, PartialEq)]
pub enum ExtrudeError {
    #[error("polygon needs at least 3 locations, got {0}")]
    TooFewLocations(usize),
    #[error("cap tessellation failed: {0}")]
    Tessellation(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeAttributes {
    pub interior: Color,
    pub outline: Color,
}

impl ShapeAttributes {
    pub fn sides() -> Self {
        Self {
            interior: css::LIGHT_GRAY.into(),
            outline: css::DARK_GRAY.into(),
        }
    }

    pub fn cap() -> Self {
        Self {
            interior: css::GRAY.into(),
            ..Self::sides()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CapImage {
    pub source: String,
    pub tex_coords: [f32; 8],
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtrudedPolygon {
    pub name: Option<String>,
    pub locations: Vec<LatLon>,
    pub height: f64,
    /// One texture per side, in boundary order.
    pub side_textures: Vec<String>,
    pub side_attributes: ShapeAttributes,
    pub cap_attributes: ShapeAttributes,
    pub cap_image: Option<CapImage>,
}

impl ExtrudedPolygon {
    /// Building-style extrusion of a polygon airspace. Four-sided polygons get
    /// the cap image; a repeated closing location does not count as a side.
    pub fn building(polygon: &PolygonAirspace, name: Option<String>) -> Self {
        let locations = open_ring(&polygon.locations);
        let cap_image = (locations.len() == 4).then(|| CapImage {
            source: CAP_IMAGE.to_string(),
            tex_coords: QUAD_CAP_TEX_COORDS,
        });
        Self {
            name,
            side_textures: vec![SIDE_TEXTURE.to_string(); locations.len()],
            locations,
            height: BUILDING_HEIGHT,
            side_attributes: ShapeAttributes::sides(),
            cap_attributes: ShapeAttributes::cap(),
            cap_image,
        }
    }

    pub fn side_count(&self) -> usize {
        self.locations.len()
    }
}

fn open_ring(locations: &[LatLon]) -> Vec<LatLon> {
    let mut ring = locations.to_vec();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Extrudes every polygon among `airspaces`; other shape kinds are skipped.
pub fn extrude_buildings(airspaces: &[Airspace]) -> Vec<ExtrudedPolygon> {
    airspaces
        .iter()
        .filter_map(|a| {
            a.kind
                .as_polygon()
                .map(|p| ExtrudedPolygon::building(p, a.display_name.clone()))
        })
        .collect()
}

/// Plain triangle list, positions relative to the shape anchor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtrudedGeometry {
    /// Cartesian point (first location, ground level) all vertices are
    /// relative to.
    pub anchor: DVec3,
    pub sides: MeshData,
    pub cap: MeshData,
    /// Closed outline loops for the base and top edges plus vertical edges.
    pub outline: Vec<[Vec3; 2]>,
}

impl ExtrudedPolygon {
    pub fn tessellate(&self) -> Result<ExtrudedGeometry, ExtrudeError> {
        let ring = open_ring(&self.locations);
        if ring.len() < 3 {
            return Err(ExtrudeError::TooFewLocations(ring.len()));
        }

        let origin = ring[0];
        let anchor = origin.at_altitude(0.0).to_cartesian();
        let planar: Vec<DVec2> = ring.iter().map(|l| local_offset(origin, *l)).collect();
        let counter_clockwise = signed_area(&planar) > 0.0;

        let to_local = |offset: DVec2, altitude: f64| -> Vec3 {
            let location = offset_location(origin, offset);
            (location.at_altitude(altitude).to_cartesian() - anchor).as_vec3()
        };
        let base: Vec<Vec3> = planar.iter().map(|p| to_local(*p, 0.0)).collect();
        let top: Vec<Vec3> = planar.iter().map(|p| to_local(*p, self.height)).collect();

        let sides = side_walls(&base, &top, counter_clockwise);
        let cap = self.cap_mesh(&planar, &top, origin, &to_local)?;

        let n = base.len();
        let mut outline = Vec::with_capacity(n * 3);
        for i in 0..n {
            let j = (i + 1) % n;
            outline.push([base[i], base[j]]);
            outline.push([top[i], top[j]]);
            outline.push([base[i], top[i]]);
        }

        Ok(ExtrudedGeometry {
            anchor,
            sides,
            cap,
            outline,
        })
    }

    fn cap_mesh(
        &self,
        planar: &[DVec2],
        top: &[Vec3],
        origin: LatLon,
        to_local: &impl Fn(DVec2, f64) -> Vec3,
    ) -> Result<MeshData, ExtrudeError> {
        let mut builder = LyonPath::builder();
        builder.begin(point(planar[0].x as f32, planar[0].y as f32));
        for p in &planar[1..] {
            builder.line_to(point(p.x as f32, p.y as f32));
        }
        builder.end(true);
        let path = builder.build();

        let mut geometry: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
        FillTessellator::new()
            .tessellate_path(
                &path,
                &FillOptions::default(),
                &mut BuffersBuilder::new(&mut geometry, |v: FillVertex| {
                    let p = v.position();
                    [p.x, p.y]
                }),
            )
            .map_err(|err| ExtrudeError::Tessellation(format!("{err:?}")))?;

        let (min, max) = planar.iter().fold(
            (DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        );
        let extent = (max - min).max(DVec2::splat(1e-9));
        let up = LocalFrame::at(origin).up.as_vec3();

        let mut cap = MeshData::default();
        for [x, y] in &geometry.vertices {
            let offset = DVec2::new(*x as f64, *y as f64);
            let position = to_local(offset, self.height);
            cap.positions.push(position.to_array());
            cap.normals.push(up.to_array());
            cap.uvs.push(self.cap_uv(offset, position, top, min, extent));
        }
        for tri in geometry.indices.chunks_exact(3) {
            let [a, b, c] =
                [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(cap.positions[i as usize]));
            if (b - a).cross(c - a).dot(up) >= 0.0 {
                cap.indices.extend_from_slice(tri);
            } else {
                cap.indices.extend_from_slice(&[tri[0], tri[2], tri[1]]);
            }
        }
        Ok(cap)
    }

    fn cap_uv(
        &self,
        offset: DVec2,
        position: Vec3,
        top: &[Vec3],
        min: DVec2,
        extent: DVec2,
    ) -> [f32; 2] {
        if let Some(image) = &self.cap_image {
            let corner = top
                .iter()
                .position(|corner| corner.distance(position) < COINCIDENT_EPSILON);
            if let Some(i) = corner.filter(|i| *i < 4) {
                return [image.tex_coords[2 * i], image.tex_coords[2 * i + 1]];
            }
        }
        let uv = (offset - min) / extent;
        [uv.x as f32, 1.0 - uv.y as f32]
    }
}

/// Shoelace formula; positive for counter-clockwise rings.
fn signed_area(ring: &[DVec2]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// One quad per boundary edge, each mapped to the full texture.
fn side_walls(base: &[Vec3], top: &[Vec3], counter_clockwise: bool) -> MeshData {
    let n = base.len();
    let mut mesh = MeshData::default();
    for i in 0..n {
        let j = (i + 1) % n;
        // Walk the ring so that the outside is on the right of each edge.
        let (a, b) = if counter_clockwise { (i, j) } else { (j, i) };
        let quad = [base[a], base[b], top[b], top[a]];
        let normal = (quad[1] - quad[0]).cross(quad[3] - quad[0]).normalize_or_zero();

        let start = mesh.positions.len() as u32;
        for (corner, uv) in quad.iter().zip([[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]) {
            mesh.positions.push(corner.to_array());
            mesh.normals.push(normal.to_array());
            mesh.uvs.push(uv);
        }
        mesh.indices
            .extend_from_slice(&[start, start + 1, start + 2, start, start + 2, start + 3]);
    }
    mesh
}
