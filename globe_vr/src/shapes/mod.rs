//! Demo shapes: archive loading, type registry, and polygon extrusion.

mod airspace;
mod archive;
mod extrude;
mod state;

pub use airspace::{
    Airspace, AirspaceConstructor, AirspaceKind, AirspaceRegistry, Altitudes,
    CappedCylinderAirspace, CurtainAirspace, OrbitAirspace, PolygonAirspace, AIRSPACE_TAG_PREFIX,
};
pub use archive::{
    load_airspaces_from_path, parse_entry_name, read_airspaces, EntryName, ShapeLoadError,
};
pub use extrude::{
    extrude_buildings, CapImage, ExtrudeError, ExtrudedGeometry, ExtrudedPolygon, MeshData,
    ShapeAttributes, BUILDING_HEIGHT, CAP_IMAGE, QUAD_CAP_TEX_COORDS, SIDE_TEXTURE,
};
pub use state::{RestorableState, StateError, StateObject};
