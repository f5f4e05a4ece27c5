mod globe;
mod placemark;
mod shapes;

pub use globe::{setup_scene, Globe};
pub use placemark::{
    balloon_text, placemark_plugin, read_balloon_content, spawn_placemark, BalloonContent,
    Placemark, PLACEMARK_LABEL, PLACEMARK_POSITION,
};
pub use shapes::{
    mesh_from_data, shapes_plugin, spawn_demo_shapes, DemoShape, ShapeOutline, ShapeSummary,
};
