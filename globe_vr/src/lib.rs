//! WorldVR: a stereo globe viewer demo.
//!
//! Library root: configuration, geodesy, the message queue, demo shapes, and
//! the Bevy plugins that put them on screen.

pub mod camera;
pub mod config;
pub mod geo;
pub mod messages;
pub mod scene;
pub mod shapes;
pub mod ui;

pub mod prelude;
pub mod sdk;

pub use messages::{Annotation, FadeController, MessageBoard, RenderSink};
pub use shapes::{load_airspaces_from_path, read_airspaces, Airspace, AirspaceRegistry};
pub use ui::{ChannelSink, MessageHud, SinkEvent};
