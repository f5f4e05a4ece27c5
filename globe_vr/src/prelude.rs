//! Minimal prelude for SDK consumers.

pub use crate::config::{viewer_config, StereoMode, ViewerConfig};
pub use crate::messages::{play_tutorial, Annotation, MessageBoard, RenderSink};
pub use crate::sdk::WorldVrBuilder;
