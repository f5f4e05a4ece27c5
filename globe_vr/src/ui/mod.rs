mod balloon;
mod hud;
mod messages;

pub use balloon::{balloon_plugin, cursor_in_viewport, faces_viewer, PlacemarkLabel};
pub use hud::{status_hud_plugin, StatusHud};
pub use messages::{
    apply_sink_events, message_hud_plugin, sync_message_opacity, ChannelSink, MessageHud,
    MessageText, SinkEvent, SinkEvents, TickerRuntime,
};
