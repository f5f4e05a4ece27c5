//! Fading, queued on-screen text messages.

mod annotation;
mod board;
mod fade;

pub use annotation::{
    Annotation, AnnotationId, Eye, MonospaceEstimate, TextMeasure, ANNOTATION_SIZE,
    EYE_PIXEL_SEPARATION,
};
pub use board::MessageBoard;
pub use fade::{
    DisplayDuration, Enqueued, FadeController, FadeState, RenderSink, TickOutcome,
    DEFAULT_DURATION, FADE_TICKS, TICK_INTERVAL,
};

/// Font size for messages at the given horizontal render resolution.
pub fn message_font_size(render_width: u32) -> f32 {
    if render_width < 1920 {
        16.0
    } else {
        28.0
    }
}

/// Tutorial prompts played when the viewer starts.
pub const WELCOME_MESSAGE: &str = "Welcome to the WorldVR Demo!";
pub const WELCOME_TICKS: i64 = 70;
pub const TUTORIAL_PROMPTS: &[&str] = &[
    "Use W,A,S,D to Navigate",
    "Use Shift Key to Change Navigation Speed",
    "Use Space Bar to Change Locations",
    "Note: on first visit to any location...",
    "...it will take time to cache imagery.",
    "Press Escape to Exit",
];

/// Shows the welcome message and queues the tutorial prompts behind it.
pub fn play_tutorial<S: RenderSink + Send + 'static>(board: &MessageBoard<S>) {
    board.show_immediately(WELCOME_MESSAGE, WELCOME_TICKS);
    for prompt in TUTORIAL_PROMPTS {
        board.enqueue(*prompt);
    }
}
