//! Annotation handle shared between the fade controller and the render sink.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bevy::math::Vec2;

/// Horizontal pixel shift applied in opposite directions for each eye.
pub const EYE_PIXEL_SEPARATION: f32 = 20.0;

/// Fixed layout box reserved for a message.
pub const ANNOTATION_SIZE: Vec2 = Vec2::new(500.0, 500.0);

static NEXT_ANNOTATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationId(u64);

/// Which eye a render pass is drawing. `Center` is used for mono output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
    Center,
}

impl Eye {
    pub fn from_is_left(is_left: bool) -> Self {
        if is_left {
            Eye::Left
        } else {
            Eye::Right
        }
    }

    fn pixel_offset(self) -> f32 {
        match self {
            Eye::Left => EYE_PIXEL_SEPARATION,
            Eye::Right => -EYE_PIXEL_SEPARATION,
            Eye::Center => 0.0,
        }
    }
}

/// Measures the rendered extent of a line of text.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> Vec2;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, f32) -> Vec2,
{
    fn measure(&self, text: &str, font_size: f32) -> Vec2 {
        self(text, font_size)
    }
}

/// Fixed-advance estimate used before the text has been laid out.
#[derive(Clone, Copy, Debug)]
pub struct MonospaceEstimate {
    pub advance: f32,
    pub line_height: f32,
}

impl Default for MonospaceEstimate {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.2,
        }
    }
}

impl TextMeasure for MonospaceEstimate {
    fn measure(&self, text: &str, font_size: f32) -> Vec2 {
        let columns = text.chars().count() as f32;
        Vec2::new(
            columns * self.advance * font_size,
            self.line_height * font_size,
        )
    }
}

/// A displayed text message.
///
/// Cloning shares the same annotation: opacity and screen point written by the
/// fade controller are visible to whichever render sink holds a clone.
#[derive(Clone, Debug)]
pub struct Annotation {
    inner: Arc<AnnotationInner>,
}

#[derive(Debug)]
struct AnnotationInner {
    id: AnnotationId,
    text: String,
    font_size: f32,
    size: Vec2,
    opacity: AtomicU32,
    screen_point: Mutex<Option<Vec2>>,
}

impl Annotation {
    pub fn new(text: impl Into<String>, font_size: f32) -> Self {
        let id = AnnotationId(NEXT_ANNOTATION_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Arc::new(AnnotationInner {
                id,
                text: text.into(),
                font_size,
                size: ANNOTATION_SIZE,
                opacity: AtomicU32::new(0.0f32.to_bits()),
                screen_point: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.inner.id
    }

    pub fn text(&self) -> &str {
        &self.inner.text
    }

    pub fn font_size(&self) -> f32 {
        self.inner.font_size
    }

    pub fn size(&self) -> Vec2 {
        self.inner.size
    }

    pub fn opacity(&self) -> f32 {
        f32::from_bits(self.inner.opacity.load(Ordering::Acquire))
    }

    pub fn set_opacity(&self, opacity: f32) {
        let clamped = opacity.clamp(0.0, 1.0);
        self.inner.opacity.store(clamped.to_bits(), Ordering::Release);
    }

    /// Top-left corner of the text box in eye-viewport pixels (y down).
    pub fn screen_point(&self) -> Option<Vec2> {
        *self
            .inner
            .screen_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_screen_point(&self, point: Vec2) {
        *self
            .inner
            .screen_point
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    pub fn measure_text(&self, measure: &impl TextMeasure) -> Vec2 {
        measure.measure(&self.inner.text, self.inner.font_size)
    }

    /// Centers the text in the eye's viewport, then shifts it horizontally by
    /// the per-eye separation. Stores and returns the new screen point.
    pub fn layout_for_eye(&self, eye: Eye, viewport: Vec2, measure: &impl TextMeasure) -> Vec2 {
        let text = self.measure_text(measure);
        let point = Vec2::new(
            viewport.x / 2.0 - text.x / 2.0 + eye.pixel_offset(),
            viewport.y / 2.0 - text.y / 2.0,
        );
        self.set_screen_point(point);
        point
    }

    pub fn same_as(&self, other: &Annotation) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_is_clamped_and_shared_between_clones() {
        let a = Annotation::new("hello", 28.0);
        let b = a.clone();
        a.set_opacity(1.5);
        assert_eq!(b.opacity(), 1.0);
        b.set_opacity(-0.2);
        assert_eq!(a.opacity(), 0.0);
        assert!(a.same_as(&b));
    }

    #[test]
    fn ids_are_unique() {
        let a = Annotation::new("a", 16.0);
        let b = Annotation::new("a", 16.0);
        assert_ne!(a.id(), b.id());
        assert!(!a.same_as(&b));
    }

    #[test]
    fn eyes_are_shifted_in_opposite_directions() {
        let a = Annotation::new("Press Escape to Exit", 28.0);
        let fixed = |_: &str, _: f32| Vec2::new(200.0, 30.0);
        let viewport = Vec2::new(640.0, 800.0);

        let left = a.layout_for_eye(Eye::Left, viewport, &fixed);
        assert_eq!(left, Vec2::new(320.0 - 100.0 + 20.0, 400.0 - 15.0));
        assert_eq!(a.screen_point(), Some(left));

        let right = a.layout_for_eye(Eye::Right, viewport, &fixed);
        assert_eq!(right.x, left.x - 2.0 * EYE_PIXEL_SEPARATION);
        assert_eq!(right.y, left.y);

        let center = a.layout_for_eye(Eye::Center, viewport, &fixed);
        assert_eq!(center.x, left.x - EYE_PIXEL_SEPARATION);
    }

    #[test]
    fn monospace_estimate_scales_with_font_and_length() {
        let m = MonospaceEstimate::default();
        let short = m.measure("abc", 10.0);
        let long = m.measure("abcdef", 10.0);
        assert!((short.x - 18.0).abs() < 1e-4);
        assert!((long.x - 2.0 * short.x).abs() < 1e-4);
        assert!((short.y - 12.0).abs() < 1e-4);
    }
}
