//! Fade state machine: a FIFO of pending messages and the tick-driven opacity
//! ramps of the message currently on screen.

use std::collections::VecDeque;
use std::time::Duration;

use bevy::math::Vec2;

use super::annotation::{Annotation, Eye, TextMeasure};

/// Interval between two fade ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Length of the fade-in and fade-out ramps, in ticks.
pub const FADE_TICKS: u64 = 10;

/// Duration used for queued messages: four seconds at the tick rate.
pub const DEFAULT_DURATION: DisplayDuration = DisplayDuration::Ticks(40);

/// How long a message stays up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayDuration {
    Ticks(u64),
    /// Stays until replaced by another message.
    Indefinite,
}

impl DisplayDuration {
    /// Negative tick counts mean "until dismissed".
    pub fn from_ticks(ticks: i64) -> Self {
        if ticks < 0 {
            DisplayDuration::Indefinite
        } else {
            DisplayDuration::Ticks(ticks as u64)
        }
    }

    fn expired(self, elapsed: u64) -> bool {
        match self {
            DisplayDuration::Ticks(total) => elapsed > total,
            DisplayDuration::Indefinite => false,
        }
    }

    fn fading_out(self, elapsed: u64) -> Option<f32> {
        match self {
            DisplayDuration::Ticks(total) if elapsed + FADE_TICKS > total => {
                Some(total.saturating_sub(elapsed) as f32 / FADE_TICKS as f32)
            }
            _ => None,
        }
    }
}

/// Where renderable annotations go when they are shown and retired.
pub trait RenderSink {
    fn add_renderable(&mut self, annotation: Annotation);
    fn remove_renderable(&mut self, annotation: &Annotation);
}

impl<S: RenderSink + ?Sized> RenderSink for Box<S> {
    fn add_renderable(&mut self, annotation: Annotation) {
        (**self).add_renderable(annotation);
    }

    fn remove_renderable(&mut self, annotation: &Annotation) {
        (**self).remove_renderable(annotation);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeState {
    Idle,
    Displaying {
        elapsed: u64,
        total: DisplayDuration,
    },
}

/// Result of a single tick, telling the scheduler what to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Same message still on screen.
    Running,
    /// The previous message expired and the next queued one started; the
    /// scheduler restarts its interval for `generation`.
    Advanced { generation: u64 },
    /// The message expired with nothing queued. The tick source stops.
    Stopped,
    /// Tick for an outdated generation, or while idle. Ignored.
    Stale,
}

/// Whether `enqueue` displayed the message or parked it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enqueued {
    Displayed { generation: u64 },
    Queued { position: usize },
}

pub struct FadeController<S> {
    sink: S,
    font_size: f32,
    pending: VecDeque<String>,
    current: Option<Annotation>,
    state: FadeState,
    generation: u64,
}

impl<S: RenderSink> FadeController<S> {
    pub fn new(sink: S, font_size: f32) -> Self {
        Self {
            sink,
            font_size,
            pending: VecDeque::new(),
            current: None,
            state: FadeState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == FadeState::Idle
    }

    /// Increments every time a new message starts a fresh timer state.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Most recently shown annotation. Stays set (at opacity 0) after
    /// expiry until the next message replaces it.
    pub fn current(&self) -> Option<&Annotation> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> impl ExactSizeIterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Drops everything queued and shows `text` right away.
    pub fn show_immediately(&mut self, text: impl Into<String>, duration: DisplayDuration) -> u64 {
        self.pending.clear();
        self.show_message(text, duration)
    }

    /// Shows `text` now if nothing is running, otherwise appends it.
    pub fn enqueue(&mut self, text: impl Into<String>) -> Enqueued {
        if self.is_idle() {
            let generation = self.show_message(text, DEFAULT_DURATION);
            Enqueued::Displayed { generation }
        } else {
            self.pending.push_back(text.into());
            Enqueued::Queued {
                position: self.pending.len() - 1,
            }
        }
    }

    /// Retires the current annotation and starts a fresh timer state for
    /// `text`. The pending queue is left alone.
    pub fn show_message(&mut self, text: impl Into<String>, duration: DisplayDuration) -> u64 {
        self.retire();
        let annotation = Annotation::new(text, self.font_size);
        self.sink.add_renderable(annotation.clone());
        self.current = Some(annotation);
        self.state = FadeState::Displaying {
            elapsed: 0,
            total: duration,
        };
        self.generation += 1;
        self.generation
    }

    /// Removes the current annotation from the sink.
    pub fn retire(&mut self) {
        if let Some(previous) = self.current.take() {
            self.sink.remove_renderable(&previous);
        }
        self.state = FadeState::Idle;
    }

    /// Advances the timer of `generation` by one tick.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if generation != self.generation {
            return TickOutcome::Stale;
        }
        let FadeState::Displaying { elapsed, total } = self.state else {
            return TickOutcome::Stale;
        };
        let Some(annotation) = self.current.clone() else {
            return TickOutcome::Stale;
        };

        let elapsed = elapsed.saturating_add(1);
        self.state = FadeState::Displaying { elapsed, total };

        if total.expired(elapsed) {
            annotation.set_opacity(0.0);
            return match self.pending.pop_front() {
                Some(next) => {
                    let generation = self.show_message(next, DEFAULT_DURATION);
                    TickOutcome::Advanced { generation }
                }
                None => {
                    self.state = FadeState::Idle;
                    TickOutcome::Stopped
                }
            };
        }

        if elapsed <= FADE_TICKS {
            annotation.set_opacity(elapsed as f32 / FADE_TICKS as f32);
        } else if let Some(opacity) = total.fading_out(elapsed) {
            annotation.set_opacity(opacity);
        }
        // Between the ramps the opacity keeps whatever value it last had.
        TickOutcome::Running
    }

    /// Recomputes the screen point of the current annotation for one eye.
    pub fn prepare_for_eye(
        &self,
        eye: Eye,
        viewport: Vec2,
        measure: &impl TextMeasure,
    ) -> Option<Vec2> {
        self.current
            .as_ref()
            .map(|annotation| annotation.layout_for_eye(eye, viewport, measure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        shown: Vec<Annotation>,
        log: Vec<String>,
    }

    impl RenderSink for RecordingSink {
        fn add_renderable(&mut self, annotation: Annotation) {
            self.log.push(format!("+{}", annotation.text()));
            self.shown.push(annotation);
        }

        fn remove_renderable(&mut self, annotation: &Annotation) {
            self.log.push(format!("-{}", annotation.text()));
            self.shown.retain(|a| !a.same_as(annotation));
        }
    }

    fn controller() -> FadeController<RecordingSink> {
        FadeController::new(RecordingSink::default(), 28.0)
    }

    fn run(c: &mut FadeController<RecordingSink>, ticks: usize) -> Vec<f32> {
        (0..ticks)
            .map(|_| {
                let generation = c.generation();
                c.tick(generation);
                c.current().map(Annotation::opacity).unwrap_or(0.0)
            })
            .collect()
    }

    #[test]
    fn new_message_starts_transparent() {
        let mut c = controller();
        c.show_immediately("A", DisplayDuration::Ticks(30));
        assert_eq!(c.current().map(Annotation::opacity), Some(0.0));
        assert_eq!(c.sink().log, vec!["+A"]);
    }

    #[test]
    fn fade_in_reaches_full_opacity_on_tenth_tick() {
        let mut c = controller();
        c.show_immediately("A", DisplayDuration::Ticks(30));
        let opacities = run(&mut c, 10);
        assert!((opacities[0] - 0.1).abs() < 1e-6);
        assert_eq!(opacities[9], 1.0);
    }

    #[test]
    fn ramps_are_strictly_monotonic() {
        for total in [20u64, 21, 40, 70] {
            let mut c = controller();
            c.show_immediately("A", DisplayDuration::Ticks(total));
            assert_eq!(c.current().map(Annotation::opacity), Some(0.0));

            let mut opacities = vec![0.0];
            let mut last = TickOutcome::Running;
            for _ in 0..=total {
                last = c.tick(c.generation());
                opacities.push(c.current().map(Annotation::opacity).unwrap_or(0.0));
            }
            let total = total as usize;

            for tick in 1..=10 {
                assert!(opacities[tick] > opacities[tick - 1], "{total}: fade in at {tick}");
            }
            assert!(opacities.contains(&1.0), "{total}: never fully opaque");
            for tick in total - 9..=total {
                assert!(opacities[tick] < opacities[tick - 1], "{total}: fade out at {tick}");
            }
            assert_eq!(opacities[total + 1], 0.0);
            assert_eq!(last, TickOutcome::Stopped);
            assert!(c.is_idle());
        }
    }

    #[test]
    fn short_duration_drops_without_fade_out() {
        let mut c = controller();
        c.show_immediately("A", DisplayDuration::Ticks(5));
        let opacities = run(&mut c, 6);
        assert!((opacities[4] - 0.5).abs() < 1e-6);
        assert_eq!(opacities[5], 0.0);
        assert!(c.is_idle());
    }

    #[test]
    fn zero_duration_expires_on_first_tick() {
        let mut c = controller();
        let generation = c.show_immediately("A", DisplayDuration::Ticks(0));
        assert_eq!(c.tick(generation), TickOutcome::Stopped);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut c = controller();
        let old = c.show_immediately("A", DisplayDuration::Ticks(30));
        c.show_message("B", DisplayDuration::Ticks(30));
        assert_eq!(c.tick(old), TickOutcome::Stale);
        assert_eq!(
            c.state(),
            FadeState::Displaying {
                elapsed: 0,
                total: DisplayDuration::Ticks(30)
            }
        );
    }

    #[test]
    fn show_message_keeps_queue() {
        let mut c = controller();
        c.show_immediately("A", DisplayDuration::Indefinite);
        c.enqueue("B");
        c.show_message("C", DisplayDuration::Ticks(3));
        assert_eq!(c.pending().collect::<Vec<_>>(), vec!["B"]);
        assert_eq!(c.sink().log, vec!["+A", "-A", "+C"]);
    }

    #[test]
    fn expired_annotation_stays_in_sink_until_replaced() {
        let mut c = controller();
        c.show_immediately("A", DisplayDuration::Ticks(2));
        run(&mut c, 3);
        assert!(c.is_idle());
        assert_eq!(c.sink().shown.len(), 1);

        c.enqueue("B");
        assert_eq!(c.sink().log, vec!["+A", "-A", "+B"]);
    }

    #[test]
    fn negative_ticks_map_to_indefinite() {
        assert_eq!(DisplayDuration::from_ticks(-1), DisplayDuration::Indefinite);
        assert_eq!(DisplayDuration::from_ticks(70), DisplayDuration::Ticks(70));
    }

    #[test]
    fn prepare_for_eye_without_message_is_none() {
        let c = controller();
        let measure = |_: &str, _: f32| Vec2::ZERO;
        assert!(c
            .prepare_for_eye(Eye::Left, Vec2::new(100.0, 100.0), &measure)
            .is_none());
    }
}
