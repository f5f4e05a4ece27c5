//! Message board: a [`FadeController`] driven by one cancellable interval task.
//!
//! Each display transition aborts the running task and spawns a new one, so at
//! most one tick source is alive. The controller, including its pending queue,
//! sits behind a single mutex shared by callers and the tick task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::log::debug;
use bevy::math::Vec2;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::annotation::{Eye, TextMeasure};
use super::fade::{
    DisplayDuration, Enqueued, FadeController, RenderSink, TickOutcome, TICK_INTERVAL,
};

pub struct MessageBoard<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for MessageBoard<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<S> {
    controller: Mutex<FadeController<S>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl<S> Drop for Shared<S> {
    fn drop(&mut self) {
        let ticker = self.ticker.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = ticker.take() {
            task.abort();
        }
    }
}

impl<S: RenderSink + Send + 'static> MessageBoard<S> {
    pub fn new(controller: FadeController<S>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                controller: Mutex::new(controller),
                ticker: Mutex::new(None),
                runtime,
            }),
        }
    }

    /// Clears the queue and displays `text` now. Negative `ticks` keep the
    /// message up until it is replaced.
    pub fn show_immediately(&self, text: impl Into<String>, ticks: i64) {
        let mut controller = self.lock();
        let generation = controller.show_immediately(text, DisplayDuration::from_ticks(ticks));
        self.restart_ticker(generation);
    }

    /// Displays `text` now when idle, otherwise queues it behind the others.
    pub fn enqueue(&self, text: impl Into<String>) {
        let mut controller = self.lock();
        match controller.enqueue(text) {
            Enqueued::Displayed { generation } => self.restart_ticker(generation),
            Enqueued::Queued { position } => {
                debug!("worldvr: message queued at position {position}");
            }
        }
    }

    /// Replaces the current message without touching the queue.
    pub fn show_message(&self, text: impl Into<String>, ticks: i64) {
        let mut controller = self.lock();
        let generation = controller.show_message(text, DisplayDuration::from_ticks(ticks));
        self.restart_ticker(generation);
    }

    pub fn prepare_for_eye(
        &self,
        eye: Eye,
        viewport: Vec2,
        measure: &impl TextMeasure,
    ) -> Option<Vec2> {
        self.lock().prepare_for_eye(eye, viewport, measure)
    }

    /// Whether a tick task is currently scheduled.
    pub fn is_ticking(&self) -> bool {
        self.shared
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Runs `f` with the controller locked.
    pub fn with_controller<R>(&self, f: impl FnOnce(&mut FadeController<S>) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, FadeController<S>> {
        self.shared
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Called with the controller lock held, which serializes replacements.
    fn restart_ticker(&self, generation: u64) {
        let mut ticker = self
            .shared
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = ticker.take() {
            previous.abort();
        }
        let shared = Arc::downgrade(&self.shared);
        *ticker = Some(self.shared.runtime.spawn(async move {
            let mut generation = generation;
            let mut interval = time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                let outcome = shared
                    .controller
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .tick(generation);
                match outcome {
                    TickOutcome::Running => {}
                    TickOutcome::Advanced { generation: next } => {
                        generation = next;
                        interval.reset_immediately();
                    }
                    TickOutcome::Stopped | TickOutcome::Stale => return,
                }
            }
        }));
    }
}
