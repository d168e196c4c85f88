//! Log/progress notifications and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::Level;

/// Receiver for ordered pipeline notifications.
///
/// Events arrive in the order they were produced, from a single worker.
pub trait EventSink: Send + Sync {
    /// A human-readable log line.
    fn log(&self, level: Level, message: &str);

    /// Overall batch progress in `[0, 1]`.
    fn progress(&self, fraction: f32);
}

/// Sink that ignores events. Log lines still reach `tracing` through the pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn log(&self, _level: Level, _message: &str) {}

    fn progress(&self, _fraction: f32) {}
}

/// A recorded notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Log { level: Level, message: String },
    Progress(f32),
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Log messages only.
    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Log { message, .. } => Some(message),
                Event::Progress(_) => None,
            })
            .collect()
    }

    /// Progress values only.
    pub fn progress_values(&self) -> Vec<f32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(p) => Some(p),
                Event::Log { .. } => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl EventSink for RecordingSink {
    fn log(&self, level: Level, message: &str) {
        self.record(Event::Log {
            level,
            message: message.to_string(),
        });
    }

    fn progress(&self, fraction: f32) {
        self.record(Event::Progress(fraction));
    }
}

/// Send a log line to the sink and mirror it to `tracing` at the same level.
pub(crate) fn emit(sink: &dyn EventSink, level: Level, message: String) {
    if level == Level::ERROR {
        tracing::error!("{}", message);
    } else if level == Level::WARN {
        tracing::warn!("{}", message);
    } else if level == Level::INFO {
        tracing::info!("{}", message);
    } else if level == Level::DEBUG {
        tracing::debug!("{}", message);
    } else {
        tracing::trace!("{}", message);
    }
    sink.log(level, &message);
}

/// Shared flag checked at the top of the document and page loops.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next loop check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
