//! Error types
//!
//! Usage errors surface synchronously to the caller. Callback errors never
//! interrupt a dispatch or delivery round; they are gathered and handed to an
//! [`ErrorReporter`] once the round is over.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::TimerId;

/// Usage errors raised synchronously by the core
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("InvalidStateError: {0}")]
    InvalidState(&'static str),

    #[error("TypeError: {0}")]
    InvalidObserverOptions(&'static str),

    #[error("Event loop is closed")]
    LoopClosed,
}

/// Where a failing callback was running
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallbackOrigin {
    /// Not yet attributed
    #[default]
    Script,
    Listener { event_type: String },
    MutationObserver,
    Timer(TimerId),
    Microtask,
    Task,
}

impl fmt::Display for CallbackOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackOrigin::Script => write!(f, "script"),
            CallbackOrigin::Listener { event_type } => write!(f, "'{}' listener", event_type),
            CallbackOrigin::MutationObserver => write!(f, "mutation observer"),
            CallbackOrigin::Timer(id) => write!(f, "timer {}", id.0),
            CallbackOrigin::Microtask => write!(f, "microtask"),
            CallbackOrigin::Task => write!(f, "task"),
        }
    }
}

/// An exception raised inside a callback
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Uncaught exception in {origin}: {message}")]
pub struct CallbackError {
    pub message: String,
    pub origin: CallbackOrigin,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: CallbackOrigin::Script,
        }
    }

    /// Attribute the error unless a more specific origin is already set
    pub(crate) fn attributed(mut self, origin: CallbackOrigin) -> Self {
        if self.origin == CallbackOrigin::Script {
            self.origin = origin;
        }
        self
    }
}

/// Outcome of invoking a callback
pub type CallbackResult = Result<(), CallbackError>;

/// Top-level sink for uncaught callback errors
pub trait ErrorReporter {
    fn report(&self, error: &CallbackError);
}

/// Reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &CallbackError) {
        tracing::error!("{}", error);
    }
}

/// Keeps every report in memory
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    reports: Rc<RefCell<Vec<CallbackError>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors reported so far
    pub fn reports(&self) -> Vec<CallbackError> {
        self.reports.borrow().clone()
    }

    /// Drain the collected errors
    pub fn take(&self) -> Vec<CallbackError> {
        self.reports.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, error: &CallbackError) {
        self.reports.borrow_mut().push(error.clone());
    }
}
