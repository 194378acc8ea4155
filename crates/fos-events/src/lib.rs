//! fOS Events - Event dispatch and change notification
//!
//! Decides which callbacks run for an interaction or a tree mutation, in what
//! order, and whether synchronously or deferred:
//! - Event dispatch through capture, target and bubble phases
//! - Listener registration with `once`, `passive` and abort-signal linkage
//! - AbortController / AbortSignal
//! - Click activation with commit or rollback
//! - Focus change sequencing
//! - MutationObserver batching and microtask delivery
//! - Timers, microtasks and tasks posted from background threads
//!
//! Callbacks are Rust closures receiving the [`EventLoop`]; a script engine
//! wraps its functions in them and maps thrown exceptions to
//! [`CallbackError`].

mod abort;
mod activation;
mod clock;
mod config;
mod dispatch;
mod error;
mod event;
mod event_loop;
mod focus;
mod listener;
mod mutation;
mod scheduler;
mod target;

pub use abort::{AbortController, AbortError, AbortReason, AbortSignal};
pub use activation::{ActivationKind, ActivationResult, ActivationSnapshot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EventLoopConfig;
pub use error::{
    CallbackError, CallbackOrigin, CallbackResult, CollectingReporter, ErrorReporter, EventError,
    TracingReporter,
};
pub use event::{Event, EventInit, EventPayload, EventPhase, MouseDetail};
pub use event_loop::EventLoop;
pub use listener::{EventCallback, ListenerOptions};
pub use mutation::{
    ChildListChange, MutationObserver, MutationObserverInit, MutationRecord, MutationType,
};
pub use scheduler::{TaskInjector, TimerId};
pub use target::{Detached, ParentResolver, TargetId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
