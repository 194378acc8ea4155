//! Mutation Observers
//!
//! Per-observer record queues fed by tree notifications and delivered in
//! batches from a microtask.

mod manager;
mod observer;
mod record;

pub(crate) use manager::ObserverRegistry;
pub use observer::{MutationObserver, MutationObserverInit};
pub use record::{ChildListChange, MutationRecord, MutationType};
