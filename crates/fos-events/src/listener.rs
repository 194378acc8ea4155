//! Listener Registry
//!
//! Per-target, per-type listener lists in registration order. Dispatch works
//! on snapshots of these lists, so structural changes made by a running
//! callback never disturb the iteration in progress; removed entries are
//! flagged so pending snapshots skip them.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{AbortSignal, CallbackResult, Event, EventLoop, TargetId};

/// Listener callback
///
/// Identity is the allocation: clones compare equal, two closures with the
/// same body do not.
#[derive(Clone)]
pub struct EventCallback(Rc<dyn Fn(&mut EventLoop, &mut Event) -> CallbackResult>);

impl EventCallback {
    pub fn new(f: impl Fn(&mut EventLoop, &mut Event) -> CallbackResult + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Same underlying callback
    pub fn same(&self, other: &EventCallback) -> bool {
        self.key() == other.key()
    }

    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }

    pub(crate) fn call(&self, rt: &mut EventLoop, event: &mut Event) -> CallbackResult {
        (self.0)(rt, event)
    }
}

impl PartialEq for EventCallback {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventCallback({:#x})", self.key())
    }
}

/// Listener options
#[derive(Debug, Clone, Default)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
    pub signal: Option<AbortSignal>,
}

impl ListenerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }

    pub fn signal(mut self, signal: &AbortSignal) -> Self {
        self.signal = Some(signal.clone());
        self
    }
}

/// Registered listener
#[derive(Debug)]
pub(crate) struct Listener {
    pub callback: EventCallback,
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
    /// Token shared with the abort signal's linkage entry
    pub signal_token: Option<u64>,
    signal: Option<AbortSignal>,
    removed: Cell<bool>,
    /// Deregistered by its signal's abort
    aborted: Cell<bool>,
}

impl Listener {
    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }

    pub fn mark_removed(&self) {
        self.removed.set(true);
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.get()
    }

    /// Drop the signal's linkage entry for this listener
    fn unlink(&self) {
        if let (Some(signal), Some(token)) = (&self.signal, self.signal_token) {
            signal.unlink(token);
        }
    }
}

/// Backing slot of an `on<type>` handler attribute
#[derive(Debug)]
struct HandlerSlot {
    handler: Rc<RefCell<EventCallback>>,
    trampoline: EventCallback,
}

type ListenerMap = HashMap<String, Vec<Rc<Listener>>>;

/// Listener storage for every target
#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    targets: HashMap<TargetId, ListenerMap>,
    handlers: HashMap<(TargetId, String), HandlerSlot>,
    next_token: u64,
}

impl ListenerRegistry {
    /// Append a listener unless an equivalent live one exists
    pub fn add(
        &mut self,
        target: TargetId,
        event_type: &str,
        callback: EventCallback,
        options: &ListenerOptions,
    ) -> Option<Rc<Listener>> {
        let list = self
            .targets
            .entry(target)
            .or_default()
            .entry(event_type.to_string())
            .or_default();

        let duplicate = list
            .iter()
            .any(|l| !l.is_removed() && l.capture == options.capture && l.callback.same(&callback));
        if duplicate {
            return None;
        }

        let signal_token = options.signal.as_ref().map(|_| {
            self.next_token += 1;
            self.next_token
        });
        let listener = Rc::new(Listener {
            callback,
            capture: options.capture,
            once: options.once,
            passive: options.passive,
            signal_token,
            signal: options.signal.clone(),
            removed: Cell::new(false),
            aborted: Cell::new(false),
        });
        list.push(listener.clone());
        Some(listener)
    }

    /// Remove the first live entry matching callback and capture flag
    pub fn remove(
        &mut self,
        target: TargetId,
        event_type: &str,
        callback: &EventCallback,
        capture: bool,
    ) -> bool {
        self.remove_where(target, event_type, |l| {
            l.capture == capture && l.callback.same(callback)
        })
        .is_some()
    }

    /// Remove the entry created for an abort linkage
    ///
    /// A `once` entry that already fired is only flagged; its structural
    /// removal is left to the dispatch that invoked it.
    pub fn remove_linked(
        &mut self,
        target: TargetId,
        event_type: &str,
        callback_key: usize,
        capture: bool,
        token: u64,
    ) -> Option<Rc<Listener>> {
        let list = self.list_mut(target, event_type)?;
        let pos = list.iter().position(|l| {
            l.capture == capture
                && l.callback.key() == callback_key
                && l.signal_token == Some(token)
        })?;
        list[pos].aborted.set(true);
        if list[pos].is_removed() {
            return None;
        }
        let listener = list.remove(pos);
        listener.mark_removed();
        self.prune(target, event_type);
        Some(listener)
    }

    /// Remove this exact entry (used for `once` cleanup)
    pub fn remove_exact(&mut self, target: TargetId, event_type: &str, listener: &Rc<Listener>) {
        let Some(list) = self.list_mut(target, event_type) else {
            return;
        };
        if let Some(pos) = list.iter().position(|l| Rc::ptr_eq(l, listener)) {
            list.remove(pos).unlink();
        }
        self.prune(target, event_type);
    }

    fn remove_where(
        &mut self,
        target: TargetId,
        event_type: &str,
        matches: impl Fn(&Listener) -> bool,
    ) -> Option<Rc<Listener>> {
        let list = self.list_mut(target, event_type)?;
        let pos = list.iter().position(|l| !l.is_removed() && matches(l))?;
        let listener = list.remove(pos);
        listener.mark_removed();
        listener.unlink();
        self.prune(target, event_type);
        Some(listener)
    }

    fn list_mut(
        &mut self,
        target: TargetId,
        event_type: &str,
    ) -> Option<&mut Vec<Rc<Listener>>> {
        self.targets.get_mut(&target)?.get_mut(event_type)
    }

    fn prune(&mut self, target: TargetId, event_type: &str) {
        if let Some(map) = self.targets.get_mut(&target) {
            if map.get(event_type).is_some_and(|l| l.is_empty()) {
                map.remove(event_type);
            }
            if map.is_empty() {
                self.targets.remove(&target);
            }
        }
    }

    /// Copy of the current list for one dispatch step
    pub fn snapshot(&self, target: TargetId, event_type: &str) -> Vec<Rc<Listener>> {
        self.targets
            .get(&target)
            .and_then(|map| map.get(event_type))
            .cloned()
            .unwrap_or_default()
    }

    /// Live listeners for target and type
    pub fn count(&self, target: TargetId, event_type: &str) -> usize {
        self.targets
            .get(&target)
            .and_then(|map| map.get(event_type))
            .map(|list| list.iter().filter(|l| !l.is_removed()).count())
            .unwrap_or(0)
    }

    /// Drop everything registered on a target
    pub fn clear_target(&mut self, target: TargetId) -> usize {
        self.handlers.retain(|(t, _), _| *t != target);
        self.targets
            .remove(&target)
            .map(|map| {
                map.values()
                    .flatten()
                    .inspect(|l| {
                        l.mark_removed();
                        l.unlink();
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

impl EventLoop {
    /// Register a listener
    ///
    /// Returns false when nothing was added: an equivalent listener (same
    /// callback, same capture flag) is already registered, or the linked
    /// signal is already aborted.
    pub fn add_event_listener(
        &mut self,
        target: TargetId,
        event_type: &str,
        callback: EventCallback,
        options: ListenerOptions,
    ) -> bool {
        if let Some(signal) = &options.signal {
            if signal.aborted() {
                tracing::debug!(
                    "Ignoring '{}' listener on {:?}: signal already aborted",
                    event_type,
                    target
                );
                return false;
            }
        }

        let Some(listener) = self.listeners.add(target, event_type, callback, &options) else {
            return false;
        };

        if let (Some(signal), Some(token)) = (&options.signal, listener.signal_token) {
            signal.link(target, event_type, &listener.callback, listener.capture, token);
        }
        tracing::trace!(
            "Added '{}' listener on {:?} (capture: {})",
            event_type,
            target,
            listener.capture
        );
        true
    }

    /// Remove a listener; no-op when absent
    pub fn remove_event_listener(
        &mut self,
        target: TargetId,
        event_type: &str,
        callback: &EventCallback,
        capture: bool,
    ) -> bool {
        self.listeners.remove(target, event_type, callback, capture)
    }

    /// Set or clear the `on<type>` handler attribute of a target
    ///
    /// The first assignment appends a listener; later assignments swap the
    /// callback without moving it, so its place in the order is kept.
    pub fn set_event_handler(
        &mut self,
        target: TargetId,
        event_type: &str,
        handler: Option<EventCallback>,
    ) {
        let key = (target, event_type.to_string());
        match handler {
            Some(handler) => {
                if let Some(slot) = self.listeners.handlers.get(&key) {
                    *slot.handler.borrow_mut() = handler;
                    return;
                }
                let cell = Rc::new(RefCell::new(handler));
                let inner = cell.clone();
                let trampoline = EventCallback::new(move |rt, event| {
                    let handler = inner.borrow().clone();
                    handler.call(rt, event)
                });
                self.listeners.add(
                    target,
                    event_type,
                    trampoline.clone(),
                    &ListenerOptions::default(),
                );
                self.listeners.handlers.insert(key, HandlerSlot { handler: cell, trampoline });
            }
            None => {
                if let Some(slot) = self.listeners.handlers.remove(&key) {
                    self.listeners.remove(target, event_type, &slot.trampoline, false);
                }
            }
        }
    }

    /// Current `on<type>` handler, if set
    pub fn event_handler(&self, target: TargetId, event_type: &str) -> Option<EventCallback> {
        self.listeners
            .handlers
            .get(&(target, event_type.to_string()))
            .map(|slot| slot.handler.borrow().clone())
    }

    /// Whether any live listener exists for target and type
    pub fn has_listeners(&self, target: TargetId, event_type: &str) -> bool {
        self.listeners.count(target, event_type) > 0
    }

    /// Number of live listeners for target and type
    pub fn listener_count(&self, target: TargetId, event_type: &str) -> usize {
        self.listeners.count(target, event_type)
    }

    /// Remove every listener and handler of a target (node teardown)
    pub fn clear_listeners(&mut self, target: TargetId) -> usize {
        let removed = self.listeners.clear_target(target);
        tracing::debug!("Cleared {} listeners from {:?}", removed, target);
        removed
    }
}
