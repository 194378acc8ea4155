//! AbortController and AbortSignal
//!
//! One-shot cancellation. A signal is itself an event target (`abort` event,
//! `onabort` handler) and owns the linkage table of listeners registered with
//! it; aborting removes those listeners before the `abort` event fires.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::{Event, EventCallback, EventInit, EventLoop, TargetId};

/// Why a signal was aborted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AbortReason {
    /// Default reason, an "AbortError"
    #[default]
    Abort,
    /// Raised by `AbortSignal::timeout`
    Timeout,
    /// Reason supplied by script
    Custom(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Abort => write!(f, "AbortError: signal is aborted without reason"),
            AbortReason::Timeout => write!(f, "TimeoutError: signal timed out"),
            AbortReason::Custom(reason) => write!(f, "{}", reason),
        }
    }
}

/// Error returned by `throw_if_aborted`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct AbortError {
    pub reason: AbortReason,
}

/// Listener registered with a signal, keyed for lookup in the registry
#[derive(Debug)]
struct ListenerLink {
    target: TargetId,
    event_type: String,
    callback_key: usize,
    capture: bool,
    token: u64,
}

#[derive(Debug)]
struct SignalInner {
    target: TargetId,
    aborted: Cell<bool>,
    reason: RefCell<Option<AbortReason>>,
    links: RefCell<Vec<ListenerLink>>,
    dependents: RefCell<Vec<Weak<SignalInner>>>,
}

/// AbortSignal - cancellation state
#[derive(Debug, Clone)]
pub struct AbortSignal {
    inner: Rc<SignalInner>,
}

/// AbortController - cancellation controller
#[derive(Debug, Clone)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Create a new abort controller
    pub fn new(rt: &mut EventLoop) -> Self {
        Self {
            signal: AbortSignal::new(rt),
        }
    }

    /// Get the associated signal
    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    /// Abort with an optional reason; later calls do nothing
    pub fn abort(&self, rt: &mut EventLoop, reason: Option<AbortReason>) {
        rt.signal_abort(&self.signal, reason.unwrap_or_default());
    }
}

impl AbortSignal {
    fn new(rt: &mut EventLoop) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                target: rt.allocate_object_target(),
                aborted: Cell::new(false),
                reason: RefCell::new(None),
                links: RefCell::new(Vec::new()),
                dependents: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create an already-aborted signal
    pub fn abort(rt: &mut EventLoop, reason: Option<AbortReason>) -> Self {
        let signal = Self::new(rt);
        signal.mark_aborted(reason.unwrap_or_default());
        signal
    }

    /// Create a signal that aborts with `AbortReason::Timeout` after `ms`
    pub fn timeout(rt: &mut EventLoop, ms: u64) -> Self {
        let signal = Self::new(rt);
        let weak = Rc::downgrade(&signal.inner);
        rt.set_timeout(
            move |rt| {
                if let Some(inner) = weak.upgrade() {
                    rt.signal_abort(&AbortSignal { inner }, AbortReason::Timeout);
                }
                Ok(())
            },
            ms,
        );
        signal
    }

    /// Create a signal that aborts as soon as any of `signals` does
    pub fn any(rt: &mut EventLoop, signals: &[AbortSignal]) -> Self {
        if let Some(aborted) = signals.iter().find(|s| s.aborted()) {
            return Self::abort(rt, aborted.reason());
        }
        let result = Self::new(rt);
        for source in signals {
            source.inner.dependents.borrow_mut().push(Rc::downgrade(&result.inner));
        }
        result
    }

    /// Event target of this signal (`abort` listeners live here)
    pub fn target(&self) -> TargetId {
        self.inner.target
    }

    /// Check if aborted
    pub fn aborted(&self) -> bool {
        self.inner.aborted.get()
    }

    /// Get abort reason
    pub fn reason(&self) -> Option<AbortReason> {
        self.inner.reason.borrow().clone()
    }

    /// Fail with the stored reason if aborted
    pub fn throw_if_aborted(&self) -> Result<(), AbortError> {
        match self.reason() {
            Some(reason) if self.aborted() => Err(AbortError { reason }),
            _ => Ok(()),
        }
    }

    /// Set or clear the `onabort` handler
    pub fn set_onabort(&self, rt: &mut EventLoop, handler: Option<EventCallback>) {
        rt.set_event_handler(self.target(), "abort", handler);
    }

    /// Number of listeners still linked to this signal
    pub fn linked_listeners(&self) -> usize {
        self.inner.links.borrow().len()
    }

    pub(crate) fn link(
        &self,
        target: TargetId,
        event_type: &str,
        callback: &EventCallback,
        capture: bool,
        token: u64,
    ) {
        self.inner.links.borrow_mut().push(ListenerLink {
            target,
            event_type: event_type.to_string(),
            callback_key: callback.key(),
            capture,
            token,
        });
    }

    pub(crate) fn unlink(&self, token: u64) {
        self.inner.links.borrow_mut().retain(|link| link.token != token);
    }

    fn mark_aborted(&self, reason: AbortReason) {
        self.inner.aborted.set(true);
        *self.inner.reason.borrow_mut() = Some(reason);
    }
}

impl PartialEq for AbortSignal {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl EventLoop {
    /// Signal abort: mark the signal and every transitive dependent aborted,
    /// then deregister linked listeners and fire `abort` on each in turn
    pub(crate) fn signal_abort(&mut self, signal: &AbortSignal, reason: AbortReason) {
        if signal.aborted() {
            return;
        }
        tracing::debug!("Aborting signal {:?}: {}", signal.target(), reason);
        signal.mark_aborted(reason.clone());

        let mut dependents: Vec<AbortSignal> = Vec::new();
        let mut next = 0;
        let mut sources = signal.inner.dependents.take();
        loop {
            for inner in sources.iter().filter_map(Weak::upgrade) {
                let dependent = AbortSignal { inner };
                if !dependent.aborted() {
                    dependent.mark_aborted(reason.clone());
                    dependents.push(dependent);
                }
            }
            let Some(source) = dependents.get(next) else {
                break;
            };
            sources = source.inner.dependents.take();
            next += 1;
        }

        self.run_abort_steps(signal);
        for dependent in &dependents {
            self.run_abort_steps(dependent);
        }
    }

    fn run_abort_steps(&mut self, signal: &AbortSignal) {
        let links = signal.inner.links.take();
        for link in links {
            let removed = self.listeners.remove_linked(
                link.target,
                &link.event_type,
                link.callback_key,
                link.capture,
                link.token,
            );
            if removed.is_some() {
                tracing::trace!(
                    "Abort removed '{}' listener on {:?}",
                    link.event_type,
                    link.target
                );
            }
        }

        let mut event = Event::trusted("abort", EventInit::default(), self.now());
        if let Err(e) = self.dispatch_event(signal.target(), &mut event) {
            tracing::warn!("Failed to fire abort event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_controller() {
        let mut rt = EventLoop::detached();
        let controller = AbortController::new(&mut rt);

        assert!(!controller.signal().aborted());

        controller.abort(&mut rt, Some(AbortReason::Custom("User cancelled".into())));

        assert!(controller.signal().aborted());
        let reason = AbortReason::Custom("User cancelled".into());
        assert_eq!(controller.signal().reason(), Some(reason));
    }

    #[test]
    fn test_abort_is_idempotent() {
        let mut rt = EventLoop::detached();
        let controller = AbortController::new(&mut rt);
        controller.abort(&mut rt, None);
        controller.abort(&mut rt, Some(AbortReason::Custom("late".into())));
        assert_eq!(controller.signal().reason(), Some(AbortReason::Abort));
    }

    #[test]
    fn test_throw_if_aborted() {
        let mut rt = EventLoop::detached();
        let signal = AbortSignal::abort(&mut rt, Some(AbortReason::Custom("test".into())));

        let result = signal.throw_if_aborted();
        assert_eq!(result.unwrap_err().to_string(), "test");

        let controller = AbortController::new(&mut rt);
        assert!(controller.signal().throw_if_aborted().is_ok());
    }

    #[test]
    fn test_default_reason_is_abort_error() {
        let mut rt = EventLoop::detached();
        let signal = AbortSignal::abort(&mut rt, None);
        assert!(signal.reason().unwrap().to_string().starts_with("AbortError"));
    }

    #[test]
    fn test_any_follows_sources() {
        let mut rt = EventLoop::detached();
        let a = AbortController::new(&mut rt);
        let b = AbortController::new(&mut rt);
        let combined = AbortSignal::any(&mut rt, &[a.signal().clone(), b.signal().clone()]);

        assert!(!combined.aborted());
        b.abort(&mut rt, Some(AbortReason::Custom("b".into())));
        assert!(combined.aborted());
        assert_eq!(combined.reason(), Some(AbortReason::Custom("b".into())));
    }

    #[test]
    fn test_any_of_any_follows_root_source() {
        let mut rt = EventLoop::detached();
        let root = AbortController::new(&mut rt);
        let middle = AbortSignal::any(&mut rt, &[root.signal().clone()]);
        let outer = AbortSignal::any(&mut rt, &[middle.clone()]);
        let outermost = AbortSignal::any(&mut rt, &[outer.clone(), middle.clone()]);

        root.abort(&mut rt, Some(AbortReason::Custom("root".into())));
        for signal in [&middle, &outer, &outermost] {
            assert!(signal.aborted());
            assert_eq!(signal.reason(), Some(AbortReason::Custom("root".into())));
        }
    }

    #[test]
    fn test_nested_dependents_fire_abort_events() {
        let mut rt = EventLoop::detached();
        let root = AbortController::new(&mut rt);
        let middle = AbortSignal::any(&mut rt, &[root.signal().clone()]);
        let outer = AbortSignal::any(&mut rt, &[middle.clone()]);

        let fired = Rc::new(RefCell::new(Vec::new()));
        for (name, signal) in [("root", root.signal()), ("middle", &middle), ("outer", &outer)] {
            let log = fired.clone();
            signal.set_onabort(&mut rt, Some(EventCallback::new(move |_, _| {
                log.borrow_mut().push(name);
                Ok(())
            })));
        }

        root.abort(&mut rt, None);
        assert_eq!(*fired.borrow(), vec!["root", "middle", "outer"]);
    }

    #[test]
    fn test_removed_listeners_unlink_from_signal() {
        let mut rt = EventLoop::detached();
        let controller = AbortController::new(&mut rt);
        let target = rt.allocate_object_target();
        let callback = EventCallback::new(|_, _| Ok(()));

        for _ in 0..3 {
            let options = crate::ListenerOptions::new().signal(controller.signal());
            assert!(rt.add_event_listener(target, "x", callback.clone(), options));
            assert_eq!(controller.signal().linked_listeners(), 1);
            assert!(rt.remove_event_listener(target, "x", &callback, false));
            assert_eq!(controller.signal().linked_listeners(), 0);
        }

        let options = crate::ListenerOptions::new().once().signal(controller.signal());
        rt.add_event_listener(target, "x", callback.clone(), options);
        let mut event = Event::new("x", EventInit::default());
        rt.dispatch_event(target, &mut event).unwrap();
        assert_eq!(controller.signal().linked_listeners(), 0);

        let options = crate::ListenerOptions::new().signal(controller.signal());
        rt.add_event_listener(target, "y", callback, options);
        rt.clear_listeners(target);
        assert_eq!(controller.signal().linked_listeners(), 0);
    }
}
