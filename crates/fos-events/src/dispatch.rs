//! Event Dispatcher
//!
//! Three-phase propagation (capture, target, bubble) over a path rebuilt from
//! the parent resolver on every dispatch.

use std::rc::Rc;

use crate::listener::Listener;
use crate::{CallbackError, CallbackOrigin, Event, EventError, EventLoop, EventPhase, TargetId};

/// Which listeners of a node take part in a dispatch step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Capture listeners only
    Capture,
    /// Every listener, capture group first
    Target,
    /// Non-capture listeners only
    Bubble,
}

/// State carried across the steps of one dispatch
#[derive(Default)]
struct DispatchRound {
    /// `once` listeners that ran, removed once the dispatch is over
    fired_once: Vec<(TargetId, Rc<Listener>)>,
    errors: Vec<CallbackError>,
}

impl EventLoop {
    /// Propagation path, target first, root last
    pub fn event_path(&self, target: TargetId) -> Vec<TargetId> {
        let mut path = vec![target];
        let mut current = target;
        while let Some(parent) = self.parent_of(current) {
            if path.contains(&parent) {
                tracing::warn!("Cycle in parent chain at {:?}; truncating event path", parent);
                break;
            }
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Dispatch `event` at `target`
    ///
    /// Returns false if a listener canceled the event. Exceptions raised by
    /// listeners are reported after the dispatch and never interrupt it.
    pub fn dispatch_event(
        &mut self,
        target: TargetId,
        event: &mut Event,
    ) -> Result<bool, EventError> {
        if event.dispatching {
            return Err(EventError::InvalidState("event is already being dispatched"));
        }
        if !event.is_initialized() {
            return Err(EventError::InvalidState("event is not initialized"));
        }

        event.dispatching = true;
        event.target = Some(target);
        event.path = self.event_path(target);
        let path = event.path.clone();
        tracing::debug!(
            "Dispatching '{}' at {:?} (path length {})",
            event.event_type(),
            target,
            path.len()
        );

        let activation = match self.activation.clone() {
            Some(hooks) if event.is_click() => (hooks.pre)(self, &path, event),
            _ => None,
        };

        let mut round = DispatchRound::default();

        event.phase = EventPhase::Capturing;
        for &node in path.iter().skip(1).rev() {
            if event.stop_propagation {
                break;
            }
            self.invoke_listeners(node, event, Step::Capture, &mut round);
        }

        if !event.stop_propagation {
            event.phase = EventPhase::AtTarget;
            self.invoke_listeners(target, event, Step::Target, &mut round);
        }

        if event.bubbles() {
            event.phase = EventPhase::Bubbling;
            for &node in path.iter().skip(1) {
                if event.stop_propagation {
                    break;
                }
                self.invoke_listeners(node, event, Step::Bubble, &mut round);
            }
        }

        let event_type = event.event_type().to_string();
        for (node, listener) in &round.fired_once {
            self.listeners.remove_exact(*node, &event_type, listener);
        }

        if let (Some(result), Some(hooks)) = (activation, self.activation.clone()) {
            if event.default_prevented {
                tracing::debug!("Rolling back {:?} activation", result.kind);
                (hooks.rollback)(self, result);
            } else {
                tracing::debug!("Committing {:?} activation", result.kind);
                (hooks.commit)(self, result);
            }
        }

        event.dispatching = false;
        event.stop_propagation = false;
        event.stop_immediate = false;
        event.in_passive_listener = false;
        event.phase = EventPhase::None;
        event.current_target = None;
        event.path.clear();

        self.report_errors(round.errors);
        Ok(!event.default_prevented)
    }

    fn invoke_listeners(
        &mut self,
        node: TargetId,
        event: &mut Event,
        step: Step,
        round: &mut DispatchRound,
    ) {
        let mut listeners = self.listeners.snapshot(node, event.event_type());
        match step {
            Step::Capture => listeners.retain(|l| l.capture),
            Step::Bubble => listeners.retain(|l| !l.capture),
            Step::Target => listeners.sort_by_key(|l| !l.capture),
        }
        if listeners.is_empty() {
            return;
        }

        event.current_target = Some(node);
        for listener in listeners {
            if listener.is_removed() {
                continue;
            }
            if listener.once {
                listener.mark_removed();
                round.fired_once.push((node, listener.clone()));
            }

            tracing::trace!(
                "Invoking '{}' listener on {:?} ({:?})",
                event.event_type(),
                node,
                event.phase
            );
            event.in_passive_listener = listener.passive;
            let callback = listener.callback.clone();
            let result = self.run_script(|rt| callback.call(rt, event));
            event.in_passive_listener = false;

            if let Err(e) = result {
                round.errors.push(e.attributed(CallbackOrigin::Listener {
                    event_type: event.event_type().to_string(),
                }));
            }
            // A listener whose own signal was aborted while it ran ends this node
            if event.stop_immediate || listener.was_aborted() {
                break;
            }
        }
        event.stop_immediate = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollectingReporter, EventCallback, EventInit, ListenerOptions};
    use std::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> EventCallback {
        let log = log.clone();
        EventCallback::new(move |_, _| {
            log.borrow_mut().push(name);
            Ok(())
        })
    }

    #[test]
    fn test_rejects_uninitialized_event() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let mut event = Event::uninitialized();
        assert!(matches!(rt.dispatch_event(target, &mut event), Err(EventError::InvalidState(_))));
    }

    #[test]
    fn test_rejects_redispatch_while_dispatching() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let nested = Rc::new(RefCell::new(None));

        let n = nested.clone();
        let callback = EventCallback::new(move |rt, event| {
            *n.borrow_mut() = Some(rt.dispatch_event(target, event));
            Ok(())
        });
        rt.add_event_listener(target, "ping", callback, ListenerOptions::default());

        let mut event = Event::new("ping", EventInit::default());
        assert_eq!(rt.dispatch_event(target, &mut event), Ok(true));
        assert!(matches!(*nested.borrow(), Some(Err(EventError::InvalidState(_)))));
        assert!(!event.is_dispatching());
    }

    #[test]
    fn test_clone_dispatches_while_original_is_dispatching() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let outcomes = Rc::new(RefCell::new(Vec::new()));

        let o = outcomes.clone();
        let callback = EventCallback::new(move |rt, event| {
            // Only the outer dispatch re-dispatches a copy
            if o.borrow().is_empty() {
                o.borrow_mut().push(None);
                let mut copy = event.clone();
                let nested = rt.dispatch_event(target, &mut copy);
                o.borrow_mut().push(Some(nested));
            }
            Ok(())
        });
        rt.add_event_listener(target, "ping", callback, ListenerOptions::default());

        let mut event = Event::new("ping", EventInit::default());
        assert_eq!(rt.dispatch_event(target, &mut event), Ok(true));
        assert_eq!(*outcomes.borrow(), vec![None, Some(Ok(true))]);
    }

    #[test]
    fn test_clone_taken_mid_dispatch_is_reusable() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let saved = Rc::new(RefCell::new(None));
        let log = Rc::new(RefCell::new(Vec::new()));
        rt.add_event_listener(target, "ping", recorder(&log, "ping"), ListenerOptions::default());

        let s = saved.clone();
        let callback = EventCallback::new(move |_, event| {
            s.borrow_mut().get_or_insert_with(|| event.clone());
            Ok(())
        });
        rt.add_event_listener(target, "ping", callback, ListenerOptions::default());

        let mut event = Event::new("ping", EventInit::default());
        rt.dispatch_event(target, &mut event).unwrap();

        let mut copy = saved.borrow_mut().take().unwrap();
        assert!(!copy.is_dispatching());
        assert_eq!(rt.dispatch_event(target, &mut copy), Ok(true));
        assert_eq!(*log.borrow(), vec!["ping", "ping"]);

        copy.init_event("pong", false, false);
        assert_eq!(copy.event_type(), "pong");
    }

    #[test]
    fn test_event_reusable_after_dispatch() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let log = Rc::new(RefCell::new(Vec::new()));
        rt.add_event_listener(target, "x", recorder(&log, "x"), ListenerOptions::default());

        let mut event = Event::new("x", EventInit::default());
        rt.dispatch_event(target, &mut event).unwrap();
        rt.dispatch_event(target, &mut event).unwrap();
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(event.phase(), EventPhase::None);
        assert_eq!(event.current_target(), None);
        assert_eq!(event.target(), Some(target));
    }

    #[test]
    fn test_at_target_capture_first() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let log = Rc::new(RefCell::new(Vec::new()));
        rt.add_event_listener(target, "x", recorder(&log, "bubble"), ListenerOptions::default());
        let capture = ListenerOptions::new().capture();
        rt.add_event_listener(target, "x", recorder(&log, "capture"), capture);

        let mut event = Event::new("x", EventInit::default());
        rt.dispatch_event(target, &mut event).unwrap();
        assert_eq!(*log.borrow(), vec!["capture", "bubble"]);
    }

    #[test]
    fn test_once_listener_runs_once() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let log = Rc::new(RefCell::new(Vec::new()));
        rt.add_event_listener(target, "x", recorder(&log, "once"), ListenerOptions::new().once());

        let mut event = Event::new("x", EventInit::default());
        rt.dispatch_event(target, &mut event).unwrap();
        rt.dispatch_event(target, &mut event).unwrap();
        assert_eq!(*log.borrow(), vec!["once"]);
        assert!(!rt.has_listeners(target, "x"));
    }

    #[test]
    fn test_listener_error_does_not_stop_dispatch() {
        let reporter = CollectingReporter::new();
        let mut rt = EventLoop::detached().with_reporter(reporter.clone());
        let target = rt.allocate_object_target();
        let log = Rc::new(RefCell::new(Vec::new()));

        let failing = EventCallback::new(|_, _| Err(CallbackError::new("boom")));
        rt.add_event_listener(target, "x", failing, ListenerOptions::default());
        rt.add_event_listener(target, "x", recorder(&log, "second"), ListenerOptions::default());

        let mut event = Event::new("x", EventInit::default());
        assert_eq!(rt.dispatch_event(target, &mut event), Ok(true));
        assert_eq!(*log.borrow(), vec!["second"]);

        let reports = reporter.take();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].origin, CallbackOrigin::Listener { event_type: "x".into() });
    }

    #[test]
    fn test_passive_listener_cannot_cancel() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        rt.add_event_listener(target, "wheel", EventCallback::new(|_, event| {
            event.prevent_default();
            Ok(())
        }), ListenerOptions::new().passive());

        let mut event = Event::new("wheel", EventInit::default().cancelable());
        assert_eq!(rt.dispatch_event(target, &mut event), Ok(true));
        assert!(!event.default_prevented());
    }

    #[test]
    fn test_listener_added_during_dispatch_waits() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let log = Rc::new(RefCell::new(Vec::new()));

        let late = recorder(&log, "late");
        let l = log.clone();
        rt.add_event_listener(target, "x", EventCallback::new(move |rt, _| {
            l.borrow_mut().push("first");
            rt.add_event_listener(target, "x", late.clone(), ListenerOptions::default());
            Ok(())
        }), ListenerOptions::default());

        let mut event = Event::new("x", EventInit::default());
        rt.dispatch_event(target, &mut event).unwrap();
        assert_eq!(*log.borrow(), vec!["first"]);

        rt.dispatch_event(target, &mut event).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "first", "late"]);
    }
}
