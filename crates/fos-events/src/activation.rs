//! Activation Coordinator
//!
//! Hooks owned by the element layer that give clicks their default action
//! (toggle a checkbox, select a radio button, submit a form). The pre hook
//! runs before propagation and may change state eagerly; after dispatch the
//! change is committed, or rolled back if a listener canceled the click.

use std::fmt;
use std::rc::Rc;

use crate::{Event, EventLoop, TargetId};

/// Which activation behavior applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationKind {
    Checkbox,
    Radio,
    Submit,
    Other(String),
}

/// State captured before activation, used to roll back
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActivationSnapshot {
    #[default]
    None,
    Checked(bool),
    RadioGroup { previously_checked: Option<TargetId> },
}

/// Activation in progress for one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationResult {
    /// Element whose activation behavior runs
    pub element: TargetId,
    pub snapshot: ActivationSnapshot,
    pub kind: ActivationKind,
}

pub(crate) type PreActivation =
    dyn Fn(&mut EventLoop, &[TargetId], &Event) -> Option<ActivationResult>;
pub(crate) type PostActivation = dyn Fn(&mut EventLoop, ActivationResult);

/// Installed coordinator hooks
pub(crate) struct ActivationHooks {
    pub pre: Box<PreActivation>,
    pub commit: Box<PostActivation>,
    pub rollback: Box<PostActivation>,
}

impl fmt::Debug for ActivationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActivationHooks")
    }
}

impl EventLoop {
    /// Install the element layer's activation hooks, replacing any previous ones
    ///
    /// `pre` sees the event path (target first) of every click carrying a
    /// mouse payload. `commit` runs after a dispatch that was not canceled,
    /// `rollback` after one that was.
    pub fn install_activation_coordinator(
        &mut self,
        pre: impl Fn(&mut EventLoop, &[TargetId], &Event) -> Option<ActivationResult> + 'static,
        commit: impl Fn(&mut EventLoop, ActivationResult) + 'static,
        rollback: impl Fn(&mut EventLoop, ActivationResult) + 'static,
    ) {
        self.activation = Some(Rc::new(ActivationHooks {
            pre: Box::new(pre),
            commit: Box::new(commit),
            rollback: Box::new(rollback),
        }));
    }

    /// Remove the activation hooks
    pub fn clear_activation_coordinator(&mut self) {
        self.activation = None;
    }

    pub fn has_activation_coordinator(&self) -> bool {
        self.activation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventCallback, EventInit, EventPayload, ListenerOptions, MouseDetail};
    use std::cell::{Cell, RefCell};

    fn click() -> Event {
        let payload = EventPayload::Mouse(MouseDetail::default());
        Event::new("click", EventInit::default().bubbles().cancelable().payload(payload))
    }

    /// Checkbox toggled eagerly by `pre`
    fn install_checkbox(
        rt: &mut EventLoop,
        checked: Rc<Cell<bool>>,
        log: Rc<RefCell<Vec<String>>>,
    ) {
        let (pre_state, rollback_state) = (checked.clone(), checked);
        let commit_log = log.clone();
        let rollback_log = log;
        rt.install_activation_coordinator(
            move |_, path, _| {
                let before = pre_state.get();
                pre_state.set(!before);
                Some(ActivationResult {
                    element: path[0],
                    snapshot: ActivationSnapshot::Checked(before),
                    kind: ActivationKind::Checkbox,
                })
            },
            move |_, result| commit_log.borrow_mut().push(format!("commit {:?}", result.kind)),
            move |_, result| {
                if let ActivationSnapshot::Checked(before) = result.snapshot {
                    rollback_state.set(before);
                }
                rollback_log.borrow_mut().push(format!("rollback {:?}", result.kind));
            },
        );
    }

    #[test]
    fn test_commit_when_not_canceled() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let checked = Rc::new(Cell::new(false));
        let log = Rc::new(RefCell::new(Vec::new()));
        install_checkbox(&mut rt, checked.clone(), log.clone());

        let seen = Rc::new(Cell::new(false));
        let s = seen.clone();
        let c = checked.clone();
        rt.add_event_listener(target, "click", EventCallback::new(move |_, _| {
            // Listeners observe the toggled state
            s.set(c.get());
            Ok(())
        }), ListenerOptions::default());

        assert_eq!(rt.dispatch_event(target, &mut click()), Ok(true));
        assert!(seen.get());
        assert!(checked.get());
        assert_eq!(*log.borrow(), vec!["commit Checkbox"]);
    }

    #[test]
    fn test_rollback_when_canceled() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let checked = Rc::new(Cell::new(false));
        let log = Rc::new(RefCell::new(Vec::new()));
        install_checkbox(&mut rt, checked.clone(), log.clone());

        rt.add_event_listener(target, "click", EventCallback::new(|_, event| {
            event.prevent_default();
            Ok(())
        }), ListenerOptions::default());

        assert_eq!(rt.dispatch_event(target, &mut click()), Ok(false));
        assert!(!checked.get());
        assert_eq!(*log.borrow(), vec!["rollback Checkbox"]);
    }

    #[test]
    fn test_non_mouse_click_skips_activation() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let checked = Rc::new(Cell::new(false));
        let log = Rc::new(RefCell::new(Vec::new()));
        install_checkbox(&mut rt, checked.clone(), log.clone());

        let mut synthetic = Event::new("click", EventInit::default());
        rt.dispatch_event(target, &mut synthetic).unwrap();
        assert!(!checked.get());
        assert!(log.borrow().is_empty());

        rt.clear_activation_coordinator();
        assert!(!rt.has_activation_coordinator());
    }
}
