//! Focus Coordinator
//!
//! Focus changes fire `focusout`, `focusin`, `blur`, `focus` in that order:
//! the bubbling pair first, then the non-bubbling pair.

use crate::{EventInit, EventLoop, EventPayload, TargetId};

/// Focused element and sequential navigation order
#[derive(Debug, Default)]
pub(crate) struct FocusState {
    focused: Option<TargetId>,
    tab_order: Vec<TargetId>,
}

impl EventLoop {
    /// Currently focused target
    pub fn focused(&self) -> Option<TargetId> {
        self.focus.focused
    }

    /// Move focus to `next` (or nowhere), firing the focus event sequence
    ///
    /// Events for an absent side are skipped; moving focus to the already
    /// focused target fires nothing.
    pub fn move_focus(&mut self, next: Option<TargetId>) {
        let previous = self.focus.focused;
        if previous == next {
            return;
        }
        self.focus.focused = next;
        tracing::debug!("Focus moving from {:?} to {:?}", previous, next);

        if let Some(old) = previous {
            self.fire_focus_event(old, "focusout", true, next);
        }
        if let Some(new) = next {
            self.fire_focus_event(new, "focusin", true, previous);
        }
        if let Some(old) = previous {
            self.fire_focus_event(old, "blur", false, next);
        }
        if let Some(new) = next {
            self.fire_focus_event(new, "focus", false, previous);
        }
    }

    /// Drop focus from the focused target
    pub fn blur_focused(&mut self) {
        self.move_focus(None);
    }

    fn fire_focus_event(
        &mut self,
        target: TargetId,
        event_type: &str,
        bubbles: bool,
        related: Option<TargetId>,
    ) {
        let mut init = EventInit::default().payload(EventPayload::Focus);
        init.bubbles = bubbles;
        init.related_target = related;
        if let Err(e) = self.fire_event(target, event_type, init) {
            tracing::warn!("Failed to fire {} on {:?}: {}", event_type, target, e);
        }
    }

    /// Sequential focus navigation order
    pub fn set_tab_order(&mut self, order: Vec<TargetId>) {
        self.focus.tab_order = order;
    }

    fn tab_position(&self) -> Option<usize> {
        let current = self.focus.focused?;
        self.focus.tab_order.iter().position(|&t| t == current)
    }

    /// Focus the next target in tab order, wrapping around
    pub fn focus_next(&mut self) -> Option<TargetId> {
        let order = &self.focus.tab_order;
        if order.is_empty() {
            return self.focus.focused;
        }
        let next = match self.tab_position() {
            Some(pos) if pos + 1 < order.len() => order[pos + 1],
            _ => order[0],
        };
        self.move_focus(Some(next));
        self.focus.focused
    }

    /// Focus the previous target in tab order, wrapping around
    pub fn focus_previous(&mut self) -> Option<TargetId> {
        let order = &self.focus.tab_order;
        let Some(&last) = order.last() else {
            return self.focus.focused;
        };
        let prev = match self.tab_position() {
            Some(0) | None => last,
            Some(pos) => order[pos - 1],
        };
        self.move_focus(Some(prev));
        self.focus.focused
    }
}
