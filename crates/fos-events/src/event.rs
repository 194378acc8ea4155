//! Event records
//!
//! The flags a dispatch reads and writes. Payload fields are carried opaquely;
//! only `click` with a mouse payload is treated specially (activation).

use crate::TargetId;

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EventPhase {
    #[default]
    None = 0,
    Capturing = 1,
    AtTarget = 2,
    Bubbling = 3,
}

/// Event-specific payload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventPayload {
    #[default]
    None,
    Custom { detail: String },
    Mouse(MouseDetail),
    Keyboard { key: String, code: String },
    Focus,
}

/// Mouse payload fields
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseDetail {
    pub client_x: f64,
    pub client_y: f64,
    pub button: i16,
    pub buttons: u16,
}

/// Event constructor options
#[derive(Debug, Clone, Default)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    pub related_target: Option<TargetId>,
    pub payload: EventPayload,
}

impl EventInit {
    pub fn bubbles(mut self) -> Self {
        self.bubbles = true;
        self
    }

    pub fn cancelable(mut self) -> Self {
        self.cancelable = true;
        self
    }

    pub fn related_target(mut self, target: TargetId) -> Self {
        self.related_target = Some(target);
        self
    }

    pub fn payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// An event instance
///
/// `dispatching` is set only for the duration of one `dispatch_event` call on
/// this instance. Afterwards the record is idle and may be dispatched again.
/// Clones start idle, whatever the state of the original.
#[derive(Debug)]
pub struct Event {
    event_type: String,
    pub(crate) target: Option<TargetId>,
    pub(crate) current_target: Option<TargetId>,
    related_target: Option<TargetId>,
    pub(crate) phase: EventPhase,
    pub(crate) path: Vec<TargetId>,

    bubbles: bool,
    cancelable: bool,
    composed: bool,
    is_trusted: bool,
    initialized: bool,
    timestamp: f64,

    pub(crate) default_prevented: bool,
    pub(crate) stop_propagation: bool,
    pub(crate) stop_immediate: bool,
    pub(crate) dispatching: bool,
    pub(crate) in_passive_listener: bool,

    /// Event-specific fields
    pub payload: EventPayload,
}

impl Clone for Event {
    fn clone(&self) -> Self {
        Self {
            event_type: self.event_type.clone(),
            target: self.target,
            current_target: None,
            related_target: self.related_target,
            phase: EventPhase::None,
            path: Vec::new(),
            bubbles: self.bubbles,
            cancelable: self.cancelable,
            composed: self.composed,
            is_trusted: self.is_trusted,
            initialized: self.initialized,
            timestamp: self.timestamp,
            default_prevented: self.default_prevented,
            stop_propagation: false,
            stop_immediate: false,
            dispatching: false,
            in_passive_listener: false,
            payload: self.payload.clone(),
        }
    }
}

impl Event {
    /// Create an initialized, untrusted event
    pub fn new(event_type: &str, init: EventInit) -> Self {
        let mut event = Self::uninitialized();
        event.initialized = true;
        event.event_type = event_type.to_string();
        event.bubbles = init.bubbles;
        event.cancelable = init.cancelable;
        event.composed = init.composed;
        event.related_target = init.related_target;
        event.payload = init.payload;
        event
    }

    /// Create an event that still needs `init_event` before dispatch
    pub fn uninitialized() -> Self {
        Self {
            event_type: String::new(),
            target: None,
            current_target: None,
            related_target: None,
            phase: EventPhase::None,
            path: Vec::new(),
            bubbles: false,
            cancelable: false,
            composed: false,
            is_trusted: false,
            initialized: false,
            timestamp: 0.0,
            default_prevented: false,
            stop_propagation: false,
            stop_immediate: false,
            dispatching: false,
            in_passive_listener: false,
            payload: EventPayload::None,
        }
    }

    /// Event generated by the engine rather than by script
    pub(crate) fn trusted(event_type: &str, init: EventInit, timestamp: f64) -> Self {
        let mut event = Self::new(event_type, init);
        event.is_trusted = true;
        event.timestamp = timestamp;
        event
    }

    /// Legacy initializer; ignored while the event is being dispatched
    pub fn init_event(&mut self, event_type: &str, bubbles: bool, cancelable: bool) {
        if self.dispatching {
            return;
        }
        self.initialized = true;
        self.event_type = event_type.to_string();
        self.bubbles = bubbles;
        self.cancelable = cancelable;
        self.default_prevented = false;
        self.stop_propagation = false;
        self.stop_immediate = false;
        self.is_trusted = false;
        self.target = None;
        self.related_target = None;
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    pub fn current_target(&self) -> Option<TargetId> {
        self.current_target
    }

    pub fn related_target(&self) -> Option<TargetId> {
        self.related_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn composed(&self) -> bool {
        self.composed
    }

    pub fn is_trusted(&self) -> bool {
        self.is_trusted
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Prevent the default action; no effect unless cancelable, or inside a
    /// passive listener
    pub fn prevent_default(&mut self) {
        if self.cancelable && !self.in_passive_listener {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Legacy inverse of `default_prevented`
    pub fn return_value(&self) -> bool {
        !self.default_prevented
    }

    /// Stop the event from reaching further nodes
    pub fn stop_propagation(&mut self) {
        self.stop_propagation = true;
    }

    /// Skip the remaining listeners on the current node
    ///
    /// Does not by itself stop the event from reaching other nodes.
    pub fn stop_immediate_propagation(&mut self) {
        self.stop_immediate = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.stop_propagation
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.stop_immediate
    }

    /// Legacy alias for `propagation_stopped`
    pub fn cancel_bubble(&self) -> bool {
        self.stop_propagation
    }

    /// Setting true stops propagation; setting false is ignored
    pub fn set_cancel_bubble(&mut self, value: bool) {
        if value {
            self.stop_propagation = true;
        }
    }

    /// Targets the event travels through, target first; empty when idle
    pub fn composed_path(&self) -> &[TargetId] {
        if self.dispatching { &self.path } else { &[] }
    }

    /// `click` carrying a mouse payload, the trigger for activation behavior
    pub fn is_click(&self) -> bool {
        self.event_type == "click" && matches!(self.payload, EventPayload::Mouse(_))
    }
}
