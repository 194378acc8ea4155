//! Event Loop
//!
//! Owns every piece of dispatch state: listener registry, scheduler,
//! mutation observers, activation hooks and focus. All callbacks receive
//! `&mut EventLoop` and run one at a time on the thread that owns the loop.

use std::fmt;
use std::rc::Rc;

use crate::activation::ActivationHooks;
use crate::focus::FocusState;
use crate::listener::ListenerRegistry;
use crate::mutation::ObserverRegistry;
use crate::scheduler::Scheduler;
use crate::{
    CallbackError, CallbackOrigin, CallbackResult, Clock, Detached, ErrorReporter, Event,
    EventError, EventInit, EventLoopConfig, ParentResolver, SystemClock, TargetId, TracingReporter,
};

/// Single-threaded dispatch loop
pub struct EventLoop {
    pub(crate) config: EventLoopConfig,
    clock: Rc<dyn Clock>,
    resolver: Rc<dyn ParentResolver>,
    reporter: Rc<dyn ErrorReporter>,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) scheduler: Scheduler,
    pub(crate) observers: ObserverRegistry,
    pub(crate) activation: Option<Rc<ActivationHooks>>,
    pub(crate) focus: FocusState,
    /// Callbacks currently on the stack
    script_depth: u32,
    performing_checkpoint: bool,
    next_object_id: u32,
}

impl EventLoop {
    /// Create a loop resolving parents through `resolver`
    pub fn new(resolver: Rc<dyn ParentResolver>) -> Self {
        Self {
            config: EventLoopConfig::default(),
            clock: Rc::new(SystemClock::new()),
            resolver,
            reporter: Rc::new(TracingReporter),
            listeners: ListenerRegistry::default(),
            scheduler: Scheduler::new(),
            observers: ObserverRegistry::default(),
            activation: None,
            focus: FocusState::default(),
            script_depth: 0,
            performing_checkpoint: false,
            next_object_id: 0,
        }
    }

    /// Loop without a tree; every target is its own root
    pub fn detached() -> Self {
        Self::new(Rc::new(Detached))
    }

    pub fn with_config(mut self, config: EventLoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Rc::new(clock);
        self
    }

    pub fn with_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Rc::new(reporter);
        self
    }

    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    /// Current time in milliseconds
    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Allocate a target that is not part of the tree
    pub fn allocate_object_target(&mut self) -> TargetId {
        self.next_object_id += 1;
        TargetId::Object(self.next_object_id)
    }

    /// Parent of a target according to the tree layer
    pub fn parent_of(&self, target: TargetId) -> Option<TargetId> {
        self.resolver.parent_of(target)
    }

    /// Script-created event stamped with the current time
    pub fn create_event(&self, event_type: &str, init: EventInit) -> Event {
        Event::new(event_type, init).with_timestamp(self.now())
    }

    /// Fire a trusted event created by the engine
    pub fn fire_event(
        &mut self,
        target: TargetId,
        event_type: &str,
        init: EventInit,
    ) -> Result<bool, EventError> {
        let mut event = Event::trusted(event_type, init, self.now());
        self.dispatch_event(target, &mut event)
    }

    /// Whether a callback is currently running
    pub fn is_running_script(&self) -> bool {
        self.script_depth > 0
    }

    /// Run a callback as script
    ///
    /// When it returns to an empty script stack, microtasks are drained.
    pub(crate) fn run_script<F>(&mut self, f: F) -> CallbackResult
    where
        F: FnOnce(&mut EventLoop) -> CallbackResult,
    {
        self.script_depth += 1;
        let result = f(self);
        self.script_depth -= 1;
        if self.script_depth == 0 {
            self.perform_microtask_checkpoint();
        }
        result
    }

    /// Drain the microtask queue, including microtasks queued while draining
    pub fn perform_microtask_checkpoint(&mut self) {
        if self.performing_checkpoint {
            return;
        }
        self.performing_checkpoint = true;

        let mut errors = Vec::new();
        while let Some(task) = self.scheduler.pop_microtask() {
            self.script_depth += 1;
            let result = task(self);
            self.script_depth -= 1;
            if let Err(e) = result {
                errors.push(e.attributed(CallbackOrigin::Microtask));
            }
        }

        self.performing_checkpoint = false;
        self.report_errors(errors);
    }

    /// Hand a finished round's callback errors to the reporter
    pub(crate) fn report_errors(&self, errors: Vec<CallbackError>) {
        for error in errors {
            if self.config.report_callback_errors {
                self.reporter.report(&error);
            } else {
                tracing::debug!("Suppressed callback error: {}", error);
            }
        }
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("config", &self.config)
            .field("listeners", &self.listeners)
            .field("scheduler", &self.scheduler)
            .field("focus", &self.focus)
            .field("script_depth", &self.script_depth)
            .finish_non_exhaustive()
    }
}
