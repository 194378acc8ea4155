//! Task Scheduler
//!
//! Timers (setTimeout / setInterval), the microtask queue, and an inbox for
//! tasks posted from other threads.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use smol::channel::{self, Receiver, Sender};

use crate::{CallbackOrigin, CallbackResult, EventError, EventLoop};

/// Deferred callback run at the next microtask checkpoint
pub(crate) type Microtask = Box<dyn FnOnce(&mut EventLoop) -> CallbackResult>;

/// Timer callback; shared so intervals can fire repeatedly
type TimerCallback = Rc<dyn Fn(&mut EventLoop) -> CallbackResult>;

/// Task posted from a background thread
pub(crate) type InjectedTask = Box<dyn FnOnce(&mut EventLoop) -> CallbackResult + Send>;

/// Timer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

/// Timer entry
struct Timer {
    callback: TimerCallback,
    due_ms: f64,
    /// `None` for one-shot timers
    interval_ms: Option<f64>,
    nesting_level: u32,
}

/// Timer and microtask queues
pub(crate) struct Scheduler {
    microtasks: VecDeque<Microtask>,
    timers: BTreeMap<TimerId, Timer>,
    next_timer_id: u32,
    /// Nesting level of the timer callback currently running (0 outside timers)
    current_nesting: u32,
    inbox: Receiver<InjectedTask>,
    injector: Sender<InjectedTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (injector, inbox) = channel::unbounded();
        Self {
            microtasks: VecDeque::new(),
            timers: BTreeMap::new(),
            next_timer_id: 1,
            current_nesting: 0,
            inbox,
            injector,
        }
    }

    pub fn pop_microtask(&mut self) -> Option<Microtask> {
        self.microtasks.pop_front()
    }

    fn allocate_id(&mut self) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        id
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("microtasks", &self.microtasks.len())
            .field("timers", &self.timers.keys().collect::<Vec<_>>())
            .field("injected", &self.inbox.len())
            .finish()
    }
}

/// Posts tasks onto the loop from any thread
///
/// Background work (a network fetch, a file read) must not touch script
/// state directly; it posts a task that the loop runs on its own thread during
/// the next `poll`.
#[derive(Clone)]
pub struct TaskInjector {
    sender: Sender<InjectedTask>,
}

impl TaskInjector {
    /// Post a task without blocking
    pub fn post(
        &self,
        task: impl FnOnce(&mut EventLoop) -> CallbackResult + Send + 'static,
    ) -> Result<(), EventError> {
        self.sender
            .try_send(Box::new(task))
            .map_err(|_| EventError::LoopClosed)
    }

    /// Post a task from async code
    pub async fn post_async(
        &self,
        task: impl FnOnce(&mut EventLoop) -> CallbackResult + Send + 'static,
    ) -> Result<(), EventError> {
        self.sender
            .send(Box::new(task))
            .await
            .map_err(|_| EventError::LoopClosed)
    }

    /// Whether the loop has been dropped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for TaskInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskInjector")
            .field("pending", &self.sender.len())
            .finish()
    }
}

impl EventLoop {
    /// Queue a microtask (Promise reactions, queueMicrotask, observer delivery)
    pub fn queue_microtask(
        &mut self,
        task: impl FnOnce(&mut EventLoop) -> CallbackResult + 'static,
    ) {
        self.scheduler.microtasks.push_back(Box::new(task));
    }

    /// Number of queued microtasks
    pub fn pending_microtasks(&self) -> usize {
        self.scheduler.microtasks.len()
    }

    /// Schedule a one-shot timer
    pub fn set_timeout(
        &mut self,
        callback: impl Fn(&mut EventLoop) -> CallbackResult + 'static,
        delay_ms: u64,
    ) -> TimerId {
        self.add_timer(Rc::new(callback), delay_ms, false)
    }

    /// Schedule a repeating timer
    pub fn set_interval(
        &mut self,
        callback: impl Fn(&mut EventLoop) -> CallbackResult + 'static,
        interval_ms: u64,
    ) -> TimerId {
        let interval_ms = interval_ms.max(self.config.min_interval_ms);
        self.add_timer(Rc::new(callback), interval_ms, true)
    }

    fn add_timer(&mut self, callback: TimerCallback, delay_ms: u64, repeat: bool) -> TimerId {
        let nesting_level = self.scheduler.current_nesting + 1;
        let delay_ms = self.clamp_delay(delay_ms, nesting_level) as f64;
        let id = self.scheduler.allocate_id();
        let due_ms = self.now() + delay_ms;
        self.scheduler.timers.insert(id, Timer {
            callback,
            due_ms,
            interval_ms: repeat.then_some(delay_ms),
            nesting_level,
        });
        tracing::trace!("Scheduled timer {} in {}ms (repeat: {})", id.0, delay_ms, repeat);
        id
    }

    fn clamp_delay(&self, delay_ms: u64, nesting_level: u32) -> u64 {
        if nesting_level > self.config.nesting_clamp_level {
            delay_ms.max(self.config.nested_min_delay_ms)
        } else {
            delay_ms
        }
    }

    /// Cancel a timer; unknown ids are ignored
    pub fn clear_timer(&mut self, id: TimerId) {
        if self.scheduler.timers.remove(&id).is_some() {
            tracing::trace!("Cleared timer {}", id.0);
        }
    }

    /// Whether a timer is still scheduled
    pub fn has_timer(&self, id: TimerId) -> bool {
        self.scheduler.timers.contains_key(&id)
    }

    /// Fire every timer that is due, once
    ///
    /// Timers scheduled by the callbacks run during this scan wait for the
    /// next one. Returns the number of callbacks run.
    pub fn run_timers(&mut self) -> usize {
        let now = self.now();
        let mut due: Vec<(f64, TimerId)> = self.scheduler.timers
            .iter()
            .filter(|(_, t)| t.due_ms <= now)
            .map(|(id, t)| (t.due_ms, *id))
            .collect();
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut fired = 0;
        for (_, id) in due {
            let fire_time = self.now();
            // Cleared by an earlier callback of this scan
            let Some(timer) = self.scheduler.timers.get_mut(&id) else {
                continue;
            };
            let callback = timer.callback.clone();
            let nesting_level = timer.nesting_level;
            if let Some(interval_ms) = timer.interval_ms {
                timer.nesting_level += 1;
                let interval = if timer.nesting_level > self.config.nesting_clamp_level {
                    interval_ms.max(self.config.nested_min_delay_ms as f64)
                } else {
                    interval_ms
                };
                timer.due_ms = fire_time + interval;
            } else {
                self.scheduler.timers.remove(&id);
            }

            tracing::debug!("Firing timer {}", id.0);
            let previous = std::mem::replace(&mut self.scheduler.current_nesting, nesting_level);
            let result = self.run_script(|rt| callback(rt));
            self.scheduler.current_nesting = previous;
            fired += 1;

            if let Err(e) = result {
                self.report_errors(vec![e.attributed(CallbackOrigin::Timer(id))]);
            }
        }
        fired
    }

    /// Run posted tasks, then due timers, then a microtask checkpoint
    ///
    /// Returns the number of callbacks run.
    pub fn poll(&mut self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.scheduler.inbox.try_recv();
            let Ok(task) = next else {
                break;
            };
            let result = self.run_script(task);
            ran += 1;
            if let Err(e) = result {
                self.report_errors(vec![e.attributed(CallbackOrigin::Task)]);
            }
        }
        ran += self.run_timers();
        self.perform_microtask_checkpoint();
        ran
    }

    /// Handle for posting tasks from other threads
    pub fn injector(&self) -> TaskInjector {
        TaskInjector {
            sender: self.scheduler.injector.clone(),
        }
    }

    /// Time until the earliest timer is due
    pub fn time_until_next_timer(&self) -> Option<Duration> {
        let now = self.now();
        self.scheduler.timers
            .values()
            .map(|t| t.due_ms)
            .min_by(|a, b| a.total_cmp(b))
            .map(|due| Duration::from_secs_f64(((due - now).max(0.0)) / 1000.0))
    }

    /// Whether anything is waiting to run
    pub fn has_pending_work(&self) -> bool {
        !self.scheduler.microtasks.is_empty()
            || !self.scheduler.timers.is_empty()
            || !self.scheduler.inbox.is_empty()
    }
}
