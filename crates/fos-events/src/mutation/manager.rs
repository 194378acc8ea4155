//! Mutation observer manager
//!
//! Turns tree notifications into per-observer records and schedules one
//! delivery microtask per observer.

use std::rc::{Rc, Weak};

use fos_dom::Mutation;

use super::observer::{ObserveOptions, ObserverInner};
use super::{ChildListChange, MutationObserver, MutationRecord, MutationType};
use crate::{CallbackOrigin, CallbackResult, EventLoop, TargetId};

/// Upper bound on ancestor walks, against a resolver that reports a cycle
const MAX_ANCESTOR_DEPTH: usize = 100_000;

/// Weak list of live observers, in creation order
#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    observers: Vec<Weak<ObserverInner>>,
    next_id: u64,
}

impl ObserverRegistry {
    pub fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn register(&mut self, observer: &Rc<ObserverInner>) {
        self.observers.retain(|w| w.strong_count() > 0);
        self.observers.push(Rc::downgrade(observer));
    }

    /// Observers still held by script
    fn live(&mut self) -> Vec<Rc<ObserverInner>> {
        self.observers.retain(|w| w.strong_count() > 0);
        self.observers.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.observers.iter().filter(|w| w.strong_count() > 0).count()
    }
}

impl EventLoop {
    /// Children of a node were added or removed
    pub fn on_child_list_changed(&mut self, change: ChildListChange) {
        if change.is_empty() {
            return;
        }
        self.queue_mutation_record(change.target, MutationType::ChildList, None, |_| {
            MutationRecord::child_list(&change)
        });
    }

    /// An attribute was set or removed; `old_value` is `None` if it was absent
    pub fn on_attribute_changed(
        &mut self,
        target: TargetId,
        name: &str,
        namespace: Option<&str>,
        old_value: Option<&str>,
    ) {
        let attribute = Some((name, namespace));
        self.queue_mutation_record(target, MutationType::Attributes, attribute, |options| {
            let old = options
                .attribute_old_value
                .then(|| old_value.map(str::to_string))
                .flatten();
            MutationRecord::attribute(target, name, namespace, old)
        });
    }

    /// Text content of a node changed
    pub fn on_character_data_changed(&mut self, target: TargetId, old_value: &str) {
        self.queue_mutation_record(target, MutationType::CharacterData, None, |options| {
            let old = options.character_data_old_value.then(|| old_value.to_string());
            MutationRecord::character_data(target, old)
        });
    }

    /// Forward a mutation reported by the tree
    pub fn notify(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::ChildList { .. } => {
                if let Ok(change) = ChildListChange::try_from(mutation) {
                    self.on_child_list_changed(change);
                }
            }
            Mutation::Attribute { target, name, namespace, old_value } => {
                self.on_attribute_changed(
                    (*target).into(),
                    name,
                    namespace.as_deref(),
                    old_value.as_deref(),
                );
            }
            Mutation::CharacterData { target, old_value } => {
                self.on_character_data_changed((*target).into(), old_value);
            }
        }
    }

    /// Forward every mutation of one tree operation, in order
    pub fn notify_all<'a>(&mut self, mutations: impl IntoIterator<Item = &'a Mutation>) {
        for mutation in mutations {
            self.notify(mutation);
        }
    }

    /// Number of observers still alive
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn queue_mutation_record(
        &mut self,
        target: TargetId,
        mutation_type: MutationType,
        attribute: Option<(&str, Option<&str>)>,
        make_record: impl Fn(&ObserveOptions) -> MutationRecord,
    ) {
        for observer in self.observers.live() {
            let Some(options) = self.registration_for(&observer, target) else {
                continue;
            };
            let interested = match mutation_type {
                MutationType::ChildList => options.child_list,
                MutationType::CharacterData => options.character_data,
                MutationType::Attributes => {
                    options.attributes
                        && attribute.is_none_or(|(name, ns)| options.accepts_attribute(name, ns))
                }
            };
            if !interested {
                continue;
            }

            observer.pending.borrow_mut().push(make_record(&options));
            if !observer.scheduled.replace(true) {
                tracing::trace!("Scheduling delivery for observer {}", observer.id);
                let handle = MutationObserver { inner: observer };
                self.queue_microtask(move |rt| rt.deliver_mutation_records(&handle));
            }
        }
    }

    /// Nearest registration of `observer` at or above `target`
    ///
    /// The target's own registration applies as is; an ancestor's applies
    /// only with `subtree`.
    fn registration_for(
        &self,
        observer: &ObserverInner,
        target: TargetId,
    ) -> Option<ObserveOptions> {
        let targets = observer.targets.borrow();
        if targets.is_empty() {
            return None;
        }
        if let Some(options) = targets.get(&target) {
            return Some(options.clone());
        }
        let mut current = target;
        for _ in 0..MAX_ANCESTOR_DEPTH {
            let parent = self.parent_of(current)?;
            if let Some(options) = targets.get(&parent).filter(|o| o.subtree) {
                return Some(options.clone());
            }
            current = parent;
        }
        tracing::warn!("Parent chain of {:?} too deep; stopping observer lookup", target);
        None
    }

    fn deliver_mutation_records(&mut self, observer: &MutationObserver) -> CallbackResult {
        let records = observer.inner.pending.take();
        observer.inner.scheduled.set(false);
        if records.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            "Delivering {} mutation records to observer {}",
            records.len(),
            observer.id()
        );
        let callback = observer.inner.callback.clone();
        callback(self, records, observer)
            .map_err(|e| e.attributed(CallbackOrigin::MutationObserver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MutationObserverInit;
    use std::cell::RefCell;

    type Batches = Rc<RefCell<Vec<Vec<MutationRecord>>>>;

    fn recording_observer(rt: &mut EventLoop) -> (MutationObserver, Batches) {
        let batches: Batches = Rc::default();
        let b = batches.clone();
        let observer = MutationObserver::new(rt, move |_, records, _| {
            b.borrow_mut().push(records);
            Ok(())
        });
        (observer, batches)
    }

    #[test]
    fn test_records_batched_into_one_delivery() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let (observer, batches) = recording_observer(&mut rt);
        observer.observe(target, MutationObserverInit::attributes()).unwrap();

        rt.on_attribute_changed(target, "a", None, None);
        rt.on_attribute_changed(target, "b", None, Some("1"));
        assert_eq!(rt.pending_microtasks(), 1);

        rt.perform_microtask_checkpoint();
        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        // Old value not requested
        assert_eq!(batches[0][1].old_value, None);
    }

    #[test]
    fn test_old_value_when_requested() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let (observer, batches) = recording_observer(&mut rt);
        let init = MutationObserverInit::character_data().character_data_old_value();
        observer.observe(target, init).unwrap();

        rt.on_character_data_changed(target, "before");
        rt.perform_microtask_checkpoint();
        assert_eq!(batches.borrow()[0][0].old_value.as_deref(), Some("before"));
    }

    #[test]
    fn test_uninterested_type_ignored() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let (observer, batches) = recording_observer(&mut rt);
        observer.observe(target, MutationObserverInit::child_list()).unwrap();

        rt.on_attribute_changed(target, "class", None, None);
        rt.perform_microtask_checkpoint();
        assert!(batches.borrow().is_empty());
        assert_eq!(observer.pending_count(), 0);
    }

    #[test]
    fn test_dropped_observer_is_forgotten() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let (observer, batches) = recording_observer(&mut rt);
        observer.observe(target, MutationObserverInit::attributes()).unwrap();
        assert_eq!(rt.observer_count(), 1);

        drop(observer);
        assert_eq!(rt.observer_count(), 0);
        rt.on_attribute_changed(target, "id", None, None);
        rt.perform_microtask_checkpoint();
        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn test_empty_child_list_change_ignored() {
        let mut rt = EventLoop::detached();
        let target = rt.allocate_object_target();
        let (observer, _batches) = recording_observer(&mut rt);
        observer.observe(target, MutationObserverInit::child_list()).unwrap();

        rt.on_child_list_changed(ChildListChange::new(target));
        assert_eq!(observer.pending_count(), 0);
    }
}
