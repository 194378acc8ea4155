//! MutationObserver handle and options

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use super::MutationRecord;
use crate::{CallbackResult, EventError, EventLoop, TargetId};

/// Observer callback: the delivered batch and the observer itself
pub(crate) type MutationCallback =
    Rc<dyn Fn(&mut EventLoop, Vec<MutationRecord>, &MutationObserver) -> CallbackResult>;

/// Options passed to `observe`
///
/// `attributes` and `character_data` distinguish "not given" from an
/// explicit `false`, which matters for the implicit-enable rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: Option<bool>,
    pub character_data: Option<bool>,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    pub fn child_list() -> Self {
        Self { child_list: true, ..Self::default() }
    }

    pub fn attributes() -> Self {
        Self { attributes: Some(true), ..Self::default() }
    }

    pub fn character_data() -> Self {
        Self { character_data: Some(true), ..Self::default() }
    }

    pub fn subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    pub fn attribute_old_value(mut self) -> Self {
        self.attribute_old_value = true;
        self
    }

    pub fn character_data_old_value(mut self) -> Self {
        self.character_data_old_value = true;
        self
    }

    pub fn attribute_filter<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.attribute_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Apply the implicit-enable rules and check the result
    pub(crate) fn validate(&self) -> Result<ObserveOptions, EventError> {
        let wants_filter = self.attribute_filter.as_ref().is_some_and(|f| !f.is_empty());
        let attributes = match self.attributes {
            Some(false) if self.attribute_old_value => {
                return Err(EventError::InvalidObserverOptions(
                    "attributeOldValue requires attributes",
                ));
            }
            Some(false) if wants_filter => {
                return Err(EventError::InvalidObserverOptions(
                    "attributeFilter requires attributes",
                ));
            }
            Some(explicit) => explicit,
            None => self.attribute_old_value || wants_filter,
        };
        let character_data = match self.character_data {
            Some(false) if self.character_data_old_value => {
                return Err(EventError::InvalidObserverOptions(
                    "characterDataOldValue requires characterData",
                ));
            }
            Some(explicit) => explicit,
            None => self.character_data_old_value,
        };
        if !self.child_list && !attributes && !character_data {
            return Err(EventError::InvalidObserverOptions(
                "one of childList, attributes or characterData must be true",
            ));
        }

        Ok(ObserveOptions {
            child_list: self.child_list,
            attributes,
            character_data,
            subtree: self.subtree,
            attribute_old_value: self.attribute_old_value,
            character_data_old_value: self.character_data_old_value,
            attribute_filter: self.attribute_filter.clone(),
        })
    }
}

/// Validated options of one registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Whether an attribute change passes this registration's filter
    pub fn accepts_attribute(&self, name: &str, namespace: Option<&str>) -> bool {
        match &self.attribute_filter {
            None => true,
            Some(filter) => namespace.is_none() && filter.iter().any(|f| f == name),
        }
    }
}

pub(crate) struct ObserverInner {
    pub id: u64,
    pub callback: MutationCallback,
    pub targets: RefCell<HashMap<TargetId, ObserveOptions>>,
    pub pending: RefCell<Vec<MutationRecord>>,
    /// A delivery microtask is queued
    pub scheduled: Cell<bool>,
}

/// MutationObserver
///
/// Clones are handles to the same observer. The loop holds observers weakly:
/// once every handle is dropped the observer stops receiving records.
#[derive(Clone)]
pub struct MutationObserver {
    pub(crate) inner: Rc<ObserverInner>,
}

impl MutationObserver {
    /// Create an observer and register it with the loop
    pub fn new(
        rt: &mut EventLoop,
        callback: impl Fn(&mut EventLoop, Vec<MutationRecord>, &MutationObserver) -> CallbackResult
        + 'static,
    ) -> Self {
        let inner = Rc::new(ObserverInner {
            id: rt.observers.allocate_id(),
            callback: Rc::new(callback),
            targets: RefCell::new(HashMap::new()),
            pending: RefCell::new(Vec::new()),
            scheduled: Cell::new(false),
        });
        rt.observers.register(&inner);
        Self { inner }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Observe a target; observing it again replaces the previous options
    pub fn observe(&self, target: TargetId, init: MutationObserverInit) -> Result<(), EventError> {
        let options = init.validate()?;
        self.inner.targets.borrow_mut().insert(target, options);
        Ok(())
    }

    /// Stop observing every target and drop pending records
    pub fn disconnect(&self) {
        self.inner.targets.borrow_mut().clear();
        self.inner.pending.borrow_mut().clear();
    }

    /// Take pending records; a queued delivery will then find nothing
    pub fn take_records(&self) -> Vec<MutationRecord> {
        self.inner.pending.take()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    pub fn is_observing(&self, target: TargetId) -> bool {
        self.inner.targets.borrow().contains_key(&target)
    }
}

impl PartialEq for MutationObserver {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationObserver")
            .field("id", &self.inner.id)
            .field("targets", &self.inner.targets.borrow().len())
            .field("pending", &self.inner.pending.borrow().len())
            .field("scheduled", &self.inner.scheduled.get())
            .finish()
    }
}
