//! Event targets
//!
//! Targets are opaque handles. Tree nodes resolve their parent through the
//! tree layer; everything else (abort signals, windows, request objects) has
//! no parent and dispatches on itself only.

use std::cell::RefCell;

use fos_dom::{Document, DomTree, NodeId};

/// Event target handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetId {
    /// A node of the document tree
    Node(NodeId),
    /// A non-node target allocated by the event loop
    Object(u32),
}

impl TargetId {
    /// The tree node behind this target, if any
    pub fn as_node(self) -> Option<NodeId> {
        match self {
            TargetId::Node(id) => Some(id),
            TargetId::Object(_) => None,
        }
    }
}

impl From<NodeId> for TargetId {
    fn from(id: NodeId) -> Self {
        TargetId::Node(id)
    }
}

/// Parent resolution supplied by the tree layer
///
/// Called fresh on every dispatch and every mutation notification, so the
/// answer always reflects the current tree.
pub trait ParentResolver {
    fn parent_of(&self, target: TargetId) -> Option<TargetId>;
}

impl ParentResolver for DomTree {
    fn parent_of(&self, target: TargetId) -> Option<TargetId> {
        self.parent(target.as_node()?).map(TargetId::Node)
    }
}

impl ParentResolver for Document {
    fn parent_of(&self, target: TargetId) -> Option<TargetId> {
        self.tree().parent_of(target)
    }
}

impl<T: ParentResolver> ParentResolver for RefCell<T> {
    fn parent_of(&self, target: TargetId) -> Option<TargetId> {
        match self.try_borrow() {
            Ok(tree) => tree.parent_of(target),
            Err(_) => {
                tracing::warn!("Tree is mutably borrowed while resolving parent of {:?}", target);
                None
            }
        }
    }
}

/// Resolver for loops that have no tree attached
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl ParentResolver for Detached {
    fn parent_of(&self, _target: TargetId) -> Option<TargetId> {
        None
    }
}
