//! Raw tree mutations
//!
//! Emitted by [`DomTree`](crate::DomTree) operations. One structural operation
//! yields one child-list mutation, however many nodes it touched.

use crate::NodeId;

/// A mutation performed by the tree layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Children of `target` were added and/or removed
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    },
    /// An attribute of `target` changed
    Attribute {
        target: NodeId,
        name: String,
        namespace: Option<String>,
        old_value: Option<String>,
    },
    /// Text content of `target` changed
    CharacterData {
        target: NodeId,
        old_value: String,
    },
}

impl Mutation {
    /// Node the mutation happened on
    pub fn target(&self) -> NodeId {
        match self {
            Mutation::ChildList { target, .. }
            | Mutation::Attribute { target, .. }
            | Mutation::CharacterData { target, .. } => *target,
        }
    }
}
