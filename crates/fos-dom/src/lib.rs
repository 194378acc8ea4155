//! fOS DOM - Document Object Model
//!
//! Arena-based DOM tree. Structural operations report the raw mutations they
//! perform so the event core can feed mutation observers.

mod node;
mod tree;
mod document;
mod mutation;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::DomTree;
pub use document::Document;
pub use mutation::Mutation;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Arena index of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tree operation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomError {
    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(&'static str),

    #[error("Node {0:?} not found")]
    NotFound(NodeId),

    #[error("Node {0:?} is not a child of {1:?}")]
    NotAChild(NodeId, NodeId),

    #[error("Node {0:?} does not hold character data")]
    NotCharacterData(NodeId),
}
