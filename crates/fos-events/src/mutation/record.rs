//! Mutation records

use fos_dom::Mutation;

use crate::TargetId;

/// Mutation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

/// Mutation record delivered to an observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: TargetId,
    pub added_nodes: Vec<TargetId>,
    pub removed_nodes: Vec<TargetId>,
    pub previous_sibling: Option<TargetId>,
    pub next_sibling: Option<TargetId>,
    pub attribute_name: Option<String>,
    pub attribute_namespace: Option<String>,
    /// Present only when the observer asked for old values
    pub old_value: Option<String>,
}

impl MutationRecord {
    fn empty(mutation_type: MutationType, target: TargetId) -> Self {
        Self {
            mutation_type,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            attribute_namespace: None,
            old_value: None,
        }
    }

    pub(crate) fn child_list(change: &ChildListChange) -> Self {
        Self {
            added_nodes: change.added.clone(),
            removed_nodes: change.removed.clone(),
            previous_sibling: change.previous_sibling,
            next_sibling: change.next_sibling,
            ..Self::empty(MutationType::ChildList, change.target)
        }
    }

    pub(crate) fn attribute(
        target: TargetId,
        name: &str,
        namespace: Option<&str>,
        old_value: Option<String>,
    ) -> Self {
        Self {
            attribute_name: Some(name.to_string()),
            attribute_namespace: namespace.map(str::to_string),
            old_value,
            ..Self::empty(MutationType::Attributes, target)
        }
    }

    pub(crate) fn character_data(target: TargetId, old_value: Option<String>) -> Self {
        Self {
            old_value,
            ..Self::empty(MutationType::CharacterData, target)
        }
    }
}

/// Children added to and/or removed from one parent in a single operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildListChange {
    pub target: TargetId,
    pub added: Vec<TargetId>,
    pub removed: Vec<TargetId>,
    pub previous_sibling: Option<TargetId>,
    pub next_sibling: Option<TargetId>,
}

impl ChildListChange {
    pub fn new(target: TargetId) -> Self {
        Self {
            target,
            added: Vec::new(),
            removed: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
        }
    }

    pub fn added(mut self, nodes: impl IntoIterator<Item = TargetId>) -> Self {
        self.added.extend(nodes);
        self
    }

    pub fn removed(mut self, nodes: impl IntoIterator<Item = TargetId>) -> Self {
        self.removed.extend(nodes);
        self
    }

    pub fn siblings(mut self, previous: Option<TargetId>, next: Option<TargetId>) -> Self {
        self.previous_sibling = previous;
        self.next_sibling = next;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Child-list part of a tree mutation, if it is one
impl TryFrom<&Mutation> for ChildListChange {
    type Error = ();

    fn try_from(mutation: &Mutation) -> Result<Self, Self::Error> {
        match mutation {
            Mutation::ChildList {
                target,
                added,
                removed,
                previous_sibling,
                next_sibling,
            } => Ok(Self {
                target: (*target).into(),
                added: added.iter().map(|&n| n.into()).collect(),
                removed: removed.iter().map(|&n| n.into()).collect(),
                previous_sibling: previous_sibling.map(Into::into),
                next_sibling: next_sibling.map(Into::into),
            }),
            _ => Err(()),
        }
    }
}
