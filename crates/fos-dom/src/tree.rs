//! DOM Tree (arena-based allocation)

use crate::{DomError, Mutation, Node, NodeId};

/// Arena-based DOM tree
///
/// Nodes are never freed; a removed node keeps its id and can be re-inserted.
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self { nodes: vec![Node::document()] }
    }

    /// Document root
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(Node::element(tag_name))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content.to_string()))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of a node in order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Attribute value on an element
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attr(name)
    }

    /// Tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.tag_name.as_str())
    }

    /// Text of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_text()
    }

    /// Append `child` to `parent`
    ///
    /// Moving an attached node first removes it from its old parent, which is
    /// reported as a separate mutation.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<Vec<Mutation>, DomError> {
        self.insert(parent, child, None)
    }

    /// Insert `child` before `reference` (append when `reference` is None)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<Vec<Mutation>, DomError> {
        self.insert(parent, child, reference)
    }

    fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<Vec<Mutation>, DomError> {
        self.check_insertion(parent, child)?;
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild(reference, parent));
            }
        }
        // Inserting a node before itself means inserting before its next sibling
        let reference = match reference {
            Some(r) if r == child => {
                let siblings = self.children(parent);
                siblings
                    .iter()
                    .position(|&c| c == child)
                    .and_then(|i| siblings.get(i + 1).copied())
            }
            other => other,
        };

        let mut mutations = Vec::with_capacity(2);
        if let Some(old_parent) = self.parent(child) {
            mutations.push(self.remove_child(old_parent, child)?);
        }

        let siblings = &self.nodes[parent.index()].children;
        let index = match reference {
            Some(r) => siblings
                .iter()
                .position(|&c| c == r)
                .ok_or(DomError::NotAChild(r, parent))?,
            None => siblings.len(),
        };
        let previous_sibling = index.checked_sub(1).map(|i| siblings[i]);
        let next_sibling = siblings.get(index).copied();

        self.nodes[parent.index()].children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
        tracing::trace!("Inserted {:?} into {:?} at {}", child, parent, index);

        mutations.push(Mutation::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
            previous_sibling,
            next_sibling,
        });
        Ok(mutations)
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.get(parent).ok_or(DomError::NotFound(parent))?;
        let child_node = self.get(child).ok_or(DomError::NotFound(child))?;
        if !parent_node.accepts_children() {
            return Err(DomError::HierarchyRequest("parent cannot have children"));
        }
        if matches!(child_node.data, crate::NodeData::Document) {
            return Err(DomError::HierarchyRequest("document cannot be inserted"));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest("node would become its own ancestor"));
        }
        Ok(())
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<Mutation, DomError> {
        if self.get(parent).is_none() {
            return Err(DomError::NotFound(parent));
        }
        let siblings = &self.nodes[parent.index()].children;
        let index = siblings.iter()
            .position(|&c| c == child)
            .ok_or(DomError::NotAChild(child, parent))?;
        let previous_sibling = index.checked_sub(1).map(|i| siblings[i]);
        let next_sibling = siblings.get(index + 1).copied();

        self.nodes[parent.index()].children.remove(index);
        self.nodes[child.index()].parent = None;

        Ok(Mutation::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![child],
            previous_sibling,
            next_sibling,
        })
    }

    /// Replace every child of `parent` with `new_children` in one operation
    ///
    /// Produces a single child-list mutation listing every removed and added
    /// node (plus one removal per new child that was attached elsewhere).
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        new_children: &[NodeId],
    ) -> Result<Vec<Mutation>, DomError> {
        for &child in new_children {
            self.check_insertion(parent, child)?;
        }

        let mut mutations = Vec::new();
        for &child in new_children {
            if let Some(old_parent) = self.parent(child) {
                if old_parent != parent {
                    mutations.push(self.remove_child(old_parent, child)?);
                }
            }
        }

        let removed = std::mem::take(&mut self.nodes[parent.index()].children);
        for &old in &removed {
            self.nodes[old.index()].parent = None;
        }
        for &child in new_children {
            self.nodes[child.index()].parent = Some(parent);
        }
        self.nodes[parent.index()].children = new_children.to_vec();

        if !removed.is_empty() || !new_children.is_empty() {
            mutations.push(Mutation::ChildList {
                target: parent,
                added: new_children.to_vec(),
                removed,
                previous_sibling: None,
                next_sibling: None,
            });
        }
        Ok(mutations)
    }

    /// Set an attribute (null namespace)
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
    ) -> Result<Mutation, DomError> {
        self.set_attribute_ns(id, None, name, value)
    }

    /// Set a namespaced attribute
    pub fn set_attribute_ns(
        &mut self,
        id: NodeId,
        namespace: Option<&str>,
        name: &str,
        value: &str,
    ) -> Result<Mutation, DomError> {
        let element = self.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::HierarchyRequest("attributes require an element"))?;
        let old_value = element.set_attr(name, namespace, value.to_string());
        Ok(Mutation::Attribute {
            target: id,
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            old_value,
        })
    }

    /// Remove an attribute; None if it was not present
    pub fn remove_attribute(
        &mut self,
        id: NodeId,
        name: &str,
    ) -> Result<Option<Mutation>, DomError> {
        let element = self.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::HierarchyRequest("attributes require an element"))?;
        Ok(element.remove_attr(name, None).map(|old| Mutation::Attribute {
            target: id,
            name: name.to_string(),
            namespace: None,
            old_value: Some(old),
        }))
    }

    /// Replace the text of a text node
    pub fn set_text(&mut self, id: NodeId, content: &str) -> Result<Mutation, DomError> {
        let node = self.get_mut(id).ok_or(DomError::NotFound(id))?;
        match &mut node.data {
            crate::NodeData::Text(text) => {
                let old_value = std::mem::replace(text, content.to_string());
                Ok(Mutation::CharacterData { target: id, old_value })
            }
            _ => Err(DomError::NotCharacterData(id)),
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}
