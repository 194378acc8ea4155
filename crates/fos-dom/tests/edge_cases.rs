//! Edge case tests for fos-dom
//!
//! Hierarchy violations and the mutations reported by tree operations.

use fos_dom::{Document, DomError, DomTree, Mutation, NodeId};

// ============================================================================
// HIERARCHY RULES
// ============================================================================

#[test]
fn test_cannot_insert_ancestor_into_descendant() {
    let mut tree = DomTree::new();
    let outer = tree.create_element("div");
    let inner = tree.create_element("div");
    tree.append_child(tree.root(), outer).unwrap();
    tree.append_child(outer, inner).unwrap();

    assert!(matches!(tree.append_child(inner, outer), Err(DomError::HierarchyRequest(_))));
    assert!(matches!(tree.append_child(outer, outer), Err(DomError::HierarchyRequest(_))));
    assert_eq!(tree.parent(outer), Some(tree.root()));
}

#[test]
fn test_text_nodes_have_no_children() {
    let mut tree = DomTree::new();
    let text = tree.create_text("leaf");
    let span = tree.create_element("span");
    assert!(tree.append_child(text, span).is_err());
}

#[test]
fn test_remove_non_child() {
    let mut tree = DomTree::new();
    let a = tree.create_element("a");
    let b = tree.create_element("b");
    assert_eq!(tree.remove_child(a, b), Err(DomError::NotAChild(b, a)));
}

#[test]
fn test_set_text_on_element_fails() {
    let mut tree = DomTree::new();
    let div = tree.create_element("div");
    assert_eq!(tree.set_text(div, "x"), Err(DomError::NotCharacterData(div)));
}

#[test]
fn test_insert_before_self_requires_membership() {
    let mut tree = DomTree::new();
    let list = tree.create_element("ul");
    let stray = tree.create_element("li");

    assert_eq!(
        tree.insert_before(list, stray, Some(stray)),
        Err(DomError::NotAChild(stray, list))
    );
    assert_eq!(tree.parent(stray), None);
    assert!(tree.children(list).is_empty());

    // A node that is already a child stays in place
    let first = tree.create_element("li");
    tree.append_child(list, stray).unwrap();
    tree.append_child(list, first).unwrap();
    tree.insert_before(list, stray, Some(stray)).unwrap();
    assert_eq!(tree.children(list), &[stray, first]);
}

// ============================================================================
// MUTATION REPORTS
// ============================================================================

#[test]
fn test_insert_before_reports_siblings() {
    let mut tree = DomTree::new();
    let list = tree.create_element("ul");
    let items: Vec<NodeId> = (0..3).map(|_| tree.create_element("li")).collect();
    tree.append_child(list, items[0]).unwrap();
    tree.append_child(list, items[2]).unwrap();

    let mutations = tree.insert_before(list, items[1], Some(items[2])).unwrap();
    assert_eq!(mutations, vec![Mutation::ChildList {
        target: list,
        added: vec![items[1]],
        removed: Vec::new(),
        previous_sibling: Some(items[0]),
        next_sibling: Some(items[2]),
    }]);
    assert_eq!(tree.children(list), items.as_slice());
}

#[test]
fn test_replace_children_with_nothing() {
    let mut tree = DomTree::new();
    let list = tree.create_element("ul");
    let item = tree.create_element("li");
    tree.append_child(list, item).unwrap();

    let mutations = tree.replace_children(list, &[]).unwrap();
    assert_eq!(mutations.len(), 1);
    assert_eq!(tree.parent(item), None);

    // Nothing to replace on an empty parent
    assert!(tree.replace_children(list, &[]).unwrap().is_empty());
}

#[test]
fn test_attribute_old_values() {
    let mut tree = DomTree::new();
    let div = tree.create_element("div");

    let first = tree.set_attribute(div, "class", "a").unwrap();
    assert!(matches!(first, Mutation::Attribute { old_value: None, .. }));

    let second = tree.set_attribute(div, "class", "b").unwrap();
    assert!(matches!(second, Mutation::Attribute { old_value: Some(ref v), .. } if v == "a"));

    let removed = tree.remove_attribute(div, "class").unwrap();
    assert!(matches!(
        removed,
        Some(Mutation::Attribute { old_value: Some(ref v), .. }) if v == "b"
    ));
    assert_eq!(tree.remove_attribute(div, "class").unwrap(), None);
}

// ============================================================================
// DOCUMENT
// ============================================================================

#[test]
fn test_document_lookup_by_id() {
    let mut doc = Document::new("https://example.com/");
    let body = doc.body();
    let main = doc.tree.create_element("main");
    doc.tree.append_child(body, main).unwrap();
    doc.tree.set_attribute(main, "id", "content").unwrap();

    assert_eq!(doc.get_element_by_id("content"), Some(main));
    assert_eq!(doc.get_element_by_id("missing"), None);
    assert_eq!(doc.tree.parent(doc.document_element()), Some(doc.tree.root()));
}
