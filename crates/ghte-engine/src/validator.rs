//! Tree validator. Checks I1-I5 on a normalised `LegalDocumentTree` and fails
//! fast on the first violation found.
//!
//! A single DFS from the roots does double duty: it confirms every node is
//! reached by exactly one path (I3, shared-parent and orphan detection both
//! fall out of the same visited-state machine) and it walks a recursion
//! stack that catches cycles directly, including ones formed by nodes with
//! no other structural defect.

use ghte_core::{Error, LegalDocumentTree, Result};
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

pub fn validate(tree: &LegalDocumentTree) -> Result<()> {
    if tree.root_nodes.is_empty() {
        return Err(Error::invalid_tree("no root nodes present (I5)"));
    }
    for root in &tree.root_nodes {
        if !tree.nodes.contains_key(root) {
            return Err(Error::invalid_tree(format!(
                "root id '{root}' has no corresponding node (I5)"
            )));
        }
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for root in &tree.root_nodes {
        visit(root, tree, &mut marks)?;
    }

    for id in tree.nodes.keys() {
        if marks.get(id.as_str()).is_none() {
            return Err(Error::invalid_tree(format!(
                "node '{id}' is unreachable from any root (I3)"
            )));
        }
    }

    Ok(())
}

fn visit<'a>(id: &'a str, tree: &'a LegalDocumentTree, marks: &mut HashMap<&'a str, Mark>) -> Result<()> {
    match marks.get(id) {
        Some(Mark::Done) => {
            return Err(Error::invalid_tree(format!(
                "node '{id}' is reachable from more than one parent (I3)"
            )))
        }
        Some(Mark::InProgress) => {
            return Err(Error::invalid_tree(format!("cycle detected at '{id}' (I3)")))
        }
        None => {}
    }

    marks.insert(id, Mark::InProgress);

    let node = tree
        .nodes
        .get(id)
        .expect("caller guarantees id exists before calling visit");

    for child_id in &node.children {
        let child = tree.nodes.get(child_id.as_str()).ok_or_else(|| {
            Error::invalid_tree(format!("dangling child reference '{child_id}' from '{id}' (I2)"))
        })?;
        if child.level != node.level + 1 {
            return Err(Error::invalid_tree(format!(
                "depth mismatch: '{child_id}' has level {} but parent '{id}' has level {} (I4)",
                child.level, node.level
            )));
        }
        visit(child_id, tree, marks)?;
    }

    marks.insert(id, Mark::Done);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghte_core::LegalNode;
    use std::collections::HashMap as Map;

    fn node(id: &str, level: u32, children: Vec<&str>) -> LegalNode {
        LegalNode {
            id: id.to_string(),
            title: id.to_string(),
            content: String::new(),
            level,
            children: children.into_iter().map(String::from).collect(),
            metadata: None,
        }
    }

    #[test]
    fn rejects_empty_root_set() {
        let tree = LegalDocumentTree::new(Map::new(), vec![]);
        assert!(validate(&tree).is_err());
    }

    #[test]
    fn rejects_dangling_child() {
        let mut nodes = Map::new();
        nodes.insert("root".into(), node("root", 0, vec!["missing"]));
        let tree = LegalDocumentTree::new(nodes, vec!["root".into()]);
        let err = validate(&tree).unwrap_err();
        assert!(err.to_string().contains("dangling"));
    }

    #[test]
    fn rejects_depth_mismatch() {
        let mut nodes = Map::new();
        nodes.insert("root".into(), node("root", 0, vec!["child"]));
        nodes.insert("child".into(), node("child", 5, vec![]));
        let tree = LegalDocumentTree::new(nodes, vec!["root".into()]);
        let err = validate(&tree).unwrap_err();
        assert!(err.to_string().contains("depth mismatch"));
    }

    #[test]
    fn rejects_shared_parent() {
        let mut nodes = Map::new();
        nodes.insert("root_a".into(), node("root_a", 0, vec!["shared"]));
        nodes.insert("root_b".into(), node("root_b", 0, vec!["shared"]));
        nodes.insert("shared".into(), node("shared", 1, vec![]));
        let tree = LegalDocumentTree::new(nodes, vec!["root_a".into(), "root_b".into()]);
        let err = validate(&tree).unwrap_err();
        assert!(err.to_string().contains("more than one parent"));
    }

    #[test]
    fn rejects_cycle_reachable_from_root() {
        let mut nodes = Map::new();
        nodes.insert("root".into(), node("root", 0, vec!["a"]));
        nodes.insert("a".into(), node("a", 1, vec!["b"]));
        nodes.insert("b".into(), node("b", 2, vec!["a"]));
        let tree = LegalDocumentTree::new(nodes, vec!["root".into()]);
        let err = validate(&tree).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn rejects_orphan_node_disconnected_from_roots() {
        let mut nodes = Map::new();
        nodes.insert("root".into(), node("root", 0, vec![]));
        nodes.insert("floating".into(), node("floating", 0, vec![]));
        let tree = LegalDocumentTree::new(nodes, vec!["root".into()]);
        let err = validate(&tree).unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn accepts_well_formed_tree() {
        let mut nodes = Map::new();
        nodes.insert("root".into(), node("root", 0, vec!["a", "b"]));
        nodes.insert("a".into(), node("a", 1, vec![]));
        nodes.insert("b".into(), node("b", 1, vec![]));
        let tree = LegalDocumentTree::new(nodes, vec!["root".into()]);
        assert!(validate(&tree).is_ok());
    }
}
