//! Raw-document normaliser. Converts whichever of several heterogeneous raw
//! shapes the caller handed us into the canonical `LegalDocumentTree`. Each
//! shape is tried as a pure, independent parse; the first one that matches
//! wins.

use ghte_core::{Error, LegalDocumentTree, LegalNode, Result};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

pub fn normalize(raw: &Value) -> Result<LegalDocumentTree> {
    let tree = if raw.is_array() {
        try_flat_array(raw)?
            .ok_or_else(|| Error::malformed_document("flat array shape did not parse"))?
    } else {
        let obj = raw
            .as_object()
            .ok_or_else(|| Error::malformed_document("root is not a JSON object or array"))?;

        if let Some(tree) = try_canonical(obj)? {
            crate::validator::validate(&tree)?;
            return Ok(tree);
        }

        if let Some(tree) = try_agent_results(obj)? {
            tree
        } else if let Some(tree) = try_single_root_recursive(obj)? {
            tree
        } else if let Some(tree) = try_nested_sections(obj)? {
            tree
        } else if let Some(tree) = try_flat_object(obj)? {
            tree
        } else {
            return Err(Error::malformed_document("no recognised input shape"));
        }
    };

    let tree = recompute_levels(tree);
    crate::validator::validate(&tree)?;
    Ok(tree)
}

/// Assigns every non-root node's level by BFS distance from its root,
/// per I4: traversal-computed depth wins over whatever the raw input said.
fn recompute_levels(mut tree: LegalDocumentTree) -> LegalDocumentTree {
    let mut queue: std::collections::VecDeque<(String, u32)> =
        tree.root_nodes.iter().map(|id| (id.clone(), 0)).collect();
    let mut seen = HashSet::new();

    while let Some((id, level)) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let children = match tree.nodes.get_mut(&id) {
            Some(node) => {
                node.level = level;
                node.children.clone()
            }
            None => continue,
        };
        for child in children {
            queue.push_back((child, level + 1));
        }
    }

    tree
}

/// Accumulates nodes, suffixing colliding ids (`_2`, `_3`, ...) so raw content
/// is never dropped on a duplicate-id collision.
#[derive(Default)]
struct Builder {
    nodes: HashMap<String, LegalNode>,
}

impl Builder {
    fn insert(&mut self, mut node: LegalNode) -> String {
        if !self.nodes.contains_key(&node.id) {
            let id = node.id.clone();
            self.nodes.insert(id.clone(), node);
            return id;
        }
        let base = node.id.clone();
        let mut suffix = 2;
        loop {
            let candidate = format!("{base}_{suffix}");
            if !self.nodes.contains_key(&candidate) {
                node.id = candidate.clone();
                self.nodes.insert(candidate.clone(), node);
                return candidate;
            }
            suffix += 1;
        }
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn metadata_field(obj: &Map<String, Value>) -> Option<ghte_core::NodeMetadata> {
    obj.get("metadata").and_then(|v| serde_json::from_value(v.clone()).ok())
}

// --- (a) already-canonical -------------------------------------------------

fn try_canonical(obj: &Map<String, Value>) -> Result<Option<LegalDocumentTree>> {
    let nodes_val = match obj.get("nodes").and_then(|v| v.as_object()) {
        Some(m) => m,
        None => return Ok(None),
    };
    let root_nodes_val = obj
        .get("rootNodes")
        .or_else(|| obj.get("root_nodes"))
        .and_then(|v| v.as_array());
    let root_nodes_val = match root_nodes_val {
        Some(a) => a,
        None => return Ok(None),
    };

    let mut nodes = HashMap::new();
    for (id, v) in nodes_val {
        let node: LegalNode = serde_json::from_value(v.clone())
            .map_err(|e| Error::malformed_document(format!("node '{id}': {e}")))?;
        nodes.insert(id.clone(), node);
    }
    let root_nodes: Vec<String> = root_nodes_val
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();

    Ok(Some(LegalDocumentTree::new(nodes, root_nodes)))
}

// --- (b) single-root recursive object, children as a map -------------------

fn try_single_root_recursive(obj: &Map<String, Value>) -> Result<Option<LegalDocumentTree>> {
    if !(obj.contains_key("id") && obj.contains_key("title")) {
        return Ok(None);
    }
    if !matches!(obj.get("children"), Some(Value::Object(_))) {
        return Ok(None);
    }

    let mut builder = Builder::default();
    let root_id = flatten_recursive(obj, 0, &mut builder)?;
    Ok(Some(LegalDocumentTree::new(builder.nodes, vec![root_id])))
}

fn flatten_recursive(obj: &Map<String, Value>, level: u32, builder: &mut Builder) -> Result<String> {
    let id = str_field(obj, "id").ok_or_else(|| Error::malformed_document("node missing id"))?;
    let title = str_field(obj, "title").unwrap_or_else(|| id.clone());
    let content = str_field(obj, "content").unwrap_or_default();
    let metadata = metadata_field(obj);

    let mut child_ids = Vec::new();
    if let Some(Value::Object(children)) = obj.get("children") {
        for (key, child_val) in children {
            if let Some(child_obj) = child_val.as_object() {
                let mut child_obj = child_obj.clone();
                child_obj
                    .entry("id".to_string())
                    .or_insert_with(|| Value::String(key.clone()));
                child_ids.push(flatten_recursive(&child_obj, level + 1, builder)?);
            }
        }
    }

    Ok(builder.insert(LegalNode { id, title, content, level, children: child_ids, metadata }))
}

// --- (c) chapter/section nested object, keyed by id -------------------------

const NEST_KEYS: [&str; 4] = ["sections", "subsections", "chapters", "parts"];

fn try_nested_sections(obj: &Map<String, Value>) -> Result<Option<LegalDocumentTree>> {
    if obj.is_empty() {
        return Ok(None);
    }
    let looks_nested = obj.values().all(|v| {
        v.as_object()
            .map(|m| NEST_KEYS.iter().any(|k| matches!(m.get(*k), Some(Value::Object(_)))))
            .unwrap_or(false)
    });
    if !looks_nested {
        return Ok(None);
    }

    let mut builder = Builder::default();
    let mut root_ids = Vec::new();
    for (key, val) in obj {
        if let Some(child_obj) = val.as_object() {
            root_ids.push(flatten_nested(key, child_obj, 0, &mut builder)?);
        }
    }
    if root_ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(LegalDocumentTree::new(builder.nodes, root_ids)))
}

fn flatten_nested(
    composed_id: &str,
    obj: &Map<String, Value>,
    level: u32,
    builder: &mut Builder,
) -> Result<String> {
    let title = str_field(obj, "title").unwrap_or_else(|| composed_id.to_string());
    let content = str_field(obj, "content").unwrap_or_default();
    let metadata = metadata_field(obj);

    let mut child_ids = Vec::new();
    for nest_key in NEST_KEYS {
        if let Some(Value::Object(children)) = obj.get(nest_key) {
            for (child_key, child_val) in children {
                if let Some(child_obj) = child_val.as_object() {
                    let composed_child_id = format!("{composed_id}_{child_key}");
                    child_ids.push(flatten_nested(&composed_child_id, child_obj, level + 1, builder)?);
                }
            }
        }
    }

    Ok(builder.insert(LegalNode {
        id: composed_id.to_string(),
        title,
        content,
        level,
        children: child_ids,
        metadata,
    }))
}

// --- (d) agent-results structure_discovery walk -----------------------------

fn try_agent_results(obj: &Map<String, Value>) -> Result<Option<LegalDocumentTree>> {
    let root_sections = obj
        .get("structure_discovery")
        .and_then(|v| v.get("structure_analysis"))
        .and_then(|v| v.get("document_structure"))
        .and_then(|v| v.get("root_sections"))
        .and_then(|v| v.as_array());

    let root_sections = match root_sections {
        Some(arr) => arr,
        None => return Ok(None),
    };

    let mut builder = Builder::default();
    let mut root_ids = Vec::new();
    for entry in root_sections {
        if let Some(entry_obj) = entry.as_object() {
            root_ids.push(flatten_agent_node(entry_obj, 0, &mut builder)?);
        }
    }
    Ok(Some(LegalDocumentTree::new(builder.nodes, root_ids)))
}

fn flatten_agent_node(obj: &Map<String, Value>, level: u32, builder: &mut Builder) -> Result<String> {
    let id = str_field(obj, "id")
        .or_else(|| str_field(obj, "section_number"))
        .unwrap_or_else(|| "section".to_string());
    let title = str_field(obj, "title").unwrap_or_else(|| id.clone());
    let content = str_field(obj, "content").unwrap_or_default();
    let metadata = metadata_field(obj);

    let mut child_ids = Vec::new();
    match obj.get("children").or_else(|| obj.get("subsections")) {
        Some(Value::Array(arr)) => {
            for child in arr {
                if let Some(child_obj) = child.as_object() {
                    child_ids.push(flatten_agent_node(child_obj, level + 1, builder)?);
                }
            }
        }
        Some(Value::Object(map)) => {
            for child in map.values() {
                if let Some(child_obj) = child.as_object() {
                    child_ids.push(flatten_agent_node(child_obj, level + 1, builder)?);
                }
            }
        }
        _ => {}
    }

    Ok(builder.insert(LegalNode { id, title, content, level, children: child_ids, metadata }))
}

// --- (e) flat array of node-like objects ------------------------------------

fn try_flat_array(raw: &Value) -> Result<Option<LegalDocumentTree>> {
    let arr = match raw.as_array() {
        Some(a) if !a.is_empty() => a,
        _ => return Ok(None),
    };

    let mut builder = Builder::default();
    let mut original_ids = Vec::with_capacity(arr.len());
    let mut final_ids = Vec::with_capacity(arr.len());
    let mut levels = Vec::with_capacity(arr.len());
    let mut parents = Vec::with_capacity(arr.len());

    for entry in arr {
        let obj = entry
            .as_object()
            .ok_or_else(|| Error::malformed_document("flat array entry is not an object"))?;
        let id = str_field(obj, "id")
            .ok_or_else(|| Error::malformed_document("flat array entry missing id"))?;
        let title = str_field(obj, "title").unwrap_or_else(|| id.clone());
        let content = str_field(obj, "content").unwrap_or_default();
        let level = obj.get("level").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let metadata = metadata_field(obj);
        let parent = str_field(obj, "parent");

        original_ids.push(id.clone());
        levels.push(level);
        parents.push(parent);

        let final_id = builder.insert(LegalNode { id, title, content, level, children: Vec::new(), metadata });
        final_ids.push(final_id);
    }

    let mut first_final_for_original: HashMap<String, String> = HashMap::new();
    for (orig, fin) in original_ids.iter().zip(final_ids.iter()) {
        first_final_for_original.entry(orig.clone()).or_insert_with(|| fin.clone());
    }

    for (i, parent_orig) in parents.iter().enumerate() {
        if let Some(p) = parent_orig {
            if let Some(parent_final) = first_final_for_original.get(p) {
                if let Some(parent_node) = builder.nodes.get_mut(parent_final) {
                    parent_node.children.push(final_ids[i].clone());
                }
            }
        }
    }

    let root_nodes: Vec<String> = (0..final_ids.len())
        .filter(|&i| parents[i].is_none() || levels[i] == 0)
        .map(|i| final_ids[i].clone())
        .collect();

    Ok(Some(LegalDocumentTree::new(builder.nodes, root_nodes)))
}

// --- (f) flat object keyed by id, skipping known metadata keys -------------

const SKIP_KEYS: [&str; 5] = ["nodes", "rootNodes", "root_nodes", "version", "generatedAt"];

fn try_flat_object(obj: &Map<String, Value>) -> Result<Option<LegalDocumentTree>> {
    let candidates: Vec<(&String, &Value)> =
        obj.iter().filter(|(k, _)| !SKIP_KEYS.contains(&k.as_str())).collect();
    if candidates.is_empty() {
        return Ok(None);
    }
    let all_look_like_nodes = candidates.iter().all(|(_, v)| {
        v.as_object()
            .map(|m| m.contains_key("title") || m.contains_key("content"))
            .unwrap_or(false)
    });
    if !all_look_like_nodes {
        return Ok(None);
    }

    let mut builder = Builder::default();
    let mut key_to_final: HashMap<String, String> = HashMap::new();

    for (key, val) in &candidates {
        let node_obj = val.as_object().unwrap();
        let title = str_field(node_obj, "title").unwrap_or_else(|| (*key).clone());
        let content = str_field(node_obj, "content").unwrap_or_default();
        let level = node_obj.get("level").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let metadata = metadata_field(node_obj);
        let final_id = builder.insert(LegalNode {
            id: (*key).clone(),
            title,
            content,
            level,
            children: Vec::new(),
            metadata,
        });
        key_to_final.insert((*key).clone(), final_id);
    }

    for (key, val) in &candidates {
        let node_obj = val.as_object().unwrap();
        if let Some(Value::Array(children)) = node_obj.get("children") {
            let final_self = key_to_final.get(*key).unwrap().clone();
            let child_finals: Vec<String> = children
                .iter()
                .filter_map(|c| c.as_str())
                .filter_map(|cid| key_to_final.get(cid).cloned())
                .collect();
            if let Some(node) = builder.nodes.get_mut(&final_self) {
                node.children = child_finals;
            }
        }
    }

    let mut referenced: HashSet<String> = HashSet::new();
    for n in builder.nodes.values() {
        referenced.extend(n.children.iter().cloned());
    }
    let root_nodes: Vec<String> = candidates
        .iter()
        .map(|(k, _)| key_to_final.get(*k).unwrap().clone())
        .filter(|id| !referenced.contains(id))
        .collect();

    if root_nodes.is_empty() {
        return Ok(None);
    }

    Ok(Some(LegalDocumentTree::new(builder.nodes, root_nodes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_passes_through() {
        let raw = json!({
            "nodes": {
                "root": {"id": "root", "title": "Root", "level": 0, "children": ["a"]},
                "a": {"id": "a", "title": "A", "level": 1, "children": []}
            },
            "rootNodes": ["root"]
        });
        let tree = normalize(&raw).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root_nodes, vec!["root".to_string()]);
    }

    #[test]
    fn single_root_recursive_flattens() {
        let raw = json!({
            "id": "part_1",
            "title": "Part 1",
            "level": 0,
            "children": {
                "section_1": {"id": "section_1", "title": "Section 1", "children": {}}
            }
        });
        let tree = normalize(&raw).unwrap();
        assert_eq!(tree.len(), 2);
        let root = tree.get("part_1").unwrap();
        assert_eq!(root.children, vec!["section_1".to_string()]);
        assert_eq!(tree.get("section_1").unwrap().level, 1);
    }

    #[test]
    fn nested_sections_compose_ids() {
        let raw = json!({
            "chapter_1": {
                "title": "Chapter 1",
                "sections": {
                    "section_1": {"title": "Section 1"}
                }
            }
        });
        let tree = normalize(&raw).unwrap();
        assert!(tree.get("chapter_1").is_some());
        assert!(tree.get("chapter_1_section_1").is_some());
        assert_eq!(tree.get("chapter_1_section_1").unwrap().level, 1);
    }

    #[test]
    fn agent_results_are_walked() {
        let raw = json!({
            "structure_discovery": {
                "structure_analysis": {
                    "document_structure": {
                        "root_sections": [
                            {"id": "part_1", "title": "Part 1", "children": [
                                {"id": "section_1", "title": "Section 1"}
                            ]}
                        ]
                    }
                }
            }
        });
        let tree = normalize(&raw).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root_nodes, vec!["part_1".to_string()]);
    }

    #[test]
    fn flat_array_infers_roots_and_children() {
        let raw = json!([
            {"id": "root", "title": "Root", "level": 0},
            {"id": "child", "title": "Child", "level": 1, "parent": "root"}
        ]);
        let tree = normalize(&raw).unwrap();
        assert_eq!(tree.root_nodes, vec!["root".to_string()]);
        assert_eq!(tree.get("root").unwrap().children, vec!["child".to_string()]);
    }

    #[test]
    fn flat_object_infers_roots_from_children_refs() {
        let raw = json!({
            "root": {"title": "Root", "children": ["child"]},
            "child": {"title": "Child"}
        });
        let tree = normalize(&raw).unwrap();
        assert_eq!(tree.root_nodes, vec!["root".to_string()]);
    }

    #[test]
    fn duplicate_ids_get_suffixed() {
        let raw = json!({
            "structure_discovery": {
                "structure_analysis": {
                    "document_structure": {
                        "root_sections": [
                            {"id": "part_1", "title": "Part 1 (first)"},
                            {"id": "part_1", "title": "Part 1 (second)"}
                        ]
                    }
                }
            }
        });
        let tree = normalize(&raw).unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree.get("part_1").is_some());
        assert!(tree.get("part_1_2").is_some());
        assert_eq!(tree.get("part_1_2").unwrap().title, "Part 1 (second)");
    }

    #[test]
    fn malformed_input_rejected() {
        let raw = json!("just a string");
        assert!(normalize(&raw).is_err());
    }
}
