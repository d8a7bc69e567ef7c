//! Node-context extraction: turns a `LegalNode` into the short text blurb
//! the oracle actually sees. Leaf nodes get a bare identity line; parent
//! nodes get a bounded preview of their content plus whatever metadata
//! snippets are available, so the oracle can judge relevance without ever
//! reading a node's full text.

use ghte_core::LegalNode;

const PREVIEW_LEN: usize = 150;
const SCOPE_LEN: usize = 100;
const IMPACT_LEN: usize = 80;
const MIN_FIRST_SENTENCE: usize = 20;
const MAX_LIST_ITEMS: usize = 3;

pub fn extract_context(node: &LegalNode) -> String {
    if node.is_leaf() {
        return format!("Title: {} | Type: Leaf node (detailed provision)", node.title);
    }

    let mut parts = vec![format!("Title: {}", node.title)];

    let preview = content_preview(&node.content, PREVIEW_LEN);
    if !preview.is_empty() {
        parts.push(preview);
    }

    if let Some(meta) = &node.metadata {
        if !meta.main_themes.is_empty() {
            parts.push(format!("Themes: {}", join_top(&meta.main_themes, MAX_LIST_ITEMS)));
        }
        if !meta.key_points.is_empty() {
            parts.push(format!("Key points: {}", join_top(&meta.key_points, MAX_LIST_ITEMS)));
        }
        if let Some(scope) = &meta.scope {
            parts.push(format!("Scope: {}", truncate_chars(scope, SCOPE_LEN)));
        }
        if let Some(impact) = &meta.practical_impact {
            parts.push(format!("Impact: {}", truncate_chars(impact, IMPACT_LEN)));
        }
    }

    parts.push(format!("Type: Parent node ({} children)", node.children.len()));
    parts.join(" | ")
}

fn join_top(items: &[String], max: usize) -> String {
    items.iter().take(max).cloned().collect::<Vec<_>>().join(", ")
}

/// Prefer the first sentence; if it's too short to be informative, pull in
/// the second one too. Either way the result is truncated at a sentence or
/// word boundary so we never cut a word in half.
fn content_preview(content: &str, max_len: usize) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let sentences = split_sentences(trimmed);
    let candidate = match sentences.first() {
        Some(first) if first.chars().count() < MIN_FIRST_SENTENCE && sentences.len() > 1 => {
            format!("{}{}", first, sentences[1])
        }
        Some(first) => first.clone(),
        None => trimmed.to_string(),
    };

    truncate_chars(candidate.trim(), max_len)
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Truncate to at most `max_len` chars. If the natural cut point lands past
/// the halfway mark, back off to the nearest preceding sentence or word
/// boundary so the preview doesn't end mid-word; otherwise hard-cut.
fn truncate_chars(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        return s.to_string();
    }

    let hard_cut: String = chars[..max_len].iter().collect();
    let half = max_len / 2;

    let boundary = hard_cut
        .rfind(['.', '!', '?'])
        .filter(|&i| i >= half)
        .or_else(|| hard_cut.rfind(' ').filter(|&i| i >= half));

    match boundary {
        Some(i) => format!("{}...", &hard_cut[..i + 1].trim_end()),
        None => format!("{hard_cut}..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghte_core::NodeMetadata;

    fn leaf(title: &str) -> LegalNode {
        LegalNode {
            id: "leaf".into(),
            title: title.into(),
            content: "irrelevant".into(),
            level: 2,
            children: vec![],
            metadata: None,
        }
    }

    fn parent(content: &str, metadata: Option<NodeMetadata>, children: usize) -> LegalNode {
        LegalNode {
            id: "parent".into(),
            title: "Chapter Three".into(),
            content: content.into(),
            level: 1,
            children: (0..children).map(|i| format!("c{i}")).collect(),
            metadata,
        }
    }

    #[test]
    fn leaf_context_is_identity_only() {
        let ctx = extract_context(&leaf("Section 4.2"));
        assert_eq!(ctx, "Title: Section 4.2 | Type: Leaf node (detailed provision)");
    }

    #[test]
    fn parent_context_includes_preview_and_child_count() {
        let node = parent(
            "This chapter governs liability. It also covers remedies and damages in detail.",
            None,
            3,
        );
        let ctx = extract_context(&node);
        assert!(ctx.starts_with("Title: Chapter Three"));
        assert!(ctx.contains("This chapter governs liability."));
        assert!(ctx.ends_with("Type: Parent node (3 children)"));
    }

    #[test]
    fn short_first_sentence_pulls_in_second() {
        let node = parent("Scope. This section defines the boundaries of the chapter's application.", None, 1);
        let preview = content_preview(&node.content, PREVIEW_LEN);
        assert!(preview.contains("Scope."));
        assert!(preview.contains("This section defines"));
    }

    #[test]
    fn long_content_is_truncated_with_ellipsis() {
        let long = "a".repeat(40) + " " + &"b".repeat(200);
        let node = parent(&long, None, 0);
        let ctx = extract_context(&node);
        assert!(ctx.contains("..."));
    }

    #[test]
    fn metadata_snippets_are_bounded_and_present() {
        let meta = NodeMetadata {
            keywords: vec![],
            main_themes: vec!["liability".into(), "remedies".into(), "damages".into(), "extra".into()],
            key_points: vec!["point one".into()],
            scope: Some("x".repeat(150)),
            practical_impact: Some("y".repeat(120)),
            legal_references: vec![],
            section_number: None,
            section_type: None,
        };
        let node = parent("Some content here.", Some(meta), 2);
        let ctx = extract_context(&node);
        assert!(ctx.contains("Themes: liability, remedies, damages"));
        assert!(!ctx.contains("extra"));
        assert!(ctx.contains("Key points: point one"));
        assert!(ctx.contains("Scope:"));
        assert!(ctx.contains("Impact:"));
    }

    #[test]
    fn empty_content_produces_no_preview_segment() {
        let node = parent("", None, 0);
        let ctx = extract_context(&node);
        assert_eq!(ctx, "Title: Chapter Three | Type: Parent node (0 children)");
    }
}
