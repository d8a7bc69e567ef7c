//! Identifier reconciliation: the oracle is asked about node id `"4.2"` and
//! sometimes answers about `"Section 4.2 Definitions"` instead. This module
//! matches what came back to what was asked for, so a slightly-off oracle
//! answer doesn't get silently dropped as unmappable.
//!
//! Matching runs a cascade of four strategies, cheapest and most exact
//! first: exact id match, numeric-prefix match, key-phrase overlap, and
//! finally fuzzy string similarity. The first strategy that matches wins;
//! a received entry is consumed at most once so two requested ids can never
//! both claim it. Requested ids are processed in submission order, which
//! matters when more than one could plausibly match the same entry.

use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "of", "and", "a", "an", "to", "in", "for", "on", "by", "is", "that", "this", "with",
    "as", "at", "or", "be", "are",
];

const FUZZY_MAX_LEN: usize = 20;
const FUZZY_MIN_SIMILARITY: f64 = 0.70;
const SUBSTRING_MIN_LEN: usize = 5;

/// Match each requested id against the pool of received `(id, payload)`
/// pairs, consuming each received entry at most once. Returns one entry per
/// requested id that found a match, in requested order; ids with no match
/// are simply absent from the result (callers treat that as unmappable).
pub fn reconcile<T>(requested_ids: &[String], received: Vec<(String, T)>) -> Vec<(String, T)> {
    let mut pool: Vec<Option<(String, T)>> = received.into_iter().map(Some).collect();
    let mut matched = Vec::with_capacity(requested_ids.len());

    for requested in requested_ids {
        let idx = find_match(requested, &pool);
        if let Some(idx) = idx {
            if let Some((_, payload)) = pool[idx].take() {
                matched.push((requested.clone(), payload));
            }
        }
    }

    matched
}

fn find_match<T>(requested: &str, pool: &[Option<(String, T)>]) -> Option<usize> {
    exact_match(requested, pool)
        .or_else(|| number_prefix_match(requested, pool))
        .or_else(|| key_phrase_match(requested, pool))
        .or_else(|| fuzzy_match(requested, pool))
}

fn exact_match<T>(requested: &str, pool: &[Option<(String, T)>]) -> Option<usize> {
    pool.iter()
        .position(|entry| matches!(entry, Some((id, _)) if id == requested))
}

fn number_prefix_match<T>(requested: &str, pool: &[Option<(String, T)>]) -> Option<usize> {
    let req_prefix = numeric_prefix(requested)?;
    pool.iter().position(|entry| match entry {
        Some((id, _)) => numeric_prefix(id).as_deref() == Some(req_prefix.as_str()),
        None => false,
    })
}

fn numeric_prefix(s: &str) -> Option<String> {
    let mut prefix = String::new();
    for c in s.trim().chars() {
        if c.is_ascii_digit() || c == '.' {
            prefix.push(c);
        } else {
            break;
        }
    }
    let trimmed = prefix.trim_end_matches('.');
    if trimmed.is_empty() || !trimmed.chars().any(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn key_words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn key_phrase_match<T>(requested: &str, pool: &[Option<(String, T)>]) -> Option<usize> {
    let req_words = key_words(requested);
    if req_words.len() < 2 {
        return None;
    }
    let required = ((req_words.len() as f64) * 0.5).ceil().max(2.0) as usize;

    pool.iter().position(|entry| {
        let Some((id, _)) = entry else { return false };
        let cand_words: HashSet<String> = key_words(id).into_iter().collect();
        let matched = req_words
            .iter()
            .filter(|w| {
                cand_words.contains(*w)
                    || cand_words.iter().any(|c| c.contains(w.as_str()) || w.contains(c.as_str()))
                    || cand_words.iter().any(|c| levenshtein(w, c) <= 1)
            })
            .count();
        matched >= required
    })
}

fn fuzzy_match<T>(requested: &str, pool: &[Option<(String, T)>]) -> Option<usize> {
    pool.iter().position(|entry| {
        let Some((id, _)) = entry else { return false };
        if requested.len() <= FUZZY_MAX_LEN && id.len() <= FUZZY_MAX_LEN {
            similarity(requested, id) >= FUZZY_MIN_SIMILARITY
        } else {
            let (shorter, longer) = if requested.len() <= id.len() {
                (requested, id.as_str())
            } else {
                (id.as_str(), requested)
            };
            shorter.len() >= SUBSTRING_MIN_LEN
                && longer.to_lowercase().contains(&shorter.to_lowercase())
        }
    })
}

fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let distance = levenshtein(a, b);
    let max_len = a.chars().count().max(b.chars().count()) as f64;
    1.0 - (distance as f64 / max_len)
}

fn levenshtein(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let s1_len = s1_chars.len();
    let s2_len = s2_chars.len();

    let mut matrix = vec![vec![0; s2_len + 1]; s1_len + 1];
    for i in 0..=s1_len {
        matrix[i][0] = i;
    }
    for j in 0..=s2_len {
        matrix[0][j] = j;
    }

    for i in 1..=s1_len {
        for j in 1..=s2_len {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = std::cmp::min(
                std::cmp::min(matrix[i - 1][j] + 1, matrix[i][j - 1] + 1),
                matrix[i - 1][j - 1] + cost,
            );
        }
    }

    matrix[s1_len][s2_len]
}
