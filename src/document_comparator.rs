//! C6 — external-document comparator: reconciles the evaluator's UBO
//! names against a caller-supplied name list (spec §4.6).

use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

const PREFIX_TITLES: &[&str] = &[
    "ing arch", "ing", "mgr", "bc", "judr", "mudr", "phdr", "rndr", "doc", "prof", "phmr", "mddr", "mvdr", "thdr",
    "thlic",
];

const SUFFIX_TITLES: &[&str] = &[
    "mba", "llm", "phd", "dis", "csc", "dba", "msc", "ba", "bba", "llb", "ma", "acca", "cfa",
];

fn fold(s: &str) -> String {
    s.nfd().filter(|c| !unicode_normalization::char::is_combining_mark(*c)).collect()
}

/// Normalizes a display name: strip accents, strip known academic
/// titles (prefix and suffix, trailing-period insensitive), lower-case,
/// collapse whitespace.
pub fn normalize_name(raw: &str) -> String {
    let folded = fold(raw).to_lowercase();
    let tokens: Vec<String> = folded
        .split_whitespace()
        .map(|t| t.replace(['.', ','], ""))
        .filter(|t| !t.is_empty())
        .collect();

    let mut start = 0;
    while start < tokens.len() {
        let joined2 = if start + 1 < tokens.len() {
            format!("{} {}", tokens[start], tokens[start + 1])
        } else {
            String::new()
        };
        if PREFIX_TITLES.contains(&joined2.as_str()) {
            start += 2;
        } else if PREFIX_TITLES.contains(&tokens[start].as_str()) {
            start += 1;
        } else {
            break;
        }
    }

    let mut end = tokens.len();
    while end > start {
        let joined2 = if end >= 2 {
            format!("{} {}", tokens[end - 2], tokens[end - 1])
        } else {
            String::new()
        };
        if end >= 2 && SUFFIX_TITLES.contains(&joined2.as_str()) {
            end -= 2;
        } else if SUFFIX_TITLES.contains(&tokens[end - 1].as_str()) {
            end -= 1;
        } else {
            break;
        }
    }

    tokens[start..end].join(" ")
}

/// Set differences between the evaluator's UBO names and an externally
/// supplied name list, keyed by normalized form.
#[derive(Debug, Clone, Default)]
pub struct ComparisonResult {
    /// Present in the evaluator's result, absent from the external list.
    pub missing_in_external: Vec<String>,
    /// Present in the external list, absent from the evaluator's result.
    pub extra_in_external: Vec<String>,
}

pub fn compare(evaluator_names: &[String], external_names: &[String]) -> ComparisonResult {
    let evaluator_keys: HashSet<String> = evaluator_names.iter().map(|n| normalize_name(n)).collect();
    let external_keys: HashSet<String> = external_names.iter().map(|n| normalize_name(n)).collect();

    let missing_in_external = evaluator_names
        .iter()
        .filter(|n| !external_keys.contains(&normalize_name(n)))
        .cloned()
        .collect();

    let extra_in_external = external_names
        .iter()
        .filter(|n| !evaluator_keys.contains(&normalize_name(n)))
        .cloned()
        .collect();

    ComparisonResult {
        missing_in_external,
        extra_in_external,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_titles_and_case() {
        assert_eq!(normalize_name("Ing. Jan Novák, Ph.D."), "jan novak");
        assert_eq!(normalize_name("jan   NOVÁK"), "jan novak");
        assert_eq!(normalize_name("Mgr. Petra Svobodová MBA"), "petra svobodova");
    }

    #[test]
    fn matching_names_produce_no_diffs() {
        let result = compare(&["Jan Novák".to_string()], &["Ing. Jan Novák".to_string()]);
        assert!(result.missing_in_external.is_empty());
        assert!(result.extra_in_external.is_empty());
    }

    #[test]
    fn unmatched_names_surface_on_both_sides() {
        let result = compare(&["Jan Novák".to_string()], &["Petr Svoboda".to_string()]);
        assert_eq!(result.missing_in_external, vec!["Jan Novák".to_string()]);
        assert_eq!(result.extra_in_external, vec!["Petr Svoboda".to_string()]);
    }
}
