//! Refusal detection and source-selection parsing for the fallback
//! ladder.
//!
//! The refusal phrase list is a contract: exact substring matching,
//! case-insensitive, and the set must not be extended silently —
//! near-synonyms do NOT trigger the no-answer fallback.

use lintel_core::chunk::RetrievedChunk;
use regex::Regex;
use std::sync::OnceLock;

/// Whether the model's answer matches a canonical refusal phrase.
pub fn is_refusal(answer: &str, refusal_phrases: &[String]) -> bool {
    let lower = answer.to_lowercase();
    refusal_phrases.iter().any(|p| lower.contains(p.as_str()))
}

fn selection_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[Using Context (\d+)\]\s*").expect("valid regex"))
}

/// Parse the `[Using Context N]` marker the STANDARD_QA template asks
/// for: strip it from the answer and mark the Nth source selected.
/// Without a marker (or with an out-of-range N) the first source is
/// considered selected.
pub fn apply_source_selection(answer: &str, sources: &mut [RetrievedChunk]) -> String {
    let mut selected = 0usize;

    let cleaned = match selection_regex().captures(answer) {
        Some(caps) => {
            if let Some(n) = caps[1].parse::<usize>().ok().filter(|n| *n >= 1) {
                selected = n - 1;
            }
            selection_regex().replace_all(answer, "").trim().to_string()
        }
        None => answer.trim().to_string(),
    };

    if selected >= sources.len() {
        selected = 0;
    }
    if let Some(source) = sources.get_mut(selected) {
        source.selected = true;
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintel_core::chunk::ContentType;

    fn phrases() -> Vec<String> {
        lintel_config::AppConfig::default().agent.refusal_phrases
    }

    fn sources(n: usize) -> Vec<RetrievedChunk> {
        (0..n)
            .map(|i| RetrievedChunk {
                document: format!("doc{i}.pdf"),
                page: 1,
                paragraph: None,
                title: None,
                content: "text".into(),
                content_type: ContentType::Text,
                score: 0.8,
                selected: false,
            })
            .collect()
    }

    #[test]
    fn canonical_phrases_trigger_in_any_casing() {
        assert!(is_refusal("I CANNOT ANSWER this.", &phrases()));
        assert!(is_refusal(
            "The provided context doesn't contain that information.",
            &phrases()
        ));
        assert!(is_refusal("There is insufficient information here.", &phrases()));
    }

    #[test]
    fn near_synonyms_do_not_trigger() {
        assert!(!is_refusal("I am unable to help with that.", &phrases()));
        assert!(!is_refusal("I don't know the answer.", &phrases()));
        assert!(!is_refusal("No idea.", &phrases()));
    }

    #[test]
    fn substantive_answer_does_not_trigger() {
        assert!(!is_refusal(
            "The maximum extension depth is 6 m for detached houses.",
            &phrases()
        ));
    }

    #[test]
    fn selection_marker_is_parsed_and_stripped() {
        let mut srcs = sources(3);
        let answer = apply_source_selection("[Using Context 2] The limit is 6 m.", &mut srcs);
        assert_eq!(answer, "The limit is 6 m.");
        assert!(!srcs[0].selected);
        assert!(srcs[1].selected);
    }

    #[test]
    fn missing_marker_selects_first_source() {
        let mut srcs = sources(2);
        let answer = apply_source_selection("The limit is 6 m.", &mut srcs);
        assert_eq!(answer, "The limit is 6 m.");
        assert!(srcs[0].selected);
    }

    #[test]
    fn out_of_range_marker_falls_back_to_first() {
        let mut srcs = sources(2);
        apply_source_selection("[Using Context 9] Answer.", &mut srcs);
        assert!(srcs[0].selected);
    }

    #[test]
    fn no_sources_is_harmless() {
        let mut srcs = sources(0);
        let answer = apply_source_selection("[Using Context 1] Answer.", &mut srcs);
        assert_eq!(answer, "Answer.");
    }
}
