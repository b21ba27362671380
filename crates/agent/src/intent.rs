//! Intent classification.
//!
//! A deterministic phrase-bag router over the lower-cased question.
//! First match wins: drawing-only, then compliance-with-adjustment,
//! then general RAG as the default.

/// The coarse intent of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Describe/analyze the drawing; routes to Tier 2 when a drawing
    /// is present, bypassing retrieval.
    DrawingOnly,
    /// Asks for a fixed/adjusted compliant design.
    ComplianceAdjust,
    /// Everything else.
    GeneralRag,
}

const DRAWING_ONLY_PHRASES: [&str; 7] = [
    "describe my drawing",
    "what is in my drawing",
    "my building drawing",
    "describe my building",
    "analyze my design",
    "what are the dimensions",
    "layers are in my drawing",
];

const COMPLIANCE_ADJUST_PHRASES: [&str; 6] = [
    "adjust",
    "fix",
    "make compliant",
    "provide compliant",
    "compliant json",
    "compliant design",
];

/// Classify a question. Same input always yields the same category.
pub fn classify(question: &str) -> Intent {
    let lower = question.to_lowercase();

    if DRAWING_ONLY_PHRASES.iter().any(|p| lower.contains(p)) {
        return Intent::DrawingOnly;
    }
    if COMPLIANCE_ADJUST_PHRASES.iter().any(|p| lower.contains(p)) {
        return Intent::ComplianceAdjust;
    }
    Intent::GeneralRag
}

/// Whether the question is compliance-flavored. Used to switch the
/// standard template into its synthesize-from-partial-information mode
/// when a drawing is present.
pub fn is_compliance_question(question: &str) -> bool {
    let lower = question.to_lowercase();
    ["compliant", "compliance", "comply", "violat", "allowed", "permitted", "limit"]
        .iter()
        .any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_only_phrases() {
        assert_eq!(classify("Describe my drawing"), Intent::DrawingOnly);
        assert_eq!(classify("What are the dimensions of the plot?"), Intent::DrawingOnly);
        assert_eq!(classify("Which layers are in my drawing?"), Intent::DrawingOnly);
    }

    #[test]
    fn compliance_adjust_phrases() {
        assert_eq!(
            classify("My extension is too deep. Provide an adjusted compliant JSON."),
            Intent::ComplianceAdjust
        );
        assert_eq!(classify("Please FIX my design"), Intent::ComplianceAdjust);
    }

    #[test]
    fn drawing_only_wins_over_compliance() {
        // Precedence: drawing-only is checked first.
        assert_eq!(
            classify("Describe my drawing and then fix it"),
            Intent::DrawingOnly
        );
    }

    #[test]
    fn default_is_general_rag() {
        assert_eq!(classify("What are the extension depth limits?"), Intent::GeneralRag);
        assert_eq!(classify("What is the weather today?"), Intent::GeneralRag);
    }

    #[test]
    fn classification_is_case_insensitive_and_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify("DESCRIBE MY DRAWING"), Intent::DrawingOnly);
        }
    }

    #[test]
    fn compliance_flavor_detection() {
        assert!(is_compliance_question("Is my extension compliant?"));
        assert!(is_compliance_question("What depth is allowed?"));
        assert!(!is_compliance_question("What is the weather today?"));
    }
}
