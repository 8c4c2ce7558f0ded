//! Keyword skill extraction against a fixed vocabulary.
//!
//! Matching is substring containment on normalized text, not word-boundary
//! matching: "java" is found inside "javascript". Entries containing
//! punctuation ("c++", "node.js") never match because normalization strips
//! the punctuation from the text but not from the vocabulary.

/// Canonical skill vocabulary. Output lists follow this order.
pub const SKILL_VOCABULARY: &[&str] = &[
    "python",
    "java",
    "c++",
    "sql",
    "excel",
    "machine learning",
    "data analysis",
    "communication",
    "project management",
    "aws",
    "docker",
    "linux",
    "git",
    "react",
    "node.js",
    "nlp",
    "deep learning",
    "api",
    "flask",
    "fastapi",
];

/// Lowercases and strips every character outside `[a-z0-9\s]`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect()
}

/// Returns the vocabulary terms found in `text`, in vocabulary order.
pub fn extract_keywords(text: &str) -> Vec<&'static str> {
    let normalized = normalize(text);
    SKILL_VOCABULARY
        .iter()
        .copied()
        .filter(|skill| normalized.contains(skill))
        .collect()
}

/// Résumé skills compared against JD skills.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillOverlap {
    /// JD skills also present in the résumé.
    pub matched: Vec<&'static str>,
    /// JD skills absent from the résumé.
    pub missing: Vec<&'static str>,
    /// `|matched| / max(|jd_skills|, 1)`; 0 when the JD names no known skill.
    pub ratio: f64,
}

pub fn skill_overlap(resume_skills: &[&'static str], jd_skills: &[&'static str]) -> SkillOverlap {
    let (matched, missing): (Vec<&'static str>, Vec<&'static str>) = jd_skills
        .iter()
        .copied()
        .partition(|skill| resume_skills.contains(skill));

    let ratio = matched.len() as f64 / jd_skills.len().max(1) as f64;

    SkillOverlap {
        matched,
        missing,
        ratio,
    }
}
