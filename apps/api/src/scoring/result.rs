use serde::Serialize;

use crate::skills::model::ExtractedSkills;

/// Response body of `POST /api/score`. The shape depends on the scoring variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AtsResult {
    Keyword(KeywordResult),
    Model(ModelResult),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordResult {
    #[serde(rename = "ATS_Score")]
    pub ats_score: i64,
    /// JD skills found in the résumé.
    #[serde(rename = "Strengths")]
    pub strengths: Vec<String>,
    /// JD skills missing from the résumé.
    #[serde(rename = "Gaps")]
    pub gaps: Vec<String>,
    #[serde(rename = "Recommendation")]
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResult {
    #[serde(rename = "ATS_Score")]
    pub ats_score: f64,
    #[serde(rename = "Recommendation")]
    pub recommendation: String,
    #[serde(rename = "Extracted_Skills")]
    pub extracted_skills: ExtractedSkills,
    /// Identifier of the generation model selected by the fallback chain.
    #[serde(rename = "Model_Used")]
    pub model_used: String,
}
