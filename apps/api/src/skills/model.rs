//! Model-delegated skill extraction.
//!
//! The model is asked for a JSON object, but its raw output is parsed
//! permissively: everything before the first `{` is treated as preamble and
//! discarded, and the rest must decode as the object. A `{` inside the preamble
//! or trailing prose after the object defeats the recovery; both degrade the
//! result instead of failing the request.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::ModelHandle;
use crate::skills::prompts::build_skill_prompt;

/// Skill categories produced by the model. Entries are kept as the model wrote them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSkills {
    #[serde(rename = "Matching_Skills", default)]
    pub matching_skills: Vec<String>,
    #[serde(rename = "Missing_Skills", default)]
    pub missing_skills: Vec<String>,
    #[serde(rename = "Unique_Strengths", default)]
    pub unique_strengths: Vec<String>,
}

/// `Extracted_Skills` payload: the parsed categories, or the reason they are missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractedSkills {
    Parsed(ModelSkills),
    Failed { error: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum SkillParseError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("model output is not valid skills JSON: {0}")]
    InvalidJson(String),
}

const SKILL_KEYS: [&str; 3] = ["Matching_Skills", "Missing_Skills", "Unique_Strengths"];

/// Decodes the model's raw output, starting at the first `{` and running to the end.
/// The object must carry at least one of the skill keys; absent ones default to empty.
pub fn parse_model_skills(raw: &str) -> Result<ModelSkills, SkillParseError> {
    let start = raw.find('{').ok_or(SkillParseError::NoJsonObject)?;
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw[start..])
            .map_err(|e| SkillParseError::InvalidJson(e.to_string()))?;

    if !SKILL_KEYS.iter().any(|key| object.contains_key(*key)) {
        return Err(SkillParseError::InvalidJson(format!(
            "expected at least one of {}",
            SKILL_KEYS.join(", ")
        )));
    }

    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| SkillParseError::InvalidJson(e.to_string()))
}

/// Asks the resolved model for skill categories. Never fails the request:
/// generation errors, timeouts and unparseable output all become `Failed`.
pub async fn extract_via_model(
    model: &ModelHandle,
    resume_text: &str,
    jd_text: &str,
) -> ExtractedSkills {
    let prompt = build_skill_prompt(resume_text, jd_text);

    let raw = match model.generate(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skill generation failed, degrading Extracted_Skills: {e}");
            return ExtractedSkills::Failed {
                error: e.to_string(),
            };
        }
    };

    match parse_model_skills(&raw) {
        Ok(skills) => {
            debug!(
                matching = skills.matching_skills.len(),
                missing = skills.missing_skills.len(),
                unique = skills.unique_strengths.len(),
                "Parsed model skills"
            );
            ExtractedSkills::Parsed(skills)
        }
        Err(e) => {
            warn!("Unparseable model output ({} chars): {e}", raw.len());
            ExtractedSkills::Failed {
                error: e.to_string(),
            }
        }
    }
}
