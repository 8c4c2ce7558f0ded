// Skill extraction prompt templates.
// Placeholders are filled in a single pass over the template; inserted text is never rescanned.

pub const SKILL_EXTRACTION_PROMPT: &str = r#"You are an expert technical recruiter. Compare the resume and the job description below.

RESUME:
{resume_text}

JOB DESCRIPTION:
{jd_text}

Return a single JSON object with exactly these keys:
{
  "Matching_Skills": ["skills required by the job that the resume demonstrates"],
  "Missing_Skills": ["skills required by the job that the resume lacks"],
  "Unique_Strengths": ["notable resume skills the job does not ask for"]
}

Each value is a list of short lowercase skill names. Return ONLY the JSON object."#;

pub fn build_skill_prompt(resume_text: &str, jd_text: &str) -> String {
    fill_template(
        SKILL_EXTRACTION_PROMPT,
        &[("{resume_text}", resume_text), ("{jd_text}", jd_text)],
    )
}

/// Replaces each placeholder with its value, scanning the template only.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let next = values
            .iter()
            .filter_map(|(key, value)| rest.find(*key).map(|at| (at, *key, *value)))
            .min_by_key(|(at, _, _)| *at);

        match next {
            Some((at, key, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + key.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_skill_prompt_embeds_both_texts() {
        let prompt = build_skill_prompt("I know Rust", "We need Go");
        assert!(prompt.contains("RESUME:\nI know Rust"));
        assert!(prompt.contains("JOB DESCRIPTION:\nWe need Go"));
        assert!(!prompt.contains("{resume_text}"));
        assert!(!prompt.contains("{jd_text}"));
    }

    #[test]
    fn test_placeholder_text_inside_inputs_is_not_substituted() {
        let prompt = build_skill_prompt("Template uses {jd_text} tokens", "SECRET JD");
        assert!(prompt.contains("RESUME:\nTemplate uses {jd_text} tokens"));
        assert_eq!(prompt.matches("SECRET JD").count(), 1);

        let prompt = build_skill_prompt("RESUME-BODY", "mentions {resume_text}");
        assert!(prompt.contains("JOB DESCRIPTION:\nmentions {resume_text}"));
        assert_eq!(prompt.matches("RESUME-BODY").count(), 1);
    }

    #[test]
    fn test_prompt_names_all_three_keys() {
        for key in ["Matching_Skills", "Missing_Skills", "Unique_Strengths"] {
            assert!(SKILL_EXTRACTION_PROMPT.contains(key), "missing {key}");
        }
    }
}
