// Skill Extraction
// Two interchangeable strategies: a fixed keyword vocabulary, or delegation to
// the resolved generative model. The scoring variant decides which one runs.

pub mod keywords;
pub mod model;
pub mod prompts;
