// Scoring: score fusion, result shapes, and the per-request pipeline.
// The pipeline is the only caller of the skill, similarity and extraction stages.

pub mod fusion;
pub mod pipeline;
pub mod result;
