//! Pipeline Orchestrator: one scoring request, start to finish.
//!
//! Flow: validate inputs → extract résumé and JD text (concurrently) →
//!       extract skills → similarity → fuse → result.
//!
//! Errors on primary input (missing JD, unreadable document, embedding
//! failure) abort the request. Skill extraction by the model never does: it
//! degrades `Extracted_Skills` instead.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info};

use crate::config::ScoringVariant;
use crate::embeddings::SimilarityScorer;
use crate::errors::AppError;
use crate::extraction::{Document, DocumentRole, TextExtractor};
use crate::llm_client::ModelHandle;
use crate::scoring::fusion::FusionPolicy;
use crate::scoring::result::{AtsResult, KeywordResult, ModelResult};
use crate::skills::keywords::{extract_keywords, skill_overlap};
use crate::skills::model::extract_via_model;

pub const MISSING_RESUME: &str = "Resume file missing.";
pub const MISSING_JD: &str = "JD missing.";

/// Per-request progress, logged as the pipeline advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    TextsExtracted,
    SkillsExtracted,
    SimilarityComputed,
    Fused,
    Responded,
}

/// Raw request inputs, before validation.
#[derive(Debug, Default)]
pub struct ScoreRequest {
    pub resume: Option<Bytes>,
    pub job_description: Option<String>,
    pub jd_pdf: Option<Bytes>,
}

/// Where the JD text comes from. A JD document wins over pasted text.
#[derive(Debug)]
pub enum JdSource {
    Document(Document),
    Text(String),
}

impl ScoreRequest {
    /// Checks that a résumé and exactly one effective JD source are present.
    /// Empty uploads and blank text count as absent.
    pub fn validate(self) -> Result<(Document, JdSource), AppError> {
        let resume = self
            .resume
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Validation(MISSING_RESUME.to_string()))?;

        let jd = match (self.jd_pdf.filter(|b| !b.is_empty()), self.job_description) {
            (Some(pdf), _) => JdSource::Document(Document::new(DocumentRole::JobDescription, pdf)),
            (None, Some(text)) if !text.trim().is_empty() => JdSource::Text(text),
            _ => return Err(AppError::Validation(MISSING_JD.to_string())),
        };

        Ok((Document::new(DocumentRole::Resume, resume), jd))
    }
}

/// How skills are extracted; also fixes the fusion policy.
#[derive(Clone)]
pub enum SkillStrategy {
    Keyword,
    Model(Arc<ModelHandle>),
}

#[derive(Clone)]
pub struct ScoringPipeline {
    extractor: TextExtractor,
    similarity: SimilarityScorer,
    strategy: SkillStrategy,
    fusion: FusionPolicy,
}

impl ScoringPipeline {
    pub fn new(extractor: TextExtractor, similarity: SimilarityScorer, strategy: SkillStrategy) -> Self {
        let fusion = FusionPolicy::for_variant(match strategy {
            SkillStrategy::Keyword => ScoringVariant::Keyword,
            SkillStrategy::Model(_) => ScoringVariant::Model,
        });
        Self {
            extractor,
            similarity,
            strategy,
            fusion,
        }
    }

    pub async fn score(&self, request: ScoreRequest) -> Result<AtsResult, AppError> {
        let mut stage = PipelineStage::Received;
        let outcome = self.run(request, &mut stage).await;

        match &outcome {
            Ok(_) => advance(&mut stage, PipelineStage::Responded),
            Err(AppError::Validation(_)) => {}
            Err(e) => error!(last_stage = ?stage, "Scoring failed: {e}"),
        }
        outcome
    }

    async fn run(
        &self,
        request: ScoreRequest,
        stage: &mut PipelineStage,
    ) -> Result<AtsResult, AppError> {
        let (resume, jd) = request.validate()?;

        let (resume_text, jd_text) =
            tokio::try_join!(self.extractor.extract(resume), self.jd_text(jd))?;
        advance(stage, PipelineStage::TextsExtracted);

        match &self.strategy {
            SkillStrategy::Keyword => self.score_keywords(&resume_text, &jd_text, stage).await,
            SkillStrategy::Model(handle) => {
                self.score_with_model(handle, &resume_text, &jd_text, stage)
                    .await
            }
        }
    }

    async fn jd_text(&self, jd: JdSource) -> Result<String, AppError> {
        match jd {
            JdSource::Document(document) => self.extractor.extract(document).await,
            JdSource::Text(text) => Ok(text),
        }
    }

    async fn score_keywords(
        &self,
        resume_text: &str,
        jd_text: &str,
        stage: &mut PipelineStage,
    ) -> Result<AtsResult, AppError> {
        let resume_skills = extract_keywords(resume_text);
        let jd_skills = extract_keywords(jd_text);
        advance(stage, PipelineStage::SkillsExtracted);

        let similarity = self.similarity.similarity(resume_text, jd_text).await?;
        advance(stage, PipelineStage::SimilarityComputed);

        let overlap = skill_overlap(&resume_skills, &jd_skills);
        let fused = self.fusion.fuse(similarity, overlap.ratio);
        advance(stage, PipelineStage::Fused);

        info!(
            score = fused.score,
            similarity,
            overlap = overlap.ratio,
            "Keyword scoring complete"
        );

        Ok(AtsResult::Keyword(KeywordResult {
            ats_score: fused.score as i64,
            strengths: overlap.matched.iter().map(|s| s.to_string()).collect(),
            gaps: overlap.missing.iter().map(|s| s.to_string()).collect(),
            recommendation: fused.recommendation.to_string(),
        }))
    }

    async fn score_with_model(
        &self,
        handle: &ModelHandle,
        resume_text: &str,
        jd_text: &str,
        stage: &mut PipelineStage,
    ) -> Result<AtsResult, AppError> {
        let resolved = handle
            .get_or_resolve()
            .await
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

        let (extracted_skills, similarity) = tokio::join!(
            extract_via_model(handle, resume_text, jd_text),
            self.similarity.similarity(resume_text, jd_text)
        );
        advance(stage, PipelineStage::SkillsExtracted);

        let similarity = similarity?;
        advance(stage, PipelineStage::SimilarityComputed);

        let fused = self.fusion.fuse(similarity, 0.0);
        advance(stage, PipelineStage::Fused);

        info!(
            score = fused.score,
            similarity,
            model = %resolved.model_id,
            "Model scoring complete"
        );

        Ok(AtsResult::Model(ModelResult {
            ats_score: fused.score,
            recommendation: fused.recommendation.to_string(),
            extracted_skills,
            model_used: resolved.model_id.clone(),
        }))
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    debug!(from = ?stage, to = ?next, "Pipeline stage");
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, HashingEmbedder};
    use crate::extraction::{FormFeedPageSource, PageSource};
    use crate::llm_client::testing::StaticBackend;
    use crate::llm_client::{LlmError, ModelResolver};
    use crate::skills::model::{ExtractedSkills, ModelSkills};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const RESUME: &str = "I know Python and SQL";
    const JD: &str = "Looking for Python and AWS skills";

    #[derive(Default)]
    struct CountingPages {
        calls: AtomicUsize,
    }

    impl PageSource for CountingPages {
        fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FormFeedPageSource.pages(bytes)
        }
    }

    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        fn model(&self) -> &str {
            "counting"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            HashingEmbedder.embed(texts).await
        }
    }

    fn scorer() -> SimilarityScorer {
        SimilarityScorer::new(Arc::new(HashingEmbedder), true)
    }

    fn keyword_pipeline() -> ScoringPipeline {
        ScoringPipeline::new(
            TextExtractor::new(Arc::new(FormFeedPageSource)),
            scorer(),
            SkillStrategy::Keyword,
        )
    }

    fn model_pipeline(backend: StaticBackend, chain: &[&str]) -> ScoringPipeline {
        let handle = ModelHandle::new(
            ModelResolver::new(
                Arc::new(backend),
                chain.iter().map(|m| m.to_string()).collect(),
            ),
            2,
            Duration::from_secs(5),
            128,
        );
        ScoringPipeline::new(
            TextExtractor::new(Arc::new(FormFeedPageSource)),
            scorer(),
            SkillStrategy::Model(Arc::new(handle)),
        )
    }

    fn request(resume: &'static str, jd_text: Option<&str>, jd_pdf: Option<&'static str>) -> ScoreRequest {
        ScoreRequest {
            resume: Some(Bytes::from_static(resume.as_bytes())),
            job_description: jd_text.map(String::from),
            jd_pdf: jd_pdf.map(|s| Bytes::from_static(s.as_bytes())),
        }
    }

    #[test]
    fn test_validate_missing_jd() {
        let err = request(RESUME, None, None).validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == MISSING_JD));
    }

    #[test]
    fn test_validate_blank_text_and_empty_pdf_are_absent() {
        let req = ScoreRequest {
            resume: Some(Bytes::from_static(b"cv")),
            job_description: Some("   ".to_string()),
            jd_pdf: Some(Bytes::new()),
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_missing_resume() {
        let req = ScoreRequest {
            job_description: Some(JD.to_string()),
            ..Default::default()
        };
        let err = req.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == MISSING_RESUME));
    }

    #[test]
    fn test_validate_pdf_takes_precedence_over_text() {
        let (_, jd) = request(RESUME, Some("pasted"), Some("uploaded"))
            .validate()
            .unwrap();
        assert!(matches!(jd, JdSource::Document(ref d) if d.bytes == "uploaded"));
    }

    #[tokio::test]
    async fn test_keyword_end_to_end() {
        let result = keyword_pipeline()
            .score(request(RESUME, Some(JD), None))
            .await
            .unwrap();

        let similarity = scorer().similarity(RESUME, JD).await.unwrap();
        let expected = FusionPolicy::Weighted.fuse(similarity, 0.5);

        match result {
            AtsResult::Keyword(r) => {
                assert_eq!(r.strengths, vec!["python"]);
                assert_eq!(r.gaps, vec!["aws"]);
                assert_eq!(r.ats_score, expected.score as i64);
                assert_eq!(r.recommendation, expected.recommendation);
            }
            other => panic!("expected keyword result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_jd_document_is_extracted() {
        let result = keyword_pipeline()
            .score(request(RESUME, Some("ignored docker text"), Some(JD)))
            .await
            .unwrap();
        match result {
            AtsResult::Keyword(r) => assert_eq!(r.gaps, vec!["aws"]),
            other => panic!("expected keyword result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_jd_fails_before_extraction() {
        let pages = Arc::new(CountingPages::default());
        let pipeline = ScoringPipeline::new(
            TextExtractor::new(pages.clone()),
            scorer(),
            SkillStrategy::Keyword,
        );

        let err = pipeline.score(request(RESUME, None, None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(pages.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resume_parse_failure_skips_similarity() {
        let embedder = Arc::new(CountingEmbedder::default());
        let pipeline = ScoringPipeline::new(
            TextExtractor::new(Arc::new(FormFeedPageSource)),
            SimilarityScorer::new(embedder.clone(), true),
            SkillStrategy::Keyword,
        );

        let req = ScoreRequest {
            resume: Some(Bytes::from_static(&[0xff, 0xfe])),
            job_description: Some(JD.to_string()),
            jd_pdf: None,
        };
        let err = pipeline.score(req).await.unwrap_err();
        assert!(matches!(err, AppError::DocumentParse(_)));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_variant_reports_fallback_model_on_every_result() {
        let answer = r#"Sure! {"Matching_Skills": ["python"], "Missing_Skills": ["aws"], "Unique_Strengths": ["sql"]}"#;
        let pipeline = model_pipeline(
            StaticBackend::new(&[("second", answer)]),
            &["first", "second", "third"],
        );

        for _ in 0..2 {
            let result = pipeline.score(request(RESUME, Some(JD), None)).await.unwrap();
            match result {
                AtsResult::Model(r) => {
                    assert_eq!(r.model_used, "second");
                    assert_eq!(
                        r.extracted_skills,
                        ExtractedSkills::Parsed(ModelSkills {
                            matching_skills: vec!["python".to_string()],
                            missing_skills: vec!["aws".to_string()],
                            unique_strengths: vec!["sql".to_string()],
                        })
                    );
                    let similarity = scorer().similarity(RESUME, JD).await.unwrap();
                    assert_eq!(r.ats_score, FusionPolicy::SimilarityOnly.fuse(similarity, 0.0).score);
                }
                other => panic!("expected model result, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_model_variant_degrades_on_unparseable_output() {
        let pipeline = model_pipeline(
            StaticBackend::new(&[("only", "I am unable to help with that.")]),
            &["only"],
        );

        let result = pipeline.score(request(RESUME, Some(JD), None)).await.unwrap();
        match result {
            AtsResult::Model(r) => {
                assert!(matches!(r.extracted_skills, ExtractedSkills::Failed { ref error } if !error.is_empty()));
                assert_eq!(r.model_used, "only");
            }
            other => panic!("expected model result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_model_variant_unresolvable_chain_is_internal_error() {
        let pipeline = model_pipeline(StaticBackend::new(&[]), &["a", "b"]);
        let err = pipeline.score(request(RESUME, Some(JD), None)).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(err.to_string().contains("a ("));
    }
}
