//! POST /api/score: multipart résumé/JD upload, scored by the pipeline.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    Json,
};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::scoring::pipeline::ScoreRequest;
use crate::scoring::result::AtsResult;
use crate::state::AppState;

/// POST /api/score
///
/// Form fields: `resume` (file, required), `job_description` (text) and
/// `jd_pdf` (file). `jd_pdf` wins when both JD fields are sent.
pub async fn handle_score(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AtsResult>, AppError> {
    let request_id = Uuid::new_v4();

    async move {
        let mut multipart = multipart.map_err(|e| AppError::Upload {
            status: e.status(),
            message: format!("Invalid form upload: {}", e.body_text()),
        })?;
        let request = read_score_form(&mut multipart).await?;
        let result = state.pipeline.score(request).await?;
        Ok(Json(result))
    }
    .instrument(info_span!("score_request", %request_id))
    .await
}

async fn read_score_form(multipart: &mut Multipart) -> Result<ScoreRequest, AppError> {
    let mut request = ScoreRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => request.resume = Some(field.bytes().await.map_err(form_error)?),
            "jd_pdf" => request.jd_pdf = Some(field.bytes().await.map_err(form_error)?),
            "job_description" => {
                request.job_description = Some(field.text().await.map_err(form_error)?)
            }
            other => debug!("Ignoring unknown form field '{other}'"),
        }
    }

    Ok(request)
}

/// Keeps the reader's status: 413 when the body limit is hit, 400 otherwise.
fn form_error(e: MultipartError) -> AppError {
    AppError::Upload {
        status: e.status(),
        message: format!("Invalid form upload: {}", e.body_text()),
    }
}
