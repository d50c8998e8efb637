//! Axum route handlers for the Sessions API.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::resume::{read_upload, ResumeIntake};
use crate::screening::analyzer::{GenerationParams, ParamOverrides};
use crate::sessions::{SessionUpdate, SessionView};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub job_description: Option<String>,
    #[serde(flatten)]
    pub overrides: ParamOverrides,
}

/// Fields accepted by the multipart endpoints.
#[derive(Debug, Default)]
struct SessionForm {
    job_description: Option<String>,
    resume: Option<Bytes>,
    overrides: ParamOverrides,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Multipart form: `job_description`, `resume` (PDF), and optional `model`,
/// `max_tokens`, `temperature`. An unreadable PDF still creates the session; the
/// reason is reported in `extraction_error` and `ready` stays false.
pub async fn handle_create_session(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let form = read_form(multipart).await?;

    let settings = &state.config.generation;
    let params = GenerationParams::defaults(settings).with_overrides(&form.overrides, settings)?;

    let resume = match form.resume {
        Some(bytes) => read_upload(bytes).await?,
        None => ResumeIntake::default(),
    };

    let view = state
        .sessions
        .create(form.job_description.unwrap_or_default(), resume, params);

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.get(id)?))
}

/// PATCH /api/v1/sessions/:id
///
/// Updates the job description and/or generation parameters.
/// A changed job description clears previous reports.
pub async fn handle_update_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSessionRequest>,
) -> Result<Json<SessionView>, AppError> {
    let view = state.sessions.update(
        id,
        SessionUpdate {
            job_description: request.job_description,
            resume: None,
            overrides: request.overrides,
        },
        &state.config.generation,
    )?;

    Ok(Json(view))
}

/// PUT /api/v1/sessions/:id/resume
///
/// Replaces the résumé document and re-extracts its text.
pub async fn handle_replace_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    // Fail fast before reading the upload
    state.sessions.get(id)?;

    let bytes = read_form(multipart)
        .await?
        .resume
        .ok_or_else(|| AppError::Validation("A 'resume' file field is required".to_string()))?;
    let resume = read_upload(bytes).await?;

    let view = state.sessions.update(
        id,
        SessionUpdate {
            resume: Some(resume),
            ..Default::default()
        },
        &state.config.generation,
    )?;

    Ok(Json(view))
}

/// DELETE /api/v1/sessions/:id
///
/// Clears all inputs and reports. Any in-flight generation is cancelled.
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.cancel(id)?;
    Ok(StatusCode::ACCEPTED)
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart parsing
// ────────────────────────────────────────────────────────────────────────────

async fn read_form(mut multipart: Multipart) -> Result<SessionForm, AppError> {
    let mut form = SessionForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_description" => {
                form.job_description = Some(field.text().await.map_err(invalid_multipart)?);
            }
            "resume" => {
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                // Browsers send an empty part when no file is chosen
                if !bytes.is_empty() {
                    form.resume = Some(bytes);
                }
            }
            "model" => {
                let model = field.text().await.map_err(invalid_multipart)?;
                form.overrides.model = Some(model.trim().to_string());
            }
            "max_tokens" => {
                let raw = field.text().await.map_err(invalid_multipart)?;
                form.overrides.max_tokens = Some(parse_field(&raw, "max_tokens")?);
            }
            "temperature" => {
                let raw = field.text().await.map_err(invalid_multipart)?;
                form.overrides.temperature = Some(parse_field(&raw, "temperature")?);
            }
            other => debug!("Ignoring multipart field '{other}'"),
        }
    }

    Ok(form)
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("{name} must be a number, got '{raw}'")))
}

fn invalid_multipart(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
}
