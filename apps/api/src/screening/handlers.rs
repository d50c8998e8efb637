//! Axum route handlers for the Screening API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{MAX_TOKENS_RANGE, TEMPERATURE_RANGE};
use crate::errors::AppError;
use crate::screening::analyzer::{run_task, TaskReport};
use crate::screening::tasks::Task;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
    pub default: T,
}

#[derive(Debug, Serialize)]
pub struct TaskInfo {
    pub task: Task,
    pub title: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    pub default_model: String,
    pub max_tokens: Bounds<u32>,
    pub temperature: Bounds<f32>,
    pub tasks: Vec<TaskInfo>,
}

/// GET /api/v1/models
///
/// The selectable models, parameter bounds and available tasks.
pub async fn handle_list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let settings = &state.config.generation;
    Json(ModelsResponse {
        models: settings.models.clone(),
        default_model: settings.default_model().to_string(),
        max_tokens: Bounds {
            min: *MAX_TOKENS_RANGE.start(),
            max: *MAX_TOKENS_RANGE.end(),
            default: settings.default_max_tokens,
        },
        temperature: Bounds {
            min: *TEMPERATURE_RANGE.start(),
            max: *TEMPERATURE_RANGE.end(),
            default: settings.default_temperature,
        },
        tasks: Task::ALL
            .iter()
            .map(|&task| TaskInfo {
                task,
                title: task.title(),
            })
            .collect(),
    })
}

/// POST /api/v1/sessions/:id/tasks/:task
///
/// Runs one analysis against the session's current inputs and stores the report.
/// A failure here leaves the session's other reports untouched.
pub async fn handle_run_task(
    State(state): State<AppState>,
    Path((id, task)): Path<(Uuid, Task)>,
) -> Result<Json<TaskReport>, AppError> {
    let inputs = state.sessions.task_inputs(id)?;

    let cancelled = inputs.cancel.notified();
    tokio::pin!(cancelled);
    cancelled.as_mut().enable();

    let run = run_task(
        state.generator.as_ref(),
        task,
        &inputs.job_description,
        inputs.resume_text.as_str(),
        &inputs.params,
    );

    let report = tokio::select! {
        result = run => result?,
        _ = &mut cancelled => {
            warn!("{task:?} cancelled for session {id}");
            return Err(AppError::Cancelled);
        }
    };

    if !state
        .sessions
        .record_report(id, inputs.revision, report.clone())
    {
        info!("Session {id} changed during {task:?}; report not stored");
    }

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::llm_client::{GenerationRequest, GenerationResult, TextGenerator};
    use crate::resume::ResumeIntake;
    use crate::routes::build_router;
    use crate::screening::analyzer::tests::{StubGenerator, JD, MATCH_OUTPUT, RESUME};
    use crate::screening::analyzer::GenerationParams;
    use crate::state::test_support::test_state;

    fn setup(generator: Arc<dyn TextGenerator>, jd: &str, resume: &str) -> (Router, AppState, Uuid) {
        let state = test_state(generator);
        let id = state
            .sessions
            .create(
                jd.to_string(),
                ResumeIntake::from_text(resume),
                GenerationParams::defaults(&state.config.generation),
            )
            .id;
        (build_router(state.clone()), state, id)
    }

    fn run_request(id: Uuid, task: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/sessions/{id}/tasks/{task}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_match_percentage_returns_score_and_verbatim_text() {
        let generator = Arc::new(StubGenerator::succeeding(MATCH_OUTPUT));
        let (app, state, id) = setup(generator.clone(), JD, RESUME);

        let response = app
            .oneshot(run_request(id, "match_percentage"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report = json_body(response).await;
        assert_eq!(report["task"], "match_percentage");
        assert_eq!(report["match_score"], 82);
        assert_eq!(report["output"], MATCH_OUTPUT);
        assert_eq!(generator.call_count(), 1);

        let view = state.sessions.get(id).unwrap();
        assert_eq!(view.reports.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_keywords_has_null_score() {
        let output = "Keywords look fine overall.";
        let (app, _, id) = setup(Arc::new(StubGenerator::succeeding(output)), JD, RESUME);

        let response = app
            .oneshot(run_request(id, "missing_keywords"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report = json_body(response).await;
        assert_eq!(report["output"], output);
        assert!(report["match_score"].is_null());
    }

    #[tokio::test]
    async fn test_empty_job_description_does_not_dispatch() {
        let generator = Arc::new(StubGenerator::succeeding(MATCH_OUTPUT));
        let (app, _, id) = setup(generator.clone(), "", RESUME);

        let response = app.oneshot(run_request(id, "evaluation")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_task_is_rejected() {
        let (app, _, id) = setup(Arc::new(StubGenerator::succeeding("x")), JD, RESUME);
        let response = app.oneshot(run_request(id, "summary")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (app, _, _) = setup(Arc::new(StubGenerator::succeeding("x")), JD, RESUME);
        let response = app
            .oneshot(run_request(Uuid::new_v4(), "evaluation"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    /// Succeeds for evaluation prompts, fails for everything else.
    struct EvaluationOnly;

    #[async_trait]
    impl TextGenerator for EvaluationOnly {
        async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
            if request.prompt.starts_with("You are an experienced Technical HR Manager") {
                GenerationResult::Success {
                    text: "Strong fit".to_string(),
                }
            } else {
                GenerationResult::Failure {
                    reason: "API error (status 429): Rate limit reached".to_string(),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_other_task_reports() {
        let (app, state, id) = setup(Arc::new(EvaluationOnly), JD, RESUME);

        let response = app
            .clone()
            .oneshot(run_request(id, "evaluation"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(run_request(id, "skill_improvement"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Rate limit reached"));

        let view = state.sessions.get(id).unwrap();
        assert_eq!(view.reports.len(), 1);
        assert_eq!(view.reports[0].task, Task::Evaluation);
        assert_eq!(view.reports[0].output, "Strong fit");
    }

    /// Never finishes; stands in for a slow provider.
    struct Hanging;

    #[async_trait]
    impl TextGenerator for Hanging {
        async fn generate(&self, _request: &GenerationRequest) -> GenerationResult {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_generation() {
        let (app, state, id) = setup(Arc::new(Hanging), JD, RESUME);

        let in_flight = tokio::spawn(app.clone().oneshot(run_request(id, "evaluation")));
        // Let the task run reach the generator before cancelling.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/sessions/{id}/cancel"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = tokio::time::timeout(Duration::from_secs(2), in_flight)
            .await
            .expect("cancel should end the run")
            .unwrap()
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(state.sessions.get(id).unwrap().reports.is_empty());
    }

    #[tokio::test]
    async fn test_list_models_exposes_bounds_and_tasks() {
        let (app, _, _) = setup(Arc::new(StubGenerator::succeeding("x")), JD, RESUME);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["default_model"], "llama3-8b-8192");
        assert_eq!(body["models"].as_array().unwrap().len(), 3);
        assert_eq!(body["max_tokens"]["min"], 64);
        assert_eq!(body["max_tokens"]["max"], 1024);
        assert_eq!(body["temperature"]["max"], 1.5);
        assert_eq!(body["tasks"].as_array().unwrap().len(), 4);
        assert_eq!(body["tasks"][3]["title"], "Match %");
    }
}
