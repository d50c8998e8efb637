//! Task Runner — precondition check → compose → generate → interpret.
//!
//! Each invocation builds a fresh `GenerationRequest`; nothing is cached or reused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{GenerationSettings, MAX_TOKENS_RANGE, TEMPERATURE_RANGE};
use crate::errors::AppError;
use crate::llm_client::{GenerationRequest, GenerationResult, TextGenerator};
use crate::screening::match_score::{extract_match_score, MatchScore};
use crate::screening::tasks::{compose, Task};

/// Validated generation parameters for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Client-supplied parameter changes; `None` keeps the current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamOverrides {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerationParams {
    pub fn defaults(settings: &GenerationSettings) -> Self {
        Self {
            model: settings.default_model().to_string(),
            max_tokens: settings.default_max_tokens,
            temperature: settings.default_temperature,
        }
    }

    /// Applies overrides, rejecting values outside the allow-list or bounds.
    pub fn with_overrides(
        &self,
        overrides: &ParamOverrides,
        settings: &GenerationSettings,
    ) -> Result<Self, AppError> {
        let model = overrides.model.clone().unwrap_or_else(|| self.model.clone());
        if !settings.allows_model(&model) {
            return Err(AppError::Validation(format!(
                "Model '{model}' is not available. Choose one of: {}",
                settings.models.join(", ")
            )));
        }

        let max_tokens = overrides.max_tokens.unwrap_or(self.max_tokens);
        if !MAX_TOKENS_RANGE.contains(&max_tokens) {
            return Err(AppError::Validation(format!(
                "max_tokens must be between {} and {}",
                MAX_TOKENS_RANGE.start(),
                MAX_TOKENS_RANGE.end()
            )));
        }

        let temperature = overrides.temperature.unwrap_or(self.temperature);
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(AppError::Validation(format!(
                "temperature must be between {} and {}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }

        Ok(Self {
            model,
            max_tokens,
            temperature,
        })
    }
}

/// Result of one successful task run, as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: Task,
    pub title: &'static str,
    /// Generated text, verbatim.
    pub output: String,
    /// Present only for `match_percentage` output that carries a `Match: N%` line.
    pub match_score: Option<MatchScore>,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

/// Runs a single screening task.
///
/// Refuses to dispatch when either input is empty. A provider failure becomes
/// `AppError::Generation` for this task only.
pub async fn run_task(
    generator: &dyn TextGenerator,
    task: Task,
    jd: &str,
    resume: &str,
    params: &GenerationParams,
) -> Result<TaskReport, AppError> {
    if jd.trim().is_empty() {
        return Err(AppError::Validation(
            "A job description is required before running an analysis".to_string(),
        ));
    }
    if resume.trim().is_empty() {
        return Err(AppError::Validation(
            "Resume text is unavailable. Upload a readable PDF resume first".to_string(),
        ));
    }

    let request = GenerationRequest {
        prompt: compose(task, jd, resume),
        model: params.model.clone(),
        max_tokens: params.max_tokens,
        temperature: params.temperature,
    };

    info!(
        "Dispatching {:?} (model={}, prompt_chars={})",
        task,
        request.model,
        request.prompt.len()
    );

    let text = match generator.generate(&request).await {
        GenerationResult::Success { text } => text,
        GenerationResult::Failure { reason } => return Err(AppError::Generation(reason)),
    };

    let match_score = if task.yields_match_score() {
        extract_match_score(&text)
    } else {
        None
    };
    if let Some(score) = match_score {
        info!("{:?} scored {}%", task, score.value());
    }

    Ok(TaskReport {
        task,
        title: task.title(),
        output: text,
        match_score,
        model: request.model,
        generated_at: Utc::now(),
    })
}
