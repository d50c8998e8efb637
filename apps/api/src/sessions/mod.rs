//! Screening sessions — the per-user working set between requests.
//!
//! A session holds the job description, the extracted résumé text, the generation
//! parameters and the latest report per task. Sessions live in memory only and expire
//! after a period of inactivity.
//!
//! The store lock is never held across an `.await`: task runs take a snapshot,
//! release the lock, generate, then record the report.

pub mod handlers;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::info;
use uuid::Uuid;

use crate::config::GenerationSettings;
use crate::errors::AppError;
use crate::resume::{ResumeIntake, ResumeText};
use crate::screening::analyzer::{GenerationParams, ParamOverrides, TaskReport};
use crate::screening::tasks::Task;

struct ScreeningSession {
    job_description: String,
    resume_text: ResumeText,
    extraction_error: Option<String>,
    params: GenerationParams,
    reports: BTreeMap<Task, TaskReport>,
    created_at: DateTime<Utc>,
    /// Bumped whenever the job description or résumé changes.
    revision: u64,
    last_active: Instant,
    cancel: Arc<Notify>,
}

impl ScreeningSession {
    fn inputs_changed(&mut self) {
        self.revision += 1;
        self.reports.clear();
    }

    fn view(&self, id: Uuid) -> SessionView {
        SessionView {
            id,
            job_description: self.job_description.clone(),
            resume_chars: self.resume_text.char_count(),
            extraction_error: self.extraction_error.clone(),
            ready: !self.job_description.trim().is_empty() && !self.resume_text.is_empty(),
            params: self.params.clone(),
            reports: self.reports.values().cloned().collect(),
            created_at: self.created_at,
        }
    }
}

/// What clients see of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub job_description: String,
    pub resume_chars: usize,
    /// Set when the uploaded document could not be read; résumé text is then empty.
    pub extraction_error: Option<String>,
    /// True when both inputs are present and tasks can be dispatched.
    pub ready: bool,
    pub params: GenerationParams,
    pub reports: Vec<TaskReport>,
    pub created_at: DateTime<Utc>,
}

/// Inputs captured for one task run.
pub struct TaskInputs {
    pub job_description: String,
    pub resume_text: ResumeText,
    pub params: GenerationParams,
    pub revision: u64,
    pub cancel: Arc<Notify>,
}

/// Changes applied through `SessionStore::update`.
#[derive(Debug, Default)]
pub struct SessionUpdate {
    pub job_description: Option<String>,
    pub resume: Option<ResumeIntake>,
    pub overrides: ParamOverrides,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, ScreeningSession>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Creates a session and sweeps any that have been idle longer than the TTL.
    pub fn create(
        &self,
        job_description: String,
        resume: ResumeIntake,
        params: GenerationParams,
    ) -> SessionView {
        let id = Uuid::new_v4();
        let session = ScreeningSession {
            job_description,
            resume_text: resume.text,
            extraction_error: resume.error,
            params,
            reports: BTreeMap::new(),
            created_at: Utc::now(),
            revision: 0,
            last_active: Instant::now(),
            cancel: Arc::new(Notify::new()),
        };
        let view = session.view(id);

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, s| s.last_active.elapsed() < ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            info!("Expired {expired} idle sessions");
        }
        sessions.insert(id, session);
        info!("Session {id} created ({} active)", sessions.len());

        view
    }

    pub fn get(&self, id: Uuid) -> Result<SessionView, AppError> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.last_active = Instant::now();
        Ok(session.view(id))
    }

    /// Applies input and parameter changes. New inputs clear stored reports.
    ///
    /// Overrides are validated and applied under one write lock. An invalid update
    /// changes nothing.
    pub fn update(
        &self,
        id: Uuid,
        update: SessionUpdate,
        settings: &GenerationSettings,
    ) -> Result<SessionView, AppError> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        let params = session.params.with_overrides(&update.overrides, settings)?;
        session.last_active = Instant::now();
        session.params = params;

        let mut inputs_changed = false;
        if let Some(jd) = update.job_description {
            if jd != session.job_description {
                session.job_description = jd;
                inputs_changed = true;
            }
        }
        if let Some(resume) = update.resume {
            session.resume_text = resume.text;
            session.extraction_error = resume.error;
            inputs_changed = true;
        }
        if inputs_changed {
            session.inputs_changed();
        }

        Ok(session.view(id))
    }

    pub fn task_inputs(&self, id: Uuid) -> Result<TaskInputs, AppError> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.last_active = Instant::now();
        Ok(TaskInputs {
            job_description: session.job_description.clone(),
            resume_text: session.resume_text.clone(),
            params: session.params.clone(),
            revision: session.revision,
            cancel: session.cancel.clone(),
        })
    }

    /// Stores `report` in its task slot, leaving other tasks untouched.
    /// Returns false when the session is gone or its inputs changed mid-run.
    pub fn record_report(&self, id: Uuid, revision: u64, report: TaskReport) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&id) {
            Some(session) if session.revision == revision => {
                session.reports.insert(report.task, report);
                true
            }
            _ => false,
        }
    }

    /// Aborts any generation currently running for the session.
    pub fn cancel(&self, id: Uuid) -> Result<(), AppError> {
        let sessions = self.sessions.read();
        let session = sessions.get(&id).ok_or_else(|| not_found(id))?;
        session.cancel.notify_waiters();
        Ok(())
    }

    /// Clears the session entirely, cancelling in-flight work first.
    pub fn remove(&self, id: Uuid) -> Result<(), AppError> {
        let session = self.sessions.write().remove(&id).ok_or_else(|| not_found(id))?;
        session.cancel.notify_waiters();
        info!("Session {id} cleared");
        Ok(())
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::match_score::extract_match_score;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(3600))
    }

    fn settings() -> GenerationSettings {
        GenerationSettings::default()
    }

    fn params() -> GenerationParams {
        GenerationParams::defaults(&settings())
    }

    fn intake(text: &str) -> ResumeIntake {
        ResumeIntake::from_text(text)
    }

    fn report(task: Task, output: &str) -> TaskReport {
        TaskReport {
            task,
            title: task.title(),
            output: output.to_string(),
            match_score: extract_match_score(output),
            model: "llama3-8b-8192".to_string(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_reports_readiness() {
        let store = store();
        let ready = store.create("Rust engineer".into(), intake("Rust, 5 years"), params());
        assert!(ready.ready);
        assert_eq!(ready.resume_chars, "Rust, 5 years".chars().count());

        let no_jd = store.create("  ".into(), intake("Rust, 5 years"), params());
        assert!(!no_jd.ready);

        let unreadable = store.create(
            "Rust engineer".into(),
            ResumeIntake::failed("Failed to read PDF: invalid header".into()),
            params(),
        );
        assert!(!unreadable.ready);
        assert_eq!(unreadable.resume_chars, 0);
        assert!(unreadable.extraction_error.unwrap().contains("invalid header"));
    }

    #[test]
    fn test_unknown_session_is_not_found() {
        let store = store();
        let id = Uuid::new_v4();
        assert!(matches!(store.get(id), Err(AppError::NotFound(_))));
        assert!(matches!(store.task_inputs(id), Err(AppError::NotFound(_))));
        assert!(matches!(store.remove(id), Err(AppError::NotFound(_))));
        assert!(!store.record_report(id, 0, report(Task::Evaluation, "x")));
    }

    #[test]
    fn test_reports_are_kept_per_task() {
        let store = store();
        let id = store.create("jd".into(), intake("resume"), params()).id;
        let revision = store.task_inputs(id).unwrap().revision;

        assert!(store.record_report(id, revision, report(Task::Evaluation, "eval")));
        assert!(store.record_report(id, revision, report(Task::MatchPercentage, "Match: 70%")));
        assert!(store.record_report(id, revision, report(Task::Evaluation, "eval v2")));

        let view = store.get(id).unwrap();
        assert_eq!(view.reports.len(), 2);
        assert_eq!(view.reports[0].task, Task::Evaluation);
        assert_eq!(view.reports[0].output, "eval v2");
        assert_eq!(view.reports[1].match_score.map(|s| s.value()), Some(70));
    }

    #[test]
    fn test_new_job_description_clears_reports_and_stale_runs() {
        let store = store();
        let id = store.create("jd".into(), intake("resume"), params()).id;
        let revision = store.task_inputs(id).unwrap().revision;
        store.record_report(id, revision, report(Task::Evaluation, "eval"));

        let view = store
            .update(
                id,
                SessionUpdate {
                    job_description: Some("different jd".into()),
                    ..Default::default()
                },
                &settings(),
            )
            .unwrap();
        assert!(view.reports.is_empty());
        assert!(!store.record_report(id, revision, report(Task::Evaluation, "stale")));
    }

    #[test]
    fn test_param_change_keeps_reports() {
        let store = store();
        let id = store.create("jd".into(), intake("resume"), params()).id;
        let revision = store.task_inputs(id).unwrap().revision;
        store.record_report(id, revision, report(Task::Evaluation, "eval"));

        let view = store
            .update(
                id,
                SessionUpdate {
                    overrides: ParamOverrides {
                        temperature: Some(0.2),
                        ..Default::default()
                    },
                    ..Default::default()
                },
                &settings(),
            )
            .unwrap();
        assert_eq!(view.reports.len(), 1);
        assert_eq!(view.params.temperature, 0.2);
        assert_eq!(view.params.model, params().model);
        assert_eq!(store.get(id).unwrap().params, view.params);
    }

    #[test]
    fn test_invalid_overrides_leave_session_untouched() {
        let store = store();
        let id = store.create("jd".into(), intake("resume"), params()).id;

        let result = store.update(
            id,
            SessionUpdate {
                job_description: Some("new jd".into()),
                overrides: ParamOverrides {
                    model: Some("gpt-4o".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
            &settings(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));

        let view = store.get(id).unwrap();
        assert_eq!(view.job_description, "jd");
        assert_eq!(view.params, params());
    }

    #[test]
    fn test_concurrent_param_updates_keep_both_fields() {
        for _ in 0..50 {
            let store = store();
            let id = store.create("jd".into(), intake("resume"), params()).id;

            let model_update = {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.update(
                        id,
                        SessionUpdate {
                            overrides: ParamOverrides {
                                model: Some("llama3-70b-8192".into()),
                                ..Default::default()
                            },
                            ..Default::default()
                        },
                        &settings(),
                    )
                })
            };
            let temperature_update = {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.update(
                        id,
                        SessionUpdate {
                            overrides: ParamOverrides {
                                temperature: Some(1.2),
                                ..Default::default()
                            },
                            ..Default::default()
                        },
                        &settings(),
                    )
                })
            };
            model_update.join().unwrap().unwrap();
            temperature_update.join().unwrap().unwrap();

            let view = store.get(id).unwrap();
            assert_eq!(view.params.model, "llama3-70b-8192");
            assert_eq!(view.params.temperature, 1.2);
        }
    }

    #[test]
    fn test_replacing_resume_updates_text_and_clears_error() {
        let store = store();
        let id = store
            .create(
                "jd".into(),
                ResumeIntake::failed("Failed to read PDF: bad xref".into()),
                params(),
            )
            .id;

        let view = store
            .update(
                id,
                SessionUpdate {
                    resume: Some(intake("Go, Kafka")),
                    ..Default::default()
                },
                &settings(),
            )
            .unwrap();
        assert!(view.ready);
        assert!(view.extraction_error.is_none());
    }

    #[test]
    fn test_idle_sessions_expire_on_create() {
        let store = SessionStore::new(Duration::ZERO);
        let old = store.create("jd".into(), intake("resume"), params()).id;
        let _new = store.create("jd".into(), intake("resume"), params());
        assert!(matches!(store.get(old), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_wakes_in_flight_waiters() {
        let store = store();
        let id = store.create("jd".into(), intake("resume"), params()).id;
        let cancel = store.task_inputs(id).unwrap().cancel;

        let notified = cancel.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        store.remove(id).unwrap();
        tokio::time::timeout(Duration::from_secs(1), notified)
            .await
            .expect("removal should notify waiters");
        assert!(matches!(store.get(id), Err(AppError::NotFound(_))));
    }
}
