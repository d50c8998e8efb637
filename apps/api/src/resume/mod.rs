// Résumé intake: document format checks and text extraction.

pub mod extractor;

use bytes::Bytes;
use tokio::task::JoinError;
use tracing::warn;

use crate::errors::AppError;
pub use extractor::{ExtractionError, ResumeText};

/// Outcome of reading an uploaded résumé.
/// An unreadable document yields empty text plus the reason, never a hard failure.
#[derive(Debug, Default)]
pub struct ResumeIntake {
    pub text: ResumeText,
    pub error: Option<String>,
}

impl ResumeIntake {
    pub fn from_extraction(result: Result<ResumeText, ExtractionError>) -> Self {
        match result {
            Ok(text) => Self { text, error: None },
            Err(e) => Self::failed(e.to_string()),
        }
    }

    pub fn failed(reason: String) -> Self {
        Self {
            text: ResumeText::default(),
            error: Some(reason),
        }
    }

    #[cfg(test)]
    pub fn from_text(text: &str) -> Self {
        Self::from_extraction(Ok(ResumeText::from_pages([Ok::<_, String>(
            text.to_string(),
        )])))
    }
}

/// Validates the upload format and extracts text on the blocking pool.
///
/// Non-PDF uploads are rejected outright; a PDF that cannot be parsed is reported
/// through `ResumeIntake::error`.
pub async fn read_upload(bytes: Bytes) -> Result<ResumeIntake, AppError> {
    if !extractor::looks_like_pdf(&bytes) {
        return Err(AppError::Validation(
            "Only PDF resumes are supported".to_string(),
        ));
    }

    let joined = tokio::task::spawn_blocking(move || extractor::extract_resume_text(&bytes)).await;
    Ok(intake_from_blocking(joined))
}

/// A panicking extraction task counts as an unreadable document.
fn intake_from_blocking(
    joined: Result<Result<ResumeText, ExtractionError>, JoinError>,
) -> ResumeIntake {
    match joined {
        Ok(result) => {
            if let Err(e) = &result {
                warn!("Resume extraction failed: {e}");
            }
            ResumeIntake::from_extraction(result)
        }
        Err(e) => {
            warn!("Resume extraction task aborted: {e}");
            ResumeIntake::failed(format!("Failed to read PDF: {e}"))
        }
    }
}
