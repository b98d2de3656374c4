//! Error taxonomy for a lesson run.
//!
//! Every failure that aborts a run is a [`LessonError`]. The variant decides
//! the process exit status so the scheduler can tell an unreachable upstream
//! from a model that answered garbage. A missing illustration is not an error
//! at all; the image fetcher degrades to `None` and logs a warning.

use thiserror::Error;

/// Errors that abort a lesson run.
#[derive(Debug, Error)]
pub enum LessonError {
    /// A news feed, the language model or another upstream could not be reached.
    #[error("{what} unavailable: {reason}")]
    ExternalDependency { what: String, reason: String },

    /// The model answered, but not with a usable lesson.
    #[error("content validation failed: {0}")]
    ContentValidation(String),

    /// Missing or unreadable configuration, templates or credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// The PDF document could not be assembled.
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    /// The manifest could not be read or rewritten.
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LessonError {
    pub fn external(what: impl Into<String>, reason: impl ToString) -> Self {
        LessonError::ExternalDependency {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status reported to the scheduler.
    pub fn exit_code(&self) -> u8 {
        match self {
            LessonError::ExternalDependency { .. } => 2,
            LessonError::ContentValidation(_) => 3,
            LessonError::Config(_) => 4,
            LessonError::Pdf(_) | LessonError::Manifest(_) | LessonError::Io(_) => 1,
        }
    }
}

impl From<lopdf::Error> for LessonError {
    fn from(e: lopdf::Error) -> Self {
        LessonError::Pdf(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_taxonomy() {
        assert_eq!(LessonError::external("news feed", "timeout").exit_code(), 2);
        assert_eq!(
            LessonError::ContentValidation("bad quiz".into()).exit_code(),
            3
        );
        assert_eq!(LessonError::Config("no template".into()).exit_code(), 4);
        assert_eq!(LessonError::Manifest("locked".into()).exit_code(), 1);
    }

    #[test]
    fn test_external_message_names_dependency() {
        let e = LessonError::external("Google News RSS (Política)", "connection refused");
        assert_eq!(
            e.to_string(),
            "Google News RSS (Política) unavailable: connection refused"
        );
    }
}
