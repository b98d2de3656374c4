//! Content adaptation: news stories in, a validated Spanish lesson out.
//!
//! All stories of a run go to the model in one request so that vocabulary and
//! quiz can span the whole lesson. The answer must be a JSON document matching
//! [`LessonContent`]; a truncated answer is re-asked once, anything else that
//! does not parse or validate aborts the run before a single byte is written.

pub mod prompt;
pub mod validate;

use crate::api::AskAsync;
use crate::error::LessonError;
use crate::models::{LessonContent, Story, Topic};
use crate::utils::{looks_truncated, strip_code_fences, truncate_for_log};
use tracing::{info, instrument, warn};

/// Adapt `stories` into one lesson.
///
/// # Arguments
///
/// * `model` - The model client; transport retries are its concern
/// * `stories` - The selected stories, one per topic, in lesson order
///
/// # Returns
///
/// Normalized content whose adapted stories line up with `stories`.
///
/// # Errors
///
/// * [`LessonError::ExternalDependency`] if the model cannot be reached
/// * [`LessonError::ContentValidation`] if the answer is not JSON, is still
///   truncated after one re-ask, or breaks the lesson contract
#[instrument(level = "info", skip_all, fields(stories = stories.len()))]
pub async fn adapt_stories<A>(model: &A, stories: &[Story]) -> Result<LessonContent, LessonError>
where
    A: AskAsync<Response = String>,
{
    if stories.is_empty() {
        return Err(LessonError::ContentValidation(
            "no stories to adapt".to_string(),
        ));
    }

    let prompt = prompt::lesson_prompt(stories);
    let mut answer = ask(model, &prompt).await?;
    let mut parsed = parse_lesson(&answer);

    // If the parse failed due to EOF (truncation), re-ask ONCE
    if let Err(ref e) = parsed {
        if looks_truncated(e) {
            warn!(error = %e, "EOF while parsing lesson; re-asking once");
            answer = ask(model, &prompt).await?;
            parsed = parse_lesson(&answer);
        }
    }

    let content = parsed.map_err(|e| {
        warn!(
            error = %e,
            response_preview = %truncate_for_log(&answer, 300),
            "Model returned non-conforming JSON"
        );
        LessonError::ContentValidation(format!("model answer is not a lesson: {e}"))
    })?;

    let content = validate::normalize(content);
    let topics: Vec<Topic> = stories.iter().map(|s| s.topic).collect();
    validate::validate(&content, &topics)?;

    info!(
        vocabulary = content.vocabulary.len(),
        stories = content.stories.len(),
        quiz = content.quiz.len(),
        "Lesson content validated"
    );
    Ok(content)
}

async fn ask<A>(model: &A, prompt: &str) -> Result<String, LessonError>
where
    A: AskAsync<Response = String>,
{
    model
        .ask(prompt)
        .await
        .map_err(|e| LessonError::external("language model", e))
}

/// Parse a model answer, tolerating Markdown code fences around the JSON.
pub fn parse_lesson(answer: &str) -> Result<LessonContent, serde_json::Error> {
    serde_json::from_str(strip_code_fences(answer))
}
