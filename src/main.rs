//! # Noticias PDF
//!
//! Builds a daily Spanish-learning PDF from current US news. Real headlines
//! are rewritten by an LLM for A2-B1 learners and laid out with vocabulary,
//! illustrations, a quiz and an answer key.
//!
//! ## Usage
//!
//! ```sh
//! noticias_pdf -o ./pdfs -i ./index.json
//! ```
//!
//! ## Architecture
//!
//! One run is a strictly sequential pipeline:
//! 1. **Fetching**: one Google News RSS search per topic
//! 2. **Selection**: the model picks the most teachable story per topic
//! 3. **Adaptation**: one model request turns the stories into vocabulary,
//!    simplified stories and a quiz, validated before anything is written
//! 4. **Illustration**: one Unsplash photo per story, when available
//! 5. **Output**: the PDF, then the `index.json` manifest entry
//!
//! The exit status tells the scheduler what went wrong: 2 for an unreachable
//! upstream, 3 for unusable model output, 4 for configuration, 1 otherwise.

use awful_aj::{config_dir, template};
use chrono::Local;
use clap::Parser;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod adapter;
mod api;
mod cli;
mod config;
mod error;
mod images;
mod models;
mod news;
mod outputs;
mod utils;

use api::{AskFnWrapper, RetryAsk};
use cli::Cli;
use config::LessonConfig;
use error::LessonError;
use images::ImageFetcher;
use models::{AdaptedStory, Lesson, Story, StorySection};
use outputs::manifest::{self, IndexEntry};
use outputs::pdf;
use utils::ensure_writable_dir;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; NoticiasPdf/1.0)";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("noticias_pdf starting up");

    let args = Cli::parse();
    debug!(?args.output_dir, ?args.manifest, ?args.date, "Parsed CLI arguments");

    match run(&args).await {
        Ok(pdf_path) => {
            let elapsed = start_time.elapsed();
            info!(
                ?elapsed,
                secs = elapsed.as_secs(),
                pdf = %pdf_path.display(),
                "Execution complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "Lesson run failed");
            ExitCode::from(e.exit_code())
        }
    }
}

#[instrument(level = "info", skip_all)]
async fn run(args: &Cli) -> Result<PathBuf, LessonError> {
    let lesson_config = LessonConfig::load(args.lesson_config.as_deref()).await?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    info!(%date, "Generating lesson");

    // Early check: ensure the PDF output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "PDF output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    // ---- Load config & templates ----
    let conf_file = match &args.config {
        Some(path) => path.clone(),
        None => config_dir()
            .map_err(|e| LessonError::Config(format!("no awful_aj config dir: {e}")))?
            .join("config.yaml"),
    };
    let config_path = conf_file.to_str().ok_or_else(|| {
        LessonError::Config(format!("not a valid config filename: {}", conf_file.display()))
    })?;
    let aj_config = awful_aj::config::load_config(config_path)
        .map_err(|e| LessonError::Config(format!("load {config_path}: {e}")))?;
    info!(config_path, "Loaded configuration");

    let lesson_template = template::load_template(&args.template)
        .await
        .map_err(|e| LessonError::Config(format!("template {}: {e}", args.template)))?;
    info!(template = %args.template, "Loaded template");
    let selection_template = match template::load_template(&args.selection_template).await {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(
                template = %args.selection_template,
                error = %e,
                "Selection template unavailable; first candidate per topic will be used"
            );
            None
        }
    };

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| LessonError::external("HTTP client", e))?;

    // ---- Fetch and select ----
    let candidates = news::fetch_candidates(&client, &lesson_config).await?;
    let selector = selection_template.as_ref().map(|template| {
        RetryAsk::new(
            AskFnWrapper {
                config: &aj_config,
                template,
            },
            2,
            Duration::from_secs(1),
        )
    });
    let stories = news::select_stories(selector.as_ref(), &candidates).await;

    // ---- Adapt ----
    let model = RetryAsk::new(
        AskFnWrapper {
            config: &aj_config,
            template: &lesson_template,
        },
        5,
        Duration::from_secs(1),
    );
    let content = adapter::adapt_stories(&model, &stories).await?;

    // ---- Illustrate ----
    let fetcher = if args.no_images {
        info!("Image search disabled");
        None
    } else {
        Some(ImageFetcher::new(
            client.clone(),
            args.unsplash_key(),
            lesson_config.images.clone(),
        ))
    };
    let sections = illustrate(fetcher.as_ref(), content.stories, &stories).await;

    // ---- Render & publish ----
    let lesson = Lesson {
        date,
        title: lesson_config.title.clone(),
        subtitle: lesson_config.subtitle.clone(),
        level: lesson_config.level.clone(),
        vocabulary: content.vocabulary,
        sections,
        quiz: content.quiz,
    };
    publish_lesson(&lesson, &args.output_dir, &args.manifest).await
}

/// Pair each adapted story with an illustration, one search at a time.
///
/// The search query is the story's `image_query`, else its topic slug. A
/// story the model left without a source keeps the feed's publisher.
async fn illustrate(
    fetcher: Option<&ImageFetcher>,
    adapted: Vec<AdaptedStory>,
    sources: &[Story],
) -> Vec<StorySection> {
    let sections: Vec<StorySection> = stream::iter(adapted.into_iter().zip(sources))
        .then(|(mut story, source)| async move {
            if story.source.as_deref().is_none_or(|s| s.trim().is_empty()) {
                story.source = Some(source.source.clone());
            }
            let query = story
                .image_query
                .clone()
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| source.topic.slug().to_string());
            let image = match fetcher {
                Some(f) => f.fetch(&query).await,
                None => None,
            };
            StorySection { story, image }
        })
        .collect()
        .await;
    let illustrated = sections.iter().filter(|s| s.image.is_some()).count();
    info!(illustrated, stories = sections.len(), "Illustrations ready");
    sections
}

/// Render `lesson` and record it; returns the PDF path.
async fn publish_lesson(
    lesson: &Lesson,
    output_dir: &Path,
    manifest_path: &Path,
) -> Result<PathBuf, LessonError> {
    let pdf_bytes = pdf::render(lesson)?;
    info!(bytes = pdf_bytes.len(), "Rendered PDF");

    let pdf_path = manifest::pdf_path(output_dir, lesson.date);
    let filename = manifest::pdf_filename(lesson.date);
    let relative = manifest::relative_path(manifest_path, &pdf_path);
    let now = Local::now();
    let entry = IndexEntry::from_lesson(lesson, &filename, &relative, now);
    let index = manifest::publish(&pdf_path, &pdf_bytes, manifest_path, entry, now).await?;
    info!(total_pdfs = index.pdfs.len(), path = %relative, "Lesson published");

    Ok(pdf_path)
}
