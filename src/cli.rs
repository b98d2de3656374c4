//! Command-line interface definitions for Noticias PDF.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! All arguments can be provided via command-line flags or environment variables.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one lesson run.
///
/// # Examples
///
/// ```sh
/// # Today's lesson into ./pdfs, recorded in ./index.json
/// noticias_pdf
///
/// # Regenerate a date into a site checkout, without illustrations
/// noticias_pdf -o site/pdfs -i site/index.json --date 2025-03-07 --no-images
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory the lesson PDF is written to
    #[arg(short, long, env = "NOTICIAS_OUTPUT_DIR", default_value = "pdfs")]
    pub output_dir: PathBuf,

    /// Path of the index.json manifest
    #[arg(short = 'i', long, env = "NOTICIAS_MANIFEST", default_value = "index.json")]
    pub manifest: PathBuf,

    /// Optional path to the awful_aj config.yaml file
    #[arg(short, long, env = "NOTICIAS_AJ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Optional YAML file overriding titles, feeds and image settings
    #[arg(short, long, env = "NOTICIAS_LESSON_CONFIG")]
    pub lesson_config: Option<PathBuf>,

    /// awful_aj template used to adapt the stories
    #[arg(long, env = "NOTICIAS_TEMPLATE", default_value = "spanish_lesson")]
    pub template: String,

    /// awful_aj template used to pick one story per topic
    #[arg(long, env = "NOTICIAS_SELECTION_TEMPLATE", default_value = "news_selector")]
    pub selection_template: String,

    /// Unsplash access key
    #[arg(long, env = "UNSPLASH_ACCESS_KEY", hide_env_values = true)]
    pub unsplash_key: Option<String>,

    /// Lesson date (YYYY-MM-DD), today by default
    #[arg(long, env = "NOTICIAS_DATE")]
    pub date: Option<NaiveDate>,

    /// Skip the image search entirely
    #[arg(long)]
    pub no_images: bool,
}

impl Cli {
    /// The Unsplash key from the command line, `UNSPLASH_ACCESS_KEY` or `UNSPLASH_API_KEY`.
    pub fn unsplash_key(&self) -> Option<String> {
        self.unsplash_key
            .clone()
            .or_else(|| std::env::var("UNSPLASH_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}
