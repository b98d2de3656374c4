//! The `index.json` manifest listing every generated lesson, newest first.
//!
//! ```json
//! {
//!   "pdfs": [
//!     { "date": "2025-03-07", "filename": "spanish_lesson_2025-03-07.pdf",
//!       "path": "pdfs/spanish_lesson_2025-03-07.pdf", "stories": [...], ... }
//!   ],
//!   "generated": "2025-01-02T08:00:00-05:00",
//!   "last_updated": "2025-03-07T08:00:03-05:00"
//! }
//! ```
//!
//! # Publishing
//!
//! [`publish`] stages the PDF in a temporary file, replaces the manifest and
//! only then renames the PDF into place. If that last rename fails the
//! previous manifest is put back, so a run leaves either both files or
//! neither.
//!
//! Entries already in the manifest are kept as raw JSON apart from their
//! date; see [`StoredEntry`].

use crate::error::LessonError;
use crate::models::{AdaptedStory, Lesson, QuizQuestion, VocabularyEntry};
use chrono::{DateTime, Local, NaiveDate, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Story fields kept in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedStory {
    pub category: String,
    pub headline_es: String,
    pub headline_en: String,
    pub body_es: String,
    pub body_en: String,
    pub source: Option<String>,
}

impl From<&AdaptedStory> for IndexedStory {
    fn from(story: &AdaptedStory) -> Self {
        Self {
            category: story.category.clone(),
            headline_es: story.headline_es.clone(),
            headline_en: story.headline_en.clone(),
            body_es: story.body_es.clone(),
            body_en: story.body_en.clone(),
            source: story.source.clone(),
        }
    }
}

/// The entry this run adds for its lesson.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub date: NaiveDate,
    pub filename: String,
    /// PDF location relative to the manifest's directory.
    pub path: String,
    pub stories: Vec<IndexedStory>,
    pub vocabulary: Vec<VocabularyEntry>,
    pub quiz: Vec<QuizQuestion>,
    pub vocabulary_count: usize,
    pub quiz_count: usize,
    pub generated_at: String,
}

impl IndexEntry {
    pub fn from_lesson(lesson: &Lesson, filename: &str, path: &str, now: DateTime<Local>) -> Self {
        Self {
            date: lesson.date,
            filename: filename.to_string(),
            path: path.to_string(),
            stories: lesson.sections.iter().map(|s| IndexedStory::from(&s.story)).collect(),
            vocabulary: lesson.vocabulary.clone(),
            quiz: lesson.quiz.clone(),
            vocabulary_count: lesson.vocabulary.len(),
            quiz_count: lesson.quiz.len(),
            generated_at: timestamp(now),
        }
    }
}

/// A manifest entry as found on disk.
///
/// Only the date is interpreted. Every other field is carried through
/// untouched, so entries written by older generators survive a rewrite even
/// when their vocabulary or quiz has a shape this version would not produce.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoredEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StoredEntry {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl TryFrom<IndexEntry> for StoredEntry {
    type Error = LessonError;

    fn try_from(entry: IndexEntry) -> Result<Self, Self::Error> {
        let date = entry.date;
        match serde_json::to_value(entry) {
            Ok(Value::Object(mut fields)) => {
                fields.remove("date");
                Ok(StoredEntry { date, fields })
            }
            Ok(other) => Err(LessonError::Manifest(format!(
                "entry for {date} is not a JSON object: {other}"
            ))),
            Err(e) => Err(LessonError::Manifest(format!("cannot serialize entry for {date}: {e}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(default)]
    pub pdfs: Vec<StoredEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Top-level keys this program does not manage.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Read the manifest at `path`; a missing file is an empty manifest.
    ///
    /// # Errors
    ///
    /// [`LessonError::Manifest`] if the file cannot be read or is not a
    /// manifest.
    pub async fn load(path: &Path) -> Result<Manifest, LessonError> {
        match read_existing(path).await? {
            Some(json) => Manifest::from_json(&json, path),
            None => Ok(Manifest::default()),
        }
    }

    fn from_json(json: &str, path: &Path) -> Result<Manifest, LessonError> {
        serde_json::from_str(json).map_err(|e| {
            LessonError::Manifest(format!("{} is not a valid manifest: {e}", path.display()))
        })
    }

    /// Add `entry`, replacing any entry with the same date.
    ///
    /// Entries stay sorted newest first, so the usual case of today's lesson
    /// is a prepend.
    pub fn record(&mut self, entry: IndexEntry, now: DateTime<Local>) -> Result<(), LessonError> {
        let entry = StoredEntry::try_from(entry)?;
        let stamp = timestamp(now);
        if self.generated.is_none() {
            self.generated = Some(stamp.clone());
        }
        self.pdfs.retain(|p| p.date != entry.date);
        let at = self
            .pdfs
            .iter()
            .position(|p| p.date < entry.date)
            .unwrap_or(self.pdfs.len());
        self.pdfs.insert(at, entry);
        self.last_updated = Some(stamp);
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, LessonError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LessonError::Manifest(format!("cannot serialize manifest: {e}")))
    }
}

/// Contents of the manifest at `path`, `None` when there is none yet.
async fn read_existing(path: &Path) -> Result<Option<String>, LessonError> {
    match fs::read_to_string(path).await {
        Ok(json) => Ok(Some(json)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No manifest yet; starting a new one");
            Ok(None)
        }
        Err(e) => Err(LessonError::Manifest(format!(
            "cannot read {}: {e}",
            path.display()
        ))),
    }
}

fn timestamp(now: DateTime<Local>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// `path` without `.` components.
fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Where `pdf_path` lives as seen from the manifest's directory, `/`-separated.
///
/// Both paths are compared lexically, so `./index.json` and `out/x.pdf`
/// give `out/x.pdf`. A PDF outside the manifest's directory is recorded
/// under `pdfs/`.
pub fn relative_path(manifest_path: &Path, pdf_path: &Path) -> String {
    let base = lexical(manifest_path.parent().unwrap_or(Path::new("")));
    let pdf = lexical(pdf_path);
    match pdf.strip_prefix(&base) {
        Ok(rel) if !rel.has_root() => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => {
            let filename = pdf_path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            warn!(
                pdf = %pdf_path.display(),
                manifest = %manifest_path.display(),
                "PDF is outside the manifest directory; recording it under pdfs/"
            );
            format!("pdfs/{filename}")
        }
    }
}

/// Write `bytes` to a synced temporary file next to `path`.
///
/// Nothing is visible at `path` until the file is persisted; dropped
/// unpersisted, the temporary file is deleted.
fn stage(path: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Write `bytes` to `path` through a temporary sibling file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    stage(path, bytes)?.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Put the manifest back the way it was before this run.
async fn restore_manifest(manifest_path: &Path, previous: Option<&str>) {
    let restored = match previous {
        Some(json) => write_atomic(manifest_path, json.as_bytes()),
        None => fs::remove_file(manifest_path).await,
    };
    if let Err(e) = restored {
        warn!(error = %e, "Could not restore the previous manifest");
    }
}

/// Store the lesson PDF and record `entry` in the manifest, all or nothing.
///
/// The manifest is read and the new one serialized before anything is
/// written. The PDF is then staged in a temporary file beside `pdf_path`,
/// the manifest is replaced, and only then is the PDF renamed into place.
///
/// # Arguments
///
/// * `pdf_path` - Final location of the PDF; a lesson already there for the
///   same date is replaced only if the whole publish succeeds
/// * `pdf` - Rendered PDF bytes
/// * `manifest_path` - The `index.json` to update
/// * `entry` - Manifest entry for this lesson
/// * `now` - Timestamp for `generated` / `last_updated`
///
/// # Returns
///
/// The manifest as written.
///
/// # Errors
///
/// * [`LessonError::Manifest`] if the existing manifest cannot be read or
///   parsed, or the new one cannot be written. The PDF is left untouched.
/// * [`LessonError::Pdf`] if the PDF cannot be staged or moved into place.
///   A manifest written by this call is restored to its previous contents.
#[instrument(level = "info", skip_all, fields(pdf = %pdf_path.display(), manifest = %manifest_path.display(), date = %entry.date))]
pub async fn publish(
    pdf_path: &Path,
    pdf: &[u8],
    manifest_path: &Path,
    entry: IndexEntry,
    now: DateTime<Local>,
) -> Result<Manifest, LessonError> {
    let previous = read_existing(manifest_path).await?;
    let mut manifest = match &previous {
        Some(json) => Manifest::from_json(json, manifest_path)?,
        None => Manifest::default(),
    };
    manifest.record(entry, now)?;
    let json = manifest.to_json()?;

    let staged = stage(pdf_path, pdf)
        .map_err(|e| LessonError::Pdf(format!("cannot write {}: {e}", pdf_path.display())))?;

    write_atomic(manifest_path, json.as_bytes()).map_err(|e| {
        LessonError::Manifest(format!("cannot write {}: {e}", manifest_path.display()))
    })?;
    info!(entries = manifest.pdfs.len(), "Manifest updated");

    if let Err(e) = staged.persist(pdf_path) {
        restore_manifest(manifest_path, previous.as_deref()).await;
        return Err(LessonError::Pdf(format!(
            "cannot write {}: {}",
            pdf_path.display(),
            e.error
        )));
    }
    info!(bytes = pdf.len(), "Wrote PDF");
    Ok(manifest)
}

/// `spanish_lesson_YYYY-MM-DD.pdf`
pub fn pdf_filename(date: NaiveDate) -> String {
    format!("spanish_lesson_{}.pdf", date.format("%Y-%m-%d"))
}

/// Output path of the lesson for `date` under `output_dir`.
pub fn pdf_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(pdf_filename(date))
}
