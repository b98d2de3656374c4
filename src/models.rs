//! Data models for stories, adapted lessons and their illustrations.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Story`]: a raw news item as fetched from a feed
//! - [`LessonContent`]: the model's adaptation of a day's stories
//! - [`AdaptedStory`], [`VocabularyEntry`], [`QuizQuestion`]: its parts
//! - [`Image`]: a downloaded, resized illustration with attribution
//! - [`Lesson`]: everything the PDF builder needs for one dated document
//!
//! Field names of the model-facing types are snake_case and match the JSON
//! schema spelled out in the adaptation prompt.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// News topic a story was fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Politics,
    Economy,
    Technology,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Politics, Topic::Economy, Topic::Technology];

    /// Spanish label used as the category in the lesson.
    pub fn label(&self) -> &'static str {
        match self {
            Topic::Politics => "Política",
            Topic::Economy => "Economía",
            Topic::Technology => "Tecnología",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Topic::Politics => "politics",
            Topic::Economy => "economy",
            Topic::Technology => "technology",
        }
    }

    /// Accepts the English slug or the Spanish label, accents optional.
    pub fn from_label(s: &str) -> Option<Topic> {
        let s = s.trim().to_lowercase();
        Topic::ALL.into_iter().find(|t| {
            s == t.slug() || s == t.label().to_lowercase() || s == strip_accents(t.label())
        })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn strip_accents(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            other => other,
        })
        .collect()
}

/// A raw news item as fetched from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub headline: String,
    /// Plain-text summary of the item (HTML already stripped).
    pub body: String,
    pub topic: Topic,
    /// Publisher name, `"News"` when the feed does not say.
    pub source: String,
    pub published: Option<String>,
}

impl Story {
    /// Text handed to the model: headline, blank line, summary.
    pub fn raw_content(&self) -> String {
        if self.body.is_empty() {
            self.headline.clone()
        } else {
            format!("{}\n\n{}", self.headline, self.body)
        }
    }
}

/// The model's adaptation of one day's stories.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LessonContent {
    pub vocabulary: Vec<VocabularyEntry>,
    pub stories: Vec<AdaptedStory>,
    pub quiz: Vec<QuizQuestion>,
}

/// A vocabulary word with its definitions and an example sentence.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VocabularyEntry {
    pub word: String,
    /// Stress-marked syllables, e.g. `sor-TE-o`.
    #[serde(default)]
    pub syllables: String,
    /// Part of speech in Spanish (`sustantivo`, `verbo`, ...).
    #[serde(default)]
    pub pos: String,
    /// Example sentence taken from the stories.
    #[serde(default)]
    pub context: String,
    pub definition_es: String,
    pub definition_en: String,
}

/// A news story rewritten for A2-B1 learners, with its English translation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AdaptedStory {
    pub category: String,
    pub headline_es: String,
    #[serde(default)]
    pub headline_en: String,
    pub body_es: String,
    #[serde(default)]
    pub body_en: String,
    /// Short English search query for the illustration.
    #[serde(default)]
    pub image_query: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Vocab,
    Comprehension,
}

/// The answer-key entry of a question.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Answer {
    TrueFalse(bool),
    Text(String),
}

impl Answer {
    pub fn is_blank(&self) -> bool {
        matches!(self, Answer::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::TrueFalse(true) => f.write_str("Verdadero"),
            Answer::TrueFalse(false) => f.write_str("Falso"),
            Answer::Text(s) => f.write_str(s.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub number: u32,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question_es: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: Answer,
}

/// A downloaded illustration, already resized and re-encoded as JPEG.
#[derive(Clone, PartialEq)]
pub struct Image {
    /// Baseline JPEG bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// e.g. `Foto: Jane Doe / Unsplash`
    pub attribution: String,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("attribution", &self.attribution)
            .finish()
    }
}

/// One story section of the PDF: the adapted text and its optional picture.
#[derive(Debug, Clone)]
pub struct StorySection {
    pub story: AdaptedStory,
    pub image: Option<Image>,
}

/// Everything the PDF builder needs for one dated document.
#[derive(Debug, Clone)]
pub struct Lesson {
    pub date: NaiveDate,
    pub title: String,
    pub subtitle: String,
    pub level: String,
    pub vocabulary: Vec<VocabularyEntry>,
    pub sections: Vec<StorySection>,
    pub quiz: Vec<QuizQuestion>,
}
