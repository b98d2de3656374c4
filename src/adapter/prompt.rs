//! The instructional prompt sent with the day's stories.

use super::validate::{
    COMPREHENSION_QUESTIONS, MAX_VOCABULARY, MIN_VOCABULARY, QUIZ_QUESTIONS, VOCAB_QUESTIONS,
};
use crate::models::Story;
use std::fmt::Write;

pub const TARGET_LEVEL: &str = "A2-B1";
pub const MIN_STORY_WORDS: usize = 120;
pub const MAX_STORY_WORDS: usize = 180;

const SCHEMA: &str = r#"{
  "vocabulary": [
    {
      "word": "Spanish word",
      "syllables": "stress-marked syllables like sor-TE-o",
      "pos": "sustantivo/verbo/adjetivo/etc",
      "context": "Example sentence from the stories using this word",
      "definition_es": "Simple Spanish definition",
      "definition_en": "English translation"
    }
  ],
  "stories": [
    {
      "category": "Política/Economía/Tecnología",
      "headline_es": "Spanish headline",
      "headline_en": "English translation of headline",
      "body_es": "Spanish adaptation of the story",
      "body_en": "English translation of the adapted story",
      "image_query": "2-3 word English search query for a stock photo",
      "source": "Original news source if known"
    }
  ],
  "quiz": [
    {
      "number": 1,
      "type": "vocab",
      "question_es": "Question in Spanish",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "answer": "A"
    }
  ]
}"#;

/// Build the adaptation prompt for `stories`.
pub fn lesson_prompt(stories: &[Story]) -> String {
    let mut prompt = format!(
        "You are an expert Spanish language teacher creating educational content \
         for {TARGET_LEVEL} level learners.\n\n\
         Given these {} US news stories, create a complete Spanish learning lesson:\n\n",
        stories.len()
    );

    for (i, story) in stories.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "STORY {} ({}):\n{}\nSource: {}\n",
            i + 1,
            story.topic.label(),
            story.raw_content(),
            story.source
        );
    }

    let _ = write!(
        prompt,
        "OUTPUT FORMAT (respond with valid JSON only):\n\n{SCHEMA}\n\n\
         REQUIREMENTS:\n\
         1. Include {MIN_VOCABULARY}-{MAX_VOCABULARY} vocabulary words that appear in the stories\n\
         2. Adapt all {n} stories, in the order given, to {MIN_STORY_WORDS}-{MAX_STORY_WORDS} words each. \
         Use simple sentences (10-20 words), keep the key facts, {TARGET_LEVEL} vocabulary\n\
         3. Create {QUIZ_QUESTIONS} quiz questions: {VOCAB_QUESTIONS} vocabulary (type \"vocab\", \
         questions 1-{VOCAB_QUESTIONS}) + {COMPREHENSION_QUESTIONS} comprehension \
         (type \"comprehension\", questions {first}-{QUIZ_QUESTIONS})\n\
         4. Comprehension questions should reference specific stories\n\
         5. Every question has 4 options and the answer is the letter of the correct option\n\
         6. All Spanish text should be appropriate for {TARGET_LEVEL} learners\n\n\
         Respond with ONLY the JSON, no other text.",
        n = stories.len(),
        first = VOCAB_QUESTIONS + 1,
    );
    prompt
}
