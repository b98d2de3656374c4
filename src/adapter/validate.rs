//! Structural checks on the model's lesson.
//!
//! A lesson that passes [`validate`] has 6-8 distinct vocabulary words, one
//! adapted story per input story in the input's topic order, and a
//! 10-question quiz numbered 1-10 whose first four questions are vocabulary
//! questions.

use crate::error::LessonError;
use crate::models::{Answer, LessonContent, QuestionKind, QuizQuestion, Topic};
use itertools::Itertools;

pub const MIN_VOCABULARY: usize = 6;
pub const MAX_VOCABULARY: usize = 8;
pub const QUIZ_QUESTIONS: usize = 10;
pub const VOCAB_QUESTIONS: usize = 4;
pub const COMPREHENSION_QUESTIONS: usize = QUIZ_QUESTIONS - VOCAB_QUESTIONS;

/// Upper bound on the Spanish body of an adapted story.
pub const MAX_BODY_WORDS: usize = 200;
/// Upper bound on the mean sentence length of an adapted story.
pub const MAX_AVG_SENTENCE_WORDS: f32 = 22.0;

/// Drop repeated vocabulary words (case-insensitive) and trim every entry.
pub fn normalize(mut content: LessonContent) -> LessonContent {
    content.vocabulary = content
        .vocabulary
        .into_iter()
        .map(|mut v| {
            v.word = v.word.trim().to_string();
            v
        })
        .unique_by(|v| v.word.to_lowercase())
        .collect();
    content.quiz.sort_by_key(|q| q.number);
    content
}

/// Check `content` against the lesson contract.
///
/// # Arguments
///
/// * `content` - The parsed and normalized model answer
/// * `topics` - Topics of the input stories, in the order they were sent
///
/// # Errors
///
/// [`LessonError::ContentValidation`] naming the first broken rule.
pub fn validate(content: &LessonContent, topics: &[Topic]) -> Result<(), LessonError> {
    check_vocabulary(content)?;
    check_stories(content, topics)?;
    check_quiz(&content.quiz)
}

fn invalid(msg: impl Into<String>) -> LessonError {
    LessonError::ContentValidation(msg.into())
}

fn check_vocabulary(content: &LessonContent) -> Result<(), LessonError> {
    let n = content.vocabulary.len();
    if !(MIN_VOCABULARY..=MAX_VOCABULARY).contains(&n) {
        return Err(invalid(format!(
            "expected {MIN_VOCABULARY}-{MAX_VOCABULARY} vocabulary words, got {n}"
        )));
    }
    if let Some(v) = content
        .vocabulary
        .iter()
        .find(|v| v.word.is_empty() || v.definition_es.trim().is_empty() || v.definition_en.trim().is_empty())
    {
        return Err(invalid(format!("vocabulary entry {:?} is incomplete", v.word)));
    }
    Ok(())
}

fn check_stories(content: &LessonContent, topics: &[Topic]) -> Result<(), LessonError> {
    if content.stories.len() != topics.len() {
        return Err(invalid(format!(
            "expected {} adapted stories, got {}",
            topics.len(),
            content.stories.len()
        )));
    }
    for (i, (story, &topic)) in content.stories.iter().zip(topics).enumerate() {
        let n = i + 1;
        if Topic::from_label(&story.category) != Some(topic) {
            return Err(invalid(format!(
                "story {n} is filed under {:?}, expected {}",
                story.category,
                topic.label()
            )));
        }
        if story.headline_es.trim().is_empty() || story.body_es.trim().is_empty() {
            return Err(invalid(format!("story {n} has an empty headline or body")));
        }
        let words = word_count(&story.body_es);
        if words > MAX_BODY_WORDS {
            return Err(invalid(format!(
                "story {n} has {words} words, more than {MAX_BODY_WORDS}"
            )));
        }
        let avg = average_sentence_words(&story.body_es);
        if avg > MAX_AVG_SENTENCE_WORDS {
            return Err(invalid(format!(
                "story {n} averages {avg:.1} words per sentence, more than {MAX_AVG_SENTENCE_WORDS}"
            )));
        }
    }
    Ok(())
}

fn check_quiz(quiz: &[QuizQuestion]) -> Result<(), LessonError> {
    if quiz.len() != QUIZ_QUESTIONS {
        return Err(invalid(format!(
            "expected {QUIZ_QUESTIONS} quiz questions, got {}",
            quiz.len()
        )));
    }

    let numbers: Vec<u32> = quiz.iter().map(|q| q.number).sorted().collect();
    if numbers != (1..=QUIZ_QUESTIONS as u32).collect::<Vec<_>>() {
        return Err(invalid(format!("quiz must be numbered 1-{QUIZ_QUESTIONS}, got {numbers:?}")));
    }

    let vocab = quiz.iter().filter(|q| q.kind == QuestionKind::Vocab).count();
    let comprehension = quiz.len() - vocab;
    if vocab != VOCAB_QUESTIONS || comprehension != COMPREHENSION_QUESTIONS {
        return Err(invalid(format!(
            "expected {VOCAB_QUESTIONS} vocabulary + {COMPREHENSION_QUESTIONS} comprehension questions, got {vocab} + {comprehension}"
        )));
    }

    for q in quiz {
        let is_vocab_slot = q.number as usize <= VOCAB_QUESTIONS;
        if is_vocab_slot != (q.kind == QuestionKind::Vocab) {
            return Err(invalid(format!(
                "question {} is in the wrong block for a {:?} question",
                q.number, q.kind
            )));
        }
        if q.question_es.trim().is_empty() || q.answer.is_blank() {
            return Err(invalid(format!("question {} has no text or no answer", q.number)));
        }
        if !q.options.is_empty() && option_index(q).is_none() {
            return Err(invalid(format!(
                "answer {:?} of question {} names none of its {} options",
                q.answer.to_string(),
                q.number,
                q.options.len()
            )));
        }
    }
    Ok(())
}

/// Index of the option an answer refers to.
///
/// Accepts a bare letter (`"B"`, `"b)"`, `"B."`) or the full text of an option.
/// A boolean answer names the `Verdadero` or `Falso` option.
pub fn option_index(q: &QuizQuestion) -> Option<usize> {
    let answer = match &q.answer {
        Answer::Text(answer) => answer.trim(),
        Answer::TrueFalse(_) => {
            let truth = q.answer.to_string();
            return q
                .options
                .iter()
                .position(|opt| opt.trim().eq_ignore_ascii_case(&truth));
        }
    };
    let mut chars = answer.chars();
    let letter = chars.next()?;
    let rest = chars.as_str().trim();
    if letter.is_ascii_alphabetic() && (rest.is_empty() || rest.starts_with(')') || rest.starts_with('.')) {
        let index = (letter.to_ascii_lowercase() as u8 - b'a') as usize;
        return (index < q.options.len()).then_some(index);
    }
    q.options
        .iter()
        .position(|opt| opt.trim().eq_ignore_ascii_case(answer))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Mean number of words per sentence, sentences ending in `.`, `!` or `?`.
pub fn average_sentence_words(text: &str) -> f32 {
    let sentences: Vec<usize> = text
        .split(['.', '!', '?'])
        .map(word_count)
        .filter(|&n| n > 0)
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    sentences.iter().sum::<usize>() as f32 / sentences.len() as f32
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{
        AdaptedStory, Answer, LessonContent, QuestionKind, QuizQuestion, VocabularyEntry,
    };

    pub fn vocabulary(n: usize) -> Vec<VocabularyEntry> {
        (1..=n)
            .map(|i| VocabularyEntry {
                word: format!("palabra{i}"),
                syllables: format!("pa-LA-bra-{i}"),
                pos: "sustantivo".to_string(),
                context: format!("La palabra{i} aparece en la noticia."),
                definition_es: format!("definición {i}"),
                definition_en: format!("word {i}"),
            })
            .collect()
    }

    pub fn story(category: &str) -> AdaptedStory {
        AdaptedStory {
            category: category.to_string(),
            headline_es: format!("Noticia de {category}"),
            headline_en: format!("{category} news"),
            body_es: "El Congreso aprobó una ley nueva. La ley ayuda a las familias. \
                      Muchas personas están contentas."
                .to_string(),
            body_en: "Congress passed a new law. The law helps families. Many people are happy."
                .to_string(),
            image_query: Some("capitol building".to_string()),
            source: Some("AP".to_string()),
        }
    }

    pub fn quiz() -> Vec<QuizQuestion> {
        (1..=10)
            .map(|n| QuizQuestion {
                number: n,
                kind: if n <= 4 {
                    QuestionKind::Vocab
                } else {
                    QuestionKind::Comprehension
                },
                question_es: format!("¿Pregunta {n}?"),
                options: vec![
                    "uno".to_string(),
                    "dos".to_string(),
                    "tres".to_string(),
                    "cuatro".to_string(),
                ],
                answer: Answer::Text(["A", "B", "C", "D"][(n as usize) % 4].to_string()),
            })
            .collect()
    }

    pub fn content() -> LessonContent {
        LessonContent {
            vocabulary: vocabulary(7),
            stories: vec![story("Política"), story("Economía"), story("Tecnología")],
            quiz: quiz(),
        }
    }
}
