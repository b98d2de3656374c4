//! PDF Builder: lays out a [`Lesson`] and serializes it with `lopdf`.
//!
//! The document always has the same shape:
//!
//! ```text
//! header ─ vocabulary │ story 1 ─ story 2 ─ ... │ quiz │ answer key
//! ```
//!
//! where `│` is a page break. Rendering is a pure function of the lesson:
//! object numbers are assigned in a fixed order and neither a creation date
//! nor a document ID is written, so the same lesson always yields the same bytes.

pub mod layout;
pub mod text;

use crate::adapter::validate::{QUIZ_QUESTIONS, VOCAB_QUESTIONS};
use crate::error::LessonError;
use crate::models::{Lesson, QuestionKind, QuizQuestion, StorySection, VocabularyEntry};
use crate::utils::spanish_date;
use layout::{Align, CONTENT_WIDTH, Color, Layout, PAGE_HEIGHT, PAGE_WIDTH, Section, Style};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::collections::BTreeMap;
use text::Font;
use tracing::{debug, instrument};

const SPANISH_RED: Color = Color::hex(0xC41E3A);
const SPANISH_YELLOW: Color = Color::hex(0xFFC400);
const DARK_BLUE: Color = Color::hex(0x1A365D);
const TEXT: Color = Color::hex(0x2D3748);
const MUTED: Color = Color::hex(0x4A5568);
const LIGHT: Color = Color::hex(0x718096);
const RULE: Color = Color::hex(0xE2E8F0);
const ANSWER_BG: Color = Color::hex(0xF7FAFC);
const WHITE: Color = Color(1.0, 1.0, 1.0);

/// 6in × 3.4in
const IMAGE_WIDTH: f32 = 432.0;
const IMAGE_HEIGHT: f32 = 244.8;

const fn style(font: Font, size: f32, leading: f32, color: Color) -> Style {
    Style {
        font,
        size,
        leading,
        color,
        align: Align::Left,
        indent: 0.0,
        space_before: 0.0,
        space_after: 0.0,
    }
}

const MAIN_TITLE: Style = Style {
    align: Align::Center,
    space_after: 8.0,
    ..style(Font::HelveticaBold, 32.0, 38.0, SPANISH_RED)
};
const SUBTITLE: Style = Style {
    align: Align::Center,
    space_after: 5.0,
    ..style(Font::Helvetica, 14.0, 18.0, DARK_BLUE)
};
const DATE_LINE: Style = Style {
    align: Align::Center,
    space_after: 15.0,
    ..style(Font::HelveticaOblique, 11.0, 14.0, LIGHT)
};
const SECTION_HEADER: Style = Style {
    space_before: 20.0,
    space_after: 12.0,
    ..style(Font::HelveticaBold, 16.0, 20.0, SPANISH_RED)
};
const INTRO: Style = Style {
    space_after: 4.0,
    ..style(Font::HelveticaOblique, 10.0, 13.0, LIGHT)
};
const CATEGORY_TAG: Style = style(Font::HelveticaBold, 9.0, 11.0, WHITE);
const STORY_HEADLINE: Style = Style {
    space_before: 10.0,
    space_after: 4.0,
    ..style(Font::HelveticaBold, 18.0, 22.0, DARK_BLUE)
};
const STORY_HEADLINE_EN: Style = Style {
    space_after: 12.0,
    ..style(Font::HelveticaOblique, 11.0, 14.0, LIGHT)
};
const ATTRIBUTION: Style = Style {
    align: Align::Right,
    space_before: 3.0,
    ..style(Font::HelveticaOblique, 8.0, 10.0, LIGHT)
};
const STORY_BODY: Style = Style {
    space_after: 12.0,
    ..style(Font::TimesRoman, 12.0, 18.0, TEXT)
};
const TRANSLATION_LABEL: Style = Style {
    space_before: 8.0,
    space_after: 4.0,
    ..style(Font::HelveticaBold, 10.0, 13.0, MUTED)
};
const TRANSLATION: Style = Style {
    space_after: 8.0,
    ..style(Font::TimesItalic, 10.0, 14.0, MUTED)
};
const SOURCE: Style = Style {
    space_before: 4.0,
    ..style(Font::HelveticaOblique, 8.0, 10.0, LIGHT)
};
const VOCAB_CONTEXT: Style = Style {
    space_before: 8.0,
    space_after: 3.0,
    ..style(Font::TimesItalic, 10.0, 14.0, LIGHT)
};
const VOCAB_WORD: Style = Style {
    space_after: 2.0,
    ..style(Font::HelveticaBold, 12.0, 15.0, DARK_BLUE)
};
const VOCAB_DEF: Style = Style {
    indent: 15.0,
    space_after: 2.0,
    ..style(Font::Helvetica, 10.0, 13.0, MUTED)
};
const QUIZ_SUBHEADER: Style = Style {
    space_before: 10.0,
    space_after: 8.0,
    ..style(Font::HelveticaBold, 13.0, 16.0, DARK_BLUE)
};
const QUIZ_QUESTION: Style = Style {
    space_before: 10.0,
    space_after: 4.0,
    ..style(Font::Helvetica, 11.0, 15.0, TEXT)
};
const QUIZ_OPTION: Style = Style {
    indent: 25.0,
    space_after: 2.0,
    ..style(Font::Helvetica, 10.0, 14.0, MUTED)
};
const ANSWER: Style = style(Font::Helvetica, 10.0, 12.0, TEXT);

/// Render `lesson` to PDF bytes.
///
/// The same lesson always yields the same bytes.
///
/// # Errors
///
/// [`LessonError::Pdf`] if the layout references an image that was never
/// embedded, [`LessonError::Io`] if the document cannot be serialized.
#[instrument(level = "info", skip_all, fields(date = %lesson.date, stories = lesson.sections.len()))]
pub fn render(lesson: &Lesson) -> Result<Vec<u8>, LessonError> {
    let layout = compose(lesson);
    debug!(pages = layout.page_count(), sections = ?layout.sections(), "Lesson laid out");
    assemble(lesson, layout)
}

/// Lay the lesson out page by page without serializing it.
pub fn compose(lesson: &Lesson) -> Layout {
    let mut layout = Layout::new();

    header(&mut layout, lesson);
    if !lesson.vocabulary.is_empty() {
        vocabulary(&mut layout, &lesson.vocabulary);
    }
    layout.page_break();

    for (i, section) in lesson.sections.iter().enumerate() {
        story(&mut layout, i + 1, section);
        if i + 1 < lesson.sections.len() {
            layout.spacer(20.0);
            layout.rule(1.0, 1.0, RULE, 20.0);
        }
    }

    if !lesson.quiz.is_empty() {
        layout.page_break();
        quiz(&mut layout, &lesson.quiz);
        layout.page_break();
        answer_key(&mut layout, &lesson.quiz);
    }
    layout
}

fn header(layout: &mut Layout, lesson: &Lesson) {
    layout.begin_section(Section::Header);
    layout.rule(1.0, 8.0, SPANISH_RED, 25.0);
    layout.paragraph(&lesson.title, &MAIN_TITLE);
    layout.paragraph(&lesson.subtitle, &SUBTITLE);
    layout.paragraph(
        &format!("{} | Nivel {}", spanish_date(lesson.date), lesson.level),
        &DATE_LINE,
    );
    layout.rule(0.3, 4.0, SPANISH_YELLOW, 20.0);
}

fn vocabulary(layout: &mut Layout, entries: &[VocabularyEntry]) {
    layout.begin_section(Section::Vocabulary);
    layout.paragraph("VOCABULARIO PREPARATORIO", &SECTION_HEADER);
    layout.paragraph("Estudia estas palabras antes de leer las noticias.", &INTRO);
    layout.spacer(10.0);

    for (i, entry) in entries.iter().enumerate() {
        if !entry.context.trim().is_empty() {
            layout.paragraph(&format!("“{}”", entry.context.trim()), &VOCAB_CONTEXT);
        }
        let syllables = if entry.syllables.trim().is_empty() {
            entry.word.to_uppercase()
        } else {
            entry.syllables.trim().to_string()
        };
        let mut word_line = format!("{}. {} [{}]", i + 1, entry.word, syllables);
        if !entry.pos.trim().is_empty() {
            word_line.push_str(&format!(" ({})", entry.pos.trim()));
        }
        layout.paragraph(&word_line, &VOCAB_WORD);
        layout.paragraph(&format!("» {}", entry.definition_es), &VOCAB_DEF);
        layout.paragraph(&format!("English: {}", entry.definition_en), &VOCAB_DEF);
        layout.spacer(8.0);
    }
}

fn story(layout: &mut Layout, number: usize, section: &StorySection) {
    let story = &section.story;
    layout.begin_section(Section::Story(number));

    let category = story.category.to_uppercase();
    let tag_width = text::text_width(&category, CATEGORY_TAG.font, CATEGORY_TAG.size) + 16.0;
    layout.tag(&category, tag_width, &CATEGORY_TAG, SPANISH_RED);
    layout.spacer(8.0);

    layout.paragraph(
        &format!("Historia {number}: {}", story.headline_es),
        &STORY_HEADLINE,
    );
    layout.paragraph(&story.headline_en, &STORY_HEADLINE_EN);

    if let Some(image) = &section.image {
        layout.image(&image_name(number), IMAGE_WIDTH, IMAGE_HEIGHT);
        layout.paragraph(&image.attribution, &ATTRIBUTION);
        layout.spacer(15.0);
    }

    layout.paragraph(&story.body_es, &STORY_BODY);

    if !story.body_en.trim().is_empty() {
        layout.paragraph("Traducción:", &TRANSLATION_LABEL);
        layout.paragraph(&story.body_en, &TRANSLATION);
    }
    if let Some(source) = story.source.as_deref().filter(|s| !s.trim().is_empty()) {
        layout.paragraph(&format!("Fuente: {source}"), &SOURCE);
    }
}

fn quiz(layout: &mut Layout, questions: &[QuizQuestion]) {
    layout.begin_section(Section::Quiz);
    layout.paragraph("PRUEBA DE COMPRENSIÓN", &SECTION_HEADER);
    layout.paragraph(
        "Responde las siguientes preguntas basándote en las noticias.",
        &INTRO,
    );
    layout.spacer(10.0);

    let blocks = [
        (QuestionKind::Vocab, format!("Vocabulario (1-{VOCAB_QUESTIONS})")),
        (
            QuestionKind::Comprehension,
            format!("Comprensión ({}-{QUIZ_QUESTIONS})", VOCAB_QUESTIONS + 1),
        ),
    ];
    for (i, (kind, title)) in blocks.iter().enumerate() {
        if i > 0 {
            layout.spacer(15.0);
        }
        layout.paragraph(title, &QUIZ_SUBHEADER);
        for q in questions.iter().filter(|q| q.kind == *kind) {
            layout.paragraph(&format!("{}. {}", q.number, q.question_es), &QUIZ_QUESTION);
            for (letter, option) in ('a'..='z').zip(&q.options) {
                layout.paragraph(&format!("{letter}) {option}"), &QUIZ_OPTION);
            }
            layout.spacer(8.0);
        }
    }
}

fn answer_key(layout: &mut Layout, questions: &[QuizQuestion]) {
    layout.begin_section(Section::AnswerKey);
    layout.paragraph("RESPUESTAS", &SECTION_HEADER);
    layout.spacer(10.0);

    let mut sorted: Vec<&QuizQuestion> = questions.iter().collect();
    sorted.sort_by_key(|q| q.number);
    let cells: Vec<String> = sorted
        .iter()
        .map(|q| format!("{}. {}", q.number, q.answer))
        .collect();
    let rows: Vec<(String, String)> = cells
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair.get(1).cloned().unwrap_or_default()))
        .collect();
    layout.two_columns(&rows, CONTENT_WIDTH / 2.0, &ANSWER, ANSWER_BG);
}

fn image_name(story_number: usize) -> String {
    format!("Im{story_number}")
}

/// Serialize the laid-out pages.
///
/// Object order: fonts, images, the page tree, then each page's content and
/// page dictionary, then the catalog and info dictionaries.
fn assemble(lesson: &Lesson, layout: Layout) -> Result<Vec<u8>, LessonError> {
    let mut doc = Document::with_version("1.5");

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), id);
    }

    let mut images: BTreeMap<String, ObjectId> = BTreeMap::new();
    for (i, section) in lesson.sections.iter().enumerate() {
        if let Some(image) = &section.image {
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width),
                    "Height" => i64::from(image.height),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8_i64,
                    "Filter" => "DCTDecode",
                },
                image.data.clone(),
            )
            .with_compression(false);
            images.insert(image_name(i + 1), doc.add_object(stream));
        }
    }

    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for page in layout.into_pages() {
        let content = Content {
            operations: page.operations,
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut resources = dictionary! { "Font" => fonts.clone() };
        if !page.images.is_empty() {
            let mut xobjects = Dictionary::new();
            for name in &page.images {
                let id = images.get(name).ok_or_else(|| {
                    LessonError::Pdf(format!("image {name} drawn but never embedded"))
                })?;
                xobjects.set(name.as_str(), *id);
            }
            resources.set("XObject", xobjects);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(
            text::to_win_ansi(&format!("{} - {}", lesson.title, lesson.date)),
            StringFormat::Literal,
        ),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::validate::fixtures;
    use crate::images::{fixtures::png, prepare_image};
    use crate::models::Answer;
    use chrono::NaiveDate;

    fn lesson(with_images: bool) -> Lesson {
        let content = fixtures::content();
        let sections = content
            .stories
            .into_iter()
            .map(|story| StorySection {
                image: with_images.then(|| {
                    prepare_image(&png(8, 8), 32, 18, "Foto: Ana López / Unsplash".to_string())
                        .unwrap()
                }),
                story,
            })
            .collect();
        Lesson {
            date: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
            title: "Español con Noticias".to_string(),
            subtitle: "Noticias de Estados Unidos".to_string(),
            level: "A2-B1".to_string(),
            vocabulary: content.vocabulary,
            sections,
            quiz: content.quiz,
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_sections_in_order() {
        let layout = compose(&lesson(true));
        assert_eq!(
            layout.sections(),
            [
                Section::Header,
                Section::Vocabulary,
                Section::Story(1),
                Section::Story(2),
                Section::Story(3),
                Section::Quiz,
                Section::AnswerKey,
            ]
        );
    }

    #[test]
    fn test_page_breaks_between_parts() {
        let layout = compose(&lesson(false));
        let page = |s| layout.section_page(s).unwrap();
        assert_eq!(page(Section::Header), 0);
        assert_eq!(page(Section::Vocabulary), 0);
        assert!(page(Section::Story(1)) > page(Section::Vocabulary));
        assert!(page(Section::Quiz) > page(Section::Story(3)));
        assert!(page(Section::AnswerKey) > page(Section::Quiz));
    }

    #[test]
    fn test_render_is_deterministic() {
        let first = render(&lesson(true)).unwrap();
        let second = render(&lesson(true)).unwrap();
        assert!(first.starts_with(b"%PDF-1.5"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_embeds_images_and_text() {
        let bytes = render(&lesson(true)).unwrap();
        assert!(contains(&bytes, b"/DCTDecode"));
        assert!(contains(&bytes, b"Historia 3"));
        assert!(contains(&bytes, b"VOCABULARIO PREPARATORIO"));
        assert!(contains(&bytes, b"RESPUESTAS"));
        assert!(!contains(&bytes, b"/CreationDate"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), compose(&lesson(true)).page_count());
    }

    #[test]
    fn test_missing_images_still_render() {
        let mut lesson = lesson(true);
        lesson.sections[1].image = None;
        let bytes = render(&lesson).unwrap();
        assert!(contains(&bytes, b"/Im1"));
        assert!(!contains(&bytes, b"/Im2"));
        assert!(contains(&bytes, b"/Im3"));

        let bare = render(&self::lesson(false)).unwrap();
        assert!(!contains(&bare, b"/DCTDecode"));
        assert!(Document::load_mem(&bare).is_ok());
    }

    #[test]
    fn test_boolean_answers_in_answer_key() {
        let mut lesson = lesson(false);
        lesson.quiz[9].options.clear();
        lesson.quiz[9].answer = Answer::TrueFalse(true);
        let bytes = render(&lesson).unwrap();
        assert!(contains(&bytes, b"10. Verdadero"));
    }
}
