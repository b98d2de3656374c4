//! A minimal flowing layout on top of raw PDF content operators.
//!
//! [`Layout`] keeps a cursor on the current page and appends content stream
//! operations as paragraphs, rules, tags and pictures are added; when the
//! cursor reaches the bottom margin a new page starts. Nothing here touches
//! object numbering, so the same calls always yield the same operations.

use super::text::{Font, text_width, to_win_ansi, wrap};
use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

/// US Letter, in points.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
/// 0.75in on every side.
pub const MARGIN: f32 = 54.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub f32, pub f32, pub f32);

impl Color {
    pub const fn hex(rgb: u32) -> Color {
        Color(
            ((rgb >> 16) & 0xFF) as f32 / 255.0,
            ((rgb >> 8) & 0xFF) as f32 / 255.0,
            (rgb & 0xFF) as f32 / 255.0,
        )
    }

    fn operands(&self) -> Vec<Object> {
        vec![real(self.0), real(self.1), real(self.2)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub font: Font,
    pub size: f32,
    pub leading: f32,
    pub color: Color,
    pub align: Align,
    /// Applied on both sides.
    pub indent: f32,
    pub space_before: f32,
    pub space_after: f32,
}

/// Top-level parts of a lesson document, recorded in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Vocabulary,
    /// 1-based story number.
    Story(usize),
    Quiz,
    AnswerKey,
}

#[derive(Debug, Default)]
pub struct Page {
    pub operations: Vec<Operation>,
    /// Image XObject names drawn on this page.
    pub images: Vec<String>,
}

#[derive(Debug)]
pub struct Layout {
    pages: Vec<Page>,
    y: f32,
    sections: Vec<(Section, usize)>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout {
    pub fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: PAGE_HEIGHT - MARGIN,
            sections: Vec::new(),
        }
    }

    /// Mark the start of a section on the current page.
    pub fn begin_section(&mut self, section: Section) {
        self.sections.push((section, self.pages.len() - 1));
    }

    pub fn sections(&self) -> Vec<Section> {
        self.sections.iter().map(|(s, _)| *s).collect()
    }

    /// Zero-based page on which `section` starts.
    pub fn section_page(&self, section: Section) -> Option<usize> {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, page)| *page)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    fn at_top(&self) -> bool {
        self.y >= PAGE_HEIGHT - MARGIN
    }

    fn current(&mut self) -> &mut Page {
        self.pages.last_mut().expect("layout always has a page")
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.at_top() {
            self.new_page();
        }
    }

    /// Start a new page unless the current one is still empty.
    pub fn page_break(&mut self) {
        if !self.current().operations.is_empty() {
            self.new_page();
        }
    }

    pub fn spacer(&mut self, height: f32) {
        if self.at_top() {
            return;
        }
        self.y -= height;
        if self.y < MARGIN {
            self.new_page();
        }
    }

    /// Wrapped text; every line moves the cursor down by the style's leading.
    pub fn paragraph(&mut self, text: &str, style: &Style) {
        let width = CONTENT_WIDTH - 2.0 * style.indent;
        let lines = wrap(text, style.font, style.size, width);
        if lines.is_empty() {
            return;
        }
        self.spacer(style.space_before);
        for line in lines {
            self.ensure_space(style.leading);
            let line_width = text_width(&line, style.font, style.size);
            let x = match style.align {
                Align::Left => MARGIN + style.indent,
                Align::Center => MARGIN + (CONTENT_WIDTH - line_width) / 2.0,
                Align::Right => PAGE_WIDTH - MARGIN - style.indent - line_width,
            };
            let baseline = self.y - style.size;
            self.show_text(x, baseline, &line, style.font, style.size, style.color);
            self.y -= style.leading;
        }
        self.spacer(style.space_after);
    }

    /// A horizontal rule of `fraction` of the content width, centered.
    pub fn rule(&mut self, fraction: f32, thickness: f32, color: Color, space_after: f32) {
        self.ensure_space(thickness);
        let width = CONTENT_WIDTH * fraction;
        let x0 = MARGIN + (CONTENT_WIDTH - width) / 2.0;
        let y = self.y - thickness / 2.0;
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new("RG", color.operands()),
            Operation::new("w", vec![real(thickness)]),
            Operation::new("m", vec![real(x0), real(y)]),
            Operation::new("l", vec![real(x0 + width), real(y)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ];
        self.current().operations.extend(ops);
        self.y -= thickness;
        self.spacer(space_after);
    }

    /// A filled, left-aligned box of `width` with one line of centered text.
    pub fn tag(&mut self, text: &str, width: f32, style: &Style, background: Color) {
        let height = style.size + 10.0;
        self.ensure_space(height);
        let bottom = self.y - height;
        self.fill_rect(MARGIN, bottom, width, height, background);
        let text_w = text_width(text, style.font, style.size);
        let x = MARGIN + (width - text_w).max(0.0) / 2.0;
        self.show_text(x, bottom + 5.0 + style.size * 0.22, text, style.font, style.size, style.color);
        self.y = bottom;
    }

    /// Draw the image XObject `name` centered at `width`×`height` points.
    pub fn image(&mut self, name: &str, width: f32, height: f32) {
        self.ensure_space(height);
        let x = MARGIN + (CONTENT_WIDTH - width) / 2.0;
        let bottom = self.y - height;
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(width), real(0.0), real(0.0), real(height), real(x), real(bottom)],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ];
        let page = self.current();
        page.operations.extend(ops);
        page.images.push(name.to_string());
        self.y = bottom;
    }

    /// Rows of two cells on a shaded background, `column_width` each.
    pub fn two_columns(&mut self, rows: &[(String, String)], column_width: f32, style: &Style, background: Color) {
        let row_height = style.leading + 8.0;
        for (left, right) in rows {
            self.ensure_space(row_height);
            let bottom = self.y - row_height;
            self.fill_rect(MARGIN, bottom, column_width * 2.0, row_height, background);
            let baseline = bottom + 4.0 + (row_height - 8.0 - style.size) / 2.0 + style.size * 0.22;
            for (i, cell) in [left, right].into_iter().enumerate() {
                if !cell.is_empty() {
                    let x = MARGIN + 6.0 + column_width * i as f32;
                    self.show_text(x, baseline, cell, style.font, style.size, style.color);
                }
            }
            self.y = bottom;
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", color.operands()),
            Operation::new("re", vec![real(x), real(y), real(width), real(height)]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ];
        self.current().operations.extend(ops);
    }

    fn show_text(&mut self, x: f32, y: f32, text: &str, font: Font, size: f32, color: Color) {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("rg", color.operands()),
            Operation::new(
                "Tf",
                vec![Object::Name(font.resource_name().as_bytes().to_vec()), real(size)],
            ),
            Operation::new("Td", vec![real(x), real(y)]),
            Operation::new(
                "Tj",
                vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ];
        self.current().operations.extend(ops);
    }
}

/// Coordinates rounded to 1/100 pt keep the content streams short.
fn real(v: f32) -> Object {
    Object::Real((v * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: Style = Style {
        font: Font::TimesRoman,
        size: 12.0,
        leading: 18.0,
        color: Color(0.0, 0.0, 0.0),
        align: Align::Left,
        indent: 0.0,
        space_before: 0.0,
        space_after: 8.0,
    };

    #[test]
    fn test_hex_color() {
        assert_eq!(Color::hex(0xFF0000), Color(1.0, 0.0, 0.0));
        assert_eq!(Color::hex(0x0000FF).2, 1.0);
    }

    #[test]
    fn test_long_text_flows_onto_new_pages() {
        let mut layout = Layout::new();
        let text = "Las noticias de hoy son importantes. ".repeat(400);
        layout.paragraph(&text, &BODY);
        assert!(layout.page_count() > 1);
    }

    #[test]
    fn test_page_break_skips_empty_page() {
        let mut layout = Layout::new();
        layout.page_break();
        assert_eq!(layout.page_count(), 1);
        layout.paragraph("Hola", &BODY);
        layout.page_break();
        assert_eq!(layout.page_count(), 2);
    }

    #[test]
    fn test_sections_record_pages() {
        let mut layout = Layout::new();
        layout.begin_section(Section::Header);
        layout.paragraph("Título", &BODY);
        layout.page_break();
        layout.begin_section(Section::Quiz);
        assert_eq!(layout.sections(), [Section::Header, Section::Quiz]);
        assert_eq!(layout.section_page(Section::Quiz), Some(1));
        assert_eq!(layout.section_page(Section::AnswerKey), None);
    }

    #[test]
    fn test_image_is_recorded_on_page() {
        let mut layout = Layout::new();
        layout.image("Im1", 432.0, 244.8);
        let pages = layout.into_pages();
        assert_eq!(pages[0].images, ["Im1"]);
        assert!(pages[0].operations.iter().any(|op| op.operator == "Do"));
    }

    #[test]
    fn test_empty_paragraph_adds_nothing() {
        let mut layout = Layout::new();
        layout.paragraph("  ", &BODY);
        assert!(layout.into_pages()[0].operations.is_empty());
    }
}
