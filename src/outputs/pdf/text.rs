//! Standard Type1 fonts: metrics, WinAnsi encoding and line wrapping.
//!
//! Only the 14 standard fonts are used, so nothing is embedded and the output
//! stays small. Widths are the Helvetica AFM widths; the other faces are
//! scaled from them, which is close enough for wrapping.

/// Fonts available to the layout, each registered once per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    TimesRoman,
    TimesItalic,
}

impl Font {
    pub const ALL: [Font; 5] = [
        Font::Helvetica,
        Font::HelveticaBold,
        Font::HelveticaOblique,
        Font::TimesRoman,
        Font::TimesItalic,
    ];

    /// Name of the font in page resource dictionaries.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
            Font::HelveticaOblique => "F3",
            Font::TimesRoman => "F4",
            Font::TimesItalic => "F5",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
            Font::HelveticaOblique => "Helvetica-Oblique",
            Font::TimesRoman => "Times-Roman",
            Font::TimesItalic => "Times-Italic",
        }
    }

    fn scale(&self) -> f32 {
        match self {
            Font::Helvetica | Font::HelveticaOblique => 1.0,
            Font::HelveticaBold => 1.06,
            Font::TimesRoman | Font::TimesItalic => 0.9,
        }
    }
}

/// Helvetica glyph widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :;<=>?@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [\]^_`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {|}~
];

/// Map an accented Latin letter to its base letter for width lookup.
fn base_letter(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        '¿' => '?',
        '¡' => '!',
        '‘' | '’' => '\'',
        '“' | '”' | '«' | '»' => '"',
        '–' => '-',
        _ => c,
    }
}

fn glyph_width(c: char) -> u16 {
    match base_letter(c) {
        c @ ' '..='~' => HELVETICA_WIDTHS[c as usize - 32],
        '—' => 1000,
        '…' => 1000,
        '•' => 350,
        _ => 556,
    }
}

/// Width of `text` set in `font` at `size` points.
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .filter(|&c| encode_char(c).is_some())
        .map(|c| u32::from(glyph_width(c)))
        .sum();
    units as f32 * font.scale() * size / 1000.0
}

/// WinAnsi (CP1252) code for `c`, if the standard fonts can show it.
fn encode_char(c: char) -> Option<u8> {
    let code = match c {
        ' '..='~' => c as u32 as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        '„' => 0x84,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '™' => 0x99,
        _ => return None,
    };
    Some(code)
}

/// Encode `text` for a WinAnsi-encoded standard font, dropping what it cannot show.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter_map(encode_char)
        .collect()
}

/// Greedy word wrap of `text` into lines no wider than `max_width`.
///
/// A single word wider than the line is put on a line of its own.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let space = text_width(" ", font, size);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0;

    for word in text.split_whitespace() {
        let w = text_width(word, font, size);
        if !line.is_empty() && line_width + space + w > max_width {
            lines.push(std::mem::take(&mut line));
            line_width = 0.0;
        }
        if !line.is_empty() {
            line.push(' ');
            line_width += space;
        }
        line.push_str(word);
        line_width += w;
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_keeps_spanish_letters() {
        assert_eq!(to_win_ansi("¿Qué?"), vec![0xBF, b'Q', b'u', 0xE9, b'?']);
        assert_eq!(to_win_ansi("año"), vec![b'a', 0xF1, b'o']);
        assert_eq!(to_win_ansi("“sí”"), vec![0x93, b's', 0xED, 0x94]);
    }

    #[test]
    fn test_win_ansi_drops_unsupported() {
        assert_eq!(to_win_ansi("📚 VOCAB"), b" VOCAB".to_vec());
        assert_eq!(to_win_ansi("a\tb\nc"), b"a b c".to_vec());
    }

    #[test]
    fn test_text_width_uses_metrics() {
        // "Hi" = 722 + 222 units
        let w = text_width("Hi", Font::Helvetica, 10.0);
        assert!((w - 9.44).abs() < 1e-3);
        assert_eq!(text_width("á", Font::Helvetica, 10.0), text_width("a", Font::Helvetica, 10.0));
        assert!(text_width("Hola", Font::TimesRoman, 12.0) < text_width("Hola", Font::Helvetica, 12.0));
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "El Congreso aprobó una nueva ley sobre el presupuesto federal del próximo año.";
        let lines = wrap(text, Font::TimesRoman, 12.0, 150.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::TimesRoman, 12.0) <= 150.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_long_word_gets_own_line() {
        let lines = wrap("a supercalifragilisticoespialidoso b", Font::Helvetica, 12.0, 40.0);
        assert_eq!(lines, ["a", "supercalifragilisticoespialidoso", "b"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap("   ", Font::Helvetica, 12.0, 100.0).is_empty());
    }
}
