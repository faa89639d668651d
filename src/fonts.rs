//! Text measurement and word wrapping for the builtin Helvetica faces.
//!
//! PDFs are rendered with the standard-14 Helvetica fonts, so nothing is
//! embedded and measurement uses average advance widths per face. Widths are
//! returned in points; callers working in millimetres convert with
//! [`PT_TO_MM`].

/// 1 pt = 0.352778 mm.
pub const PT_TO_MM: f32 = 0.352778;

/// Font metrics for the builtin Helvetica family.
#[derive(Debug, Clone)]
pub struct FontManager {
    /// Average advance width as a fraction of the font size.
    regular_advance: f32,
    bold_advance: f32,
    /// Ascender height as a fraction of the font size.
    ascender: f32,
}

impl FontManager {
    pub fn new(regular_advance: f32, bold_advance: f32, ascender: f32) -> Self {
        Self {
            regular_advance,
            bold_advance,
            ascender,
        }
    }

    /// Measure the width of a string at a given font size, in points.
    pub fn measure_text_width(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        let avg = if bold {
            self.bold_advance
        } else {
            self.regular_advance
        };
        text.chars().count() as f32 * font_size * avg
    }

    /// Same as [`measure_text_width`](Self::measure_text_width) but in mm.
    pub fn measure_text_width_mm(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        self.measure_text_width(text, font_size, bold) * PT_TO_MM
    }

    /// Ascender in points for the given font size.
    pub fn ascender_pt(&self, font_size: f32) -> f32 {
        font_size * self.ascender
    }
}

impl Default for FontManager {
    fn default() -> Self {
        // Helvetica-like metrics; bold is ~10 % wider.
        Self::new(0.5, 0.55, 0.75)
    }
}

/// Word-wrap text to fit within `max_width_mm`. Returns a vec of lines.
///
/// Existing newlines are hard breaks. Words wider than the line are split
/// by character so no line ever exceeds the width.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    max_width_mm: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width_mm <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let fits = |s: &str| fonts.measure_text_width_mm(s, font_size, bold) <= max_width_mm;

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };
            if fits(&candidate) {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if fits(word) {
                current_line = word.to_string();
            } else {
                // Hard-split an overlong word.
                for c in word.chars() {
                    current_line.push(c);
                    if !fits(&current_line) && current_line.chars().count() > 1 {
                        current_line.pop();
                        lines.push(std::mem::take(&mut current_line));
                        current_line.push(c);
                    }
                }
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
