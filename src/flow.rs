//! Page-flow layout engine.
//!
//! Walks a [`Block`] tree top to bottom with a single vertical cursor and
//! emits [`DrawOp`]s onto fixed-size pages, breaking to a new page whenever
//! the next piece of content would cross the bottom margin. A degraded
//! plain-text path shares the same page model.
//!
//! Units are millimetres; font sizes are points. `LINE_FACTOR` (≈ pt → mm)
//! converts a font size into the cursor advance of one line.

use serde::{Deserialize, Serialize};

use crate::fonts::{wrap_text, FontManager};
use crate::layout_config::{DocumentLayout, DrawOp, GridRow, PageLayout, TableGrid, TextRun};
use crate::markdown::Block;
use crate::table::{measure_table, MeasuredTable, CELL_PADDING_MM};

/// Cursor advance per line, as a fraction of the font size.
pub const LINE_FACTOR: f32 = 0.35;

// Minimum free space each block kind needs before it starts.
const LINE_BREAK_RESERVE: f32 = 5.0;
const LEAF_RESERVE: f32 = 8.0;
const LIST_ITEM_RESERVE: f32 = 8.0;
const PARAGRAPH_RESERVE: f32 = 10.0;
const HEADING_RESERVE: f32 = 15.0;
const TABLE_RESERVE: f32 = 30.0;

const HEADING_PRE_GAP: f32 = 5.0;
const HEADING_POST_GAP: f32 = 5.0;
const PARAGRAPH_GAP: f32 = 3.0;
const LIST_GAP: f32 = 3.0;
const LIST_ITEM_GAP: f32 = 2.0;
const LIST_INDENT: f32 = 5.0;
const LIST_WRAP_INSET: f32 = 10.0;
const TABLE_GAP: f32 = 10.0;

/// Plain-text mode keeps a fixed reserve at the bottom instead of the margin.
const PLAIN_BOTTOM_RESERVE: f32 = 20.0;
/// Minimum run of `=` that plain-text mode treats as a heading underline.
const SEPARATOR_MIN_LEN: usize = 10;

/// Page geometry and base typography for one document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub margin: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub page_height: f32,
    pub page_width: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        // A4 portrait in mm.
        Self {
            margin: 20.0,
            font_size: 10.0,
            line_height: 1.4,
            page_height: 297.0,
            page_width: 210.0,
        }
    }
}

impl LayoutOptions {
    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Lowest y at which content may end.
    pub fn bottom_limit(&self) -> f32 {
        self.page_height - self.margin
    }
}

/// Which layout path to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Structured block layout with headings, lists and table grids.
    #[default]
    Rich,
    /// Formatting-stripped text, laid out line by line.
    PlainText,
}

/// Heading font size for a level.
pub fn heading_size(level: u8) -> f32 {
    match level {
        1 => 14.0,
        2 => 12.0,
        _ => 11.0,
    }
}

/// Rendering context for one document: owns the pages and the cursor.
pub struct FlowContext<'a> {
    options: LayoutOptions,
    fonts: &'a FontManager,
    pages: Vec<PageLayout>,
    y: f32,
}

impl<'a> FlowContext<'a> {
    pub fn new(options: LayoutOptions, fonts: &'a FontManager) -> Self {
        Self {
            options,
            fonts,
            pages: vec![PageLayout {
                page_index: 0,
                ops: Vec::new(),
            }],
            y: options.margin,
        }
    }

    pub fn cursor(&self) -> f32 {
        self.y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Freeze the accumulated pages into a [`DocumentLayout`].
    pub fn finish(self, title: &str) -> DocumentLayout {
        DocumentLayout {
            title: title.to_string(),
            page_width_mm: self.options.page_width,
            page_height_mm: self.options.page_height,
            pages: self.pages,
        }
    }

    /// Start a new page if `required` mm would not fit below the cursor.
    /// Returns whether a break happened.
    pub fn check_page_break(&mut self, required: f32) -> bool {
        if self.y + required > self.options.bottom_limit() {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn new_page(&mut self) {
        let index = self.pages.len();
        log::debug!("page break at y={:.1}, starting page {}", self.y, index + 1);
        self.pages.push(PageLayout {
            page_index: index,
            ops: Vec::new(),
        });
        self.y = self.options.margin;
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// Lay out blocks starting at `start_y`; returns the final cursor.
    pub fn layout_blocks(&mut self, blocks: &[Block], start_y: f32) -> f32 {
        self.y = start_y;
        for block in blocks {
            self.layout_block(block);
        }
        self.y
    }

    fn layout_block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, text } => self.heading(*level, text),
            Block::Paragraph(text) => self.paragraph(text),
            Block::List { ordered, items } => self.list(*ordered, items),
            Block::Table { rows } => self.table(rows),
            Block::LineBreak => self.line_break(),
            Block::Generic { text, children } => {
                if children.is_empty() {
                    self.leaf(text);
                } else {
                    for child in children {
                        self.layout_block(child);
                    }
                }
            }
        }
    }

    fn heading(&mut self, level: u8, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let size = heading_size(level);
        self.check_page_break(HEADING_RESERVE);
        self.y += HEADING_PRE_GAP;
        let lines = wrap_text(text, size, true, self.options.content_width(), self.fonts);
        self.draw_lines(&lines, self.options.margin, size, true);
        self.y += HEADING_POST_GAP;
    }

    fn paragraph(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.check_page_break(PARAGRAPH_RESERVE);
        self.body_text(text);
    }

    fn leaf(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.check_page_break(LEAF_RESERVE);
        self.body_text(text);
    }

    fn body_text(&mut self, text: &str) {
        let size = self.options.font_size;
        let lines = wrap_text(text, size, false, self.options.content_width(), self.fonts);
        self.draw_lines(&lines, self.options.margin, size, false);
        self.y += PARAGRAPH_GAP;
    }

    fn list(&mut self, ordered: bool, items: &[String]) {
        if items.is_empty() {
            return;
        }
        let size = self.options.font_size;
        let width = self.options.content_width() - LIST_WRAP_INSET;
        let x = self.options.margin + LIST_INDENT;

        self.y += LIST_GAP;
        for (i, item) in items.iter().enumerate() {
            self.check_page_break(LIST_ITEM_RESERVE);
            let text = if ordered {
                format!("{}. {}", i + 1, item.trim())
            } else {
                format!("• {}", item.trim())
            };
            let lines = wrap_text(&text, size, false, width, self.fonts);
            self.draw_lines(&lines, x, size, false);
            self.y += LIST_ITEM_GAP;
        }
        self.y += LIST_GAP;
    }

    fn line_break(&mut self) {
        self.check_page_break(LINE_BREAK_RESERVE);
        self.y += self.options.font_size * LINE_FACTOR;
    }

    /// Draw pre-wrapped lines one per text run, advancing one line each and
    /// breaking the page between lines as needed.
    fn draw_lines(&mut self, lines: &[String], x: f32, size: f32, bold: bool) {
        let advance = size * LINE_FACTOR;
        for line in lines {
            self.check_page_break(advance);
            if !line.is_empty() {
                self.push(DrawOp::Text(TextRun {
                    x,
                    y: self.y,
                    text: line.clone(),
                    font_size: size,
                    bold,
                }));
            }
            self.y += advance;
        }
    }

    fn table(&mut self, rows: &[Vec<String>]) {
        if rows.iter().all(Vec::is_empty) {
            return;
        }
        self.check_page_break(TABLE_RESERVE);
        let measured = measure_table(
            rows,
            self.options.content_width(),
            self.options.font_size,
            self.options.line_height,
            self.fonts,
        );
        let final_y = self.place_table(&measured);
        self.y = final_y + TABLE_GAP;
    }

    /// Place measured rows from the cursor down, splitting across pages and
    /// repeating the header on each continuation. Returns the bottom of the
    /// last row.
    fn place_table(&mut self, table: &MeasuredTable) -> f32 {
        let limit = self.options.bottom_limit();
        let mut grid = self.empty_grid(table, self.y);
        let mut y = self.y;

        for row in &table.rows {
            if y + row.height > limit {
                let has_body = grid.rows.iter().any(|r| !r.header);
                let lone_header = !grid.rows.is_empty() && !has_body;
                if has_body || (lone_header && grid.y > self.options.margin) {
                    if has_body {
                        self.push(DrawOp::Table(grid));
                    }
                    self.new_page();
                    y = self.y;
                    grid = self.empty_grid(table, y);
                    if let Some(header) = table.header().filter(|_| !row.header) {
                        grid.rows.push(GridRow { y, ..header.clone() });
                        y += header.height;
                    }
                }
            }
            grid.rows.push(GridRow { y, ..row.clone() });
            y += row.height;
        }

        let bottom = grid.bottom();
        if !grid.rows.is_empty() {
            self.push(DrawOp::Table(grid));
        }
        bottom
    }

    fn empty_grid(&self, table: &MeasuredTable, y: f32) -> TableGrid {
        TableGrid {
            x: self.options.margin,
            y,
            column_widths: table.column_widths.clone(),
            font_size: self.options.font_size,
            cell_padding: CELL_PADDING_MM,
            line_advance: table.line_advance,
            rows: Vec::new(),
        }
    }

    /// Degraded path: lay out formatting-stripped text line by line starting
    /// at `start_y`; returns the final cursor.
    ///
    /// Lines made only of `=` (10 or more) are leftovers of the heading
    /// underlines produced by [`crate::markdown::markdown_to_plain_text`]
    /// and are skipped without advancing the cursor.
    pub fn layout_plain_text(&mut self, text: &str, start_y: f32) -> f32 {
        self.y = start_y;
        let size = self.options.font_size;
        let advance = size * LINE_FACTOR * self.options.line_height;
        let limit = self.options.page_height - PLAIN_BOTTOM_RESERVE;
        let width = self.options.content_width();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                self.y += size * LINE_FACTOR * 0.5;
                continue;
            }
            if is_separator(line) {
                continue;
            }
            for wrapped in wrap_text(line, size, false, width, self.fonts) {
                if self.y + advance > limit {
                    self.new_page();
                }
                self.push(DrawOp::Text(TextRun {
                    x: self.options.margin,
                    y: self.y,
                    text: wrapped,
                    font_size: size,
                    bold: false,
                }));
                self.y += advance;
            }
        }
        self.y
    }
}

fn is_separator(line: &str) -> bool {
    line.len() >= SEPARATOR_MIN_LEN && line.chars().all(|c| c == '=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(layout: &DocumentLayout) -> Vec<String> {
        layout.text_runs().map(|(_, r)| r.text.clone()).collect()
    }

    #[test]
    fn blank_paragraph_is_a_no_op() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let end = ctx.layout_blocks(&[Block::Paragraph(" \n\t ".into())], 42.0);
        assert_eq!(end, 42.0);
        assert_eq!(ctx.finish("t").op_count(), 0);
    }

    #[test]
    fn single_line_paragraph_advance() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let end = ctx.layout_blocks(&[Block::Paragraph("Short".into())], 20.0);
        assert!((end - (20.0 + 10.0 * 0.35 + 3.0)).abs() < 1e-4);
    }

    #[test]
    fn three_line_heading_advance() {
        let fonts = FontManager::default();
        let options = LayoutOptions::default();
        // 9-char words; bold 12pt fits 7 words per 170 mm line -> 7/7/6.
        let text = vec!["abcdefghi"; 20].join(" ");
        let lines = wrap_text(&text, 12.0, true, options.content_width(), &fonts);
        assert_eq!(lines.len(), 3);

        let mut ctx = FlowContext::new(options, &fonts);
        let end = ctx.layout_blocks(&[Block::Heading { level: 2, text }], 20.0);
        let expected = 20.0 + 5.0 + 3.0 * 12.0 * 0.35 + 5.0;
        assert!((end - expected).abs() < 1e-4, "end={end} expected={expected}");
        assert_eq!(ctx.page_count(), 1);
    }

    #[test]
    fn heading_near_bottom_breaks_first() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        // 270 + 15 > 277
        let end = ctx.layout_blocks(
            &[Block::Heading {
                level: 1,
                text: "Title".into(),
            }],
            270.0,
        );
        assert_eq!(ctx.page_count(), 2);
        assert!((end - (20.0 + 5.0 + 14.0 * 0.35 + 5.0)).abs() < 1e-4);
        let layout = ctx.finish("t");
        let (page, run) = layout.text_runs().next().expect("heading run");
        assert_eq!(page, 1);
        assert_eq!(run.y, 25.0);
        assert!(run.bold);
    }

    #[test]
    fn list_prefixes() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        ctx.layout_blocks(
            &[
                Block::List {
                    ordered: false,
                    items: vec!["A".into(), "B".into()],
                },
                Block::List {
                    ordered: true,
                    items: vec!["A".into(), "B".into()],
                },
            ],
            20.0,
        );
        let layout = ctx.finish("t");
        assert_eq!(texts(&layout), vec!["• A", "• B", "1. A", "2. B"]);
        let (_, first) = layout.text_runs().next().expect("first item");
        assert_eq!(first.x, 25.0);
        assert_eq!(first.y, 23.0);
    }

    #[test]
    fn list_advance() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let end = ctx.layout_blocks(
            &[Block::List {
                ordered: false,
                items: vec!["A".into(), "B".into()],
            }],
            20.0,
        );
        let expected = 20.0 + 3.0 + 2.0 * (10.0 * 0.35 + 2.0) + 3.0;
        assert!((end - expected).abs() < 1e-4);
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let end = ctx.layout_blocks(
            &[Block::List {
                ordered: true,
                items: vec![],
            }],
            50.0,
        );
        assert_eq!(end, 50.0);
    }

    #[test]
    fn line_break_advances_without_drawing() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let end = ctx.layout_blocks(&[Block::LineBreak], 30.0);
        assert!((end - 33.5).abs() < 1e-4);
        assert_eq!(ctx.finish("t").op_count(), 0);
    }

    #[test]
    fn table_cursor_is_final_y_plus_gap() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let rows = vec![
            vec!["Control".to_string(), "ID".to_string()],
            vec!["Access".to_string(), "AC-1".to_string()],
        ];
        let end = ctx.layout_blocks(&[Block::Table { rows }], 40.0);
        let layout = ctx.finish("t");
        let grid = match &layout.pages[0].ops[0] {
            DrawOp::Table(g) => g,
            other => panic!("expected table, got {other:?}"),
        };
        assert_eq!(grid.rows.len(), 2);
        assert!(grid.rows[0].header);
        assert!(!grid.rows[1].header);
        assert_eq!(grid.rows[0].cells[0], vec!["Control"]);
        assert_eq!(grid.rows[1].cells[1], vec!["AC-1"]);
        assert!((end - (grid.bottom() + 10.0)).abs() < 1e-4);
    }

    #[test]
    fn table_without_room_starts_on_next_page() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let rows = vec![vec!["H".to_string()], vec!["b".to_string()]];
        ctx.layout_blocks(&[Block::Table { rows }], 250.0);
        let layout = ctx.finish("t");
        assert_eq!(layout.pages.len(), 2);
        assert!(layout.pages[0].ops.is_empty());
        match &layout.pages[1].ops[0] {
            DrawOp::Table(g) => assert_eq!(g.y, 20.0),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn long_table_repeats_header_on_each_page() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let mut rows = vec![vec!["Policy".to_string(), "Control ID".to_string()]];
        for i in 0..80 {
            rows.push(vec![format!("Requirement {i}"), format!("AC-{i}")]);
        }
        let end = ctx.layout_blocks(&[Block::Table { rows }], 20.0);
        let layout = ctx.finish("t");
        assert!(layout.pages.len() > 1);

        let mut body_rows = 0;
        for page in &layout.pages {
            for op in &page.ops {
                if let DrawOp::Table(g) = op {
                    assert!(g.rows[0].header, "page {} lacks header", page.page_index);
                    assert!(g.bottom() <= 277.0 + 1e-3);
                    body_rows += g.rows.iter().filter(|r| !r.header).count();
                }
            }
        }
        assert_eq!(body_rows, 80);

        let last = layout.pages.last().and_then(|p| p.ops.last());
        match last {
            Some(DrawOp::Table(g)) => assert!((end - (g.bottom() + 10.0)).abs() < 1e-4),
            other => panic!("expected trailing table, got {other:?}"),
        }
    }

    #[test]
    fn generic_recurses_and_leaf_draws() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let tree = Block::Generic {
            text: String::new(),
            children: vec![
                Block::Paragraph("inside".into()),
                Block::Generic {
                    text: "leaf".into(),
                    children: vec![],
                },
                Block::Generic {
                    text: "  ".into(),
                    children: vec![],
                },
            ],
        };
        ctx.layout_blocks(&[tree], 20.0);
        assert_eq!(texts(&ctx.finish("t")), vec!["inside", "leaf"]);
    }

    #[test]
    fn cursor_stays_above_bottom_margin_before_every_draw() {
        let fonts = FontManager::default();
        let options = LayoutOptions::default();
        let mut blocks = Vec::new();
        for i in 0..40 {
            blocks.push(Block::Heading {
                level: (i % 4) as u8 + 1,
                text: format!("Section {i}"),
            });
            blocks.push(Block::Paragraph("lorem ipsum dolor sit amet ".repeat(12)));
            blocks.push(Block::List {
                ordered: i % 2 == 0,
                items: vec!["first item".into(), "second item ".repeat(20)],
            });
        }
        let mut ctx = FlowContext::new(options, &fonts);
        ctx.layout_blocks(&blocks, options.margin);
        let layout = ctx.finish("t");
        assert!(layout.pages.len() > 3);
        for (_, run) in layout.text_runs() {
            assert!(run.y <= options.bottom_limit(), "run at y={}", run.y);
        }
    }

    #[test]
    fn plain_text_skips_separator_lines() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let text = format!("Title\n{}\nBody", "=".repeat(50));
        let end = ctx.layout_plain_text(&text, 20.0);
        let advance = 10.0 * 0.35 * 1.4;
        assert!((end - (20.0 + 2.0 * advance)).abs() < 1e-4);
        assert_eq!(texts(&ctx.finish("t")), vec!["Title", "Body"]);
    }

    #[test]
    fn plain_text_blank_lines_advance_half_a_line() {
        let fonts = FontManager::default();
        let mut ctx = FlowContext::new(LayoutOptions::default(), &fonts);
        let end = ctx.layout_plain_text("\n\n", 20.0);
        assert!((end - (20.0 + 2.0 * 10.0 * 0.35 * 0.5)).abs() < 1e-4);
    }

    #[test]
    fn plain_text_uses_fixed_bottom_reserve() {
        let fonts = FontManager::default();
        let options = LayoutOptions {
            margin: 10.0,
            ..LayoutOptions::default()
        };
        let mut ctx = FlowContext::new(options, &fonts);
        // 276 + 4.9 > 297 - 20, even though the margin alone would allow it.
        ctx.layout_plain_text("line", 276.0);
        let layout = ctx.finish("t");
        assert_eq!(layout.pages.len(), 2);
        let (page, run) = layout.text_runs().next().expect("run");
        assert_eq!(page, 1);
        assert_eq!(run.y, 10.0);
    }
}
