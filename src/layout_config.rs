//! Document layout – the intermediate representation between the flow engine
//! and PDF rendering. This is the "frozen" structure that encodes exactly what
//! goes on each page.
//!
//! All coordinates are millimetres from the top-left corner of the page.

use serde::{Deserialize, Serialize};

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "DocumentLayout::default_title")]
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    /// Ordered list of pages; never empty once produced by the flow engine.
    pub pages: Vec<PageLayout>,
}

/// One page of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub ops: Vec<DrawOp>,
}

/// A positioned drawing instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawOp {
    Text(TextRun),
    Table(TableGrid),
}

/// A single line of text. `y` is the top of the line box; the renderer
/// places the baseline one ascender below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub bold: bool,
}

/// The part of a table that lands on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGrid {
    pub x: f32,
    pub y: f32,
    pub column_widths: Vec<f32>,
    pub font_size: f32,
    pub cell_padding: f32,
    pub line_advance: f32,
    pub rows: Vec<GridRow>,
}

/// One table row, already wrapped. `y` is absolute on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub y: f32,
    pub height: f32,
    pub header: bool,
    /// Wrapped lines per cell, one entry per column.
    pub cells: Vec<Vec<String>>,
}

impl TableGrid {
    /// Bottom edge of the last row, or `y` for an empty fragment.
    pub fn bottom(&self) -> f32 {
        self.rows.last().map(|r| r.y + r.height).unwrap_or(self.y)
    }
}

impl DocumentLayout {
    /// An empty A4 layout.
    pub fn a4() -> Self {
        Self {
            title: Self::default_title(),
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            pages: Vec::new(),
        }
    }

    fn default_title() -> String {
        "policy-forge output".to_string()
    }

    /// All text runs in page order, paired with their page index.
    pub fn text_runs(&self) -> impl Iterator<Item = (usize, &TextRun)> {
        self.pages.iter().flat_map(|p| {
            p.ops.iter().filter_map(move |op| match op {
                DrawOp::Text(run) => Some((p.page_index, run)),
                DrawOp::Table(_) => None,
            })
        })
    }

    /// Total number of draw operations across all pages.
    pub fn op_count(&self) -> usize {
        self.pages.iter().map(|p| p.ops.len()).sum()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
