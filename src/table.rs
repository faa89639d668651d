//! Table measurement – column widths and wrapped, sized rows.
//!
//! Placement and page splitting happen in [`crate::flow`]; this module only
//! answers "how wide is each column and how tall is each row".

use crate::fonts::{wrap_text, FontManager};
use crate::layout_config::GridRow;

/// Padding inside every cell, in mm.
pub const CELL_PADDING_MM: f32 = 2.0;

/// A table whose rows have been wrapped to their columns.
#[derive(Debug, Clone)]
pub struct MeasuredTable {
    pub column_widths: Vec<f32>,
    /// Row geometry with `y` left at 0; the flow engine assigns positions.
    pub rows: Vec<GridRow>,
    pub line_advance: f32,
}

impl MeasuredTable {
    pub fn header(&self) -> Option<&GridRow> {
        self.rows.first().filter(|r| r.header)
    }
}

/// Measure `rows` for a table `width` mm wide. Row 0 is the header.
///
/// Columns get widths proportional to their widest single-line cell, so
/// short ID columns stay narrow and descriptive columns take the rest.
/// Ragged rows are padded with empty cells.
pub fn measure_table(
    rows: &[Vec<String>],
    width: f32,
    font_size: f32,
    line_height: f32,
    fonts: &FontManager,
) -> MeasuredTable {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let line_advance = font_size * crate::flow::LINE_FACTOR * line_height;
    if columns == 0 {
        return MeasuredTable {
            column_widths: Vec::new(),
            rows: Vec::new(),
            line_advance,
        };
    }

    let mut natural = vec![0.0f32; columns];
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let w = fonts.measure_text_width_mm(cell.trim(), font_size, r == 0)
                + 2.0 * CELL_PADDING_MM;
            natural[c] = natural[c].max(w);
        }
    }
    let total: f32 = natural.iter().sum();
    let column_widths: Vec<f32> = if total <= 0.0 {
        vec![width / columns as f32; columns]
    } else {
        natural.iter().map(|n| width * n / total).collect()
    };

    let measured_rows = rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let header = r == 0;
            let cells: Vec<Vec<String>> = (0..columns)
                .map(|c| {
                    let text = row.get(c).map(|s| s.trim()).unwrap_or("");
                    if text.is_empty() {
                        Vec::new()
                    } else {
                        let inner = column_widths[c] - 2.0 * CELL_PADDING_MM;
                        wrap_text(text, font_size, header, inner, fonts)
                    }
                })
                .collect();
            let line_count = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
            GridRow {
                y: 0.0,
                height: line_count as f32 * line_advance + 2.0 * CELL_PADDING_MM,
                header,
                cells,
            }
        })
        .collect();

    MeasuredTable {
        column_widths,
        rows: measured_rows,
        line_advance,
    }
}
