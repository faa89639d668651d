//! PDF renderer – takes a [`DocumentLayout`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).

use printpdf::*;

use crate::fonts::{FontManager, PT_TO_MM};
use crate::layout_config::*;

/// Header cell shading (#f2f2f2).
const HEADER_FILL: [f32; 3] = [0.949, 0.949, 0.949];
const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
const GRID_LINE_PT: f32 = 0.75;

fn mm_to_pt(mm: f32) -> f32 {
    mm / PT_TO_MM
}

/// Render a DocumentLayout into PDF bytes.
pub fn render_pdf(layout: &DocumentLayout, fonts: &FontManager) -> Vec<u8> {
    let page_w = Mm(layout.page_width_mm);
    let page_h = Mm(layout.page_height_mm);
    let page_h_pt = mm_to_pt(layout.page_height_mm);

    let mut doc = PdfDocument::new(&layout.title);

    let mut pages: Vec<PdfPage> = layout
        .pages
        .iter()
        .map(|page_layout| {
            let mut ops = Vec::new();
            for op in &page_layout.ops {
                match op {
                    DrawOp::Text(run) => render_text_run(&mut ops, run, page_h_pt, fonts),
                    DrawOp::Table(grid) => render_table(&mut ops, grid, page_h_pt, fonts),
                }
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect();

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    doc.save(&PdfSaveOptions::default(), &mut Vec::new())
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0x9F range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn rgb(c: [f32; 3]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Corners of a rectangle given in PDF space (origin bottom-left).
fn rect_points(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<LinePoint> {
    vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)]
}

/// Write one line of text. `top_pt` is the top of the line box in PDF space.
fn write_text(
    ops: &mut Vec<Op>,
    text: &str,
    x_pt: f32,
    top_pt: f32,
    font_size: f32,
    bold: bool,
    fonts: &FontManager,
) {
    let font = if bold {
        BuiltinFont::HelveticaBold
    } else {
        BuiltinFont::Helvetica
    };
    let baseline = top_pt - fonts.ascender_pt(font_size);

    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(x_pt),
            y: Pt(baseline),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(font_size),
        font,
    });
    ops.push(Op::SetFillColor { col: rgb(BLACK) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

fn render_text_run(ops: &mut Vec<Op>, run: &TextRun, page_h_pt: f32, fonts: &FontManager) {
    if run.text.is_empty() {
        return;
    }
    // PDF coordinate system: origin at bottom-left; layout is top-left.
    let top = page_h_pt - mm_to_pt(run.y);
    write_text(
        ops,
        &run.text,
        mm_to_pt(run.x),
        top,
        run.font_size,
        run.bold,
        fonts,
    );
}

fn render_table(ops: &mut Vec<Op>, grid: &TableGrid, page_h_pt: f32, fonts: &FontManager) {
    for row in &grid.rows {
        let row_top = page_h_pt - mm_to_pt(row.y);
        let row_bottom = row_top - mm_to_pt(row.height);
        let mut x_mm = grid.x;

        for (col, width_mm) in grid.column_widths.iter().enumerate() {
            let x1 = mm_to_pt(x_mm);
            let x2 = mm_to_pt(x_mm + width_mm);

            // Header shading
            if row.header {
                ops.push(Op::SetFillColor {
                    col: rgb(HEADER_FILL),
                });
                ops.push(Op::DrawPolygon {
                    polygon: Polygon {
                        rings: vec![PolygonRing {
                            points: rect_points(x1, row_bottom, x2, row_top),
                        }],
                        mode: PaintMode::Fill,
                        winding_order: WindingOrder::NonZero,
                    },
                });
            }

            // Cell border
            ops.push(Op::SetOutlineColor { col: rgb(BLACK) });
            ops.push(Op::SetOutlineThickness {
                pt: Pt(GRID_LINE_PT),
            });
            ops.push(Op::DrawLine {
                line: Line {
                    points: rect_points(x1, row_bottom, x2, row_top),
                    is_closed: true,
                },
            });

            // Cell text
            if let Some(lines) = row.cells.get(col) {
                let text_x = mm_to_pt(x_mm + grid.cell_padding);
                for (i, line) in lines.iter().enumerate() {
                    if line.is_empty() {
                        continue;
                    }
                    let line_top_mm = row.y + grid.cell_padding + i as f32 * grid.line_advance;
                    write_text(
                        ops,
                        line,
                        text_x,
                        page_h_pt - mm_to_pt(line_top_mm),
                        grid.font_size,
                        row.header,
                        fonts,
                    );
                }
            }

            x_mm += width_mm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty_layout() {
        let layout = DocumentLayout::a4();
        let bytes = render_pdf(&layout, &FontManager::default());
        assert!(bytes.len() > 100, "PDF should have content");
        // PDF magic number
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn bullet_maps_to_winansi() {
        let s = to_winlatin("• A");
        assert_eq!(s.as_bytes(), &[0x95, b' ', b'A']);
    }

    #[test]
    fn unmappable_chars_become_question_marks() {
        assert_eq!(to_winlatin("✓ ok").as_bytes(), b"? ok");
    }
}
