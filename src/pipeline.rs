//! Pipeline – ties together markdown parsing, flow layout and rendering into a
//! single function call.

use serde::{Deserialize, Serialize};

use crate::flow::{FlowContext, LayoutMode, LayoutOptions};
use crate::fonts::FontManager;
use crate::layout_config::DocumentLayout;
use crate::markdown::{markdown_to_plain_text, parse_markdown, Block};
use crate::render::render_pdf;

/// Configuration for the markdown → PDF pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub layout: LayoutOptions,
    pub mode: LayoutMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "policy-forge output".to_string(),
            layout: LayoutOptions::default(),
            mode: LayoutMode::Rich,
        }
    }
}

impl PipelineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Lay out markdown, optionally preceded by already-built blocks (such as a
/// title block), without rendering.
pub fn layout_document(
    preamble: &[Block],
    markdown: &str,
    config: &PipelineConfig,
    fonts: &FontManager,
) -> DocumentLayout {
    let mut ctx = FlowContext::new(config.layout, fonts);
    let mut y = ctx.layout_blocks(preamble, config.layout.margin);
    y = match config.mode {
        LayoutMode::Rich => ctx.layout_blocks(&parse_markdown(markdown), y),
        LayoutMode::PlainText => ctx.layout_plain_text(&markdown_to_plain_text(markdown), y),
    };
    log::debug!(
        "laid out '{}' on {} page(s), final y={:.1}",
        config.title,
        ctx.page_count(),
        y
    );
    ctx.finish(&config.title)
}

/// Generate only the layout (no PDF rendering) – useful for testing.
pub fn compute_layout(markdown: &str, config: &PipelineConfig) -> DocumentLayout {
    layout_document(&[], markdown, config, &FontManager::default())
}

/// Full pipeline: markdown string → PDF bytes.
///
/// Returns `(pdf_bytes, layout)`.
pub fn generate_pdf(markdown: &str, config: &PipelineConfig) -> (Vec<u8>, DocumentLayout) {
    let fonts = FontManager::default();
    let layout = layout_document(&[], markdown, config, &fonts);
    let bytes = render_pdf(&layout, &fonts);
    (bytes, layout)
}
