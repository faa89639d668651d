//! Markdown → block tree.
//!
//! Markdown is rendered to HTML with `pulldown-cmark` (tables enabled), parsed
//! with [`crate::dom`], and folded into the small set of [`Block`] variants the
//! flow engine understands. Inline formatting is flattened into plain text.

use std::sync::OnceLock;

use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

use crate::dom::{body_children, parse_html, DomNode, ElementNode, Tag};

/// A structural unit of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    List { ordered: bool, items: Vec<String> },
    /// Row 0 is the header row when present.
    Table { rows: Vec<Vec<String>> },
    LineBreak,
    /// Any other element. Children are laid out in order; a childless node
    /// with text is laid out like a paragraph.
    Generic { text: String, children: Vec<Block> },
}

/// Render markdown to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Parse markdown into a block tree.
pub fn parse_markdown(markdown: &str) -> Vec<Block> {
    let html = markdown_to_html(markdown);
    let dom = parse_html(&html);
    blocks_from_dom(&body_children(&dom))
}

/// Convert a DOM node list into blocks.
///
/// Runs of inline content at block level (text, emphasis, links) are
/// gathered into a single paragraph.
pub fn blocks_from_dom(nodes: &[DomNode]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut inline_run = InlineText::default();

    for node in nodes {
        match node {
            DomNode::Text(t) => inline_run.push_text(t),
            DomNode::Element(e) if e.tag == Tag::Br => {
                if inline_run.is_blank() {
                    blocks.push(Block::LineBreak);
                } else {
                    inline_run.push_break();
                }
            }
            DomNode::Element(e) if e.tag.is_inline() => inline_run.push_element(e),
            DomNode::Element(e) => {
                flush_inline(&mut inline_run, &mut blocks);
                blocks.push(block_from_element(e));
            }
        }
    }
    flush_inline(&mut inline_run, &mut blocks);
    blocks
}

fn flush_inline(run: &mut InlineText, blocks: &mut Vec<Block>) {
    let text = std::mem::take(run).finish();
    if !text.trim().is_empty() {
        blocks.push(Block::Paragraph(text));
    }
}

fn block_from_element(e: &ElementNode) -> Block {
    match &e.tag {
        Tag::Heading(level) => Block::Heading {
            level: *level,
            text: inline_text(&e.children),
        },
        Tag::P => Block::Paragraph(inline_text(&e.children)),
        Tag::Ul | Tag::Ol => Block::List {
            ordered: e.tag == Tag::Ol,
            items: list_items(e, 0),
        },
        Tag::Table => Block::Table {
            rows: table_rows(e),
        },
        Tag::Pre => Block::Generic {
            text: preformatted_text(&e.children),
            children: Vec::new(),
        },
        _ => {
            let children = blocks_from_dom(&e.children);
            let text = if children.is_empty() {
                inline_text(&e.children)
            } else {
                String::new()
            };
            Block::Generic { text, children }
        }
    }
}

/// List item texts. Nested lists are folded into their parent item as extra
/// lines, indented and dashed per depth.
fn list_items(list: &ElementNode, depth: usize) -> Vec<String> {
    list.child_elements()
        .filter(|li| li.tag == Tag::Li)
        .map(|li| {
            let mut own = InlineText::default();
            let mut nested = Vec::new();
            for child in &li.children {
                match child {
                    DomNode::Element(sub) if matches!(sub.tag, Tag::Ul | Tag::Ol) => {
                        for item in list_items(sub, depth + 1) {
                            nested.push(format!("{}- {}", "  ".repeat(depth), item));
                        }
                    }
                    // Loose lists wrap item content in <p>.
                    DomNode::Element(p) if p.tag == Tag::P => {
                        own.push_text(" ");
                        own.push_element(p);
                        own.push_text(" ");
                    }
                    DomNode::Element(sub) => own.push_element(sub),
                    DomNode::Text(t) => own.push_text(t),
                }
            }
            let mut text = own.finish();
            for line in nested {
                text.push('\n');
                text.push_str(&line);
            }
            text
        })
        .collect()
}

fn table_rows(table: &ElementNode) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    collect_rows(table, &mut rows);
    rows
}

fn collect_rows(e: &ElementNode, rows: &mut Vec<Vec<String>>) {
    for child in e.child_elements() {
        match child.tag {
            Tag::Tr => rows.push(
                child
                    .child_elements()
                    .filter(|c| matches!(c.tag, Tag::Th | Tag::Td))
                    .map(|c| inline_text(&c.children))
                    .collect(),
            ),
            Tag::Thead | Tag::Tbody => collect_rows(child, rows),
            _ => {}
        }
    }
}

fn preformatted_text(nodes: &[DomNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => out.push_str(&preformatted_text(&e.children)),
        }
    }
    out.trim_end_matches('\n').to_string()
}

/// Flatten inline content to plain text.
pub fn inline_text(nodes: &[DomNode]) -> String {
    let mut run = InlineText::default();
    for node in nodes {
        match node {
            DomNode::Text(t) => run.push_text(t),
            DomNode::Element(e) => run.push_element(e),
        }
    }
    run.finish()
}

/// Accumulates inline text with HTML whitespace collapsing. Explicit `<br>`
/// becomes a newline, which the text wrapper treats as a hard break.
#[derive(Default)]
struct InlineText {
    out: String,
    pending_space: bool,
}

impl InlineText {
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() && c != '\u{00A0}' {
                self.pending_space = true;
            } else {
                if self.pending_space && !self.out.is_empty() && !self.out.ends_with('\n') {
                    self.out.push(' ');
                }
                self.pending_space = false;
                self.out.push(c);
            }
        }
    }

    fn push_break(&mut self) {
        self.out.push('\n');
        self.pending_space = false;
    }

    fn push_element(&mut self, e: &ElementNode) {
        match e.tag {
            Tag::Br => self.push_break(),
            Tag::Img => {
                if let Some(alt) = e.attr("alt") {
                    self.push_text(alt);
                }
            }
            _ => {
                for child in &e.children {
                    match child {
                        DomNode::Text(t) => self.push_text(t),
                        DomNode::Element(sub) => self.push_element(sub),
                    }
                }
            }
        }
    }

    fn is_blank(&self) -> bool {
        self.out.trim().is_empty()
    }

    fn finish(self) -> String {
        self.out.trim_end().to_string()
    }
}

/// Length of the `=` underline written beneath headings in plain-text output.
pub const HEADING_UNDERLINE_LEN: usize = 50;

struct PlainPatterns {
    fence: Regex,
    rule: Regex,
    table_rule: Regex,
    heading: Regex,
    bullet: Regex,
    bold: Regex,
    bold_underscore: Regex,
    italic: Regex,
    italic_underscore: Regex,
    code: Regex,
}

impl PlainPatterns {
    fn get() -> &'static PlainPatterns {
        static PATTERNS: OnceLock<PlainPatterns> = OnceLock::new();
        PATTERNS.get_or_init(|| PlainPatterns {
            fence: Regex::new(r"^\s*(```|~~~)").unwrap(),
            rule: Regex::new(r"^\s{0,3}([-*_])(\s*[-*_]){2,}\s*$").unwrap(),
            table_rule: Regex::new(r"^\s*\|?(\s*:?-+:?\s*\|)+\s*(:?-+:?)?\s*$").unwrap(),
            heading: Regex::new(r"^\s{0,3}#{1,6}\s+(.*?)\s*#*\s*$").unwrap(),
            bullet: Regex::new(r"^(\s*)[-*+]\s+").unwrap(),
            bold: Regex::new(r"\*\*(.+?)\*\*").unwrap(),
            bold_underscore: Regex::new(r"__(.+?)__").unwrap(),
            italic: Regex::new(r"\*([^*\s][^*]*?)\*").unwrap(),
            italic_underscore: Regex::new(r"(^|[^\w])_([^_]+)_([^\w]|$)").unwrap(),
            code: Regex::new(r"`([^`]+)`").unwrap(),
        })
    }

    fn strip_inline(&self, line: &str) -> String {
        let line = self.code.replace_all(line, "$1");
        let line = self.bold.replace_all(&line, "$1");
        let line = self.bold_underscore.replace_all(&line, "$1");
        let line = self.italic.replace_all(&line, "$1");
        let line = self.italic_underscore.replace_all(&line, "$1$2$3");
        line.into_owned()
    }
}

/// Strip markdown down to plain text for the degraded layout path.
///
/// Headings become their text followed by a line of `=`; emphasis markers,
/// inline code backticks, code fences, rules and table alignment rows are
/// removed; bullets become `•`.
pub fn markdown_to_plain_text(markdown: &str) -> String {
    let p = PlainPatterns::get();
    let mut out: Vec<String> = Vec::new();
    for line in markdown.lines() {
        if p.fence.is_match(line) || p.rule.is_match(line) || p.table_rule.is_match(line) {
            continue;
        }
        if let Some(caps) = p.heading.captures(line) {
            out.push(p.strip_inline(&caps[1]));
            out.push("=".repeat(HEADING_UNDERLINE_LEN));
            continue;
        }
        let line = p.bullet.replace(line, "${1}• ");
        out.push(p.strip_inline(&line));
    }
    out.join("\n")
}
