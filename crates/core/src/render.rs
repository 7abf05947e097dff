//! Markdown and plain-text rendering of a decoded presentation.
//!
//! Each slide is first classified into a [`RenderedSlide`] (title plus an
//! ordered list of content blocks), then serialized for the chosen
//! [`OutputMode`]. Blocks are separated by a blank line; consecutive bullet
//! lines are kept together.
//!
//! # Example output (markdown)
//! ```text
//! # Quarterly Review
//!
//! ## Welcome
//!
//! - Hello
//!   - Nested point
//!
//! ## Slide 2
//!
//! | A | B |
//! | --- | --- |
//! | 1 | 2 |
//!
//! **Notes:**
//! > Remember the numbers
//! ```

use crate::normalize::TextNormalizer;
use crate::types::{Paragraph, Presentation, Shape, ShapeKind, Slide, Table, TextBody};
use serde::{Deserialize, Serialize};

/// Indentation unit per nesting level.
const INDENT: &str = "  ";

/// Output flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// Headings, `-` bullets, pipe tables and blockquoted notes.
    #[default]
    Markdown,
    /// `--- Slide <n> ---` separators, indented lines and delimited rows.
    PlainText,
}

impl OutputMode {
    /// File extension for rendered output, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::PlainText => "txt",
        }
    }
}

/// How nested paragraphs are laid out in plain-text mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlainBulletStyle {
    /// Two spaces per nesting level.
    #[default]
    Indented,
    /// Every paragraph flush left.
    Flat,
}

/// One paragraph of body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletLine {
    pub level: u32,
    pub text: String,
}

/// A unit of slide content, in the order it was encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Bullet(BulletLine),
    /// Normalized cell text, padded so every row has the same width.
    Table(Vec<Vec<String>>),
    Notes(String),
}

/// A slide after classification, before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSlide {
    /// 1-based slide number.
    pub number: usize,
    pub title: Option<String>,
    pub blocks: Vec<ContentBlock>,
}

/// Render a whole deck with default settings for `mode`.
pub fn render(presentation: &Presentation, mode: OutputMode) -> String {
    SlideRenderer::new(mode).render(presentation)
}

/// Configurable renderer for presentations.
#[derive(Debug, Clone)]
pub struct SlideRenderer {
    mode: OutputMode,
    deck_title: bool,
    notes: bool,
    plain_bullets: PlainBulletStyle,
    cell_delimiter: String,
    normalizer: TextNormalizer,
}

impl Default for SlideRenderer {
    fn default() -> Self {
        Self::new(OutputMode::default())
    }
}

impl SlideRenderer {
    /// Create a renderer with the deck heading and notes enabled.
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            deck_title: true,
            notes: true,
            plain_bullets: PlainBulletStyle::default(),
            cell_delimiter: " | ".to_string(),
            normalizer: TextNormalizer::new(),
        }
    }

    /// Emit `# <filename stem>` at the top of markdown output.
    pub fn with_deck_title(mut self, enabled: bool) -> Self {
        self.deck_title = enabled;
        self
    }

    /// Include speaker notes blocks.
    pub fn with_notes(mut self, enabled: bool) -> Self {
        self.notes = enabled;
        self
    }

    /// Choose how plain-text mode lays out nested paragraphs.
    pub fn with_plain_bullets(mut self, style: PlainBulletStyle) -> Self {
        self.plain_bullets = style;
        self
    }

    /// Delimiter between cells in plain-text tables.
    pub fn with_cell_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.cell_delimiter = delimiter.into();
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Render every slide in order into a single text blob.
    ///
    /// Non-empty output always ends with exactly one newline.
    pub fn render(&self, presentation: &Presentation) -> String {
        let mut chunks: Vec<String> = Vec::new();

        if self.mode == OutputMode::Markdown && self.deck_title {
            chunks.push(format!("# {}", presentation.stem()));
        }

        for slide in &presentation.slides {
            let rendered = self.render_slide(slide);
            self.write_slide(&rendered, &mut chunks);
        }

        if chunks.is_empty() {
            String::new()
        } else {
            let mut output = chunks.join("\n\n");
            output.push('\n');
            output
        }
    }

    /// Classify a slide's shapes into a title and content blocks.
    pub fn render_slide(&self, slide: &Slide) -> RenderedSlide {
        let title_shape = slide.title_shape();
        let title = title_shape
            .map(|(_, body)| self.normalizer.normalize_inline(&body.text()))
            .filter(|t| !t.is_empty());
        let skip = title_shape.map(|(idx, _)| idx);

        let mut blocks = Vec::new();
        for (idx, shape) in slide.shapes.iter().enumerate() {
            if Some(idx) == skip {
                continue;
            }
            self.collect_shape(slide.number, shape, &mut blocks);
        }

        if self.notes {
            if let Some(notes) = &slide.notes {
                let notes = self.normalizer.normalize_block(notes);
                if !notes.is_empty() {
                    blocks.push(ContentBlock::Notes(notes));
                }
            }
        }

        RenderedSlide {
            number: slide.number,
            title,
            blocks,
        }
    }

    /// Walk a shape and everything nested under it, depth first, in order.
    fn collect_shape(&self, slide_number: usize, shape: &Shape, blocks: &mut Vec<ContentBlock>) {
        let mut stack = vec![std::slice::from_ref(shape).iter()];

        while let Some(iter) = stack.last_mut() {
            let Some(shape) = iter.next() else {
                stack.pop();
                continue;
            };

            match &shape.kind {
                ShapeKind::Text(body) => self.collect_paragraphs(body, blocks),
                ShapeKind::Table(table) => {
                    if let Some(block) = self.table_block(table) {
                        blocks.push(block);
                    }
                }
                ShapeKind::Group(children) => stack.push(children.iter()),
                ShapeKind::Other(_) => {}
                ShapeKind::Unreadable(reason) => {
                    log::warn!(
                        "Slide {}: skipping shape '{}': {}",
                        slide_number,
                        shape.name,
                        reason
                    );
                }
            }
        }
    }

    fn collect_paragraphs(&self, body: &TextBody, blocks: &mut Vec<ContentBlock>) {
        for paragraph in &body.paragraphs {
            let text = self.normalizer.normalize_inline(&paragraph.text());
            if !text.is_empty() {
                blocks.push(ContentBlock::Bullet(BulletLine {
                    level: paragraph.level,
                    text,
                }));
            }
        }
    }

    fn table_block(&self, table: &Table) -> Option<ContentBlock> {
        let columns = table.column_count();
        if columns == 0 {
            return None;
        }

        let rows = table
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = row
                    .iter()
                    .map(|cell| self.normalizer.normalize_inline(cell))
                    .collect();
                cells.resize(columns, String::new());
                cells
            })
            .collect();

        Some(ContentBlock::Table(rows))
    }

    fn write_slide(&self, slide: &RenderedSlide, chunks: &mut Vec<String>) {
        chunks.push(match self.mode {
            OutputMode::Markdown => match &slide.title {
                Some(title) => format!("## {}", title),
                None => format!("## Slide {}", slide.number),
            },
            OutputMode::PlainText => match &slide.title {
                Some(title) => format!("--- Slide {} ---\n{}", slide.number, title),
                None => format!("--- Slide {} ---", slide.number),
            },
        });

        let mut bullets: Vec<String> = Vec::new();
        for block in &slide.blocks {
            match block {
                ContentBlock::Bullet(line) => bullets.push(self.bullet_line(line)),
                ContentBlock::Table(rows) => {
                    flush_bullets(&mut bullets, chunks);
                    chunks.push(self.table_text(rows));
                }
                ContentBlock::Notes(notes) => {
                    flush_bullets(&mut bullets, chunks);
                    chunks.push(self.notes_text(notes));
                }
            }
        }
        flush_bullets(&mut bullets, chunks);
    }

    fn bullet_line(&self, line: &BulletLine) -> String {
        let indent = INDENT.repeat(line.level.min(Paragraph::MAX_LEVEL) as usize);
        match (self.mode, self.plain_bullets) {
            (OutputMode::Markdown, _) => format!("{}- {}", indent, line.text),
            (OutputMode::PlainText, PlainBulletStyle::Indented) => {
                format!("{}{}", indent, line.text)
            }
            (OutputMode::PlainText, PlainBulletStyle::Flat) => line.text.clone(),
        }
    }

    fn table_text(&self, rows: &[Vec<String>]) -> String {
        match self.mode {
            OutputMode::Markdown => {
                let mut lines = Vec::with_capacity(rows.len() + 1);
                for (idx, row) in rows.iter().enumerate() {
                    let cells: Vec<String> = row
                        .iter()
                        .map(|c| self.normalizer.markdown_cell(c))
                        .collect();
                    lines.push(format!("| {} |", cells.join(" | ")));
                    if idx == 0 {
                        lines.push(format!("| {} |", vec!["---"; row.len()].join(" | ")));
                    }
                }
                lines.join("\n")
            }
            OutputMode::PlainText => rows
                .iter()
                .map(|row| row.join(&self.cell_delimiter))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn notes_text(&self, notes: &str) -> String {
        match self.mode {
            OutputMode::Markdown => {
                let quoted: Vec<String> = notes
                    .split('\n')
                    .map(|line| {
                        if line.is_empty() {
                            ">".to_string()
                        } else {
                            format!("> {}", line)
                        }
                    })
                    .collect();
                format!("**Notes:**\n{}", quoted.join("\n"))
            }
            OutputMode::PlainText => format!("Notes:\n{}", notes),
        }
    }
}

/// Move pending bullet lines into one chunk.
fn flush_bullets(bullets: &mut Vec<String>, chunks: &mut Vec<String>) {
    if !bullets.is_empty() {
        chunks.push(bullets.join("\n"));
        bullets.clear();
    }
}
