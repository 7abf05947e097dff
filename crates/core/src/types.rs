//! Domain types for a decoded presentation and its shape tree.

use serde::{Deserialize, Serialize};

/// A decoded presentation, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    /// Original filename (without path).
    pub filename: String,

    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Presentation {
    /// Create an empty presentation with the given filename.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            slides: Vec::new(),
        }
    }

    /// Add a slide to the presentation.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Filename with its last extension removed.
    ///
    /// `"Quarterly Review.pptx"` becomes `"Quarterly Review"`. Names without
    /// an extension, or dotfiles such as `".pptx"`, are returned unchanged.
    pub fn stem(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.filename,
        }
    }
}

/// A single slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Top-level shapes in document order.
    pub shapes: Vec<Shape>,

    /// Speaker notes, if the slide has any.
    pub notes: Option<String>,
}

impl Slide {
    /// Create a new slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            shapes: Vec::new(),
            notes: None,
        }
    }

    /// Add a top-level shape.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Index and body of the first top-level title placeholder.
    ///
    /// Only top-level shapes are considered; a title tucked inside a group is
    /// rendered as ordinary body text.
    pub fn title_shape(&self) -> Option<(usize, &TextBody)> {
        self.shapes
            .iter()
            .enumerate()
            .find_map(|(idx, shape)| match &shape.kind {
                ShapeKind::Text(body) if body.is_title() => Some((idx, body)),
                _ => None,
            })
    }
}

/// Any visual element on a slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    /// Shape id from the non-visual properties, when present.
    pub id: Option<u32>,

    /// Author-visible shape name.
    pub name: String,

    /// What the shape holds.
    pub kind: ShapeKind,
}

impl Shape {
    /// Create an unnamed shape of the given kind.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            id: None,
            name: String::new(),
            kind,
        }
    }

    /// Attach an id and name.
    pub fn with_identity(mut self, id: Option<u32>, name: impl Into<String>) -> Self {
        self.id = id;
        self.name = name.into();
        self
    }

    /// Shorthand for a text shape.
    pub fn text(body: TextBody) -> Self {
        Self::new(ShapeKind::Text(body))
    }

    /// Shorthand for a table shape.
    pub fn table(table: Table) -> Self {
        Self::new(ShapeKind::Table(table))
    }

    /// Shorthand for a group shape.
    pub fn group(children: Vec<Shape>) -> Self {
        Self::new(ShapeKind::Group(children))
    }
}

// Groups can nest arbitrarily deep; unlink children onto a heap stack so
// dropping a tree never recurses.
impl Drop for Shape {
    fn drop(&mut self) {
        let ShapeKind::Group(children) = &mut self.kind else {
            return;
        };
        let mut pending = std::mem::take(children);
        while let Some(mut shape) = pending.pop() {
            if let ShapeKind::Group(children) = &mut shape.kind {
                pending.append(children);
            }
        }
    }
}

/// The closed set of shape variants the renderer understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShapeKind {
    /// A shape with a text body.
    Text(TextBody),
    /// A table graphic frame.
    Table(Table),
    /// A group of nested shapes.
    Group(Vec<Shape>),
    /// Pictures, connectors, charts and anything without text.
    Other(String),
    /// A shape whose text could not be extracted; holds the reason.
    Unreadable(String),
}

/// Placeholder role assigned by the slide layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placeholder {
    Title,
    CenterTitle,
    VerticalTitle,
    Subtitle,
    Body,
    Object,
    Other(String),
}

impl Placeholder {
    /// Map a `p:ph/@type` attribute value. A missing type means `obj`.
    pub fn from_type(value: Option<&str>) -> Self {
        match value.unwrap_or("obj") {
            "title" => Self::Title,
            "ctrTitle" => Self::CenterTitle,
            "vertTitle" => Self::VerticalTitle,
            "subTitle" => Self::Subtitle,
            "body" => Self::Body,
            "obj" => Self::Object,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this placeholder supplies a slide title.
    pub fn is_title(&self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle | Self::VerticalTitle)
    }
}

/// Text content of a shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBody {
    /// Placeholder role, if the shape is a placeholder.
    pub placeholder: Option<Placeholder>,

    /// Paragraphs in order.
    pub paragraphs: Vec<Paragraph>,
}

impl TextBody {
    /// Create a body with no placeholder role.
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            placeholder: None,
            paragraphs,
        }
    }

    /// Set the placeholder role.
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn is_title(&self) -> bool {
        self.placeholder.as_ref().is_some_and(Placeholder::is_title)
    }

    /// All paragraph text joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A paragraph: a nesting level and its runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    /// Nesting level, 0 for top level.
    pub level: u32,

    /// Text fragments in order.
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Deepest outline level a paragraph can have (`a:pPr/@lvl` is 0..=8).
    pub const MAX_LEVEL: u32 = 8;

    /// A top-level paragraph with one run.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_level(text, 0)
    }

    /// A paragraph at the given level with one run.
    pub fn with_level(text: impl Into<String>, level: u32) -> Self {
        Self {
            level,
            runs: vec![Run::new(text)],
        }
    }

    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A text fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A table as a grid of cell text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Rows in order; each row holds its cells in order.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Widest row's cell count.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}
