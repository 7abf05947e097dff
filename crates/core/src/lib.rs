//! Core slide model, text normalization, and markdown / plain-text
//! rendering for PowerPoint decks.

pub mod error;
pub mod normalize;
pub mod render;
pub mod types;

pub use error::{Error, Result};
pub use normalize::TextNormalizer;
pub use render::{
    render, BulletLine, ContentBlock, OutputMode, PlainBulletStyle, RenderedSlide, SlideRenderer,
};
pub use types::{Paragraph, Placeholder, Presentation, Run, Shape, ShapeKind, Slide, Table, TextBody};
