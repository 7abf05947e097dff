//! PPTX (Office Open XML) decoder.
//!
//! Opens the ZIP package, resolves slide order and speaker notes through the
//! package relationships, and decodes each slide's shape tree into the
//! `slides-core` model.

pub mod parser;
pub mod shape_tree;

pub use parser::PptxParser;
pub use shape_tree::parse_shape_tree;
