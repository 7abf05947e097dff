//! Streaming decoder for a slide's `p:spTree`.
//!
//! Walks slide (or notes slide) XML with quick-xml and builds the nested
//! [`Shape`] tree. Groups are tracked on an explicit frame stack, so nesting
//! depth is only bounded by memory. Problems confined to one shape (an
//! undecodable entity, a malformed attribute) turn that shape into
//! [`ShapeKind::Unreadable`] and decoding carries on with its siblings.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use slides_core::{
    Error, Paragraph, Placeholder, Result, Run, Shape, ShapeKind, Table, TextBody,
};

/// Decode the shape tree of a slide XML document.
///
/// Returns the top-level shapes in document order. Content under
/// `mc:Fallback` is skipped so alternate renditions are not duplicated.
pub fn parse_shape_tree(xml: &str) -> Result<Vec<Shape>> {
    let mut reader = Reader::from_str(xml);
    // Whitespace inside <a:t> is significant.
    reader.trim_text(false);

    let mut builder = TreeBuilder::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => builder.start(e),
            Ok(Event::Empty(ref e)) => {
                builder.start(e);
                builder.end(local_name(e.name().as_ref()));
            }
            Ok(Event::Text(ref e)) => builder.text(e),
            Ok(Event::End(ref e)) => builder.end(local_name(e.name().as_ref())),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(builder.finish())
}

/// Leaf shape element being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafElement {
    Sp,
    GraphicFrame,
    Pic,
    CxnSp,
}

impl LeafElement {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sp" => Some(Self::Sp),
            b"graphicFrame" => Some(Self::GraphicFrame),
            b"pic" => Some(Self::Pic),
            b"cxnSp" => Some(Self::CxnSp),
            _ => None,
        }
    }
}

/// An open group (or the spTree root) collecting its children.
#[derive(Debug, Default)]
struct GroupFrame {
    id: Option<u32>,
    name: String,
    has_identity: bool,
    children: Vec<Shape>,
}

impl GroupFrame {
    fn into_shape(self) -> Shape {
        Shape::group(self.children).with_identity(self.id, self.name)
    }
}

#[derive(Debug, Default)]
struct TableFrame {
    rows: Vec<Vec<String>>,
    /// Paragraph texts of the open `a:tc`.
    cell: Option<Vec<String>>,
}

/// A leaf shape being decoded.
#[derive(Debug)]
struct ShapeFrame {
    element: LeafElement,
    id: Option<u32>,
    name: String,
    has_identity: bool,
    placeholder: Option<Placeholder>,
    has_text_body: bool,
    paragraphs: Vec<Paragraph>,
    paragraph: Option<Paragraph>,
    table: Option<TableFrame>,
    error: Option<String>,
}

impl ShapeFrame {
    fn new(element: LeafElement) -> Self {
        Self {
            element,
            id: None,
            name: String::new(),
            has_identity: false,
            placeholder: None,
            has_text_body: false,
            paragraphs: Vec::new(),
            paragraph: None,
            table: None,
            error: None,
        }
    }

    /// Record the first failure; later ones add nothing.
    fn fail(&mut self, reason: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(reason.into());
        }
    }

    fn into_shape(self) -> Shape {
        let kind = match self.error {
            Some(reason) => ShapeKind::Unreadable(reason),
            None => match self.element {
                LeafElement::Sp if self.has_text_body => ShapeKind::Text(TextBody {
                    placeholder: self.placeholder,
                    paragraphs: self.paragraphs,
                }),
                LeafElement::Sp => ShapeKind::Other("sp".to_string()),
                LeafElement::GraphicFrame => match self.table {
                    Some(table) => ShapeKind::Table(Table::new(table.rows)),
                    None => ShapeKind::Other("graphicFrame".to_string()),
                },
                LeafElement::Pic => ShapeKind::Other("pic".to_string()),
                LeafElement::CxnSp => ShapeKind::Other("cxnSp".to_string()),
            },
        };

        Shape::new(kind).with_identity(self.id, self.name)
    }
}

#[derive(Debug, Default)]
struct TreeBuilder {
    /// `groups[0]` is the spTree itself.
    groups: Vec<GroupFrame>,
    shape: Option<ShapeFrame>,
    finished: Option<Vec<Shape>>,
    /// Depth inside an `mc:Fallback` subtree, 0 when not skipping.
    skip_depth: usize,
    in_text: bool,
}

impl TreeBuilder {
    fn start(&mut self, e: &BytesStart) {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return;
        }

        let name = e.name();
        let local = local_name(name.as_ref());

        if local == b"Fallback" {
            self.skip_depth = 1;
            return;
        }

        if local == b"spTree" {
            if self.groups.is_empty() && self.finished.is_none() {
                self.groups.push(GroupFrame::default());
            }
            return;
        }

        if self.groups.is_empty() {
            return;
        }

        if self.shape.is_none() {
            if local == b"grpSp" {
                self.groups.push(GroupFrame::default());
            } else if let Some(element) = LeafElement::from_local_name(local) {
                self.shape = Some(ShapeFrame::new(element));
            } else if local == b"cNvPr" {
                self.group_identity(e);
            }
            return;
        }

        let in_text = &mut self.in_text;
        let Some(shape) = self.shape.as_mut() else {
            return;
        };

        match local {
            b"cNvPr" if !shape.has_identity => {
                shape.has_identity = true;
                match read_identity(e) {
                    Ok((id, name)) => {
                        shape.id = id;
                        shape.name = name;
                    }
                    Err(reason) => shape.fail(reason),
                }
            }
            b"ph" => match attribute(e, b"type") {
                Ok(value) => shape.placeholder = Some(Placeholder::from_type(value.as_deref())),
                Err(reason) => shape.fail(reason),
            },
            b"txBody" => shape.has_text_body = true,
            b"tbl" => shape.table = Some(TableFrame::default()),
            b"tr" => {
                if let Some(table) = shape.table.as_mut() {
                    table.rows.push(Vec::new());
                }
            }
            b"tc" => {
                if let Some(table) = shape.table.as_mut() {
                    table.cell = Some(Vec::new());
                }
            }
            b"p" => shape.paragraph = Some(Paragraph::default()),
            b"pPr" => {
                if shape.paragraph.is_some() {
                    match attribute(e, b"lvl") {
                        Ok(Some(value)) => match value.parse::<u32>() {
                            Ok(level) if level <= Paragraph::MAX_LEVEL => {
                                if let Some(paragraph) = shape.paragraph.as_mut() {
                                    paragraph.level = level;
                                }
                            }
                            _ => shape.fail(format!("invalid paragraph level '{}'", value)),
                        },
                        Ok(None) => {}
                        Err(reason) => shape.fail(reason),
                    }
                }
            }
            b"t" => *in_text = shape.paragraph.is_some(),
            b"br" => {
                if let Some(paragraph) = shape.paragraph.as_mut() {
                    paragraph.runs.push(Run::new("\n"));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, e: &BytesText) {
        if self.skip_depth > 0 || !self.in_text {
            return;
        }
        let Some(shape) = self.shape.as_mut() else {
            return;
        };

        match e.unescape() {
            Ok(text) => {
                if let Some(paragraph) = shape.paragraph.as_mut() {
                    paragraph.runs.push(Run::new(text.into_owned()));
                }
            }
            Err(err) => shape.fail(format!("undecodable text: {}", err)),
        }
    }

    fn end(&mut self, local: &[u8]) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }

        if local == b"spTree" {
            self.close_tree();
            return;
        }

        if let Some(shape) = self.shape.as_mut() {
            match local {
                b"t" => self.in_text = false,
                b"p" => {
                    if let Some(paragraph) = shape.paragraph.take() {
                        match shape.table.as_mut().and_then(|t| t.cell.as_mut()) {
                            Some(cell) => cell.push(paragraph.text()),
                            None => shape.paragraphs.push(paragraph),
                        }
                    }
                }
                b"tc" => {
                    if let Some(table) = shape.table.as_mut() {
                        if let Some(cell) = table.cell.take() {
                            if table.rows.is_empty() {
                                table.rows.push(Vec::new());
                            }
                            if let Some(row) = table.rows.last_mut() {
                                row.push(cell.join("\n"));
                            }
                        }
                    }
                }
                _ => {
                    if LeafElement::from_local_name(local) == Some(shape.element) {
                        self.close_shape();
                    }
                }
            }
            return;
        }

        if local == b"grpSp" && self.groups.len() > 1 {
            self.close_group();
        }
    }

    fn group_identity(&mut self, e: &BytesStart) {
        let Some(group) = self.groups.last_mut() else {
            return;
        };
        if group.has_identity {
            return;
        }
        group.has_identity = true;
        match read_identity(e) {
            Ok((id, name)) => {
                group.id = id;
                group.name = name;
            }
            Err(reason) => log::warn!("Ignoring malformed group properties: {}", reason),
        }
    }

    fn close_shape(&mut self) {
        self.in_text = false;
        if let (Some(shape), Some(parent)) = (self.shape.take(), self.groups.last_mut()) {
            parent.children.push(shape.into_shape());
        }
    }

    fn close_group(&mut self) {
        if let Some(group) = self.groups.pop() {
            if let Some(parent) = self.groups.last_mut() {
                parent.children.push(group.into_shape());
            }
        }
    }

    /// Fold any still-open frames into the root and keep its children.
    fn close_tree(&mut self) {
        if self.shape.is_some() {
            self.close_shape();
        }
        while self.groups.len() > 1 {
            self.close_group();
        }
        if let Some(root) = self.groups.pop() {
            self.finished = Some(root.children);
        }
    }

    fn finish(mut self) -> Vec<Shape> {
        if self.finished.is_none() {
            self.close_tree();
        }
        self.finished.unwrap_or_default()
    }
}

/// Read `id` and `name` from a `cNvPr` element.
fn read_identity(e: &BytesStart) -> std::result::Result<(Option<u32>, String), String> {
    let id = attribute(e, b"id")?.and_then(|v| v.parse::<u32>().ok());
    let name = attribute(e, b"name")?.unwrap_or_default();
    Ok((id, name))
}

/// Look up an unprefixed attribute and unescape its value.
fn attribute(e: &BytesStart, key: &[u8]) -> std::result::Result<Option<String>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("malformed attribute: {}", err))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| format!("undecodable attribute value: {}", err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
