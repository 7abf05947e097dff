//! PPTX package reader.
//!
//! Resolves slide order and speaker notes through the package
//! relationships, then hands each part to the shape tree decoder.

use crate::shape_tree::{local_name, parse_shape_tree};
use quick_xml::events::Event;
use quick_xml::Reader;
use slides_core::{Error, Presentation, Result, Shape, ShapeKind, Slide};
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    ///
    /// Fails fast: an unreadable container, a missing presentation part or a
    /// malformed slide aborts the whole file. Speaker notes that cannot be
    /// read are logged and left out.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<Presentation> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut presentation = Presentation::new(filename);

        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("{}: {} slides", filename, slide_order.len());

        for (idx, slide_path) in slide_order.iter().enumerate() {
            let slide = self.parse_slide(&mut archive, slide_path, idx + 1)?;
            presentation.add_slide(slide);
        }

        Ok(presentation)
    }

    /// Get the ordered list of slide part paths.
    ///
    /// The authoritative order is `p:sldIdLst` in presentation.xml. Packages
    /// without one fall back to the number embedded in each relationship.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let relationships = self
            .read_relationships(archive, PRESENTATION_PART)
            .map_err(|e| Error::CorruptedFile(format!("Not a presentation package: {}", e)))?;

        let slide_ids = match self.read_file_from_archive(archive, PRESENTATION_PART) {
            Ok(xml) => parse_slide_id_list(&xml)?,
            Err(e) => {
                log::warn!("Falling back to relationship order: {}", e);
                Vec::new()
            }
        };

        if !slide_ids.is_empty() {
            let mut slides = Vec::with_capacity(slide_ids.len());
            for id in &slide_ids {
                match relationships.iter().find(|r| &r.id == id && r.is_slide()) {
                    Some(rel) => slides.push(rel.target.clone()),
                    None => log::warn!("Slide id list references unknown relationship '{}'", id),
                }
            }
            return Ok(slides);
        }

        let mut slides: Vec<(String, Option<usize>)> = relationships
            .iter()
            .filter(|r| r.is_slide())
            .map(|r| {
                let order = extract_slide_number(&r.target).or_else(|| extract_slide_number(&r.id));
                (r.target.clone(), order)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide and its notes from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<Slide> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let mut slide = Slide::new(slide_number);

        slide.shapes = parse_shape_tree(&content)
            .map_err(|e| Error::PptxParseError(format!("{}: {}", slide_path, e)))?;
        slide.notes = self.parse_notes(archive, slide_path);

        Ok(slide)
    }

    /// Speaker notes text for a slide, if it has a notes part.
    fn parse_notes<R: Read + Seek>(&self, archive: &mut ZipArchive<R>, slide_path: &str) -> Option<String> {
        let relationships = match self.read_relationships(archive, slide_path) {
            Ok(rels) => rels,
            Err(e) => {
                log::debug!("No relationships for {}: {}", slide_path, e);
                return None;
            }
        };

        let notes_path = relationships.iter().find(|r| r.is_notes_slide())?.target.clone();

        let shapes = match self
            .read_file_from_archive(archive, &notes_path)
            .and_then(|xml| parse_shape_tree(&xml))
        {
            Ok(shapes) => shapes,
            Err(e) => {
                log::warn!("Skipping notes for {}: {}", slide_path, e);
                return None;
            }
        };

        notes_text(&shapes)
    }

    /// Read and resolve the relationships of a package part.
    fn read_relationships<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        part_path: &str,
    ) -> Result<Vec<Relationship>> {
        let xml = self.read_file_from_archive(archive, &rels_path_for(part_path))?;
        parse_relationships(&xml, part_path)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content).map_err(|e| {
            Error::IoError(std::io::Error::new(e.kind(), format!("'{}': {}", path, e)))
        })?;

        Ok(content)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A package relationship with its target resolved to an archive path.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

impl Relationship {
    fn is_slide(&self) -> bool {
        self.rel_type.ends_with("/slide")
    }

    fn is_notes_slide(&self) -> bool {
        self.rel_type.ends_with("/notesSlide")
    }
}

/// Parse a `.rels` document. External targets (hyperlinks) are dropped.
fn parse_relationships(xml: &str, source_part: &str) -> Result<Vec<Relationship>> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut id = String::new();
                let mut external = false;

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        b"Id" => id = value,
                        b"TargetMode" => external = value == "External",
                        _ => {}
                    }
                }

                if !external && !id.is_empty() && !target.is_empty() {
                    relationships.push(Relationship {
                        id,
                        rel_type,
                        target: resolve_target(source_part, &target),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Relationship ids of `p:sldIdLst`, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"sldId" => {
                // The unprefixed `id` is the numeric slide id; `r:id` links the part.
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"id" && attr.key.prefix().is_some() {
                        ids.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::PptxParseError(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Text of the notes body placeholder, paragraphs joined by newlines.
fn notes_text(shapes: &[Shape]) -> Option<String> {
    shapes.iter().find_map(|shape| match &shape.kind {
        ShapeKind::Text(body)
            if body.placeholder == Some(slides_core::Placeholder::Body) =>
        {
            let text = body.text();
            if text.trim().is_empty() {
                None
            } else {
                Some(text)
            }
        }
        _ => None,
    })
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`.
fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part_path),
    }
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape_tree::tests::{slide_xml, table_shape, text_shape};
    use slides_core::{render, OutputMode};
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    const REL_NOTES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
    const REL_LAYOUT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";

    struct TestSlide {
        xml: String,
        notes: Option<String>,
    }

    fn rels_xml(entries: &[(String, &str, String)]) -> String {
        let body: String = entries
            .iter()
            .map(|(id, ty, target)| format!(r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#, id, ty, target))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            body
        )
    }

    fn notes_xml(text: &str) -> String {
        slide_xml(&(text_shape(2, Some("sldImg"), &[]) + &text_shape(3, Some("body"), &[(0, text)])))
            .replace("<p:sld ", "<p:notes ")
            .replace("</p:sld>", "</p:notes>")
    }

    /// Build a package with `slideN.xml` linked as `rId{10 + N}`. `order`
    /// lists slide numbers for `p:sldIdLst`; `None` leaves out presentation.xml.
    fn build_pptx(slides: &[TestSlide], order: Option<&[usize]>) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let mut pres_rels = Vec::new();
        for (idx, slide) in slides.iter().enumerate() {
            let n = idx + 1;
            pres_rels.push((format!("rId{}", 10 + n), REL_SLIDE, format!("slides/slide{}.xml", n)));

            zip.start_file(format!("ppt/slides/slide{}.xml", n), options).unwrap();
            zip.write_all(slide.xml.as_bytes()).unwrap();

            let mut slide_rels = vec![(
                "rId1".to_string(),
                REL_LAYOUT,
                "../slideLayouts/slideLayout1.xml".to_string(),
            )];
            if let Some(notes) = &slide.notes {
                slide_rels.push((
                    "rId2".to_string(),
                    REL_NOTES,
                    format!("../notesSlides/notesSlide{}.xml", n),
                ));
                zip.start_file(format!("ppt/notesSlides/notesSlide{}.xml", n), options).unwrap();
                zip.write_all(notes_xml(notes).as_bytes()).unwrap();
            }
            zip.start_file(format!("ppt/slides/_rels/slide{}.xml.rels", n), options).unwrap();
            zip.write_all(rels_xml(&slide_rels).as_bytes()).unwrap();
        }
        pres_rels.push(("rId1".to_string(), "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster", "slideMasters/slideMaster1.xml".to_string()));

        zip.start_file("ppt/_rels/presentation.xml.rels", options).unwrap();
        zip.write_all(rels_xml(&pres_rels).as_bytes()).unwrap();

        if let Some(order) = order {
            let ids: String = order
                .iter()
                .enumerate()
                .map(|(i, n)| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, 10 + n))
                .collect();
            zip.start_file(PRESENTATION_PART, options).unwrap();
            zip.write_all(
                format!(
                    r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
                    ids
                )
                .as_bytes(),
            )
            .unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    fn slide_with(shapes: String, notes: Option<&str>) -> TestSlide {
        TestSlide {
            xml: slide_xml(&shapes),
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_two_slide_deck_to_markdown() {
        let data = build_pptx(
            &[
                slide_with(
                    text_shape(2, Some("title"), &[(0, "Welcome")]) + &text_shape(3, Some("body"), &[(0, "Hello")]),
                    None,
                ),
                slide_with(table_shape(4, &[&["A", "B"], &["1", "2"]]), Some("Say hi")),
            ],
            Some(&[1, 2]),
        );

        let presentation = PptxParser::new().parse(Cursor::new(data), "Deck.pptx").unwrap();
        assert_eq!(presentation.slides.len(), 2);
        assert_eq!(presentation.slides[1].notes.as_deref(), Some("Say hi"));

        let output = render(&presentation, OutputMode::Markdown);
        assert!(output.starts_with("# Deck\n"));
        assert!(output.contains("## Welcome\n\n- Hello\n"));
        assert!(output.contains("## Slide 2\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n"));
        assert!(output.contains("**Notes:**\n> Say hi\n"));
    }

    #[test]
    fn test_slide_order_follows_slide_id_list() {
        let slides: Vec<TestSlide> = ["one", "two", "three"]
            .iter()
            .map(|&t| slide_with(text_shape(2, None, &[(0, t)]), None))
            .collect();
        let data = build_pptx(&slides, Some(&[3, 1, 2]));

        let presentation = PptxParser::new().parse(Cursor::new(data), "x.pptx").unwrap();
        let firsts: Vec<String> = presentation
            .slides
            .iter()
            .map(|s| match &s.shapes[0].kind {
                ShapeKind::Text(body) => body.text(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(firsts, vec!["three", "one", "two"]);
        let numbers: Vec<usize> = presentation.slides.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_slide_order_falls_back_to_relationship_numbers() {
        let slides: Vec<TestSlide> = (1..=11)
            .map(|n| {
                let label = n.to_string();
                slide_with(text_shape(2, None, &[(0, label.as_str())]), None)
            })
            .collect();
        let data = build_pptx(&slides, None);

        let presentation = PptxParser::new().parse(Cursor::new(data), "x.pptx").unwrap();
        assert_eq!(presentation.slides.len(), 11);
        match &presentation.slides[10].shapes[0].kind {
            ShapeKind::Text(body) => assert_eq!(body.text(), "11"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_slide_without_notes_has_none() {
        let data = build_pptx(&[slide_with(text_shape(2, None, &[(0, "x")]), None)], Some(&[1]));
        let presentation = PptxParser::new().parse(Cursor::new(data), "x.pptx").unwrap();
        assert_eq!(presentation.slides[0].notes, None);
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        let result = PptxParser::new().parse(Cursor::new(b"definitely not a zip".to_vec()), "bad.pptx");
        assert!(matches!(result, Err(Error::ZipError(_))));
    }

    #[test]
    fn test_zip_without_presentation_is_corrupted() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", FileOptions::default()).unwrap();
        zip.write_all(b"<w:document/>").unwrap();
        let data = zip.finish().unwrap().into_inner();

        let result = PptxParser::new().parse(Cursor::new(data), "doc.pptx");
        assert!(matches!(result, Err(Error::CorruptedFile(_))));
    }

    #[test]
    fn test_unreadable_part_is_an_io_error() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("ppt/_rels/presentation.xml.rels", FileOptions::default()).unwrap();
        write!(
            zip,
            r#"<Relationships><Relationship Id="rId2" Type="{}" Target="slides/slide1.xml"/></Relationships>"#,
            REL_SLIDE
        )
        .unwrap();
        zip.start_file("ppt/slides/slide1.xml", FileOptions::default()).unwrap();
        zip.write_all(&[0x3c, 0xff, 0xfe, 0x3e]).unwrap();
        let data = zip.finish().unwrap().into_inner();

        match PptxParser::new().parse(Cursor::new(data), "x.pptx") {
            Err(Error::IoError(e)) => assert!(e.to_string().contains("ppt/slides/slide1.xml")),
            other => panic!("expected an I/O error, got {:?}", other.map(|p| p.slides.len())),
        }
    }

    #[test]
    fn test_malformed_slide_fails_the_file() {
        let data = build_pptx(
            &[TestSlide {
                xml: "<p:sld><p:cSld><p:spTree></p:cSld>".to_string(),
                notes: None,
            }],
            Some(&[1]),
        );
        let result = PptxParser::new().parse(Cursor::new(data), "x.pptx");
        assert!(matches!(result, Err(Error::PptxParseError(_))));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt/presentation.xml", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../notesSlides/notesSlide1.xml"),
            "ppt/notesSlides/notesSlide1.xml"
        );
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "/ppt/media/a.png"), "ppt/media/a.png");
        assert_eq!(resolve_target("ppt/presentation.xml", "./slides/slide2.xml"), "ppt/slides/slide2.xml");
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
        assert_eq!(rels_path_for("ppt/slides/slide3.xml"), "ppt/slides/_rels/slide3.xml.rels");
        assert_eq!(rels_path_for("root.xml"), "_rels/root.xml.rels");
    }

    #[test]
    fn test_parse_relationships_skips_external_targets() {
        let xml = concat!(
            r#"<Relationships>"#,
            r#"<Relationship Id="rId1" Type="x/hyperlink" Target="https://example.com" TargetMode="External"/>"#,
            r#"<Relationship Id="rId2" Type="x/notesSlide" Target="../notesSlides/notesSlide2.xml"/>"#,
            r#"</Relationships>"#
        );
        let rels = parse_relationships(xml, "ppt/slides/slide2.xml").unwrap();
        assert_eq!(
            rels,
            vec![Relationship {
                id: "rId2".into(),
                rel_type: "x/notesSlide".into(),
                target: "ppt/notesSlides/notesSlide2.xml".into(),
            }]
        );
        assert!(rels[0].is_notes_slide());
        assert!(!rels[0].is_slide());
    }

    #[test]
    fn test_parse_slide_id_list() {
        let xml = r#"<p:presentation><p:sldIdLst><p:sldId id="256" r:id="rId7"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst></p:presentation>"#;
        assert_eq!(parse_slide_id_list(xml).unwrap(), vec!["rId7", "rId2"]);
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("ppt/slides/slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }
}
