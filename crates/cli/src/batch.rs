//! Sequential batch conversion of the input folder.
//!
//! Each deck is decoded, rendered and written on its own; a failure is
//! logged and recorded, and the batch moves on to the next file.

use crate::folders::Folders;
use anyhow::{Context, Result};
use slides_core::SlideRenderer;
use slides_pptx::PptxParser;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Prefix Office uses for lock files next to an open document.
const LOCK_FILE_PREFIX: &str = "~$";

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Leave converted decks in `input/` instead of moving them.
    pub keep_originals: bool,
    pub renderer: SlideRenderer,
}

/// A deck that converted successfully.
#[derive(Debug, Clone)]
pub struct Converted {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Where the source was moved, unless originals are kept.
    pub moved_to: Option<PathBuf>,
}

/// A deck that could not be converted.
#[derive(Debug, Clone)]
pub struct Failure {
    pub source: PathBuf,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub converted: Vec<Converted>,
    pub failed: Vec<Failure>,
}

/// List `.pptx` files in `input`, sorted by name.
///
/// The extension match is case-insensitive. Office lock files (`~$...`) and
/// directories are skipped.
pub fn find_presentations(input: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(input)
        .with_context(|| format!("Failed to read input folder: {}", input.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read input folder: {}", input.display()))?;
        let path = entry.path();

        let is_pptx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pptx"));
        let is_lock_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOCK_FILE_PREFIX));

        if is_pptx && !is_lock_file && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Decode and render a single deck.
pub fn convert_file(path: &Path, renderer: &SlideRenderer) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    let presentation = PptxParser::new()
        .parse(reader, &filename)
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    log::debug!("  Found {} slides", presentation.slides.len());

    Ok(renderer.render(&presentation))
}

/// Convert every deck in the input folder.
///
/// Only a failure to list the input folder is returned as an error; per-file
/// problems end up in [`BatchReport::failed`].
pub fn run_batch(folders: &Folders, options: &BatchOptions) -> Result<BatchReport> {
    let files = find_presentations(&folders.input)?;
    let mut report = BatchReport::default();

    if files.is_empty() {
        println!("No PPTX files found in {}", folders.input.display());
        return Ok(report);
    }

    println!("Found {} PPTX file(s) to process", files.len());

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("\nProcessing: {}", name);

        match process_file(&path, folders, options) {
            Ok(converted) => {
                println!("  -> {}", converted.output.display());
                match &converted.moved_to {
                    Some(_) => println!("  -> moved to processed/"),
                    None => println!("  (original kept in input)"),
                }
                report.converted.push(converted);
            }
            Err(e) => {
                log::error!("{}: {:#}", name, e);
                report.failed.push(Failure {
                    source: path,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    println!(
        "\nDone. {} converted, {} failed.",
        report.converted.len(),
        report.failed.len()
    );

    Ok(report)
}

fn process_file(path: &Path, folders: &Folders, options: &BatchOptions) -> Result<Converted> {
    let text = convert_file(path, &options.renderer)?;

    let output = folders.output_path(path, options.renderer.mode());
    fs::write(&output, text).with_context(|| format!("Failed to write {}", output.display()))?;

    let moved_to = if options.keep_originals {
        None
    } else {
        let destination = folders.processed_path(path);
        move_file(path, &destination)?;
        Some(destination)
    };

    Ok(Converted {
        source: path.to_path_buf(),
        output,
        moved_to,
    })
}

/// Rename, falling back to copy + remove when a rename is not possible
/// (for example across filesystems).
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to)
        .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))?;
    fs::remove_file(from).with_context(|| format!("Failed to remove {}", from.display()))?;
    Ok(())
}
