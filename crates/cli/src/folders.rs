//! The input / processed / output folder layout.

use anyhow::{Context, Result};
use slides_core::OutputMode;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether a working folder had to be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    Created,
    Verified,
}

impl FolderStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Verified => "Verified",
        }
    }
}

/// The three working folders under a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folders {
    /// Decks waiting to be converted.
    pub input: PathBuf,
    /// Decks that converted successfully.
    pub processed: PathBuf,
    /// Rendered text files.
    pub output: PathBuf,
}

impl Folders {
    /// Folder paths under `base`, without touching the filesystem.
    pub fn new(base: &Path) -> Self {
        Self {
            input: base.join("input"),
            processed: base.join("processed"),
            output: base.join("output"),
        }
    }

    /// Create any missing folders under `base`.
    pub fn create(base: &Path) -> Result<Self> {
        Self::create_with_status(base).map(|(folders, _)| folders)
    }

    /// Like [`Folders::create`], also reporting what happened to each
    /// folder, in [`Folders::all`] order.
    pub fn create_with_status(base: &Path) -> Result<(Self, [FolderStatus; 3])> {
        let folders = Self::new(base);
        let mut status = [FolderStatus::Verified; 3];

        for (folder, status) in folders.all().into_iter().zip(status.iter_mut()) {
            if folder.is_dir() {
                log::debug!("Verified folder: {}", folder.display());
            } else {
                fs::create_dir_all(folder)
                    .with_context(|| format!("Failed to create folder: {}", folder.display()))?;
                log::info!("Created folder: {}", folder.display());
                *status = FolderStatus::Created;
            }
        }

        Ok((folders, status))
    }

    pub fn all(&self) -> [&Path; 3] {
        [
            self.input.as_path(),
            self.processed.as_path(),
            self.output.as_path(),
        ]
    }

    /// Output file for a source deck: same stem, mode's extension.
    pub fn output_path(&self, source: &Path, mode: OutputMode) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.output.join(format!("{}.{}", stem, mode.extension()))
    }

    /// Where a source deck goes once it has been converted.
    pub fn processed_path(&self, source: &Path) -> PathBuf {
        match source.file_name() {
            Some(name) => self.processed.join(name),
            None => self.processed.clone(),
        }
    }
}
