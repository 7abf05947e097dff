//! Interactive first-time setup.
//!
//! Offers a few platform-appropriate locations for the working folders,
//! creates them and saves the choice.

use crate::config::{app_dir, AppConfig};
use crate::folders::{FolderStatus, Folders};
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Folder name used for the suggested locations.
const DEFAULT_FOLDER_NAME: &str = "slides-to-markdown";

/// One numbered entry in the setup menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOption {
    pub label: String,
    pub path: PathBuf,
}

impl SetupOption {
    fn new(label: &str, path: PathBuf) -> Self {
        Self {
            label: label.to_string(),
            path,
        }
    }
}

/// The user's home directory, if the environment names one.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

/// Suggested locations for `os` (as in [`std::env::consts::OS`]).
pub fn default_options(app_dir: &Path, home: Option<&Path>, os: &str) -> Vec<SetupOption> {
    let mut options = vec![SetupOption::new("Here (next to the program)", app_dir.to_path_buf())];

    if let Some(home) = home {
        match os {
            "macos" | "windows" => {
                options.push(SetupOption::new("Desktop", home.join("Desktop").join(DEFAULT_FOLDER_NAME)));
                options.push(SetupOption::new(
                    "Documents",
                    home.join("Documents").join(DEFAULT_FOLDER_NAME),
                ));
            }
            _ => options.push(SetupOption::new("Home folder", home.join(DEFAULT_FOLDER_NAME))),
        }
    }

    options
}

/// Show the menu and read a choice.
///
/// Invalid answers re-prompt. Returns `Ok(None)` when input ends before a
/// choice is made.
pub fn prompt_for_directory<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    options: &[SetupOption],
    home: Option<&Path>,
) -> Result<Option<PathBuf>> {
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out, "  Slides to Markdown - First-time Setup")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;
    writeln!(out, "Where would you like the working folders")?;
    writeln!(out, "(input/, output/, processed/) to be created?")?;
    writeln!(out)?;

    for (idx, option) in options.iter().enumerate() {
        writeln!(out, "  [{}] {}", idx + 1, option.label)?;
        writeln!(out, "      {}", option.path.display())?;
        writeln!(out)?;
    }

    let custom = options.len() + 1;
    writeln!(out, "  [{}] Custom path", custom)?;
    writeln!(out)?;

    loop {
        write!(out, "Choose an option [1-{}]: ", custom)?;
        out.flush()?;

        let Some(answer) = read_line(input)? else {
            return Ok(None);
        };

        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(Some(options[n - 1].path.clone())),
            Ok(n) if n == custom => {
                write!(out, "Enter the full path: ")?;
                out.flush()?;
                let Some(path) = read_line(input)? else {
                    return Ok(None);
                };
                if path.is_empty() {
                    writeln!(out, "No path entered. Please try again.")?;
                    continue;
                }
                return Ok(Some(expand_home(&path, home)));
            }
            _ => writeln!(out, "Please enter a number between 1 and {}.", custom)?,
        }
    }
}

/// Run setup on the terminal: pick a folder, create it, save the config.
///
/// Returns the chosen directory, or `None` if setup was cancelled.
pub fn run_setup(config_path: &Path) -> Result<Option<PathBuf>> {
    let home = home_dir();
    let options = default_options(&app_dir(), home.as_deref(), std::env::consts::OS);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    let Some(chosen) = prompt_for_directory(&mut input, &mut out, &options, home.as_deref())? else {
        return Ok(None);
    };
    let chosen = std::path::absolute(&chosen)
        .with_context(|| format!("Invalid path: {}", chosen.display()))?;

    println!("\nSetting up in: {}", chosen.display());
    let (folders, status) = Folders::create_with_status(&chosen)?;
    for line in folder_report(&folders, &status) {
        println!("{}", line);
    }

    AppConfig::new(&chosen).save(config_path)?;
    println!("\nSaved to {}", config_path.display());
    println!("Future runs will use: {}", chosen.display());
    println!("(Override anytime with --dir or re-run --setup)\n");

    Ok(Some(chosen))
}

/// One line per working folder, saying whether it was created or already there.
fn folder_report(folders: &Folders, status: &[FolderStatus; 3]) -> Vec<String> {
    folders
        .all()
        .iter()
        .zip(status)
        .map(|(folder, status)| format!("  {} folder: {}", status.label(), folder.display()))
        .collect()
}

/// Read one trimmed line; `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(&rest[1..])
        }
        _ => PathBuf::from(path),
    }
}
