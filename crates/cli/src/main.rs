//! CLI tool for converting folders of PowerPoint decks to Markdown or text.

mod batch;
mod config;
mod folders;
mod setup;

use anyhow::Result;
use batch::{run_batch, BatchOptions};
use clap::{Parser, ValueEnum};
use config::{default_config_path, resolve_working_dir, AppConfig};
use folders::Folders;
use slides_core::{OutputMode, PlainBulletStyle, SlideRenderer};
use std::path::PathBuf;

/// Convert every .pptx in `<dir>/input` and write the results to `<dir>/output`.
#[derive(Parser, Debug)]
#[command(name = "slides-to-md")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Working directory (default: saved setup choice, then current directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Choose and save a working directory, then exit
    #[arg(long)]
    setup: bool,

    /// Keep original files in input/ instead of moving them to processed/
    #[arg(short, long)]
    keep: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Leave out speaker notes
    #[arg(long)]
    no_notes: bool,

    /// Leave out the deck title line (Markdown only)
    #[arg(long)]
    no_title: bool,

    /// Do not indent nested bullets in plain-text output
    #[arg(long)]
    flat: bool,

    /// Config file location (default: next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Markdown,
    Text,
}

impl From<Format> for OutputMode {
    fn from(format: Format) -> Self {
        match format {
            Format::Markdown => OutputMode::Markdown,
            Format::Text => OutputMode::PlainText,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config_path = args.config.clone().unwrap_or_else(default_config_path);

    if args.setup {
        if setup::run_setup(&config_path)?.is_none() {
            println!("\nSetup cancelled.");
        }
        return Ok(());
    }

    let saved = AppConfig::load(&config_path);
    let working_dir = resolve_working_dir(args.dir.as_deref(), saved.as_ref())?;
    println!("Working in: {}", working_dir.display());

    let folders = Folders::create(&working_dir)?;
    let options = BatchOptions {
        keep_originals: args.keep,
        renderer: build_renderer(&args),
    };

    run_batch(&folders, &options)?;
    Ok(())
}

fn build_renderer(args: &Args) -> SlideRenderer {
    let bullets = if args.flat {
        PlainBulletStyle::Flat
    } else {
        PlainBulletStyle::Indented
    };

    SlideRenderer::new(args.format.into())
        .with_deck_title(!args.no_title)
        .with_notes(!args.no_notes)
        .with_plain_bullets(bullets)
}
