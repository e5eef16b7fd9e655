//! diffctx CLI: thin wrappers over the library entry points.
//!
//! Results go to stdout, logs to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use diffctx::config::Config;
use diffctx::diff::{self, ContextPolicy, ContextRadius};
use diffctx::metadata;
use diffctx::operations;
use diffctx::position::{self, Position};
use diffctx::splitter::DeclarationSplitter;

/// Extract change context from Java sources.
#[derive(Parser)]
#[command(name = "diffctx", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Unified line diff between two files
    Diff {
        before: String,
        after: String,

        /// Context lines around each change; negative for a single full hunk
        #[arg(long, allow_hyphen_values = true)]
        radius: Option<i64>,
    },
    /// Context window around a position of the after file
    Window {
        before: String,
        after: String,
        line: usize,
        character: usize,

        /// Keep the lines before the target
        #[arg(long)]
        before_context: bool,

        /// Keep the lines after the target
        #[arg(long)]
        after_context: bool,

        /// Line cap (default: per-policy cap from the configuration)
        #[arg(long)]
        max_lines: Option<usize>,
    },
    /// Split the class declared on a line into member units
    Split {
        file: String,
        line: usize,
        character: usize,
    },
    /// Render the signature of a method fragment
    Signature { file: String },
    /// Extract method metadata as JSON
    Metadata { file: String },
    /// Operations a test performs on the dropped arguments and the result of a
    /// changed method, as JSON
    Operations {
        /// Focal method at the before revision
        before: String,
        /// Focal method at the after revision
        after: String,
        /// Test method calling the focal method
        test: String,
    },
    /// Translate a position inside a fragment into the enclosing text
    Relocate {
        outer: String,
        inner: String,
        line: usize,
        character: usize,
    },
}

fn read(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Diff { before, after, radius } => {
            let radius = radius.map_or(ContextRadius::Lines(config.diff.context_radius), ContextRadius::from);
            let unified = diff::diff(&read(&before)?, &read(&after)?, radius);
            if !unified.is_empty() {
                println!("{unified}");
            }
        }
        Commands::Window {
            before,
            after,
            line,
            character,
            before_context,
            after_context,
            max_lines,
        } => {
            let policy = ContextPolicy::from_flags(before_context, after_context);
            let max_lines = max_lines.unwrap_or_else(|| policy.max_lines(&config.window));
            debug!("Window policy {policy:?}, cap {max_lines}");

            let clean = diff::locate_and_extract(
                &read(&before)?,
                &read(&after)?,
                Position::new(line, character),
                &config.diff,
            );
            let window = diff::window(&clean, policy, max_lines);
            if !window.is_empty() {
                println!("{}", window.render());
            }
        }
        Commands::Split { file, line, character } => {
            let splitter = DeclarationSplitter::new(&config.splitter);
            let units = splitter.split(&read(&file)?, Position::new(line, character))?;
            for unit in units {
                println!("{}", unit.render());
            }
        }
        Commands::Signature { file } => {
            let text = read(&file)?;
            let signature = metadata::render_signature(&text)
                .with_context(|| format!("no method or constructor found in {file}"))?;
            println!("{signature}");
        }
        Commands::Metadata { file } => {
            let text = read(&file)?;
            let meta = metadata::extract_metadata(&text)
                .with_context(|| format!("no method or constructor found in {file}"))?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        Commands::Operations { before, after, test } => {
            let ops = operations::for_change(&read(&before)?, &read(&after)?, &read(&test)?)
                .with_context(|| format!("no method or constructor found in {before} or {after}"))?;
            println!("{}", serde_json::to_string_pretty(&ops)?);
        }
        Commands::Relocate {
            outer,
            inner,
            line,
            character,
        } => {
            let relocated = position::relocate(&read(&outer)?, &read(&inner)?, Position::new(line, character))?;
            println!("{relocated}");
        }
    }

    Ok(())
}
