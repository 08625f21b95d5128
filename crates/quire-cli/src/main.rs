use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use quire_content::{ParsedSegment, convert, parse, render_html, sanitize};
use quire_editor::{EmbedReader, InlineDataReader, PickedFile, TableDraft, validate_image};

mod config;

#[derive(Parser)]
#[command(version, about = "Quire - tools for rich answer content", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a KDL config file
    #[arg(long, global = true, env = "QUIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert math notation to Unicode symbols
    Convert {
        /// Notation such as `\frac{1}{2}` or `x^{2}`
        notation: String,
    },
    /// Render content to read-only HTML
    Render {
        /// Content file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Show how content splits into text, table and image segments
    Segments {
        /// Content file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Sanitize a markup fragment
    Sanitize {
        /// Fragment file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Build a table fragment and its plain-text preview
    Table {
        #[arg(long, default_value_t = 2)]
        rows: usize,

        #[arg(long, default_value_t = 2)]
        cols: usize,

        /// Style the first row as a header
        #[arg(long)]
        header: bool,

        /// Cell contents in row-major order
        cells: Vec<String>,
    },
    /// Embed an image file as an inline fragment
    EmbedImage {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Convert { notation } => println!("{}", convert(&notation)),
        Commands::Render { file } => println!("{}", render_html(&read_input(file.as_deref())?)),
        Commands::Segments { file } => {
            let content = read_input(file.as_deref())?;
            for segment in parse(&content) {
                let kind = match &segment {
                    ParsedSegment::Text(_) => "text",
                    ParsedSegment::Table(_) => "table",
                    ParsedSegment::Image(_) => "image",
                };
                println!("{kind:<5} {:?}", segment.as_str());
            }
        }
        Commands::Sanitize { file } => println!("{}", sanitize(&read_input(file.as_deref())?)),
        Commands::Table {
            rows,
            cols,
            header,
            cells,
        } => {
            let config = config::load(cli.config.as_deref())?;
            print_table(rows, cols, header, cells, config.escape_table_cells)?;
        }
        Commands::EmbedImage { path } => {
            let config = config::load(cli.config.as_deref())?;
            embed_image(&path, &config).await?;
        }
    }

    Ok(())
}

fn print_table(
    rows: usize,
    cols: usize,
    header: bool,
    cells: Vec<String>,
    escape_cells: bool,
) -> Result<()> {
    let mut draft = TableDraft::new(rows, cols);
    let (rows, cols) = (draft.table().rows(), draft.table().cols());
    if cells.len() > rows * cols {
        miette::bail!(
            "{} cells given for a {rows}x{cols} table (at most {})",
            cells.len(),
            rows * cols
        );
    }
    draft.set_header_row(header);
    for (index, cell) in cells.into_iter().enumerate() {
        draft.set_cell(index / cols, index % cols, cell);
    }

    let preview = draft.plain_text_preview();
    println!("{}", draft.into_fragment(escape_cells));
    println!();
    println!("{preview}");
    Ok(())
}

async fn embed_image(path: &Path, config: &quire_editor::EditorConfig) -> Result<()> {
    let data = std::fs::read(path).into_diagnostic()?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = PickedFile::new(name, data);

    validate_image(&file, config.max_image_bytes)?;
    let image = InlineDataReader.read_embeddable(&file).await?;
    tracing::debug!(mime = %image.mime_type, bytes = file.len(), "image embedded");
    println!("{}", image.to_fragment(&config.image_max_width));
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).into_diagnostic(),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()?;
            Ok(input)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(3)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
