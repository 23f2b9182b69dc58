use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use pdfgraph::structure::{self, PageLeaf};
use pdfgraph::{append_pages, parse_document, save_to_file, Context, WriterConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdfgraph",
    about = "Inspect, rewrite and merge PDF object graphs",
    version,
    author
)]
struct Cli {
    /// Log recovery details (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, object count, pages and trailer entries of a PDF
    Info {
        /// Input PDF file
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a PDF and write it back out
    Rewrite {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Pack objects into object streams with an xref stream
        #[arg(long)]
        object_streams: bool,

        /// Objects per object stream
        #[arg(long, default_value_t = 50)]
        per_stream: usize,
    },

    /// Append every page of SOURCE to the end of DEST
    CopyPages {
        /// PDF whose pages are copied
        source: PathBuf,

        /// PDF receiving the pages
        dest: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct PageInfo {
    number: usize,
    object: String,
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Serialize)]
struct DocumentInfo {
    file: String,
    version: String,
    objects: usize,
    largest_object_number: u32,
    pages: Vec<PageInfo>,
    root: Option<String>,
    trailer_keys: Vec<&'static str>,
}

impl DocumentInfo {
    fn collect(path: &Path, context: &Context) -> Result<Self> {
        let pages = structure::page_refs(context)
            .context("Failed to walk the page tree")?
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                let size = PageLeaf::new(id).size(context).ok().flatten();
                PageInfo {
                    number: index + 1,
                    object: id.to_string(),
                    width: size.map(|(width, _)| width),
                    height: size.map(|(_, height)| height),
                }
            })
            .collect();

        let trailer = context.trailer_info();
        let trailer_keys = [
            ("Root", trailer.root.is_some()),
            ("Encrypt", trailer.encrypt.is_some()),
            ("Info", trailer.info.is_some()),
            ("ID", trailer.id.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, present)| present.then_some(key))
        .collect();

        Ok(Self {
            file: path.display().to_string(),
            version: context.version().to_string(),
            objects: context.object_count(),
            largest_object_number: context.largest_object_number(),
            pages,
            root: trailer.root.map(|root| root.to_string()),
            trailer_keys,
        })
    }

    fn print(&self) {
        println!("PDF Information for: {}", self.file);
        println!("==========================================");
        println!("PDF Version: {}", self.version);
        println!("Objects: {} (largest number {})", self.objects, self.largest_object_number);
        if let Some(root) = &self.root {
            println!("Root: {root}");
        }
        println!("Trailer: {}", self.trailer_keys.join(", "));
        println!("Pages: {}", self.pages.len());
        for page in self.pages.iter().take(3) {
            match (page.width, page.height) {
                (Some(width), Some(height)) => {
                    println!("  Page {} ({}): {width:.0}x{height:.0} pts", page.number, page.object)
                }
                _ => println!("  Page {} ({}): no MediaBox", page.number, page.object),
            }
        }
        if self.pages.len() > 3 {
            println!("  ... and {} more pages", self.pages.len() - 3);
        }
    }
}

fn load(path: &Path) -> Result<Context> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let context =
        parse_document(&bytes).with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::debug!("Loaded {} objects from {}", context.object_count(), path.display());
    Ok(context)
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input, json } => {
            let context = load(&input)?;
            let info = DocumentInfo::collect(&input, &context)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                info.print();
            }
        }

        Commands::Rewrite {
            input,
            output,
            object_streams,
            per_stream,
        } => {
            anyhow::ensure!(per_stream > 0, "--per-stream must be at least 1");
            let context = load(&input)?;
            let config = WriterConfig::default()
                .with_object_streams(object_streams)
                .with_objects_per_stream(per_stream);
            save_to_file(&context, &output, &config)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "✓ Rewrote {} objects to {}",
                context.object_count(),
                output.display()
            );
        }

        Commands::CopyPages {
            source,
            dest,
            output,
        } => {
            let donor = load(&source)?;
            let mut target = load(&dest)?;
            let copied = append_pages(&donor, &mut target).context("Failed to copy pages")?;
            save_to_file(&target, &output, &WriterConfig::default())
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "✓ Appended {} pages from {} into {}",
                copied.len(),
                source.display(),
                output.display()
            );
        }
    }

    Ok(())
}
