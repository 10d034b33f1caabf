//! reflow - PDF to EPUB converter

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

use reflow::{Config, Converter, MuPdfSource};

#[derive(Parser)]
#[command(name = "reflow")]
#[command(version, about = "Convert PDF documents into reflowable EPUB ebooks", long_about = None)]
#[command(after_help = "EXAMPLES:
    reflow book.pdf book.epub            One chapter with every page
    reflow book.pdf book.epub 3          Chapters from the TOC on page 3
    reflow --plan book.pdf book.epub 3   Show the chapters without writing")]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output EPUB file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Page listing the table of contents (1-based)
    #[arg(value_name = "TOC_PAGE")]
    toc_page: Option<u32>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Book title (defaults to the input file name)
    #[arg(long)]
    title: Option<String>,

    /// Book author; may be given more than once
    #[arg(long = "author", value_name = "AUTHOR")]
    authors: Vec<String>,

    /// Book language code
    #[arg(long)]
    language: Option<String>,

    /// Unique book identifier
    #[arg(long)]
    identifier: Option<String>,

    /// Stylesheet to embed in the book
    #[arg(long, value_name = "FILE")]
    stylesheet: Option<PathBuf>,

    /// Print the chapter plan as JSON instead of writing the EPUB
    #[arg(long)]
    plan: bool,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// More log output; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn load_config(&self) -> reflow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(title) = &self.title {
            config.metadata.title = Some(title.clone());
        }
        if !self.authors.is_empty() {
            config.metadata.authors = self.authors.clone();
        }
        if let Some(language) = &self.language {
            config.metadata.language = language.clone();
        }
        if let Some(identifier) = &self.identifier {
            config.metadata.identifier = identifier.clone();
        }
        if let Some(stylesheet) = &self.stylesheet {
            config.stylesheet = Some(stylesheet.clone());
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // A second logger is the only failure here; keep going without it.
    let _ = TermLogger::init(
        cli.log_level(),
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let result = if cli.plan { print_plan(&cli) } else { convert(&cli) };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn convert(cli: &Cli) -> Result<(), String> {
    let converter = Converter::new(cli.load_config().map_err(|e| e.to_string())?);
    converter
        .convert(&cli.input, &cli.output, cli.toc_page)
        .map_err(|e| e.to_string())?;
    Ok(())
}

fn print_plan(cli: &Cli) -> Result<(), String> {
    let converter = Converter::new(cli.load_config().map_err(|e| e.to_string())?);
    let source = MuPdfSource::open(&cli.input).map_err(|e| e.to_string())?;
    let plan = converter
        .plan(&source, cli.toc_page)
        .map_err(|e| e.to_string())?;

    let json = serde_json::to_string_pretty(&plan).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
