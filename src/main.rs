//! egw-library CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use egw_library::{
    commands::{
        cmd_export, cmd_get_book, cmd_import, cmd_init, cmd_list_books, cmd_list_categories,
        cmd_list_languages, cmd_read_book, cmd_search, cmd_status, format_book_detail,
        format_book_listing, format_book_text, format_categories, format_languages, print_export,
        print_import_stats, print_init, print_search_results, print_status, ExportOptions,
        InitOptions, SearchOptions,
    },
    config::Config,
    error::{Error, Result},
    jobs::JobService,
    mcp::McpServer,
    progress::{BarProgress, LogWriterFactory},
    render::{FontFamily, PageSize},
    store::{BookFilter, ContentStore},
};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "egw-library")]
#[command(version, about = "Local full-text library with PDF export and MCP server support", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Show library status
    Status,

    /// Import a JSON bundle of languages, books and chapters
    Import {
        /// Path to the bundle file
        path: PathBuf,
    },

    /// Full-text search across all paragraphs
    Search {
        /// Search expression; supports "quoted phrases" and prefix*
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of results to skip
        #[arg(long)]
        offset: Option<u32>,
    },

    /// List stored languages
    Languages,

    /// List categories with book counts
    Categories,

    /// List books
    Books {
        /// Language code
        #[arg(long)]
        lang: Option<String>,

        /// Folder ID
        #[arg(long)]
        folder: Option<i64>,

        /// Category (egw, pioneer, reference, periodical, devotional, bible)
        #[arg(long)]
        category: Option<String>,

        /// Subcategory
        #[arg(long)]
        subcategory: Option<String>,

        /// Maximum number of books
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of books to skip
        #[arg(long)]
        offset: Option<u32>,
    },

    /// Show metadata for one book
    Book {
        /// Book ID
        book_id: i64,
    },

    /// Print a book's paragraphs in reading order
    Read {
        /// Book ID
        book_id: i64,

        /// First paragraph (0-based)
        #[arg(long, default_value = "0")]
        offset: u32,

        /// Paragraphs to print
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },

    /// Render a book to PDF
    Export {
        /// Book ID
        book_id: i64,

        /// Output file (defaults to the export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Page size: a4, letter or legal
        #[arg(long)]
        page_size: Option<String>,

        /// Font family: helvetica, times or courier
        #[arg(long)]
        font: Option<String>,

        /// Body font size in points
        #[arg(long)]
        font_size: Option<f32>,

        /// Skip the table of contents
        #[arg(long)]
        no_toc: bool,
    },

    /// Start MCP server on stdio
    Mcp,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config, force).await;
    }

    // Handle completions command (doesn't need config/db)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "egw-library", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let store = ContentStore::connect(&config).await?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Status => {
            let status = cmd_status(&config, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Import { path } => {
            let stats = cmd_import(&store, &path).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_import_stats(&stats);
            }
        }

        Commands::Search {
            query,
            limit,
            offset,
        } => {
            let options = SearchOptions { limit, offset };
            let results = cmd_search(&config, &store, &query, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_search_results(&results);
            }
        }

        Commands::Languages => {
            let languages = cmd_list_languages(&store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&languages)?);
            } else {
                println!("{}", format_languages(&languages));
            }
        }

        Commands::Categories => {
            let categories = cmd_list_categories(&store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                println!("{}", format_categories(&categories));
            }
        }

        Commands::Books {
            lang,
            folder,
            category,
            subcategory,
            limit,
            offset,
        } => {
            let filter = BookFilter {
                lang,
                folder_id: folder,
                category,
                subcategory,
                limit,
                offset,
            };
            let listing = cmd_list_books(&store, &filter).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                println!("{}", format_book_listing(&listing));
            }
        }

        Commands::Book { book_id } => {
            let detail = cmd_get_book(&store, book_id).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                println!("{}", format_book_detail(&detail));
            }
        }

        Commands::Read {
            book_id,
            offset,
            limit,
        } => {
            let text = cmd_read_book(&store, book_id, offset, limit).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&text)?);
            } else {
                println!("{}", format_book_text(&text));
            }
        }

        Commands::Export {
            book_id,
            output,
            page_size,
            font,
            font_size,
            no_toc,
        } => {
            let mut layout = config.pdf.layout.clone();
            if let Some(size) = page_size {
                layout.page_size = parse_choice::<PageSize>("page size", &size)?;
            }
            if let Some(family) = font {
                layout.font_family = parse_choice::<FontFamily>("font", &family)?;
            }
            if let Some(size) = font_size {
                layout.font_size = size;
            }
            if no_toc {
                layout.include_toc = false;
            }

            let options = ExportOptions {
                output,
                layout: Some(layout),
            };
            let mut bar = BarProgress::new(&format!("book {}", book_id));
            let result = cmd_export(&config, &store, book_id, options, &mut bar).await;
            bar.finish();
            let result = result?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_export(&result);
            }
        }

        Commands::Mcp => {
            let jobs = JobService::in_memory(store.clone(), config.paths.export_dir.join("jobs"));
            let sweeper = jobs.spawn_sweeper(config.jobs.sweep_interval(), config.jobs.max_age());

            let server = McpServer::new(config, store, jobs);
            let outcome = server.run().await;
            sweeper.abort();
            outcome?;
        }
    }

    Ok(())
}

/// Parse a lowercase option name into one of the layout enums
fn parse_choice<T: DeserializeOwned>(what: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| Error::InvalidInput(format!("Unknown {}: {}", what, value)))
}

async fn handle_init(config_arg: Option<PathBuf>, force: bool) -> Result<()> {
    // A .toml path names the config file; anything else names the base directory
    let base_dir = match config_arg {
        Some(path) if path.extension().map_or(false, |e| e == "toml") => path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir),
        Some(path) => path,
        None => Config::default_base_dir(),
    };

    let config = cmd_init(InitOptions { base_dir, force }).await?;
    info!("Initialized library at {:?}", config.paths.base_dir);
    print_init(&config);

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'egw-library init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(&config_path)
}
