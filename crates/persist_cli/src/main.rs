//! Persist CLI
//!
//! Command-line access to a Persist database.
//!
//! # Commands
//!
//! - `collections` - List collections with their metadata records
//! - `create` / `remove` - Manage collections
//! - `get` / `save` / `delete` - Single-document operations
//! - `count` / `query` - Rule-based reads
//! - `metadata` - Read or replace collection metadata
//! - `index` - Add or drop secondary indexes
//!
//! Documents, rules and metadata are given and printed as JSON. Dates are
//! written as `{"$date": "<RFC 3339>"}`.

mod commands;

use clap::{Parser, Subcommand};
use persist_core::{Config, Database};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Command-line access to a Persist database.
#[derive(Parser)]
#[command(name = "persist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Storage driver (file, mem)
    #[arg(global = true, short, long, default_value = "file")]
    driver: String,

    /// Skip fsync after writes (file driver)
    #[arg(global = true, long)]
    no_sync: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List collections
    Collections {
        /// Output format (text, json)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Create a collection
    Create {
        /// Collection name
        collection: String,
    },

    /// Remove a collection and all its documents
    Remove {
        /// Collection name
        collection: String,
    },

    /// Print a document
    Get {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
    },

    /// Save a JSON document (must carry a string "id")
    Save {
        /// Collection name
        collection: String,
        /// The document, or an array of documents
        document: String,
        /// Create the collection if it does not exist
        #[arg(short, long)]
        create: bool,
    },

    /// Delete a document
    Delete {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
    },

    /// Count documents
    Count {
        /// Collection name
        collection: String,
        /// Filter rules as JSON
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Query documents
    Query {
        /// Collection name
        collection: String,
        /// Query rules as JSON
        #[arg(short, long)]
        rules: Option<String>,
        /// Path to sort by
        #[arg(short, long)]
        sort: Option<String>,
        /// Sort in descending order
        #[arg(long)]
        descending: bool,
        /// Maximum number of documents
        #[arg(short, long)]
        limit: Option<usize>,
        /// Number of documents to skip
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Print or replace collection metadata
    Metadata {
        /// Collection name
        collection: String,
        /// New metadata as a JSON object
        #[arg(long)]
        set: Option<String>,
    },

    /// Manage secondary indexes
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum IndexAction {
    /// Add an index
    Add {
        /// Collection name
        collection: String,
        /// Index name
        index: String,
        /// Document path to index
        #[arg(value_name = "FIELD_PATH")]
        field: String,
    },
    /// Drop an index
    Drop {
        /// Collection name
        collection: String,
        /// Index name
        index: String,
    },
}

fn open(cli: &Cli) -> Result<Database, Box<dyn std::error::Error>> {
    let path = cli.path.as_ref().ok_or("Database path required")?;
    let path = path.to_str().ok_or("Database path must be valid UTF-8")?;

    let mut config = Config::new(cli.driver.as_str());
    if cli.no_sync {
        config = config.option("sync", false);
    }
    debug!(path, driver = %cli.driver, sync = !cli.no_sync, "opening database");
    Ok(Database::open_with_config(path, &config)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("Persist CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Persist Core v{}", persist_core::VERSION);
        return Ok(());
    }

    let db = open(&cli)?;
    match &cli.command {
        Commands::Collections { format } => commands::collections::list(&db, format)?,
        Commands::Create { collection } => commands::collections::create(&db, collection)?,
        Commands::Remove { collection } => commands::collections::remove(&db, collection)?,
        Commands::Metadata { collection, set } => {
            commands::collections::metadata(&db, collection, set.as_deref())?;
        }
        Commands::Get { collection, id } => commands::documents::get(&db, collection, id)?,
        Commands::Save {
            collection,
            document,
            create,
        } => commands::documents::save(&db, collection, document, *create)?,
        Commands::Delete { collection, id } => commands::documents::delete(&db, collection, id)?,
        Commands::Count { collection, filter } => {
            commands::documents::count(&db, collection, filter.as_deref())?;
        }
        Commands::Query {
            collection,
            rules,
            sort,
            descending,
            limit,
            offset,
        } => {
            let args = commands::documents::QueryArgs {
                rules: rules.as_deref(),
                sort: sort.as_deref(),
                descending: *descending,
                limit: *limit,
                offset: *offset,
            };
            commands::documents::query(&db, collection, &args)?;
        }
        Commands::Index { action } => match action {
            IndexAction::Add {
                collection,
                index,
                field,
            } => commands::index::add(&db, collection, index, field)?,
            IndexAction::Drop { collection, index } => {
                commands::index::remove(&db, collection, index)?;
            }
        },
        Commands::Version => {}
    }

    db.close()?;
    Ok(())
}
