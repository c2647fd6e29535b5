use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "querykit")]
#[command(author, version, about = "SQLite people store with compile-once parameterized queries")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (overrides database.path from the config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database if needed and apply pending migrations
    Migrate,

    /// Insert a person and print the stored row as JSON
    AddPerson {
        /// Display name
        #[arg(long)]
        name: String,

        /// Age in years
        #[arg(long)]
        age: i64,

        /// Unique email address
        #[arg(long)]
        email: Option<String>,
    },

    /// Count people strictly older than the given age
    Count {
        /// Minimum age (exclusive)
        #[arg(long)]
        min_age: i64,
    },

    /// List everyone, ordered by name
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
