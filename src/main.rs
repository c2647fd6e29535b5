mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use querykit_common::config::Config;
use querykit_db::migrations::current_version;
use querykit_db::models::NewPerson;
use querykit_db::pool::{get_conn, init_pool, DbPool};
use querykit_db::queries::people::{list_people, PeopleQueries};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref());
    if let Some(ref path) = cli.database {
        config.database.path = path.clone();
    }

    // RUST_LOG wins, then --verbose, then the config file, then defaults.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "querykit=trace,querykit_db=trace,querykit_common=debug".to_string()
        } else if let Some(ref filter) = config.logging.filter {
            filter.clone()
        } else {
            "querykit=info,querykit_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }

    match cli.command {
        Commands::Migrate => migrate(&config),
        Commands::AddPerson { name, age, email } => add_person(&config, name, age, email),
        Commands::Count { min_age } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(count_older_than(&config, min_age))
        }
        Commands::List { json } => list(&config, json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("querykit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_pool(config: &Config) -> Result<DbPool> {
    tracing::info!("Opening database at {}", config.database.path.display());
    init_pool(&config.database)
        .with_context(|| format!("failed to open {}", config.database.path.display()))
}

fn migrate(config: &Config) -> Result<()> {
    let pool = open_pool(config)?;
    let conn = get_conn(&pool)?;
    let version = current_version(&conn)?;
    println!(
        "Database {} is at schema version {version}",
        config.database.path.display()
    );
    Ok(())
}

fn add_person(config: &Config, name: String, age: i64, email: Option<String>) -> Result<()> {
    let pool = open_pool(config)?;
    let conn = get_conn(&pool)?;
    let queries = PeopleQueries::new();

    let person = queries.create(&conn, &NewPerson { name, email, age })?;
    println!("{}", serde_json::to_string_pretty(&person)?);
    Ok(())
}

async fn count_older_than(config: &Config, min_age: i64) -> Result<()> {
    let pool = open_pool(config)?;
    let queries = PeopleQueries::new();

    let count = queries.count_older_than(&pool, min_age).await?;
    println!("{count}");
    Ok(())
}

fn list(config: &Config, json: bool) -> Result<()> {
    let pool = open_pool(config)?;
    let conn = get_conn(&pool)?;
    let people = list_people(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&people)?);
        return Ok(());
    }

    if people.is_empty() {
        println!("No people stored.");
        return Ok(());
    }
    for p in &people {
        let email = p.email.as_deref().unwrap_or("-");
        println!("{}  {:<24} {:>3}  {}", p.id, p.name, p.age, email);
    }
    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        anyhow::bail!("No config file given; pass one with --config or as an argument");
    };

    let config = Config::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    let warnings = config.validate();

    if warnings.is_empty() {
        println!("Configuration is valid: {}", path.display());
    } else {
        println!("Configuration loaded with warnings: {}", path.display());
        for w in &warnings {
            println!("  - {w}");
        }
    }
    Ok(())
}
