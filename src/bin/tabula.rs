//! tabula CLI
//!
//! Usage:
//!   tabula apply schema.json --database-url postgres://...
//!   tabula plan schema.json [-o migration.sql]
//!   tabula check schema.json
//!   tabula status schema.json
//!
//! Exit status: 0 on success, 2 when the schema is invalid, 1 otherwise.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabula::config::{Config, LogFormat};
use tabula::migrate::{self, CHECKSUM_TABLE, HISTORY_TABLE, Migrator, Outcome, PgDatabase};
use tabula::{MigrateError, Table, load_tables};

#[derive(Parser)]
#[command(
    name = "tabula",
    author,
    version,
    about = "Compile table schemas to PostgreSQL and apply them"
)]
struct Cli {
    /// Config file (default: ./tabula.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, compile and apply a schema in one transaction
    Apply {
        /// Schema JSON file
        schema: PathBuf,
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
    /// Print the DDL a schema compiles to, without a database
    Plan {
        schema: PathBuf,
        /// Write the SQL here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate and compile only
    Check { schema: PathBuf },
    /// Compare a schema with what the database last applied
    Status {
        schema: PathBuf,
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("TABULA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn read_schema(path: &Path) -> Result<Vec<Table>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    Ok(load_tables(&content).map_err(MigrateError::from)?)
}

fn database_url(flag: Option<String>, config: &Config) -> Result<String> {
    flag.or_else(|| config.database.url.clone()).context(
        "no database URL: pass --database-url, set DATABASE_URL or [database].url in tabula.toml",
    )
}

async fn connect(url: &str) -> Result<PgDatabase> {
    Ok(PgDatabase::connect(url).await.map_err(MigrateError::Database)?)
}

async fn apply(schema: &Path, url: &str, config: &Config) -> Result<()> {
    let tables = read_schema(schema)?;
    let db = connect(url).await?;
    let mut migrator = Migrator::new(db, config.compile_options());

    match migrator.run(&tables).await? {
        Outcome::Skipped { checksum } => {
            println!(
                "{} Schema unchanged ({}), nothing to do",
                "✓".green(),
                short(&checksum).dimmed()
            );
        }
        Outcome::Applied { checksum, report } => {
            println!(
                "{} Applied {} statements in {} ms ({})",
                "✓".green().bold(),
                report.statements.to_string().cyan(),
                report.elapsed.as_millis(),
                short(&checksum).dimmed()
            );
        }
    }
    migrator.into_database().close().await?;
    Ok(())
}

fn plan(schema: &Path, output: Option<&Path>, config: &Config) -> Result<()> {
    let tables = read_schema(schema)?;
    let prepared = migrate::prepare(&tables, &config.compile_options())?;
    let sql = format!("-- checksum: {}\n\n{}\n", prepared.checksum, prepared.plan.to_sql());

    match output {
        Some(path) => {
            std::fs::write(path, &sql)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} {} statements written to {}",
                "✓".green(),
                prepared.plan.len(),
                path.display().to_string().yellow()
            );
        }
        None => print!("{sql}"),
    }
    Ok(())
}

fn check(schema: &Path, config: &Config) -> Result<()> {
    let tables = read_schema(schema)?;
    let prepared = migrate::prepare(&tables, &config.compile_options())?;
    println!(
        "{} {} tables valid, {} statements ({})",
        "✓".green().bold(),
        tables.len(),
        prepared.plan.len(),
        short(&prepared.checksum).dimmed()
    );
    Ok(())
}

async fn status(schema: &Path, url: &str, config: &Config) -> Result<()> {
    let tables = read_schema(schema)?;
    let db = connect(url).await?;
    let mut migrator = Migrator::new(db, config.compile_options());
    let status = migrator.status(&tables).await?;

    println!("{}", "Migration status".cyan().bold());
    println!();
    println!("  Checksum table: {}", CHECKSUM_TABLE.green());
    println!("  History table:  {} ({} records)", HISTORY_TABLE.green(), status.history_count);
    println!("  Schema:         {}", short(&status.current));
    match &status.stored {
        Some(stored) => println!("  Applied:        {}", short(stored)),
        None => println!("  Applied:        {}", "never".dimmed()),
    }
    println!();
    if status.is_up_to_date() {
        println!("  {} Database is up to date", "✓".green());
    } else {
        println!("  {} Schema has changes; run {}", "○".yellow(), "tabula apply".cyan());
    }
    migrator.into_database().close().await?;
    Ok(())
}

fn short(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

/// Structured failure report on stderr.
fn report(err: &anyhow::Error) {
    let Some(migrate_err) = err.downcast_ref::<MigrateError>() else {
        eprintln!("{} {err:#}", "error:".red().bold());
        return;
    };

    match migrate_err {
        MigrateError::Validation(e) => {
            eprintln!("{} {}", "validation error:".red().bold(), e.message);
            eprintln!("  table: {}", e.table);
            eprintln!("  path:  {}", e.path.join("."));
        }
        MigrateError::Compile(e) => {
            eprintln!("{} {e}", "compile error:".red().bold());
        }
        MigrateError::Execution(e) => {
            eprintln!("{} {}", "migration failed:".red().bold(), e.phase);
            if let Some(sql) = &e.sql {
                eprintln!("  sql:      {}", sql.yellow());
            }
            if let Some(code) = &e.cause.code {
                eprintln!("  sqlstate: {code}");
            }
            eprintln!("  cause:    {}", e.cause.message);
            if let Some(trigger) = &e.trigger {
                eprintln!("  trigger:  {trigger}");
            }
        }
        MigrateError::Database(e) => {
            eprintln!("{} {e}", "database error:".red().bold());
        }
        MigrateError::Serialization(e) => {
            eprintln!("{} {e}", "error:".red().bold());
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<MigrateError>() {
        Some(e) if e.is_schema_error() => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Apply {
            schema,
            database_url: flag,
        } => apply(&schema, &database_url(flag, &config)?, &config).await,
        Commands::Plan { schema, output } => plan(&schema, output.as_deref(), &config),
        Commands::Check { schema } => check(&schema, &config),
        Commands::Status {
            schema,
            database_url: flag,
        } => status(&schema, &database_url(flag, &config)?, &config).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            return ExitCode::from(1);
        }
    };
    init_tracing(config.log.format);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            report(&e);
            exit_code(&e)
        }
    }
}
