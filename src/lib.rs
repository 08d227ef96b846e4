//! tabula: declarative table schemas compiled to PostgreSQL DDL.
//!
//! A schema is a list of [`Table`]s. One run goes through:
//!
//! 1. [`checksum`]: canonical SHA-256 of the schema; an unchanged schema is skipped.
//! 2. [`validator`]: formula syntax, references and cycles, keys, views, permissions.
//! 3. [`compiler`]: field types to columns, then `CREATE ... IF NOT EXISTS` statements.
//! 4. [`migrate`]: every statement in one transaction, history row, checksum.
//!
//! ```no_run
//! use tabula::compiler::CompileOptions;
//! use tabula::migrate::{Migrator, PgDatabase};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let tables = tabula::load_tables(&std::fs::read_to_string("schema.json")?)?;
//! let db = PgDatabase::connect("postgres://localhost/app").await?;
//! let outcome = Migrator::new(db, CompileOptions::default()).run(&tables).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod compiler;
pub mod config;
pub mod error;
pub mod formula;
pub mod migrate;
pub mod schema;
pub mod validator;

pub use checksum::{migration_checksum, schema_checksum};
pub use compiler::{CompileOptions, MigrationPlan, compile_schema};
pub use config::Config;
pub use error::{
    CompileError, DatabaseError, ExecutionError, MigrateError, MigrateResult, Phase,
    ValidationError,
};
pub use migrate::{Migrator, Outcome};
pub use schema::{Field, FieldKind, Table, load_tables};
pub use validator::validate_schema;
