//! easycrud CLI - table CRUD and raw queries against a pooled MySQL connection
//!
//! Every command opens a pool, checks out one connection, runs, releases the
//! connection and closes the pool. Results are printed as JSON on stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use commands::crud::{FilterOnlyArgs, GetArgs, InsertArgs, UpdateArgs};
use commands::{ConnectionArgs, DemoArgs, QueryArgs, Session};
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "easycrud",
    author,
    version,
    about = "Quick CRUD helpers and transactions over a pooled MySQL connection",
    long_about = "Run exact-match CRUD statements against one table, or raw parameterized SQL. \
                  Connection settings come from --config, EASYCRUD_* environment variables, \
                  or the flags below (highest priority)."
)]
struct Cli {
    /// Log every statement to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch rows (SELECT *) with optional filter, ordering and pagination
    Get(GetArgs),
    /// Count rows matching a filter
    Count(FilterOnlyArgs),
    /// Check whether any row matches a filter
    Exists(FilterOnlyArgs),
    /// Insert one row
    Insert(InsertArgs),
    /// Update rows matching a filter (no filter updates ALL rows)
    Update(UpdateArgs),
    /// Delete rows matching a filter (no filter deletes ALL rows)
    Delete(FilterOnlyArgs),
    /// Run raw parameterized SQL
    Query(QueryArgs),
    /// Walk through a read-only transaction against a table
    Demo(DemoArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // .env in cwd is optional

    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug })?;

    let config = cli.connection.resolve()?;
    let mut session = Session::open(config).await?;
    let conn = session.conn();

    let outcome = match cli.command {
        Commands::Get(args) => commands::crud::run_get(conn, args).await,
        Commands::Count(args) => commands::crud::run_count(conn, args).await,
        Commands::Exists(args) => commands::crud::run_exists(conn, args).await,
        Commands::Insert(args) => commands::crud::run_insert(conn, args).await,
        Commands::Update(args) => commands::crud::run_update(conn, args).await,
        Commands::Delete(args) => commands::crud::run_delete(conn, args).await,
        Commands::Query(args) => commands::query::run_query(conn, args).await,
        Commands::Demo(args) => commands::demo::run_demo(conn, args).await,
    };

    session.finish(outcome).await
}
