//! Raw SQL escape hatch

use anyhow::{Context, Result};
use clap::Args;
use easycrud_core::DbConnection;
use serde_json::Value;

use super::parse_param;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// SQL text with `?` placeholders
    pub sql: String,

    /// Positional parameter, repeatable (JSON when it parses, else string)
    #[arg(long = "param", short = 'p', value_parser = parse_param)]
    pub params: Vec<Value>,
}

pub async fn run_query(conn: &mut DbConnection, args: QueryArgs) -> Result<Value> {
    let output = conn
        .query(&args.sql, &args.params)
        .await
        .context("raw query failed")?;
    Ok(serde_json::to_value(output)?)
}
