//! Guided walkthrough: raw select, begin, ordered get, commit (rollback on error)

use anyhow::Result;
use clap::Args;
use easycrud_core::{DbConnection, Direction, Fields, GetOptions};
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Table to read
    #[arg(default_value = "Users")]
    pub table: String,
}

pub async fn run_demo(conn: &mut DbConnection, args: DemoArgs) -> Result<Value> {
    match demo_steps(conn, &args.table).await {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(error = %err, "demo failed, rolling back");
            if conn.in_transaction() {
                conn.rollback().await?;
            }
            Err(err)
        }
    }
}

async fn demo_steps(conn: &mut DbConnection, table: &str) -> Result<Value> {
    let raw = conn
        .query(&format!("SELECT * FROM `{}`", table), &[])
        .await?;
    info!(rows = raw.rows().map_or(0, |r| r.len()), "raw query done");

    conn.begin_transaction().await?;
    info!("transaction began");

    let newest_first = conn
        .table(table)
        .get(&Fields::new(), &GetOptions::new().order_by("id", Direction::Desc))
        .await?;

    conn.commit().await?;
    info!("committed");

    Ok(json!({
        "raw": raw,
        "newest_first": newest_first,
    }))
}
