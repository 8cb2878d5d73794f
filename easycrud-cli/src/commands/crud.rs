//! Table commands: get, count, exists, insert, update, delete

use anyhow::{Context, Result};
use clap::Args;
use easycrud_core::{DbConnection, Direction, Fields, GetOptions};
use serde_json::{json, Value};

use super::{parse_assignment, parse_order, FilterArgs};

#[derive(Args, Debug)]
pub struct FilterOnlyArgs {
    /// Table name
    pub table: String,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Table name
    pub table: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Sort column, repeatable: --order id:desc (or id:1 / id:0)
    #[arg(long, value_name = "COL[:DIR]", value_parser = parse_order)]
    pub order: Vec<(String, Direction)>,

    /// Page number, 1-based (needs --per-page)
    #[arg(long)]
    pub page: Option<u32>,

    /// Rows per page (needs --page)
    #[arg(long)]
    pub per_page: Option<u32>,
}

impl GetArgs {
    fn options(&self) -> GetOptions {
        GetOptions {
            order: self.order.clone(),
            page: self.page,
            page_per: self.per_page,
        }
    }
}

#[derive(Args, Debug)]
pub struct InsertArgs {
    /// Table name
    pub table: String,

    /// Column to set, repeatable: --set col=value
    #[arg(long = "set", short = 's', value_name = "COL=VALUE", required = true, value_parser = parse_assignment)]
    pub data: Vec<(String, Value)>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Table name
    pub table: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Column to set, repeatable: --set col=value
    #[arg(long = "set", short = 's', value_name = "COL=VALUE", required = true, value_parser = parse_assignment)]
    pub data: Vec<(String, Value)>,
}

pub async fn run_get(conn: &mut DbConnection, args: GetArgs) -> Result<Value> {
    let rows = conn
        .table(args.table.as_str())
        .get(&args.filter.fields(), &args.options())
        .await
        .with_context(|| format!("get from `{}` failed", args.table))?;
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

pub async fn run_count(conn: &mut DbConnection, args: FilterOnlyArgs) -> Result<Value> {
    let count = conn
        .table(args.table.as_str())
        .count(&args.filter.fields())
        .await
        .with_context(|| format!("count on `{}` failed", args.table))?;
    Ok(json!({ "count": count }))
}

pub async fn run_exists(conn: &mut DbConnection, args: FilterOnlyArgs) -> Result<Value> {
    let exists = conn
        .table(args.table.as_str())
        .exists(&args.filter.fields())
        .await
        .with_context(|| format!("exists on `{}` failed", args.table))?;
    Ok(json!({ "exists": exists }))
}

pub async fn run_insert(conn: &mut DbConnection, args: InsertArgs) -> Result<Value> {
    let data: Fields = args.data.into_iter().collect();
    let result = conn
        .table(args.table.as_str())
        .create(&data)
        .await
        .with_context(|| format!("insert into `{}` failed", args.table))?;
    Ok(serde_json::to_value(result)?)
}

pub async fn run_update(conn: &mut DbConnection, args: UpdateArgs) -> Result<Value> {
    if args.filter.filter.is_empty() {
        tracing::warn!(table = %args.table, "update without --where touches every row");
    }
    let data: Fields = args.data.into_iter().collect();
    let result = conn
        .table(args.table.as_str())
        .update(&args.filter.fields(), &data)
        .await
        .with_context(|| format!("update of `{}` failed", args.table))?;
    Ok(serde_json::to_value(result)?)
}

pub async fn run_delete(conn: &mut DbConnection, args: FilterOnlyArgs) -> Result<Value> {
    if args.filter.filter.is_empty() {
        tracing::warn!(table = %args.table, "delete without --where removes every row");
    }
    let result = conn
        .table(args.table.as_str())
        .delete(&args.filter.fields())
        .await
        .with_context(|| format!("delete from `{}` failed", args.table))?;
    Ok(serde_json::to_value(result)?)
}
