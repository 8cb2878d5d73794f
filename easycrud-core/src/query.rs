//! SQL statement construction
//!
//! Every CRUD helper goes through one of the builders here. Identifiers are
//! wrapped in backticks but not escaped; values always travel as positional
//! `?` parameters.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::value::Fields;

/// A parameterized statement ready to hand to the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Sort direction for one ORDER BY column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Numeric flag form: exactly `1` means descending, anything else ascending.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 1 {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Offset/limit window derived from a 1-based page index and a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Rows per page
    pub per_page: u32,
}

impl Pagination {
    /// Both values must be positive; zero in either disables the window.
    pub fn new(page: u32, per_page: u32) -> Option<Self> {
        (page > 0 && per_page > 0).then_some(Self { page, per_page })
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> u32 {
        self.per_page
    }
}

/// Options recognised by `get`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Compound ORDER BY, applied in list order
    pub order: Vec<(String, Direction)>,
    pub page: Option<u32>,
    pub page_per: Option<u32>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_per(mut self, page_per: u32) -> Self {
        self.page_per = Some(page_per);
        self
    }

    pub fn paginate(self, page: u32, page_per: u32) -> Self {
        self.page(page).page_per(page_per)
    }

    /// The LIMIT window, present only when both `page` and `page_per` are set.
    pub fn window(&self) -> Option<Pagination> {
        match (self.page, self.page_per) {
            (Some(page), Some(per_page)) => Pagination::new(page, per_page),
            _ => None,
        }
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name)
}

/// Build ` WHERE `a` = ? AND `b` = ?`, pushing the values onto `params`.
///
/// An empty filter yields an empty string (no WHERE at all).
pub fn where_clause(filter: &Fields, params: &mut Vec<Value>) -> Result<String> {
    filter.validate()?;
    if filter.is_empty() {
        return Ok(String::new());
    }

    let conditions: Vec<String> = filter
        .iter()
        .map(|(column, value)| {
            params.push(value.clone());
            format!("{} = ?", quote_ident(column))
        })
        .collect();

    Ok(format!(" WHERE {}", conditions.join(" AND ")))
}

fn set_clause(data: &Fields, operation: &'static str, params: &mut Vec<Value>) -> Result<String> {
    data.validate()?;
    if data.is_empty() {
        return Err(Error::EmptyData { operation });
    }

    let assignments: Vec<String> = data
        .iter()
        .map(|(column, value)| {
            params.push(value.clone());
            format!("{} = ?", quote_ident(column))
        })
        .collect();

    Ok(format!(" SET {}", assignments.join(", ")))
}

fn order_clause(order: &[(String, Direction)]) -> String {
    if order.is_empty() {
        return String::new();
    }

    let terms: Vec<String> = order
        .iter()
        .map(|(column, direction)| format!("{} {}", column, direction.as_sql()))
        .collect();

    format!(" ORDER BY {}", terms.join(", "))
}

/// `SELECT id FROM `table` [WHERE ...]`
pub fn select_ids(table: &str, filter: &Fields) -> Result<Statement> {
    let mut params = Vec::with_capacity(filter.len());
    let sql = format!(
        "SELECT id FROM {}{}",
        quote_ident(table),
        where_clause(filter, &mut params)?
    );
    Ok(Statement { sql, params })
}

/// `SELECT COUNT(id) AS rCount FROM `table` [WHERE ...]`
pub fn select_count(table: &str, filter: &Fields) -> Result<Statement> {
    let mut params = Vec::with_capacity(filter.len());
    let sql = format!(
        "SELECT COUNT(id) AS rCount FROM {}{}",
        quote_ident(table),
        where_clause(filter, &mut params)?
    );
    Ok(Statement { sql, params })
}

/// `SELECT * FROM `table` [WHERE ...] [ORDER BY ...] [LIMIT offset, limit]`
pub fn select_rows(table: &str, filter: &Fields, options: &GetOptions) -> Result<Statement> {
    let mut params = Vec::with_capacity(filter.len());
    let mut sql = format!(
        "SELECT * FROM {}{}",
        quote_ident(table),
        where_clause(filter, &mut params)?
    );
    sql.push_str(&order_clause(&options.order));
    if let Some(window) = options.window() {
        sql.push_str(&format!(" LIMIT {}, {}", window.offset(), window.limit()));
    }
    Ok(Statement { sql, params })
}

/// `INSERT INTO `table` SET `col` = ?, ...`
pub fn insert(table: &str, data: &Fields) -> Result<Statement> {
    let mut params = Vec::with_capacity(data.len());
    let sql = format!(
        "INSERT INTO {}{}",
        quote_ident(table),
        set_clause(data, "INSERT", &mut params)?
    );
    Ok(Statement { sql, params })
}

/// `UPDATE `table` SET `col` = ?, ... [WHERE ...]`
///
/// Data values bind first, then filter values. An empty filter touches every row.
pub fn update(table: &str, filter: &Fields, data: &Fields) -> Result<Statement> {
    let mut params = Vec::with_capacity(data.len() + filter.len());
    let set = set_clause(data, "UPDATE", &mut params)?;
    let sql = format!(
        "UPDATE {}{}{}",
        quote_ident(table),
        set,
        where_clause(filter, &mut params)?
    );
    Ok(Statement { sql, params })
}

/// `DELETE FROM `table` [WHERE ...]`. An empty filter deletes every row.
pub fn delete(table: &str, filter: &Fields) -> Result<Statement> {
    let mut params = Vec::with_capacity(filter.len());
    let sql = format!(
        "DELETE FROM {}{}",
        quote_ident(table),
        where_clause(filter, &mut params)?
    );
    Ok(Statement { sql, params })
}
