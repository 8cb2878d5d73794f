//! Column/value mappings and conversion between JSON values and MySQL
//!
//! Where-clauses and insert/update data are both `Fields`: an
//! insertion-ordered list of (column, value) pairs. Rows come back as JSON
//! objects keyed by column name.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySql, MySqlArguments, MySqlColumn, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::error::{Error, Result};

/// One result row: column name -> value.
pub type Row = Map<String, Value>;

/// Ordered column/value pairs used for WHERE filters and SET data.
///
/// Order is preserved exactly as inserted, which fixes both the clause order
/// and the parameter order of the generated statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder-style append.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.push((column.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(column, value)| (column.as_str(), value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(column, _)| column.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, value)| value)
    }

    /// Every column name must be a non-empty string.
    pub fn validate(&self) -> Result<()> {
        match self.0.iter().position(|(column, _)| column.is_empty()) {
            Some(position) => Err(Error::InvalidColumn { position }),
            None => Ok(()),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Fields {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Key order follows the map's iteration order.
impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Driver report for statements that do not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    /// AUTO_INCREMENT id generated by the statement (0 when none)
    pub insert_id: u64,
    pub affected_rows: u64,
}

impl From<sqlx::mysql::MySqlQueryResult> for WriteResult {
    fn from(result: sqlx::mysql::MySqlQueryResult) -> Self {
        Self {
            insert_id: result.last_insert_id(),
            affected_rows: result.rows_affected(),
        }
    }
}

/// Result of a raw `query()`: rows for statements that produce a result set,
/// the write report otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Rows(Vec<Row>),
    Write(WriteResult),
}

impl QueryOutput {
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Write(_) => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Write(_) => None,
        }
    }
}

/// Bind one JSON value as a positional parameter.
///
/// Scalars bind natively; arrays and objects bind as a JSON document.
pub(crate) fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => {
            if let Some(signed) = number.as_i64() {
                query.bind(signed)
            } else if let Some(unsigned) = number.as_u64() {
                query.bind(unsigned)
            } else {
                query.bind(number.as_f64())
            }
        }
        Value::String(text) => query.bind(text.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(sqlx::types::Json(value)),
    }
}

/// Convert a driver row into a JSON object.
pub(crate) fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut out = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        out.insert(column.name().to_owned(), decode_column(row, column)?);
    }
    Ok(out)
}

fn decode_column(row: &MySqlRow, column: &MySqlColumn) -> Result<Value> {
    let index = column.ordinal();
    let name = column.name();

    let raw = row
        .try_get_raw(index)
        .map_err(|err| Error::decode(name, err))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = column.type_info().name();
    let decoded: std::result::Result<Value, sqlx::Error> = match type_name {
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(index).map(Value::from)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" | "YEAR" => row.try_get_unchecked::<u64, _>(index).map(Value::from),
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(index).map(Value::from),
        // DECIMAL travels as text in both protocols; keep it exact.
        "DECIMAL" => row.try_get_unchecked::<String, _>(index).map(Value::String),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|dt| Value::String(dt.to_string()))
            .or_else(|err| zero_temporal(row, index, ZERO_DATETIME, err)),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|date| Value::String(date.to_string()))
            .or_else(|err| zero_temporal(row, index, ZERO_DATE, err)),
        // TIME is a signed interval up to 838:59:59, not a time of day.
        "TIME" => row
            .try_get::<MySqlTime, _>(index)
            .map(|time| Value::String(format_time(&time))),
        "JSON" => row
            .try_get::<sqlx::types::Json<Value>, _>(index)
            .map(|json| json.0),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(BASE64.encode(bytes))),
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String),
    };

    decoded.map_err(|err| Error::decode(name, err))
}

/// `[-]HH:MM:SS[.ffffff]`, the way the server prints TIME.
fn format_time(time: &MySqlTime) -> String {
    let sign = if time.is_negative() { "-" } else { "" };
    let mut out = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        time.hours(),
        time.minutes(),
        time.seconds()
    );
    if time.microseconds() != 0 {
        out.push_str(&format!(".{:06}", time.microseconds()));
    }
    out
}

const ZERO_DATE: &str = "0000-00-00";
const ZERO_DATETIME: &str = "0000-00-00 00:00:00";

/// Render a MySQL zero date, which chrono cannot represent, as its literal
/// text. Any other decode failure is passed through.
fn zero_temporal(
    row: &MySqlRow,
    index: usize,
    zero: &str,
    err: sqlx::Error,
) -> std::result::Result<Value, sqlx::Error> {
    match row.try_get_unchecked::<&[u8], _>(index) {
        Ok(bytes) if is_zero_temporal(bytes) => Ok(Value::String(zero.to_owned())),
        _ => Err(err),
    }
}

/// Zero dates arrive as `0000-00-00...` text, or as a zero-length value
/// (a lone length byte) in the binary protocol.
fn is_zero_temporal(bytes: &[u8]) -> bool {
    bytes == [0] || bytes.is_empty() || bytes.starts_with(ZERO_DATE.as_bytes())
}
