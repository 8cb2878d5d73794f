//! Bound connection handle and table-scoped CRUD
//!
//! A `DbConnection` owns one pooled connection until `release()`. Table
//! operations go through `DbConnection::table`, which hands out a short-lived
//! `Table` borrowing the connection, so a table name never outlives the call
//! chain that selected it.

use serde_json::Value;
use sqlx::mysql::MySql;
use sqlx::pool::PoolConnection;
use sqlx::{Executor, Row as _, Statement as _};
use std::fmt;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pool::CheckoutGuard;
use crate::query::{self, GetOptions, Statement};
use crate::value::{bind_value, decode_row, Fields, QueryOutput, Row, WriteResult};

/// Transaction state tracked per handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionState {
    #[default]
    Idle,
    InTransaction,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::InTransaction => write!(f, "in a transaction"),
        }
    }
}

/// One checked-out connection.
///
/// Every operation takes `&mut self`, so a handle runs one statement at a
/// time. Dropping the handle also returns the connection to the pool.
pub struct DbConnection {
    conn: PoolConnection<MySql>,
    state: TransactionState,
    _checkout: CheckoutGuard,
}

impl fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConnection")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DbConnection {
    pub(crate) fn new(conn: PoolConnection<MySql>, checkout: CheckoutGuard) -> Self {
        Self {
            conn,
            state: TransactionState::Idle,
            _checkout: checkout,
        }
    }

    /// Scope the following operations to `name`.
    pub fn table(&mut self, name: impl Into<String>) -> Table<'_> {
        Table {
            conn: self,
            name: name.into(),
        }
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.state
    }

    pub fn in_transaction(&self) -> bool {
        self.state == TransactionState::InTransaction
    }

    pub async fn begin_transaction(&mut self) -> Result<()> {
        self.expect_state("begin a transaction", TransactionState::Idle)?;
        self.run_text("START TRANSACTION").await?;
        self.state = TransactionState::InTransaction;
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.expect_state("commit", TransactionState::InTransaction)?;
        self.run_text("COMMIT").await?;
        self.state = TransactionState::Idle;
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.expect_state("roll back", TransactionState::InTransaction)?;
        self.run_text("ROLLBACK").await?;
        self.state = TransactionState::Idle;
        Ok(())
    }

    /// Run arbitrary SQL with positional parameters.
    ///
    /// Statements that produce a result set come back as rows; everything
    /// else as a `WriteResult`.
    pub async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput> {
        debug!(sql, params = params.len(), "raw query");

        let prepared = (&mut *self.conn)
            .prepare(sql)
            .await
            .map_err(|e| Error::query(sql, e))?;
        let returns_rows = !prepared.columns().is_empty();

        let stmt = Statement {
            sql: sql.to_owned(),
            params: params.to_vec(),
        };
        if returns_rows {
            self.fetch_all(&stmt).await.map(QueryOutput::Rows)
        } else {
            self.execute(&stmt).await.map(QueryOutput::Write)
        }
    }

    /// Give the connection back to the pool.
    ///
    /// A connection released mid-transaction is closed instead of reused, so
    /// the next borrower never inherits an open transaction.
    pub fn release(self) {
        if self.in_transaction() {
            warn!("connection released with an open transaction; closing it instead of reusing");
            drop(self.conn.detach());
        }
    }

    fn expect_state(&self, action: &'static str, wanted: TransactionState) -> Result<()> {
        if self.state == wanted {
            Ok(())
        } else {
            Err(Error::Transaction {
                action,
                state: self.state,
            })
        }
    }

    /// Transaction control goes over the text protocol.
    async fn run_text(&mut self, sql: &'static str) -> Result<()> {
        debug!(sql, "transaction control");
        sqlx::raw_sql(sql)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::query(sql, e))?;
        Ok(())
    }

    fn prepare_query(stmt: &Statement) -> sqlx::query::Query<'_, MySql, sqlx::mysql::MySqlArguments> {
        stmt.params
            .iter()
            .fold(sqlx::query(&stmt.sql), bind_value)
    }

    async fn fetch_all(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
        let rows = Self::prepare_query(stmt)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| Error::query(&stmt.sql, e))?;

        rows.iter().map(decode_row).collect()
    }

    async fn fetch_any(&mut self, stmt: &Statement) -> Result<bool> {
        let row = Self::prepare_query(stmt)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| Error::query(&stmt.sql, e))?;

        Ok(row.is_some())
    }

    async fn fetch_count(&mut self, stmt: &Statement) -> Result<i64> {
        let row = Self::prepare_query(stmt)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| Error::query(&stmt.sql, e))?;

        row.try_get::<i64, _>("rCount")
            .map_err(|e| Error::decode("rCount", e))
    }

    async fn execute(&mut self, stmt: &Statement) -> Result<WriteResult> {
        let result = Self::prepare_query(stmt)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::query(&stmt.sql, e))?;

        Ok(result.into())
    }
}

/// Operations against one table on a borrowed connection.
pub struct Table<'c> {
    conn: &'c mut DbConnection,
    name: String,
}

impl Table<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True iff at least one row matches `filter` (any row when empty).
    pub async fn exists(&mut self, filter: &Fields) -> Result<bool> {
        let stmt = query::select_ids(&self.name, filter)?;
        self.log(&stmt);
        self.conn.fetch_any(&stmt).await
    }

    /// Number of rows matching `filter`.
    pub async fn count(&mut self, filter: &Fields) -> Result<i64> {
        let stmt = query::select_count(&self.name, filter)?;
        self.log(&stmt);
        self.conn.fetch_count(&stmt).await
    }

    /// Rows matching `filter`, ordered and windowed per `options`.
    pub async fn get(&mut self, filter: &Fields, options: &GetOptions) -> Result<Vec<Row>> {
        let stmt = query::select_rows(&self.name, filter, options)?;
        self.log(&stmt);
        self.conn.fetch_all(&stmt).await
    }

    pub async fn create(&mut self, data: &Fields) -> Result<WriteResult> {
        let stmt = query::insert(&self.name, data)?;
        self.log(&stmt);
        self.conn.execute(&stmt).await
    }

    /// Update rows matching `filter`. An empty filter updates every row.
    pub async fn update(&mut self, filter: &Fields, data: &Fields) -> Result<WriteResult> {
        let stmt = query::update(&self.name, filter, data)?;
        self.log(&stmt);
        self.conn.execute(&stmt).await
    }

    /// Delete rows matching `filter`. An empty filter deletes every row.
    pub async fn delete(&mut self, filter: &Fields) -> Result<WriteResult> {
        let stmt = query::delete(&self.name, filter)?;
        self.log(&stmt);
        self.conn.execute(&stmt).await
    }

    /// Raw escape hatch on the underlying connection.
    pub async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutput> {
        self.conn.query(sql, params).await
    }

    fn log(&self, stmt: &Statement) {
        debug!(
            table = %self.name,
            sql = %stmt.sql,
            params = stmt.params.len(),
            "executing statement"
        );
    }
}
