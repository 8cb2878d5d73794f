//! easycrud-core: pooled MySQL connections with table-scoped CRUD helpers
//!
//! ```ignore
//! let mut pool = DbPool::new(DbConfig::from_env()?);
//! pool.create();
//!
//! let mut conn = pool.acquire().await?;
//! conn.begin_transaction().await?;
//! conn.table("Users")
//!     .create(&Fields::new().with("userid", "god").with("age", 25))
//!     .await?;
//! let newest = conn
//!     .table("Users")
//!     .get(&Fields::new(), &GetOptions::new().order_by("id", Direction::Desc))
//!     .await?;
//! conn.commit().await?;
//!
//! conn.release();
//! pool.end().await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod query;
pub mod value;

pub use config::DbConfig;
pub use connection::{DbConnection, Table, TransactionState};
pub use error::{Error, Result, ShutdownError};
pub use pool::{DbPool, PoolStatus};
pub use query::{Direction, GetOptions, Pagination, Statement};
pub use value::{Fields, QueryOutput, Row, WriteResult};
