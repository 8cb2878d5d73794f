//! Pool manager: configuration plus the lifetime of the shared pool
//!
//! Uses sqlx `MySqlPool` with explicit connection limits. The pool is created
//! lazily (no connection is opened until the first `acquire`).

use sqlx::MySqlPool;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::DbConfig;
use crate::connection::DbConnection;
use crate::error::{Error, Result, ShutdownError};

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open physical connections as the driver sees them
    pub size: u32,
    pub idle: u32,
    pub max: u32,
    /// `DbConnection` handles not yet released or dropped
    pub checked_out: u32,
}

impl PoolStatus {
    /// Handles currently held by callers.
    pub fn active(&self) -> u32 {
        self.checked_out
    }
}

/// Count of live `DbConnection` handles.
///
/// The driver's own size/idle numbers lag behind a release (a returned
/// connection is pinged before it counts as idle), so shutdown checks this
/// counter instead.
#[derive(Debug, Clone, Default)]
pub(crate) struct Checkouts(Arc<AtomicU32>);

impl Checkouts {
    pub(crate) fn checkout(&self) -> CheckoutGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        CheckoutGuard(Arc::clone(&self.0))
    }

    fn current(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}

/// Held by a `DbConnection`; decrements the count when the handle goes away.
#[derive(Debug)]
pub(crate) struct CheckoutGuard(Arc<AtomicU32>);

impl Drop for CheckoutGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Owns the configuration and, once created, the connection pool.
#[derive(Debug)]
pub struct DbPool {
    config: DbConfig,
    pool: Option<MySqlPool>,
    checkouts: Checkouts,
}

impl DbPool {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            pool: None,
            checkouts: Checkouts::default(),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn is_created(&self) -> bool {
        self.pool.is_some()
    }

    /// Instantiate the pool from the stored configuration.
    ///
    /// Calling this twice replaces the previous pool; connections still
    /// checked out from the old one are orphaned.
    ///
    /// Must run inside a Tokio runtime.
    #[instrument(skip_all, fields(host = %self.config.host, limit = self.config.connection_limit))]
    pub fn create(&mut self) -> &mut Self {
        if self.pool.is_some() {
            warn!("create() called on a live pool; replacing it");
        }

        let pool = self
            .config
            .pool_options()
            .connect_lazy_with(self.config.connect_options());
        self.pool = Some(pool);
        info!("connection pool created");
        self
    }

    /// Check out one physical connection.
    ///
    /// # Errors
    ///
    /// `Error::PoolNotCreated` before `create()`, `Error::Pool` when the pool
    /// is exhausted past its acquire timeout or connecting fails.
    #[instrument(skip_all)]
    pub async fn acquire(&self) -> Result<DbConnection> {
        let pool = self.pool.as_ref().ok_or(Error::PoolNotCreated)?;
        let conn = pool.acquire().await.map_err(Error::Pool)?;
        Ok(DbConnection::new(conn, self.checkouts.checkout()))
    }

    pub fn status(&self) -> Option<PoolStatus> {
        self.pool.as_ref().map(|pool| PoolStatus {
            size: pool.size(),
            idle: u32::try_from(pool.num_idle()).unwrap_or(u32::MAX),
            max: self.config.connection_limit,
            checked_out: self.checkouts.current(),
        })
    }

    /// Drain and close the pool.
    ///
    /// Refuses while any handle is still checked out; release every
    /// `DbConnection` first. Connections still on their way back to the pool
    /// are waited for.
    #[instrument(skip_all)]
    pub async fn end(&mut self) -> Result<()> {
        if self.pool.is_none() {
            return Err(ShutdownError::NotCreated.into());
        }
        let active = self.checkouts.current();
        if active > 0 {
            return Err(ShutdownError::ActiveConnections { active }.into());
        }

        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        info!("connection pool closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> DbConfig {
        DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            acquire_timeout_secs: Some(1),
            ..DbConfig::default()
        }
    }

    #[tokio::test]
    async fn acquire_before_create_fails() {
        let pool = DbPool::new(DbConfig::default());
        assert!(!pool.is_created());
        assert!(matches!(pool.acquire().await, Err(Error::PoolNotCreated)));
    }

    #[tokio::test]
    async fn end_before_create_fails() {
        let mut pool = DbPool::new(DbConfig::default());
        let err = pool.end().await.unwrap_err();
        assert!(matches!(err, Error::Shutdown(ShutdownError::NotCreated)));
    }

    #[tokio::test]
    async fn create_is_lazy_and_end_closes() {
        let mut pool = DbPool::new(unreachable_config());
        pool.create();

        let status = pool.status().expect("pool created");
        assert_eq!(status.size, 0);
        assert_eq!(status.active(), 0);
        assert_eq!(status.max, 10);

        pool.end().await.expect("idle pool closes");
        assert!(!pool.is_created());
    }

    #[tokio::test]
    async fn acquire_wraps_driver_error() {
        let mut pool = DbPool::new(unreachable_config());
        pool.create();

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, Error::Pool(_)));
        assert!(err.driver_error().is_some());

        pool.end().await.unwrap();
    }

    #[test]
    fn status_active_count() {
        let status = PoolStatus {
            size: 5,
            idle: 5,
            max: 10,
            checked_out: 3,
        };
        assert_eq!(status.active(), 3);
    }

    #[test]
    fn checkout_guard_tracks_live_handles() {
        let checkouts = Checkouts::default();
        let first = checkouts.checkout();
        let second = checkouts.checkout();
        assert_eq!(checkouts.current(), 2);

        drop(first);
        assert_eq!(checkouts.current(), 1);
        drop(second);
        assert_eq!(checkouts.current(), 0);
    }

    #[tokio::test]
    async fn end_waits_only_for_outstanding_handles() {
        let mut pool = DbPool::new(unreachable_config());
        pool.create();

        let handle = pool.checkouts.checkout();
        assert_eq!(pool.status().unwrap().checked_out, 1);
        let err = pool.end().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Shutdown(ShutdownError::ActiveConnections { active: 1 })
        ));
        assert!(pool.is_created());

        // Released handle: end goes through on the current-thread runtime
        // without waiting for the driver's idle bookkeeping.
        drop(handle);
        pool.end().await.expect("released pool closes");
        assert!(!pool.is_created());
    }

    // Integration tests require a real database
    // Run with: EASYCRUD_HOST=... cargo test -p easycrud-core -- --ignored
}
