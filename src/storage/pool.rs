use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Configuration for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of connections opened against the database file.
    pub size: usize,
    /// How long `acquire` waits for a free connection before giving up.
    pub acquire_timeout: Duration,
    /// SQLite `busy_timeout` applied to every connection.
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 4,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Bounded pool of `tokio_rusqlite` connections.
///
/// A semaphore holds one permit per connection; a permit is taken before a
/// connection is popped from the idle list and given back only after the
/// connection has been pushed back, so the idle list is never empty while a
/// permit is outstanding.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    idle: Mutex<Vec<tokio_rusqlite::Connection>>,
    permits: Arc<Semaphore>,
    size: usize,
    acquire_timeout: Duration,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, Vec<tokio_rusqlite::Connection>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Pool {
    pub(crate) fn from_connections(
        connections: Vec<tokio_rusqlite::Connection>,
        acquire_timeout: Duration,
    ) -> Self {
        let size = connections.len();
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(connections),
                permits: Arc::new(Semaphore::new(size)),
                size,
                acquire_timeout,
            }),
        }
    }

    /// Borrow a connection exclusively. It returns to the pool when the guard drops.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let timeout = self.inner.acquire_timeout;
        let permit = match tokio::time::timeout(timeout, self.inner.permits.clone().acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(Error::PoolClosed),
            Err(_) => {
                log::warn!("No pooled connection became free within {timeout:?}");
                return Err(Error::PoolTimeout(timeout));
            }
        };

        let conn = self
            .inner
            .idle()
            .pop()
            .ok_or_else(|| Error::Other("pool permit granted with no idle connection".into()))?;
        log::debug!(
            "Acquired pooled connection ({} of {} free)",
            self.inner.permits.available_permits(),
            self.inner.size
        );

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Total number of connections managed by the pool.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Connections currently sitting idle.
    pub fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }

    /// Refuse further acquisitions. Outstanding guards still return normally.
    pub fn close(&self) {
        self.inner.permits.close();
    }
}

/// A connection checked out of a [`Pool`].
pub struct PooledConnection {
    conn: Option<tokio_rusqlite::Connection>,
    pool: Arc<PoolInner>,
    // Dropped after `Drop::drop` has pushed the connection back.
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = tokio_rusqlite::Connection;

    fn deref(&self) -> &Self::Target {
        // Only `drop` takes the connection out.
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.idle().push(conn);
            log::debug!("Released pooled connection");
        }
    }
}
