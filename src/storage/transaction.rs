use rusqlite::Transaction;

use super::Pool;
use crate::error::{unwrap_call_error, Result};

impl Pool {
    /// Run `work` inside a transaction on a dedicated pooled connection.
    ///
    /// Commits and returns the closure's value on success. Any error from the
    /// closure or from `COMMIT` rolls the transaction back and is returned
    /// as-is. The connection goes back to the pool on every path. A failure to
    /// acquire a connection is returned before any transaction is opened.
    pub async fn transaction<F, R>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.acquire().await?;
        conn.call(move |conn| run_in_transaction(conn, work))
            .await
            .map_err(unwrap_call_error)
    }
}

fn run_in_transaction<F, R>(conn: &mut rusqlite::Connection, work: F) -> Result<R>
where
    F: FnOnce(&Transaction<'_>) -> Result<R>,
{
    let tx = conn.transaction()?;
    match work(&tx) {
        Ok(value) => {
            // A failed COMMIT leaves the transaction open; dropping `tx` rolls it back.
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            log::warn!("Rolling back transaction: {e}");
            if let Err(rollback_err) = tx.rollback() {
                log::error!("Rollback failed: {rollback_err}");
            }
            Err(e)
        }
    }
}
