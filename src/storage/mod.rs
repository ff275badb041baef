pub mod pool;
pub mod repository;
pub mod transaction;

pub use pool::{Pool, PoolConfig, PooledConnection};

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))])
}

impl Pool {
    /// Open the database at the default path (`~/.workpulse/workpulse.db`).
    pub async fn open() -> Result<Self> {
        Self::open_with(PoolConfig::default()).await
    }

    /// Open the database at the default path with the given pool settings.
    pub async fn open_with(config: PoolConfig) -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".workpulse");
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config(e.to_string()))?;
        Self::open_at(dir.join("workpulse.db"), config).await
    }

    /// Open `config.size` connections to the database at the given path.
    /// The first connection applies pending migrations before the rest are opened.
    pub async fn open_at(path: impl AsRef<std::path::Path>, config: PoolConfig) -> Result<Self> {
        if config.size == 0 {
            return Err(Error::Config("pool size must be at least 1".into()));
        }
        let path = path.as_ref().to_path_buf();

        let first = tokio_rusqlite::Connection::open(&path).await?;
        init_connection(&first, &config).await?;
        migrate(&first).await?;

        let mut connections = vec![first];
        for _ in 1..config.size {
            let conn = tokio_rusqlite::Connection::open(&path).await?;
            init_connection(&conn, &config).await?;
            connections.push(conn);
        }

        log::info!(
            "Opened {} with {} pooled connections",
            path.display(),
            config.size
        );
        Ok(Self::from_connections(connections, config.acquire_timeout))
    }

    /// Open an in-memory database (for testing).
    ///
    /// In-memory databases are per-connection, so the pool holds exactly one.
    pub async fn open_memory() -> Result<Self> {
        let config = PoolConfig {
            size: 1,
            ..PoolConfig::default()
        };
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        init_connection(&conn, &config).await?;
        migrate(&conn).await?;
        Ok(Self::from_connections(vec![conn], config.acquire_timeout))
    }
}

async fn init_connection(conn: &tokio_rusqlite::Connection, config: &PoolConfig) -> Result<()> {
    let busy_ms = config.busy_timeout.as_millis();
    conn.call(move |conn| {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\
             PRAGMA foreign_keys=ON;\
             PRAGMA busy_timeout={busy_ms};"
        ))?;
        Ok::<(), rusqlite::Error>(())
    })
    .await?;
    Ok(())
}

async fn migrate(conn: &tokio_rusqlite::Connection) -> Result<()> {
    conn.call(|conn| {
        migrations().to_latest(conn).map_err(|e| e.to_string())?;
        Ok::<(), String>(())
    })
    .await
    .map_err(|e| Error::Migration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_validate() {
        assert!(migrations().validate().is_ok());
    }

    #[tokio::test]
    async fn test_open_memory() {
        let pool = Pool::open_memory().await.unwrap();
        assert_eq!(pool.size(), 1);

        let conn = pool.acquire().await.unwrap();
        let tables: Vec<String> = conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok::<Vec<String>, rusqlite::Error>(rows.filter_map(|r| r.ok()).collect())
            })
            .await
            .unwrap();

        for table in [
            "organizations",
            "employees",
            "projects",
            "tasks",
            "task_assignees",
            "app_config",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_open_at_creates_every_connection() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig {
            size: 3,
            ..PoolConfig::default()
        };
        let pool = Pool::open_at(dir.path().join("wp.db"), config).await.unwrap();
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.idle_count(), 3);

        // Reopening an already-migrated file is a no-op.
        drop(pool);
        let pool = Pool::open_at(dir.path().join("wp.db"), PoolConfig::default())
            .await
            .unwrap();
        assert_eq!(pool.size(), 4);
    }

    #[tokio::test]
    async fn test_zero_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig {
            size: 0,
            ..PoolConfig::default()
        };
        let result = Pool::open_at(dir.path().join("wp.db"), config).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
