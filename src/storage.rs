use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::favorites::FavoriteStore;

#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("storage: open in-memory database")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn favorite_ids(&self) -> Result<Vec<String>> {
        self.list_ids("favorites")
    }

    pub fn is_favorite(&self, gif_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM favorites WHERE gif_id = ?1",
                params![gif_id],
                |row| row.get(0),
            )
            .optional()
            .context("storage: query favorite")?;
        Ok(found.is_some())
    }

    pub fn add_favorite(&self, gif_id: &str) -> Result<()> {
        self.insert_id("favorites", gif_id)
    }

    pub fn remove_favorite(&self, gif_id: &str) -> Result<()> {
        self.delete_id("favorites", gif_id)
    }

    /// Flips membership and returns whether the id is now a favorite.
    pub fn toggle_favorite(&self, gif_id: &str) -> Result<bool> {
        if self.is_favorite(gif_id)? {
            self.remove_favorite(gif_id)?;
            Ok(false)
        } else {
            self.add_favorite(gif_id)?;
            Ok(true)
        }
    }

    pub fn uploaded_ids(&self) -> Result<Vec<String>> {
        self.list_ids("uploads")
    }

    pub fn add_upload(&self, gif_id: &str) -> Result<()> {
        self.insert_id("uploads", gif_id)
    }

    pub fn remove_upload(&self, gif_id: &str) -> Result<()> {
        self.delete_id("uploads", gif_id)
    }

    fn list_ids(&self, table: &'static str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT gif_id FROM {table} ORDER BY saved_at ASC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .with_context(|| format!("storage: list {table}"))?;
        Ok(rows)
    }

    fn insert_id(&self, table: &'static str, gif_id: &str) -> Result<()> {
        let gif_id = gif_id.trim();
        if gif_id.is_empty() {
            bail!("storage: gif id required");
        }
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                r#"
INSERT INTO {table} (gif_id, saved_at)
VALUES (?1, ?2)
ON CONFLICT(gif_id) DO NOTHING
"#
            ),
            params![gif_id, Utc::now().timestamp()],
        )
        .with_context(|| format!("storage: insert into {table}"))?;
        Ok(())
    }

    fn delete_id(&self, table: &'static str, gif_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!("DELETE FROM {table} WHERE gif_id = ?1"),
            params![gif_id],
        )
        .with_context(|| format!("storage: delete from {table}"))?;
        Ok(())
    }
}

impl FavoriteStore for Store {
    fn snapshot(&self) -> HashSet<String> {
        match self.favorite_ids() {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                warn!(error = %err, "favorites snapshot unavailable");
                HashSet::new()
            }
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.is_favorite(id).unwrap_or_else(|err| {
            warn!(error = %err, "favorite lookup failed");
            false
        })
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let migrations = migrations();
    for (idx, sql) in migrations.iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![
                version,
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_secs() as i64,
            ],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![r#"
CREATE TABLE IF NOT EXISTS favorites (
  gif_id TEXT PRIMARY KEY,
  saved_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS uploads (
  gif_id TEXT PRIMARY KEY,
  saved_at INTEGER NOT NULL
);
"#]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gifgrid").join("state.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        assert!(path.exists());
        store.close().unwrap();
    }

    #[test]
    fn favorites_keep_insertion_order_without_duplicates() {
        let store = Store::open_in_memory().unwrap();
        store.add_favorite("b").unwrap();
        store.add_favorite("a").unwrap();
        store.add_favorite("b").unwrap();
        assert_eq!(store.favorite_ids().unwrap(), vec!["b", "a"]);
        store.remove_favorite("b").unwrap();
        assert_eq!(store.favorite_ids().unwrap(), vec!["a"]);
    }

    #[test]
    fn toggle_flips_membership() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.toggle_favorite("x").unwrap());
        assert!(FavoriteStore::contains(&store, "x"));
        assert!(!store.toggle_favorite("x").unwrap());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn uploads_are_separate_from_favorites() {
        let store = Store::open_in_memory().unwrap();
        store.add_upload("u1").unwrap();
        store.add_upload("u1").unwrap();
        store.add_favorite("f1").unwrap();
        assert_eq!(store.uploaded_ids().unwrap(), vec!["u1"]);
        store.remove_upload("u1").unwrap();
        assert!(store.uploaded_ids().unwrap().is_empty());
        assert_eq!(store.favorite_ids().unwrap(), vec!["f1"]);
    }

    #[test]
    fn blank_id_rejected() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.add_favorite("  ").is_err());
    }

    #[test]
    fn reopen_keeps_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        store.add_favorite("keep").unwrap();
        store.close().unwrap();
        let store = Store::open(Options { path: Some(path) }).unwrap();
        assert!(store.is_favorite("keep").unwrap());
    }
}
