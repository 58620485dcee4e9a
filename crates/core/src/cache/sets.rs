//! Cache-set enumeration, creation and deletion.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Summary of one cache set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheSetInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheDb {
    /// Open a cache set, creating it if absent.
    pub async fn open_set(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_sets (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a cache set with this exact name exists.
    pub async fn has_set(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM cache_sets WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every cache set, in creation order.
    pub async fn set_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_sets ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every cache set with its entry count, in creation order.
    pub async fn list_sets(&self) -> Result<Vec<CacheSetInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheSetInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, s.created_at, COUNT(e.key_hash)
                    FROM cache_sets s
                    LEFT JOIN entries e ON e.cache_name = s.name
                    GROUP BY s.name
                    ORDER BY s.rowid",
                )?;
                let sets = stmt
                    .query_map([], |row| {
                        Ok(CacheSetInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(sets)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a cache set and every entry in it.
    ///
    /// Returns false if no set had that name.
    pub async fn delete_set(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_sets WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_set_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_set("app-shell-v1").await.unwrap();
        db.open_set("app-shell-v1").await.unwrap();

        assert_eq!(db.set_names().await.unwrap(), vec!["app-shell-v1".to_string()]);
        assert!(db.has_set("app-shell-v1").await.unwrap());
        assert!(!db.has_set("app-shell-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_names_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["b", "a", "c"] {
            db.open_set(name).await.unwrap();
        }
        assert_eq!(db.set_names().await.unwrap(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_delete_set() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_set("app-runtime-v1").await.unwrap();

        assert!(db.delete_set("app-runtime-v1").await.unwrap());
        assert!(!db.delete_set("app-runtime-v1").await.unwrap());
        assert!(db.set_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sets_counts_empty() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_set("app-shell-v1").await.unwrap();

        let sets = db.list_sets().await.unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "app-shell-v1");
        assert_eq!(sets[0].entries, 0);
    }
}
