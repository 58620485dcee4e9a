//! Request/response entries stored inside cache sets.
//!
//! A stored response is an immutable snapshot. Writing the same key again
//! replaces the whole entry in one transaction; there is no per-entry
//! versioning or expiry.

use super::connection::CacheDb;
use super::hash::RequestKey;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// Snapshot of a response at the time it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub key: RequestKey,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Snapshot a response now.
    pub fn new(key: RequestKey, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { key, status, headers, body, stored_at: chrono::Utc::now().to_rfc3339() }
    }

    /// First header value with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

type RawEntry = (RequestKey, u16, String, Vec<u8>, String);

const SELECT_ENTRY: &str = "SELECT method, url, status, headers_json, body, stored_at FROM entries";

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok((
        RequestKey { method: row.get(0)?, url: row.get(1)? },
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode(raw: RawEntry) -> Result<StoredResponse, Error> {
    let (key, status, headers_json, body, stored_at) = raw;
    let headers = serde_json::from_str(&headers_json)?;
    Ok(StoredResponse { key, status, headers, body, stored_at })
}

fn upsert(tx: &rusqlite::Transaction<'_>, set: &str, response: &StoredResponse, headers_json: &str) -> Result<(), Error> {
    tx.execute(
        "INSERT INTO cache_sets (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![set, &response.stored_at],
    )?;
    tx.execute(
        "INSERT INTO entries (cache_name, key_hash, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(cache_name, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            set,
            response.key.hash(),
            &response.key.method,
            &response.key.url,
            response.status,
            headers_json,
            &response.body,
            &response.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store a response in a cache set, replacing any entry with the same key.
    ///
    /// The set is created if it does not exist yet.
    pub async fn put(&self, set: &str, response: &StoredResponse) -> Result<(), Error> {
        let set = set.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                upsert(&tx, &set, &response, &headers_json)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response only while the `anchor` set still exists.
    ///
    /// The existence check and the write share one transaction, so a
    /// concurrent `delete_set(anchor)` either happens before (nothing is
    /// written, returns `false`) or after (the write is deleted with the rest).
    pub async fn put_anchored(&self, anchor: &str, set: &str, response: &StoredResponse) -> Result<bool, Error> {
        let anchor = anchor.to_string();
        let set = set.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                let live: bool =
                    tx.query_row("SELECT EXISTS(SELECT 1 FROM cache_sets WHERE name = ?1)", params![&anchor], |row| {
                        row.get(0)
                    })?;
                if !live {
                    return Ok(false);
                }
                upsert(&tx, &set, &response, &headers_json)?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a key in one cache set.
    pub async fn match_in(&self, set: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let set = set.to_string();
        let hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let raw = conn
                    .query_row(
                        &format!("{SELECT_ENTRY} WHERE cache_name = ?1 AND key_hash = ?2"),
                        params![set, hash],
                        read_entry,
                    )
                    .optional()?;
                raw.map(decode).transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a key in each of `sets` in order, returning the first hit and
    /// the set it came from.
    pub async fn match_any(&self, key: &RequestKey, sets: &[&str]) -> Result<Option<(String, StoredResponse)>, Error> {
        for set in sets {
            if let Some(hit) = self.match_in(set, key).await? {
                return Ok(Some((set.to_string(), hit)));
            }
        }
        Ok(None)
    }

    /// Look up a key across every existing cache set, oldest set first.
    pub async fn match_all(&self, key: &RequestKey) -> Result<Option<(String, StoredResponse)>, Error> {
        let hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<(String, StoredResponse)>, Error> {
                let raw = conn
                    .query_row(
                        "SELECT e.cache_name, e.method, e.url, e.status, e.headers_json, e.body, e.stored_at
                        FROM entries e
                        JOIN cache_sets s ON s.name = e.cache_name
                        WHERE e.key_hash = ?1
                        ORDER BY s.rowid
                        LIMIT 1",
                        params![hash],
                        |row| {
                            let set: String = row.get(0)?;
                            let entry: RawEntry = (
                                RequestKey { method: row.get(1)?, url: row.get(2)? },
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                                row.get(6)?,
                            );
                            Ok((set, entry))
                        },
                    )
                    .optional()?;
                raw.map(|(set, entry)| decode(entry).map(|r| (set, r))).transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys stored in a cache set, oldest first.
    pub async fn keys(&self, set: &str) -> Result<Vec<RequestKey>, Error> {
        let set = set.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE cache_name = ?1 ORDER BY rowid")?;
                let keys = stmt
                    .query_map(params![set], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
