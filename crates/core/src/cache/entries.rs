//! `CacheStore` implementation over SQLite.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{CacheStore, GenerationId, RequestKey};
use crate::Error;
use crate::response::CachedResponse;

impl CacheDb {
    /// Number of entries stored in a generation.
    pub async fn entry_count(&self, generation: &GenerationId) -> Result<u64, Error> {
        let generation = generation.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, generation: &GenerationId) -> Result<(), Error> {
        let generation = generation.as_str().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, generation: &GenerationId, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        let generation = generation.as_str().to_string();
        let key = key.clone();
        let status = response.status.as_u16();
        let headers_json = response.headers_json();
        let body = response.body.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![&generation, &now],
                )?;
                tx.execute(
                    "INSERT INTO entries (generation, key_hash, method, url, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![&generation, &key.hash, &key.method, &key.url, status, &headers_json, &body, &now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, generation: &GenerationId, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let generation = generation.as_str().to_string();
        let hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, hash], |row| {
                    Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
                });

                match result {
                    Ok((status, headers_json, body)) => CachedResponse::from_stored(status, &headers_json, body).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn generations(&self) -> Result<BTreeSet<GenerationId>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeSet<GenerationId>, Error> {
                let mut stmt = conn.prepare("SELECT id FROM generations")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids.into_iter().map(GenerationId::from).collect())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, generation: &GenerationId) -> Result<bool, Error> {
        let generation = generation.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE id = ?1", params![generation])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
