//! Store SQLite.
//!
//! Uma única tabela `entities` guarda o corpo JSON de cada entidade junto de
//! colunas indexadas para eleição e status. A coluna `version` implementa a
//! concorrência otimista: `UPDATE ... WHERE version = ?` sem linhas afetadas
//! significa que outra escrita chegou antes.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::{EleitoralError, EleitoralResult};

use super::{RecordFilter, Store, StoredRecord};

/// Store persistente em SQLite.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Cria ou abre o banco.
    pub fn open(db_path: &Path) -> EleitoralResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(db_path)?)
    }

    /// Banco em memória.
    pub fn in_memory() -> EleitoralResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> EleitoralResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                election_id TEXT NOT NULL,
                status TEXT NOT NULL,
                version INTEGER NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );

            CREATE INDEX IF NOT EXISTS idx_entities_election ON entities(kind, election_id);
            CREATE INDEX IF NOT EXISTS idx_entities_status ON entities(kind, status);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conflict(record: &StoredRecord) -> EleitoralError {
        EleitoralError::ConcurrencyConflict {
            kind: record.kind,
            id: record.id.clone(),
            expected: record.version,
        }
    }
}

fn decode_row(
    kind: &'static str,
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(StoredRecord, String)> {
    let version: i64 = row.get(3)?;
    Ok((
        StoredRecord {
            kind,
            id: row.get(0)?,
            election_id: row.get(1)?,
            status: row.get(2)?,
            version: version as u64,
            body: serde_json::Value::Null,
        },
        row.get(4)?,
    ))
}

#[async_trait]
impl Store for SqliteStore {
    async fn load(&self, kind: &'static str, id: &str) -> EleitoralResult<Option<StoredRecord>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, election_id, status, version, body FROM entities WHERE kind = ?1 AND id = ?2",
                params![kind, id],
                |row| decode_row(kind, row),
            )
            .optional()?;

        match row {
            Some((mut record, body)) => {
                record.body = serde_json::from_str(&body)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, record: StoredRecord) -> EleitoralResult<u64> {
        let conn = self.conn.lock().await;
        let body = serde_json::to_string(&record.body)?;
        let now = Utc::now().to_rfc3339();
        let next = record.version + 1;

        let changed = if record.version == 0 {
            conn.execute(
                r#"
                INSERT OR IGNORE INTO entities (kind, id, election_id, status, version, body, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    record.kind,
                    record.id,
                    record.election_id,
                    record.status,
                    next as i64,
                    body,
                    now
                ],
            )?
        } else {
            conn.execute(
                r#"
                UPDATE entities
                SET election_id = ?3, status = ?4, version = ?5, body = ?6, updated_at = ?7
                WHERE kind = ?1 AND id = ?2 AND version = ?8
                "#,
                params![
                    record.kind,
                    record.id,
                    record.election_id,
                    record.status,
                    next as i64,
                    body,
                    now,
                    record.version as i64
                ],
            )?
        };

        if changed == 0 {
            return Err(Self::conflict(&record));
        }
        Ok(next)
    }

    async fn list(
        &self,
        kind: &'static str,
        filter: &RecordFilter,
    ) -> EleitoralResult<Vec<StoredRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, election_id, status, version, body FROM entities
            WHERE kind = ?1
              AND (?2 IS NULL OR election_id = ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![kind, filter.election_id, filter.status],
                |row| decode_row(kind, row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut record, body)| {
                record.body = serde_json::from_str(&body)?;
                Ok(record)
            })
            .collect()
    }

    async fn delete(
        &self,
        kind: &'static str,
        id: &str,
        expected_version: u64,
    ) -> EleitoralResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "DELETE FROM entities WHERE kind = ?1 AND id = ?2 AND version = ?3",
            params![kind, id, expected_version as i64],
        )?;
        if changed == 1 {
            return Ok(());
        }

        let exists: Option<i64> = conn
            .query_row(
                "SELECT version FROM entities WHERE kind = ?1 AND id = ?2",
                params![kind, id],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Err(EleitoralError::ConcurrencyConflict {
                kind,
                id: id.to_string(),
                expected: expected_version,
            }),
            None => Err(EleitoralError::not_found(kind, id)),
        }
    }
}
