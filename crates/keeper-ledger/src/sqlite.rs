use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;

use keeper_types::{
    CanonicalPath, ChangeKind, ChangeToken, ContentHash, FileId, FileSummary, TrackedFile,
    TypeError, Version, VersionId,
};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{next_capture_time, plan, FileRecord, NewVersion, Transition};
use crate::traits::{LedgerReader, LedgerWriter};

const SCHEMA_VERSION: i64 = 1;
const MAX_IDLE_READERS: usize = 8;

const FILE_COLUMNS: &str = "f.id, f.path, f.change_token, f.content_hash, f.last_modified, f.is_deleted";
const VERSION_COLUMNS: &str = "v.id, v.file_id, f.path, v.content, v.content_hash, v.previous_hash, \
     v.change_type, v.captured_at, v.upstream_token, v.upstream_modified";

/// SQLite-backed ledger in WAL mode.
///
/// One writer connection serializes all mutations; readers draw from a small
/// pool of `query_only` connections and never block on the writer.
pub struct SqliteLedger {
    path: PathBuf,
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
}

impl SqliteLedger {
    /// Open (or create) the database at `path` and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        configure_pragmas(&conn)?;
        migrate_schema(&conn)?;
        debug!(path = %path.display(), "ledger database opened");
        Ok(Self {
            path,
            writer: Mutex::new(conn),
            readers: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.writer.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    fn open_reader(&self) -> LedgerResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "PRAGMA busy_timeout = 5000;
             PRAGMA query_only = ON;",
        )?;
        Ok(conn)
    }

    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> LedgerResult<T>) -> LedgerResult<T> {
        let pooled = self
            .readers
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?
            .pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => self.open_reader()?,
        };
        let result = f(&conn);
        if let Ok(mut pool) = self.readers.lock() {
            if pool.len() < MAX_IDLE_READERS {
                pool.push(conn);
            }
        }
        result
    }
}

fn configure_pragmas(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    debug!("SQLite pragmas configured (WAL mode)");
    Ok(())
}

fn migrate_schema(conn: &Connection) -> LedgerResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(LedgerError::Persistence(format!(
            "database schema version {version} is newer than supported {SCHEMA_VERSION}"
        )));
    }
    conn.execute_batch(include_str!("schema.sql"))?;
    debug!(from = version, to = SCHEMA_VERSION, "ledger schema initialized");
    Ok(())
}

// Column decoding

fn conversion_error(idx: usize, ty: Type, error: TypeError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(error))
}

fn parsed<T: FromStr<Err = TypeError>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parsed_opt<T: FromStr<Err = TypeError>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse().map_err(|e| conversion_error(idx, Type::Text, e)))
        .transpose()
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    from_micros(idx, micros)
}

fn timestamp_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let micros: Option<i64> = row.get(idx)?;
    micros.map(|m| from_micros(idx, m)).transpose()
}

fn from_micros(idx: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, "timestamp out of range".into())
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<TrackedFile> {
    Ok(TrackedFile {
        id: FileId::new(row.get::<_, i64>(0)? as u64),
        path: parsed(row, 1)?,
        change_token: ChangeToken::new(row.get::<_, String>(2)?),
        content_hash: parsed(row, 3)?,
        last_modified: timestamp(row, 4)?,
        is_deleted: row.get(5)?,
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        id: VersionId::new(row.get::<_, i64>(0)? as u64),
        file_id: FileId::new(row.get::<_, i64>(1)? as u64),
        path: parsed(row, 2)?,
        content: row.get(3)?,
        content_hash: parsed(row, 4)?,
        previous_hash: parsed_opt(row, 5)?,
        change: parsed(row, 6)?,
        captured_at: timestamp(row, 7)?,
        upstream_token: row.get::<_, Option<String>>(8)?.map(ChangeToken::new),
        upstream_modified: timestamp_opt(row, 9)?,
    })
}

// Statements shared by the writer and reader connections

fn find_file(conn: &Connection, path: &CanonicalPath) -> LedgerResult<Option<TrackedFile>> {
    let sql = format!("SELECT {FILE_COLUMNS} FROM files f WHERE f.path = ?1");
    Ok(conn
        .prepare_cached(&sql)?
        .query_row([path.as_str()], file_from_row)
        .optional()?)
}

fn upsert(conn: &Connection, record: &FileRecord) -> LedgerResult<TrackedFile> {
    conn.prepare_cached(
        "INSERT INTO files (path, change_token, content_hash, last_modified, is_deleted)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(path) DO UPDATE SET
             change_token = excluded.change_token,
             content_hash = excluded.content_hash,
             last_modified = excluded.last_modified,
             is_deleted = excluded.is_deleted",
    )?
    .execute(params![
        record.path.as_str(),
        record.change_token.as_str(),
        record.content_hash.to_hex(),
        record.last_modified.timestamp_micros(),
        record.is_deleted,
    ])?;
    find_file(conn, &record.path)?.ok_or_else(|| LedgerError::UnknownFile(record.path.clone()))
}

fn append(conn: &Connection, version: &NewVersion) -> LedgerResult<VersionId> {
    let file = find_file(conn, &version.path)?
        .ok_or_else(|| LedgerError::UnknownFile(version.path.clone()))?;
    let file_id = file.id.get() as i64;

    let previous: Option<i64> = conn
        .prepare_cached("SELECT MAX(captured_at) FROM versions WHERE file_id = ?1")?
        .query_row([file_id], |row| row.get(0))?;
    let previous = previous.and_then(DateTime::from_timestamp_micros);
    let captured_at = next_capture_time(previous);

    conn.prepare_cached(
        "INSERT INTO versions (file_id, content, content_hash, previous_hash, change_type,
                               captured_at, upstream_token, upstream_modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?
    .execute(params![
        file_id,
        version.content,
        ContentHash::of(&version.content).to_hex(),
        version.previous_hash.map(|h| h.to_hex()),
        version.change.as_str(),
        captured_at.timestamp_micros(),
        version.upstream_token.as_ref().map(ChangeToken::as_str),
        version.upstream_modified.map(|t| t.timestamp_micros()),
    ])?;
    Ok(VersionId::new(conn.last_insert_rowid() as u64))
}

fn select_versions(conn: &Connection, path: &CanonicalPath, limit: i64) -> LedgerResult<Vec<Version>> {
    let sql = format!(
        "SELECT {VERSION_COLUMNS} FROM versions v JOIN files f ON f.id = v.file_id
         WHERE f.path = ?1
         ORDER BY v.captured_at DESC, v.id DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![path.as_str(), limit], version_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl LedgerWriter for SqliteLedger {
    fn upsert_file(&self, file: &FileRecord) -> LedgerResult<TrackedFile> {
        let conn = self.writer()?;
        upsert(&conn, file)
    }

    fn mark_deleted(&self, path: &CanonicalPath) -> LedgerResult<bool> {
        let conn = self.writer()?;
        let changed = conn
            .prepare_cached("UPDATE files SET is_deleted = 1 WHERE path = ?1")?
            .execute([path.as_str()])?;
        Ok(changed > 0)
    }

    fn append_version(&self, version: &NewVersion) -> LedgerResult<VersionId> {
        let mut conn = self.writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = append(&tx, version)?;
        tx.commit()?;
        Ok(id)
    }

    fn apply(&self, transition: &Transition) -> LedgerResult<Option<VersionId>> {
        let mut conn = self.writer()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = find_file(&tx, transition.path())?;
        let plan = plan(transition, existing.as_ref())?;
        upsert(&tx, &plan.file)?;
        let id = plan.version.as_ref().map(|v| append(&tx, v)).transpose()?;
        tx.commit()?;
        Ok(id)
    }
}

impl LedgerReader for SqliteLedger {
    fn get_file(&self, path: &CanonicalPath) -> LedgerResult<Option<TrackedFile>> {
        self.with_reader(|conn| find_file(conn, path))
    }

    fn list_files(&self) -> LedgerResult<Vec<FileSummary>> {
        self.with_reader(|conn| {
            let sql = format!(
                "SELECT {FILE_COLUMNS},
                    (SELECT COUNT(*) FROM versions v WHERE v.file_id = f.id),
                    (SELECT v.captured_at FROM versions v WHERE v.file_id = f.id
                     ORDER BY v.captured_at DESC, v.id DESC LIMIT 1),
                    (SELECT v.change_type FROM versions v WHERE v.file_id = f.id
                     ORDER BY v.captured_at DESC, v.id DESC LIMIT 1)
                 FROM files f
                 ORDER BY f.path"
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map([], |row| {
                let file = file_from_row(row)?;
                let latest_change = timestamp_opt(row, 7)?.unwrap_or(file.last_modified);
                Ok(FileSummary {
                    version_count: row.get::<_, i64>(6)? as u64,
                    latest_change,
                    latest_change_type: parsed_opt::<ChangeKind>(row, 8)?,
                    file,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    fn get_version(&self, id: VersionId) -> LedgerResult<Option<Version>> {
        self.with_reader(|conn| {
            let sql = format!(
                "SELECT {VERSION_COLUMNS} FROM versions v JOIN files f ON f.id = v.file_id
                 WHERE v.id = ?1"
            );
            Ok(conn
                .prepare_cached(&sql)?
                .query_row([id.get() as i64], version_from_row)
                .optional()?)
        })
    }

    fn list_versions(&self, path: &CanonicalPath) -> LedgerResult<Vec<Version>> {
        self.with_reader(|conn| select_versions(conn, path, -1))
    }

    fn latest_version(&self, path: &CanonicalPath) -> LedgerResult<Option<Version>> {
        self.with_reader(|conn| Ok(select_versions(conn, path, 1)?.into_iter().next()))
    }
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger").field("path", &self.path).finish()
    }
}
