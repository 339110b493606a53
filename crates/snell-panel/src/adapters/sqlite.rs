//! SQLite-backed [`EntryStore`].
//!
//! A single connection guarded by a mutex. The `entries` table is created on
//! open; tables written by older panel releases (no geo columns, no node ids)
//! are upgraded in place.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::domain::entry::{Entry, EntryPatch};
use crate::domain::error::StoreError;
use crate::ports::outbound::EntryStore;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS entries (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        ip           TEXT    NOT NULL,
        port         INTEGER NOT NULL,
        psk          TEXT    NOT NULL,
        country_code TEXT    NOT NULL DEFAULT '',
        isp          TEXT    NOT NULL DEFAULT '',
        asn          INTEGER NOT NULL DEFAULT 0,
        node_id      TEXT    NOT NULL UNIQUE,
        node_name    TEXT,
        version      INTEGER NOT NULL DEFAULT 4
    );
";

const CREATE_INDEXES: &str = "
    CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_node_id ON entries (node_id);
    CREATE INDEX IF NOT EXISTS idx_entries_ip ON entries (ip);
";

/// Columns missing from tables created by older releases, with the DDL used
/// to add them.
const UPGRADE_COLUMNS: &[(&str, &str)] = &[
    ("country_code", "TEXT NOT NULL DEFAULT ''"),
    ("isp", "TEXT NOT NULL DEFAULT ''"),
    ("asn", "INTEGER NOT NULL DEFAULT 0"),
    ("node_id", "TEXT"),
    ("node_name", "TEXT"),
    ("version", "INTEGER NOT NULL DEFAULT 4"),
];

const SELECT_COLUMNS: &str =
    "SELECT id, ip, port, psk, country_code, isp, asn, node_id, node_name, version FROM entries";

pub struct SqliteEntryStore {
    conn: Mutex<Connection>,
}

impl SqliteEntryStore {
    /// Open the store at `location`: a file path, or `:memory:`.
    pub fn open(location: &str) -> Result<Self, StoreError> {
        let conn = if location == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(location))?
        };
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl EntryStore for SqliteEntryStore {
    fn insert(&self, mut entry: Entry) -> Result<Entry, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO entries (ip, port, psk, country_code, isp, asn, node_id, node_name, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.ip,
                entry.port,
                entry.psk,
                entry.country_code,
                entry.isp,
                entry.asn,
                entry.node_id,
                entry.node_name,
                entry.version,
            ],
        )?;
        entry.id = conn.last_insert_rowid();
        Ok(entry)
    }

    fn list(&self) -> Result<Vec<Entry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn find_by_node_id(&self, node_id: &str) -> Result<Option<Entry>, StoreError> {
        let conn = self.conn.lock();
        let entry = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE node_id = ?1"),
                params![node_id],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn delete_by_ip(&self, ip: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        Ok(conn.execute("DELETE FROM entries WHERE ip = ?1", params![ip])?)
    }

    fn delete_by_node_id(&self, node_id: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        Ok(conn.execute("DELETE FROM entries WHERE node_id = ?1", params![node_id])?)
    }

    fn update_by_node_id(&self, node_id: &str, patch: &EntryPatch) -> Result<usize, StoreError> {
        let (sql, values) = build_update(node_id, patch).ok_or(StoreError::EmptyUpdate)?;
        debug!(%sql, "Updating entry");
        let conn = self.conn.lock();
        Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
    }
}

/// Build `UPDATE entries SET ... WHERE node_id = ?N` covering only the
/// columns present in `patch`. `node_id` itself is never assigned.
pub(crate) fn build_update(node_id: &str, patch: &EntryPatch) -> Option<(String, Vec<Value>)> {
    let mut assignments: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let mut set = |column: &str, value: Value| {
        values.push(value);
        assignments.push(format!("{column} = ?{}", values.len()));
    };

    if let Some(name) = &patch.node_name {
        set("node_name", Value::Text(name.clone()));
    }
    if let Some(ip) = &patch.ip {
        set("ip", Value::Text(ip.clone()));
    }
    if let Some(geo) = &patch.geo {
        set("country_code", Value::Text(geo.country_code.clone()));
        set("isp", Value::Text(geo.isp.clone()));
        set("asn", Value::Integer(i64::from(geo.asn)));
    }
    if let Some(port) = patch.port {
        set("port", Value::Integer(i64::from(port)));
    }
    if let Some(psk) = &patch.psk {
        set("psk", Value::Text(psk.clone()));
    }
    if let Some(version) = patch.version {
        set("version", Value::Integer(i64::from(version)));
    }

    if assignments.is_empty() {
        return None;
    }

    values.push(Value::Text(node_id.to_string()));
    let sql = format!(
        "UPDATE entries SET {} WHERE node_id = ?{}",
        assignments.join(", "),
        values.len()
    );
    Some((sql, values))
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(CREATE_TABLE)?;

    let existing = table_columns(conn)?;
    for (column, ddl) in UPGRADE_COLUMNS {
        if !existing.iter().any(|c| c == column) {
            info!(column, "Adding missing column to entries table");
            conn.execute_batch(&format!("ALTER TABLE entries ADD COLUMN {column} {ddl}"))?;
        }
    }

    let backfilled = conn.execute(
        "UPDATE entries SET node_id = lower(hex(randomblob(16)))
         WHERE node_id IS NULL OR node_id = ''",
        [],
    )?;
    if backfilled > 0 {
        warn!(rows = backfilled, "Assigned node ids to entries created without one");
    }

    if ip_is_unique(conn)? {
        rebuild_without_ip_constraint(conn)?;
    }

    conn.execute_batch(CREATE_INDEXES)?;
    Ok(())
}

/// Whether a unique index covers exactly the `ip` column. Releases before
/// node ids declared `ip TEXT UNIQUE`.
fn ip_is_unique(conn: &Connection) -> Result<bool, StoreError> {
    let mut stmt = conn.prepare("PRAGMA index_list(entries)")?;
    let unique_indexes = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>("name")?,
                row.get::<_, bool>("unique")?,
                row.get::<_, String>("origin")?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (name, unique, origin) in unique_indexes {
        if !unique || origin == "pk" {
            continue;
        }
        let mut info = conn.prepare(&format!("PRAGMA index_info(\"{}\")", name.replace('"', "\"\"")))?;
        let columns = info
            .query_map([], |row| row.get::<_, Option<String>>("name"))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns == [Some("ip".to_string())] {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Copy every row into a table with the current schema and swap it in.
/// Constraints cannot be dropped with `ALTER TABLE`, so this is the only way
/// to lift the legacy `UNIQUE` on `ip`.
fn rebuild_without_ip_constraint(conn: &Connection) -> Result<(), StoreError> {
    info!("Rebuilding entries table to drop the unique address constraint");
    let create_new = CREATE_TABLE.replacen(" entries (", " entries_new (", 1);

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("DROP TABLE IF EXISTS entries_new;")?;
    tx.execute_batch(&create_new)?;
    tx.execute(
        "INSERT INTO entries_new
             (id, ip, port, psk, country_code, isp, asn, node_id, node_name, version)
         SELECT id, COALESCE(ip, ''), COALESCE(port, 0), COALESCE(psk, ''),
                COALESCE(country_code, ''), COALESCE(isp, ''), COALESCE(asn, 0),
                node_id, node_name, COALESCE(version, 4)
         FROM entries",
        [],
    )?;
    tx.execute_batch(
        "DROP TABLE entries;
         ALTER TABLE entries_new RENAME TO entries;",
    )?;
    tx.commit()?;
    Ok(())
}

fn table_columns(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("PRAGMA table_info(entries)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        ip: row.get(1)?,
        port: row.get(2)?,
        psk: row.get(3)?,
        country_code: row.get(4)?,
        isp: row.get(5)?,
        asn: row.get(6)?,
        node_id: row.get(7)?,
        node_name: row.get(8)?,
        version: row.get(9)?,
    })
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, message)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(message.clone().unwrap_or_else(|| e.to_string()))
            }
            rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..) => StoreError::CorruptRow(e.to_string()),
            _ => StoreError::Database(e.to_string()),
        }
    }
}
