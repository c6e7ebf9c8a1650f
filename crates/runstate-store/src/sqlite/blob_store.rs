//! SQLite-backed versioned blob store
//!
//! All entries live in one table, `state_entries` unless configured
//! otherwise, keyed by `(namespace, name)`. Version rows carry `payload`;
//! alias rows carry `alias_target`. An alias repoint is one upsert inside a
//! transaction that first checks the target row.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use runstate_core::errors::RunStateError;
use runstate_core::naming::{glob_match, validate_name};
use runstate_core::ports::{StoredEntry, VersionedBlobStore};

use crate::db;
use crate::errors::{from_rusqlite, sqlite_read, sqlite_write, Result};

/// Table created by the embedded migrations
pub const DEFAULT_TABLE: &str = "state_entries";

/// Tables the migrations own with a different schema
const RESERVED_TABLES: [&str; 2] = ["job_locks", "schema_version"];

/// Schema of a state table; `$TABLE$` is replaced by the table name
const STATE_TABLE_DDL: &str = "
CREATE TABLE IF NOT EXISTS $TABLE$ (
    namespace    TEXT NOT NULL,
    name         TEXT NOT NULL,
    payload      BLOB,
    alias_target TEXT,
    updated_at   INTEGER NOT NULL,
    PRIMARY KEY (namespace, name),
    CHECK ((payload IS NULL) <> (alias_target IS NULL))
);
CREATE INDEX IF NOT EXISTS idx_$TABLE$_alias_target
    ON $TABLE$ (namespace, alias_target)
    WHERE alias_target IS NOT NULL;
";

/// Check that `table` is a plain SQL identifier usable as a state table
///
/// # Errors
///
/// Returns `InvalidInput` for an empty name, a name with characters outside
/// `[A-Za-z0-9_]`, a leading digit, or a table owned by the migrations.
pub fn validate_table_name(table: &str) -> Result<()> {
    let well_formed = table
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed {
        return Err(RunStateError::invalid_input(format!(
            "state table name '{}' must match [A-Za-z_][A-Za-z0-9_]*",
            table
        )));
    }
    if RESERVED_TABLES.contains(&table) {
        return Err(RunStateError::invalid_input(format!(
            "state table name '{}' is reserved",
            table
        )));
    }
    Ok(())
}

/// SQL rendered once for the configured table
struct Statements {
    select_one: String,
    select_namespace: String,
    upsert_version: String,
    upsert_alias: String,
    delete_one: String,
    delete_namespace: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            select_one: format!(
                "SELECT name, payload, alias_target FROM {table}
                 WHERE namespace = ?1 AND name = ?2"
            ),
            select_namespace: format!(
                "SELECT name, payload, alias_target FROM {table}
                 WHERE namespace = ?1 ORDER BY name"
            ),
            upsert_version: format!(
                "INSERT INTO {table} (namespace, name, payload, alias_target, updated_at)
                 VALUES (?1, ?2, ?3, NULL, ?4)
                 ON CONFLICT(namespace, name) DO UPDATE SET
                    payload = excluded.payload,
                    updated_at = excluded.updated_at
                 WHERE {table}.alias_target IS NULL"
            ),
            upsert_alias: format!(
                "INSERT INTO {table} (namespace, name, payload, alias_target, updated_at)
                 VALUES (?1, ?2, NULL, ?3, ?4)
                 ON CONFLICT(namespace, name) DO UPDATE SET
                    alias_target = excluded.alias_target,
                    updated_at = excluded.updated_at"
            ),
            delete_one: format!("DELETE FROM {table} WHERE namespace = ?1 AND name = ?2"),
            delete_namespace: format!("DELETE FROM {table} WHERE namespace = ?1"),
        }
    }
}

struct Row {
    name: String,
    payload: Option<Vec<u8>>,
    alias_target: Option<String>,
}

/// SQLite-backed versioned blob store
///
/// The connection sits behind a `Mutex`; several processes may open the same
/// file, with SQLite's own locking serializing their writes.
pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
    table: String,
    sql: Statements,
}

impl SqliteBlobStore {
    /// Open (creating and migrating if needed) the database at `path`
    ///
    /// # Errors
    ///
    /// Returns `StoreWrite` if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_table(path, DEFAULT_TABLE)
    }

    /// Open the database at `path`, keeping entries in `table`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unusable table name and `StoreWrite` if
    /// the database cannot be opened, migrated or given the table.
    pub fn open_with_table(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Self::with_table(db::open_migrated(path)?, table)
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    ///
    /// Returns `StoreWrite` if the database cannot be created or migrated.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_table(db::open_in_memory_migrated()?, DEFAULT_TABLE)
    }

    /// Wrap an already-migrated connection, creating `table` if missing
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unusable table name and `StoreWrite` if
    /// the table cannot be created.
    pub fn with_table(conn: Connection, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        conn.execute_batch(&STATE_TABLE_DDL.replace("$TABLE$", table))
            .map_err(from_rusqlite)?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            sql: Statements::for_table(table),
        })
    }

    /// Table holding this store's entries
    pub fn table(&self) -> &str {
        &self.table
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RunStateError::internal("sqlite connection mutex poisoned"))
    }

    fn fetch_row(&self, conn: &Connection, namespace: &str, name: &str) -> Result<Option<Row>> {
        conn.query_row(&self.sql.select_one, params![namespace, name], |row| {
            Ok(Row {
                name: row.get(0)?,
                payload: row.get(1)?,
                alias_target: row.get(2)?,
            })
        })
        .optional()
        .map_err(|e| sqlite_read(namespace, name, e))
    }

    fn fetch_namespace(&self, conn: &Connection, namespace: &str) -> Result<Vec<Row>> {
        let mut stmt = conn
            .prepare(&self.sql.select_namespace)
            .map_err(|e| sqlite_read(namespace, "*", e))?;
        let rows = stmt
            .query_map([namespace], |row| {
                Ok(Row {
                    name: row.get(0)?,
                    payload: row.get(1)?,
                    alias_target: row.get(2)?,
                })
            })
            .map_err(|e| sqlite_read(namespace, "*", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sqlite_read(namespace, "*", e))?;
        Ok(rows)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl VersionedBlobStore for SqliteBlobStore {
    fn put(&self, namespace: &str, name: &str, payload: &[u8]) -> Result<()> {
        validate_name(namespace)?;
        validate_name(name)?;

        let conn = self.conn()?;
        let changed = conn
            .execute(
                &self.sql.upsert_version,
                params![namespace, name, payload, now_millis()],
            )
            .map_err(|e| sqlite_write(namespace, name, e))?;

        if changed == 0 {
            return Err(RunStateError::invalid_input(format!(
                "'{}' is an alias in namespace '{}'",
                name, namespace
            )));
        }
        Ok(())
    }

    fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>> {
        validate_name(namespace)?;
        validate_name(name)?;

        let conn = self.conn()?;
        let row = self
            .fetch_row(&conn, namespace, name)?
            .ok_or_else(|| RunStateError::not_found(namespace, name))?;

        match (row.payload, row.alias_target) {
            (Some(payload), _) => Ok(payload),
            (None, Some(target)) => self
                .fetch_row(&conn, namespace, &target)?
                .and_then(|target_row| target_row.payload)
                .ok_or_else(|| RunStateError::not_found(namespace, &target)),
            (None, None) => Err(RunStateError::internal(format!(
                "entry {}/{} has neither payload nor alias target",
                namespace, name
            ))),
        }
    }

    fn get_all(
        &self,
        namespace: &str,
        pattern: &str,
        resolve_aliases: bool,
    ) -> Result<Vec<StoredEntry>> {
        validate_name(namespace)?;

        let rows = self.fetch_namespace(&*self.conn()?, namespace)?;

        let versions: HashMap<&str, &Vec<u8>> = rows
            .iter()
            .filter_map(|r| r.payload.as_ref().map(|p| (r.name.as_str(), p)))
            .collect();

        let mut out = Vec::new();
        for row in rows.iter().filter(|r| glob_match(pattern, &r.name)) {
            match (&row.payload, &row.alias_target) {
                (Some(payload), _) => out.push(StoredEntry {
                    name: row.name.clone(),
                    alias_target: None,
                    payload: payload.clone(),
                }),
                (None, Some(target)) if resolve_aliases => match versions.get(target.as_str()) {
                    Some(payload) => out.push(StoredEntry {
                        name: row.name.clone(),
                        alias_target: Some(target.clone()),
                        payload: (*payload).clone(),
                    }),
                    None => {
                        tracing::warn!(namespace, alias = %row.name, target = %target, "Skipping dangling alias");
                    }
                },
                _ => {}
            }
        }
        Ok(out)
    }

    fn exists(&self, namespace: &str, name: &str) -> Result<bool> {
        validate_name(namespace)?;
        validate_name(name)?;

        Ok(self.fetch_row(&*self.conn()?, namespace, name)?.is_some())
    }

    fn create_alias(&self, namespace: &str, existing_name: &str, alias_name: &str) -> Result<()> {
        validate_name(namespace)?;
        validate_name(existing_name)?;
        validate_name(alias_name)?;

        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| sqlite_write(namespace, alias_name, e))?;

        let target_is_version = self
            .fetch_row(&tx, namespace, existing_name)?
            .is_some_and(|row| row.payload.is_some());
        if !target_is_version {
            return Err(RunStateError::not_found(namespace, existing_name));
        }
        let alias_is_version = self
            .fetch_row(&tx, namespace, alias_name)?
            .is_some_and(|row| row.payload.is_some());
        if alias_is_version {
            return Err(RunStateError::invalid_input(format!(
                "'{}' is a version entry in namespace '{}'",
                alias_name, namespace
            )));
        }

        tx.execute(
            &self.sql.upsert_alias,
            params![namespace, alias_name, existing_name, now_millis()],
        )
        .map_err(|e| sqlite_write(namespace, alias_name, e))?;

        tx.commit()
            .map_err(|e| sqlite_write(namespace, alias_name, e))?;
        Ok(())
    }

    fn resolve_alias(&self, namespace: &str, alias_name: &str) -> Result<Option<String>> {
        validate_name(namespace)?;
        validate_name(alias_name)?;

        Ok(self
            .fetch_row(&*self.conn()?, namespace, alias_name)?
            .and_then(|row| row.alias_target))
    }

    fn list_names(&self, namespace: &str, pattern: &str) -> Result<Vec<String>> {
        validate_name(namespace)?;

        Ok(self
            .fetch_namespace(&*self.conn()?, namespace)?
            .into_iter()
            .map(|row| row.name)
            .filter(|name| glob_match(pattern, name))
            .collect())
    }

    fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        validate_name(namespace)?;
        validate_name(name)?;

        let changed = self
            .conn()?
            .execute(&self.sql.delete_one, params![namespace, name])
            .map_err(|e| sqlite_write(namespace, name, e))?;
        Ok(changed > 0)
    }

    fn delete_namespace(&self, namespace: &str) -> Result<()> {
        validate_name(namespace)?;

        let removed = self
            .conn()?
            .execute(&self.sql.delete_namespace, params![namespace])
            .map_err(|e| sqlite_write(namespace, "*", e))?;
        tracing::debug!(namespace, removed, "Deleted namespace");
        Ok(())
    }
}
