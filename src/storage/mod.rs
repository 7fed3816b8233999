//! The embedded-database wrapper: connection lifecycle, PRAGMA tuning,
//! scripted DDL, parameterized execute/query, and a scoped transaction
//! guard.
//!
//! Everything above this module talks to the database only through
//! [`Storage`]; no other module holds a `rusqlite::Connection` directly.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use tracing::{debug, trace, warn};

use crate::error::{EngineError, Result};
use crate::value::no_space_collation;

/// Where the backing file for a [`Storage`] lives.
pub enum Location<'a> {
    /// A private, transient in-memory database.
    Memory,
    /// A file on disk, created if it doesn't exist.
    Path(&'a Path),
}

/// One row projected as an ordered list of coerced-but-untyped SQL values.
pub type Row = Vec<SqlValue>;
/// One row projected as a column-name → value map.
pub type RowMap = HashMap<String, SqlValue>;

/// Owns the one connection to the backing database and applies this
/// crate's PRAGMA and collation conventions to it.
pub struct Storage {
    conn: Connection,
    in_memory: bool,
}

impl Storage {
    /// Open a fresh connection at `location`, applying the standard PRAGMA
    /// set (different for in-memory vs on-disk, see module docs).
    pub fn open(location: Location<'_>) -> Result<Self> {
        let (conn, in_memory) = match location {
            Location::Memory => (Connection::open_in_memory()?, true),
            Location::Path(path) => (Connection::open(path)?, false),
        };
        let storage = Storage { conn, in_memory };
        storage.configure()?;
        storage.register_default_collations()?;
        Ok(storage)
    }

    /// Wrap an already-open connection, applying the same PRAGMA set. Used
    /// by callers that need to construct the connection themselves (e.g.
    /// shared-cache setups) before handing it to the engine.
    pub fn from_connection(conn: Connection, in_memory: bool) -> Result<Self> {
        let storage = Storage { conn, in_memory };
        storage.configure()?;
        storage.register_default_collations()?;
        Ok(storage)
    }

    fn configure(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        if self.in_memory {
            self.conn.pragma_update(None, "synchronous", "NORMAL")?;
            self.conn.pragma_update(None, "journal_mode", "WAL")?;
            self.conn.pragma_update(None, "mmap_size", 30_000_000_000i64)?;
            self.conn.pragma_update(None, "cache_size", -20_000i64)?;
        } else {
            self.conn.pragma_update(None, "synchronous", "FULL")?;
            self.conn.pragma_update(None, "journal_mode", "DELETE")?;
            self.conn.pragma_update(None, "mmap_size", 0i64)?;
            self.conn.pragma_update(None, "cache_size", -2_000i64)?;
        }
        self.conn.pragma_update(None, "temp_store", "MEMORY")?;
        debug!(in_memory = self.in_memory, "configured storage pragmas");
        Ok(())
    }

    fn register_default_collations(&self) -> Result<()> {
        self.add_collation("NOSPACE", no_space_collation)
    }

    /// Register a string collation function under `name`.
    pub fn add_collation<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&str, &str) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.conn.create_collation(name, f)?;
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    /// Run one non-`SELECT` statement. Commits immediately if no
    /// transaction is open; if one is open, errors propagate so the
    /// enclosing [`TransactionGuard`] rolls back.
    pub fn execute(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<usize> {
        trace!(sql, "execute");
        Ok(self.conn.execute(sql, params)?)
    }

    /// Run `sql` once per row in `rows`.
    pub fn executemany(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<usize> {
        trace!(sql, batch = rows.len(), "executemany");
        let mut stmt = self.conn.prepare(sql)?;
        let mut affected = 0;
        for row in rows {
            let params: Vec<&dyn rusqlite::ToSql> =
                row.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
            affected += stmt.execute(params.as_slice())?;
        }
        if affected == 0 {
            warn!(sql, "executemany touched zero rows");
        }
        Ok(affected)
    }

    /// Run a multi-statement script, splitting on `;` and skipping empty
    /// statements. Wrapped in an immediate transaction if none is active.
    pub fn executescript(&self, script: &str) -> Result<()> {
        let needs_wrapper = self.conn.is_autocommit();
        if needs_wrapper {
            self.conn.execute_batch(&format!("BEGIN IMMEDIATE;\n{script}\nCOMMIT;"))?;
        } else {
            self.conn.execute_batch(script)?;
        }
        Ok(())
    }

    /// Run a `SELECT` and collect every row as a list of untyped values.
    /// Rejects anything that isn't a read.
    pub fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Row>> {
        ensure_select(sql)?;
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let rows = stmt.query_map(params, move |row| {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(row.get::<_, SqlValue>(i)?);
            }
            Ok(values)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(EngineError::from)
    }

    /// Like [`Storage::query`] but projects each row to a column-name map.
    pub fn query_dicts(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<RowMap>> {
        ensure_select(sql)?;
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let rows = stmt.query_map(params, move |row| {
            let mut map = HashMap::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                map.insert(name.clone(), row.get::<_, SqlValue>(i)?);
            }
            Ok(map)
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(EngineError::from)
    }

    /// Stream a `SELECT`'s rows through `visit` one at a time, pulling each
    /// from the engine's cursor on demand rather than materializing the
    /// whole result set first. Restartable only by calling again.
    pub fn iter_query<F>(&self, sql: &str, params: &[&dyn rusqlite::ToSql], mut visit: F) -> Result<()>
    where
        F: FnMut(Row) -> Result<()>,
    {
        ensure_select(sql)?;
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params)?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(row.get::<_, SqlValue>(i)?);
            }
            visit(values)?;
        }
        Ok(())
    }

    /// Like [`Storage::iter_query`] but projects each row to a column-name
    /// map before handing it to `visit`.
    pub fn iter_dicts<F>(&self, sql: &str, params: &[&dyn rusqlite::ToSql], mut visit: F) -> Result<()>
    where
        F: FnMut(RowMap) -> Result<()>,
    {
        ensure_select(sql)?;
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt.query(params)?;
        while let Some(row) = rows.next()? {
            let mut map = HashMap::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                map.insert(name.clone(), row.get::<_, SqlValue>(i)?);
            }
            visit(map)?;
        }
        Ok(())
    }

    pub fn fetchone(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    pub fn fetchone_dict(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<RowMap>> {
        Ok(self.query_dicts(sql, params)?.into_iter().next())
    }

    /// Insert one or more records (identical key sets) into `table`.
    pub fn insert_records(&self, table: &str, records: &[HashMap<String, SqlValue>]) -> Result<()> {
        let Some(first) = records.first() else {
            return Err(EngineError::UsageError("insert_records requires at least one record".into()));
        };
        let mut columns: Vec<&str> = first.keys().map(|s| s.as_str()).collect();
        columns.sort_unstable();
        for record in records {
            let mut keys: Vec<&str> = record.keys().map(|s| s.as_str()).collect();
            keys.sort_unstable();
            if keys != columns {
                return Err(EngineError::UsageError(
                    "insert_records requires identical key sets across records".into(),
                ));
            }
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );
        let rows: Vec<Vec<SqlValue>> = records
            .iter()
            .map(|record| columns.iter().map(|c| record[*c].clone()).collect())
            .collect();
        self.executemany(&sql, &rows)?;
        Ok(())
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    pub fn list_table_names(&self) -> Result<Vec<String>> {
        let rows = self.query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.pop())
            .map(|v| value_to_string(&v))
            .collect())
    }

    /// `(column_name, column_type)` pairs for `table`, in declared order.
    pub fn table_info(&self, table: &str) -> Result<Vec<(String, String)>> {
        let rows = self.query_dicts(&format!("PRAGMA table_info({table})"), &[])?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                let name = value_to_string(&row.remove("name").unwrap_or(SqlValue::Null));
                let ty = value_to_string(&row.remove("type").unwrap_or(SqlValue::Null));
                (name, ty)
            })
            .collect())
    }

    /// Begin a scoped transaction. Commits when the guard is dropped
    /// normally via [`TransactionGuard::commit`]; any earlier drop rolls
    /// back.
    pub fn transaction(&self) -> Result<TransactionGuard<'_>> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(TransactionGuard { storage: self, done: false })
    }

    /// Copy the whole database to `path` using the engine's native backup
    /// API. Flushes WAL first when copying from a file-backed database.
    pub fn backup(&self, path: &Path) -> Result<()> {
        if !self.in_memory {
            self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
        }
        let mut dst = Connection::open(path)?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dst)?;
        backup.run_to_completion(100, std::time::Duration::from_millis(10), None)?;
        Ok(())
    }

    /// `PRAGMA optimize`, `ANALYZE`, then `VACUUM`. `VACUUM` cannot run
    /// inside a transaction; any open transaction is committed first with a
    /// warning.
    pub fn optimize(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            warn!("committing open transaction before VACUUM");
            self.conn.execute_batch("COMMIT")?;
        }
        self.conn.execute_batch("PRAGMA optimize; ANALYZE;")?;
        self.conn.execute_batch("VACUUM")?;
        Ok(())
    }

    /// Roll back any open transaction, then release the connection. Safe
    /// to call more than once.
    pub fn close(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK").ok();
        }
        Ok(())
    }
}

/// A scoped transaction. Rolls back on drop unless [`commit`] was called.
pub struct TransactionGuard<'a> {
    storage: &'a Storage,
    done: bool,
}

impl<'a> TransactionGuard<'a> {
    pub fn commit(mut self) -> Result<()> {
        self.storage.conn.execute_batch("COMMIT")?;
        self.done = true;
        Ok(())
    }

    pub fn storage(&self) -> &Storage {
        self.storage
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.storage.conn.execute_batch("ROLLBACK").ok();
        }
    }
}

fn ensure_select(sql: &str) -> Result<()> {
    let head = sql.trim_start().get(..6).unwrap_or_default().to_ascii_uppercase();
    if head != "SELECT" && !sql.trim_start().to_ascii_uppercase().starts_with("PRAGMA") && !sql.trim_start().to_ascii_uppercase().starts_with("WITH") {
        return Err(EngineError::UsageError(format!(
            "query() only accepts read statements, got: {}",
            sql.trim()
        )));
    }
    Ok(())
}

pub fn value_to_string(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

pub fn value_ref_to_string(value: ValueRef<'_>) -> String {
    value_to_string(&SqlValue::from(value.to_owned()))
}
