//! The typed data-engine façade: the public API surface of this crate.
//!
//! An [`Engine`] owns one [`Storage`] and resolves every domain enum/name
//! the caller passes into the integer ids the relational schema uses
//! internally. Callers never see a raw row id unless they ask for one.

pub mod identity;
pub mod memberships;
pub mod objects;
pub mod properties;

use std::collections::HashMap;
use std::path::Path;

use rusqlite::types::Value as SqlValue;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::schema::str_to_schema;
use crate::storage::{Location, Storage};
use crate::value::Value;
use crate::xmlcodec::XmlDataSet;

/// The packaged default schema script, embedded at compile time so the
/// crate never depends on a runtime resource lookup.
pub const DEFAULT_SCHEMA: &str = include_str!("../../resources/schema.sql");

/// The schema-aware engine. Construct with [`Engine::new_in_memory`],
/// [`Engine::open`], or [`Engine::from_xml`].
pub struct Engine {
    storage: Storage,
}

impl Engine {
    /// A fresh in-memory database with no schema yet created.
    pub fn new_in_memory() -> Result<Self> {
        Ok(Engine { storage: Storage::open(Location::Memory)? })
    }

    /// Open (or create) a file-backed database. When `new_db` is false and
    /// the database already has a `t_config` table, the reported
    /// [`Engine::version`] is populated from it.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Engine { storage: Storage::open(Location::Path(path))? })
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Execute the packaged schema script, or `schema` if given.
    pub fn create_schema(&self, schema: Option<&str>) -> Result<()> {
        match schema {
            Some(script) => self.storage.executescript(script),
            None => {
                debug!("using default schema");
                self.storage.executescript(DEFAULT_SCHEMA)
            }
        }
    }

    /// The dotted-integer version recorded in `t_config`, or `None` if the
    /// table doesn't exist yet or carries no `Version` row.
    pub fn version(&self) -> Option<Vec<i64>> {
        let row = self
            .storage
            .fetchone("SELECT value FROM t_config WHERE element = 'Version'", &[])
            .ok()
            .flatten()?;
        let text = match row.first()? {
            SqlValue::Text(s) => s.clone(),
            other => crate::storage::value_to_string(other),
        };
        text.split('.').map(|part| part.parse::<i64>().ok()).collect()
    }

    /// Build a fresh in-memory engine, create its schema, and import every
    /// row from `path`.
    pub fn from_xml(path: &Path, schema: Option<&str>) -> Result<Self> {
        if !path.exists() {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input XML file does not exist: {}", path.display()),
            )));
        }
        let engine = Self::new_in_memory()?;
        engine.create_schema(schema)?;

        let dataset = XmlDataSet::parse(path)?;
        for tag in dataset.table_tags().map(str::to_string).collect::<Vec<_>>() {
            let Some(entry) = str_to_schema(&tag) else {
                continue;
            };
            let records = dataset.get_records(entry);
            if records.is_empty() {
                continue;
            }
            import_records(&engine, &tag, &records)?;
        }
        Ok(engine)
    }

    /// Serialize every table to a `MasterDataSet` XML document at `path`.
    pub fn to_xml(&self, path: &Path) -> Result<()> {
        crate::xmlcodec::write_master_dataset(&self.storage, path)
    }

    /// `PRAGMA optimize`, `ANALYZE`, then `VACUUM`.
    pub fn optimize(&self) -> Result<()> {
        self.storage.optimize()
    }

    /// Copy the whole database to `path`.
    pub fn backup(&self, path: &Path) -> Result<()> {
        self.storage.backup(path)
    }

    pub fn close(&self) -> Result<()> {
        self.storage.close()
    }

    /// Run a read-only query and return raw rows. Non-`SELECT` statements
    /// fail with a usage error.
    pub fn query(&self, sql: &str) -> Result<Vec<Vec<SqlValue>>> {
        self.storage.query(sql, &[])
    }
}

/// Group records by their exact key set (XML records may omit optional
/// columns) and issue one parameterized insert per group, matching the
/// vendor XML's permissive column layout.
fn import_records(engine: &Engine, table: &str, records: &[HashMap<String, Value>]) -> Result<()> {
    let mut groups: HashMap<Vec<String>, Vec<&HashMap<String, Value>>> = HashMap::new();
    for record in records {
        let mut columns: Vec<String> = record.keys().cloned().collect();
        columns.sort_unstable();
        groups.entry(columns).or_default().push(record);
    }

    for (columns, group) in groups {
        if columns.is_empty() {
            continue;
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!("INSERT INTO {table} ({}) VALUES ({placeholders})", columns.join(", "));
        let rows: Vec<Vec<SqlValue>> = group
            .iter()
            .map(|record| columns.iter().map(|c| value_to_sql(&record[c])).collect())
            .collect();
        let affected = engine.storage.executemany(&sql, &rows)?;
        if affected == 0 {
            warn!(table, ?columns, "no rows inserted");
        }
    }
    Ok(())
}

pub(crate) fn value_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::List(_) | Value::Map(_) => SqlValue::Text(value.as_str_lossy()),
    }
}
