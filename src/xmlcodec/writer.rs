//! Streams the live database back out as a flat `MasterDataSet` document.
//!
//! Column-type-aware text rendering mirrors the vendor format: `BIT`
//! columns render as the literals `true`/`false`, `NULL` columns are
//! omitted entirely, and other columns render their coerced scalar's
//! display text.

use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rusqlite::types::Value as SqlValue;
use tracing::{debug, info};

use crate::error::Result;
use crate::storage::{value_to_string, Storage};

use super::NAMESPACE;

/// Write every table in `storage` as a sorted, pretty-printed
/// `MasterDataSet` document at `path`.
pub fn write_master_dataset(storage: &Storage, path: &Path) -> Result<()> {
    let mut tables = storage.list_table_names()?;
    tables.sort();

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = Writer::new_with_indent(&mut buffer, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let root = BytesStart::new(super::ROOT_TAG).with_attributes([("xmlns", NAMESPACE)]);
        writer.write_event(Event::Start(root))?;

        for table in &tables {
            let columns = storage.table_info(table)?;
            let rows = storage.query(&format!("SELECT * FROM {table}"), &[])?;
            write_table_rows(&mut writer, table, &columns, &rows)?;
        }

        writer.write_event(Event::End(BytesEnd::new(super::ROOT_TAG)))?;
    }

    debug!(path = %path.display(), tables = tables.len(), "writing xml document");
    std::fs::write(path, buffer.into_inner())?;
    info!(path = %path.display(), "saved xml document");
    Ok(())
}

fn write_table_rows<W: std::io::Write>(
    writer: &mut Writer<W>,
    table: &str,
    columns: &[(String, String)],
    rows: &[Vec<SqlValue>],
) -> Result<()> {
    for row in rows {
        writer.write_event(Event::Start(BytesStart::new(table)))?;
        for ((name, ty), value) in columns.iter().zip(row.iter()) {
            if let Some(text) = render_column(ty, value) {
                writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
                writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new(table)))?;
    }
    Ok(())
}

/// Render one column value as XML text, or `None` to omit the column
/// entirely (the `NULL` case).
fn render_column(column_type: &str, value: &SqlValue) -> Option<String> {
    if matches!(value, SqlValue::Null) {
        return None;
    }
    if column_type.eq_ignore_ascii_case("BIT") {
        return match value {
            SqlValue::Integer(1) => Some("true".to_string()),
            SqlValue::Integer(0) => Some("false".to_string()),
            _ => Some(value_to_string(value)),
        };
    }
    Some(value_to_string(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Location;

    #[test]
    fn omits_null_columns_and_renders_bit_literals() {
        let storage = Storage::open(Location::Memory).unwrap();
        storage
            .execute("CREATE TABLE t_flag (id INTEGER, active BIT, note TEXT)", &[])
            .unwrap();
        storage
            .execute("INSERT INTO t_flag (id, active, note) VALUES (1, 1, NULL)", &[])
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        write_master_dataset(&storage, &path).unwrap();

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains("<active>true</active>"));
        assert!(!xml.contains("<note>"));
        assert!(xml.contains(NAMESPACE));
    }
}
