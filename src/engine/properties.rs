//! Property ingestion and retrieval: single and bulk inserts, scenario
//! tagging, and the aggregated read path that rolls bands/texts/scenario
//! tags back onto each property row.

use std::collections::HashMap;

use rusqlite::types::Value as SqlValue;

use crate::error::{EngineError, Result};
use crate::schema::{Class, Collection};
use crate::storage::value_to_string;
use crate::value::Value;

use super::Engine;

/// One property as returned by [`Engine::get_object_properties`]: the base
/// `t_data` row plus every sibling band/text/scenario-tag row rolled up by
/// `GROUP_CONCAT`.
#[derive(Debug, Clone)]
pub struct PropertyRecord {
    pub name: String,
    pub property_name: String,
    pub value: String,
    pub unit: Option<String>,
    pub bands: Vec<i64>,
    pub texts: Vec<String>,
    pub scenarios: Vec<String>,
    pub scenario_category: Vec<String>,
}

/// Shared filter set for [`Engine::get_object_properties`] and
/// [`Engine::iterate_properties`].
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter<'a> {
    pub property_names: Option<&'a [String]>,
    pub parent_class: Option<Class>,
    pub collection: Option<Collection>,
    pub category: Option<&'a str>,
    pub chunk_size: Option<usize>,
}

impl Engine {
    /// Attach one property value to the membership between `parent_name`
    /// and `child_name`. `band` defaults to 1 (the common single-band
    /// case). Returns the new `t_data` row's id.
    #[allow(clippy::too_many_arguments)]
    pub fn add_property(
        &self,
        collection: Collection,
        parent_class: Class,
        parent_name: &str,
        child_class: Class,
        child_name: &str,
        property_name: &str,
        value: &str,
        band: Option<i64>,
        scenario: Option<&str>,
        text: Option<&str>,
    ) -> Result<i64> {
        let membership_id = self.get_membership_id(parent_name, child_name, collection)?;
        let property_id = self.get_property_id(property_name, collection, parent_class, child_class)?;

        self.storage().execute(
            "INSERT INTO t_data (membership_id, property_id, value) VALUES (?, ?, ?)",
            &[&membership_id, &property_id, &value],
        )?;
        let data_id = self.storage().last_insert_rowid();
        self.storage().execute(
            "UPDATE t_property SET is_dynamic = 1, is_enabled = 1 WHERE property_id = ?",
            &[&property_id],
        )?;

        let band = band.unwrap_or(1);
        self.storage()
            .execute("INSERT INTO t_band (data_id, band_id) VALUES (?, ?)", &[&data_id, &band])?;

        if let Some(text) = text {
            let class_id = self.get_class_id(child_class)?;
            self.storage().execute(
                "INSERT INTO t_text (data_id, class_id, value) VALUES (?, ?, ?)",
                &[&data_id, &class_id, &text],
            )?;
        }

        if let Some(scenario) = scenario {
            self.tag_scenario(membership_id, property_id, value, scenario)?;
        }

        Ok(data_id)
    }

    /// Tag every `t_data` row matching `(membership_id, property_id,
    /// value)` with `scenario`'s object id.
    ///
    /// Matches on the value triple rather than the specific `data_id` just
    /// inserted, the fragile design inherited unchanged: if another row
    /// happens to share the same membership, property, and value text it
    /// gets tagged too, and calling this twice for the same triple inserts
    /// a duplicate tag row rather than upserting.
    pub fn tag_scenario(&self, membership_id: i64, property_id: i64, value: &str, scenario: &str) -> Result<usize> {
        let scenario_object_id = self.get_scenario_id(scenario)?;
        self.storage().execute(
            "INSERT INTO t_tag (data_id, object_id) \
             SELECT data_id, ? FROM t_data WHERE membership_id = ? AND property_id = ? AND value = ?",
            &[&scenario_object_id, &membership_id, &property_id, &value],
        )
    }

    /// Bulk-ingest property records under one transaction. Each record
    /// must carry `parent_class`, `parent_object_name`, `collection`,
    /// `child_class`, `child_object_name`, `property_name`, and `value`;
    /// missing required keys fail the whole batch. A record naming a
    /// membership or property that doesn't exist is skipped rather than
    /// aborting the batch.
    pub fn add_properties_from_records(&self, records: &[HashMap<String, Value>]) -> Result<usize> {
        const REQUIRED: [&str; 7] = [
            "parent_class",
            "parent_object_name",
            "collection",
            "child_class",
            "child_object_name",
            "property_name",
            "value",
        ];
        for record in records {
            let missing: Vec<String> = REQUIRED
                .iter()
                .filter(|k| !record.contains_key(**k))
                .map(|k| k.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(EngineError::KeyError { fields: missing });
            }
        }

        let txn = self.storage().transaction()?;
        let mut inserted = 0usize;
        let mut touched_properties: std::collections::HashSet<i64> = std::collections::HashSet::new();
        for record in records {
            let parent_class = field_class(record, "parent_class")?;
            let child_class = field_class(record, "child_class")?;
            let collection = field_collection(record, "collection")?;
            let parent_name = field_str(record, "parent_object_name")?;
            let child_name = field_str(record, "child_object_name")?;
            let property_name = field_str(record, "property_name")?;
            let value = field_str(record, "value")?;
            let band = record.get("band").and_then(value_as_i64);
            let scenario = record.get("scenario").map(Value::as_str_lossy);
            let text = record.get("text").map(Value::as_str_lossy);

            let Ok(membership_id) = self.get_membership_id(&parent_name, &child_name, collection) else {
                tracing::warn!(parent_name, child_name, "skipping property record with unknown membership");
                continue;
            };
            let Ok(property_id) = self.get_property_id(&property_name, collection, parent_class, child_class) else {
                tracing::warn!(property_name, "skipping property record naming an unknown property");
                continue;
            };

            txn.storage().execute(
                "INSERT INTO t_data (membership_id, property_id, value) VALUES (?, ?, ?)",
                &[&membership_id, &property_id, &value],
            )?;
            let data_id = txn.storage().last_insert_rowid();
            let band = band.unwrap_or(1);
            txn.storage()
                .execute("INSERT INTO t_band (data_id, band_id) VALUES (?, ?)", &[&data_id, &band])?;
            if let Some(text) = &text {
                let class_id = self.get_class_id(child_class)?;
                txn.storage().execute(
                    "INSERT INTO t_text (data_id, class_id, value) VALUES (?, ?, ?)",
                    &[&data_id, &class_id, text],
                )?;
            }
            if let Some(scenario) = &scenario {
                self.tag_scenario(membership_id, property_id, value.as_str(), scenario.as_str())?;
            }
            touched_properties.insert(property_id);
            inserted += 1;
        }
        for property_id in &touched_properties {
            txn.storage().execute(
                "UPDATE t_property SET is_dynamic = 1, is_enabled = 1 WHERE property_id = ?",
                &[property_id],
            )?;
        }
        txn.commit()?;
        Ok(inserted)
    }

    /// Every `t_data` id attached to `name` (of `class`) acting as the
    /// child side of a membership, optionally narrowed to one collection.
    pub fn get_object_data_ids(&self, class: Class, name: &str, collection: Option<Collection>) -> Result<Vec<i64>> {
        let object_id = self.get_object_id(class, name, None)?;
        let mut sql = "SELECT data.data_id FROM t_data data \
                        JOIN t_membership m ON data.membership_id = m.membership_id \
                        WHERE m.child_object_id = ?"
            .to_string();
        let collection_id;
        let rows = if let Some(collection) = collection {
            collection_id = self
                .storage()
                .fetchone("SELECT collection_id FROM t_collection WHERE name = ?", &[&collection.name()])?
                .map(|row| first_i64(&row))
                .ok_or(EngineError::NotFound { kind: "collection", name: collection.name().to_string() })?;
            sql.push_str(" AND m.collection_id = ?");
            self.storage().query(&sql, &[&object_id, &collection_id])?
        } else {
            self.storage().query(&sql, &[&object_id])?
        };
        Ok(rows.into_iter().map(|row| first_i64(&row)).collect())
    }

    /// Every property attached to `name` (of `class`) matching `filter`,
    /// aggregating each row's bands/texts/scenario tags via `GROUP_CONCAT`.
    /// The underlying data_ids are computed once, then fetched in batches
    /// of `filter.chunk_size` (default 1000) to bound how large any one
    /// query's `IN (...)` list gets.
    pub fn get_object_properties(&self, class: Class, name: &str, filter: PropertyFilter<'_>) -> Result<Vec<PropertyRecord>> {
        if !self.has_properties(class, name, filter.collection, filter.category)? {
            return Err(EngineError::NoPropertiesError { object: name.to_string() });
        }
        let data_ids = self.candidate_data_ids(class, name, &filter)?;
        let chunk_size = filter.chunk_size.unwrap_or(1000).max(1);
        let mut records = Vec::new();
        for chunk in data_ids.chunks(chunk_size) {
            records.extend(self.property_records_for(chunk)?);
        }
        Ok(records)
    }

    /// Lazy sibling of [`Engine::get_object_properties`]: streams records
    /// chunk by chunk through `visit` instead of collecting them all into
    /// one `Vec`. Restartable only by calling again.
    pub fn iterate_properties<F>(&self, class: Class, name: &str, filter: PropertyFilter<'_>, mut visit: F) -> Result<()>
    where
        F: FnMut(PropertyRecord) -> Result<()>,
    {
        if !self.has_properties(class, name, filter.collection, filter.category)? {
            return Err(EngineError::NoPropertiesError { object: name.to_string() });
        }
        let data_ids = self.candidate_data_ids(class, name, &filter)?;
        let chunk_size = filter.chunk_size.unwrap_or(1000).max(1);
        for chunk in data_ids.chunks(chunk_size) {
            for record in self.property_records_for(chunk)? {
                visit(record)?;
            }
        }
        Ok(())
    }

    /// The distinct `data_id`s matching `name` (of `class`) and `filter`,
    /// unpaged. Drives the chunk boundaries for both retrieval methods.
    fn candidate_data_ids(&self, class: Class, name: &str, filter: &PropertyFilter<'_>) -> Result<Vec<i64>> {
        let object_id = self.get_object_id(class, name, None)?;
        let mut sql = "SELECT DISTINCT data.data_id FROM t_data data \
                        JOIN t_membership m ON data.membership_id = m.membership_id \
                        JOIN t_object obj ON m.child_object_id = obj.object_id \
                        JOIN t_property property ON data.property_id = property.property_id \
                        WHERE m.child_object_id = ?"
            .to_string();
        let mut params: Vec<SqlValue> = vec![SqlValue::Integer(object_id)];
        self.append_property_filters(class, &mut sql, &mut params, filter)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();
        let rows = self.storage().query(&sql, &param_refs)?;
        Ok(rows.into_iter().map(|r| first_i64(&r)).collect())
    }

    /// The aggregated [`PropertyRecord`]s for exactly the `data_id`s in
    /// `chunk`.
    fn property_records_for(&self, chunk: &[i64]) -> Result<Vec<PropertyRecord>> {
        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT obj.name, property.name, data.value, unit.value, \
             GROUP_CONCAT(DISTINCT band.band_id), \
             GROUP_CONCAT(DISTINCT text.value), \
             GROUP_CONCAT(DISTINCT scenario_obj.name), \
             GROUP_CONCAT(DISTINCT scenario_cat.name) \
             FROM t_data data \
             JOIN t_membership m ON data.membership_id = m.membership_id \
             JOIN t_object obj ON m.child_object_id = obj.object_id \
             JOIN t_property property ON data.property_id = property.property_id \
             LEFT JOIN t_unit unit ON property.unit_id = unit.unit_id \
             LEFT JOIN t_band band ON band.data_id = data.data_id \
             LEFT JOIN t_text text ON text.data_id = data.data_id \
             LEFT JOIN t_tag tag ON tag.data_id = data.data_id \
             LEFT JOIN t_object scenario_obj ON tag.object_id = scenario_obj.object_id \
                 AND scenario_obj.class_id = (SELECT class_id FROM t_class WHERE name = 'Scenario') \
             LEFT JOIN t_category scenario_cat ON scenario_obj.category_id = scenario_cat.category_id \
             WHERE data.data_id IN ({placeholders}) \
             GROUP BY data.data_id"
        );
        let params: Vec<&dyn rusqlite::ToSql> = chunk.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
        let rows = self.storage().query(&sql, &params)?;
        Ok(rows
            .into_iter()
            .map(|row| PropertyRecord {
                name: value_to_string(&row[0]),
                property_name: value_to_string(&row[1]),
                value: value_to_string(&row[2]),
                unit: match &row[3] {
                    SqlValue::Null => None,
                    v => Some(value_to_string(v)),
                },
                bands: split_concat(&row[4]).iter().filter_map(|s| s.parse().ok()).collect(),
                texts: split_concat(&row[5]),
                scenarios: split_concat(&row[6]),
                scenario_category: split_concat(&row[7]),
            })
            .collect())
    }

    fn append_property_filters(
        &self,
        class: Class,
        sql: &mut String,
        params: &mut Vec<SqlValue>,
        filter: &PropertyFilter<'_>,
    ) -> Result<()> {
        if let Some(parent_class) = filter.parent_class {
            sql.push_str(" AND m.parent_class_id = (SELECT class_id FROM t_class WHERE name = ?)");
            params.push(SqlValue::Text(parent_class.name().to_string()));
        }
        if let Some(collection) = filter.collection {
            let collection_id = self
                .storage()
                .fetchone("SELECT collection_id FROM t_collection WHERE name = ?", &[&collection.name()])?
                .map(|row| first_i64(&row))
                .ok_or(EngineError::NotFound { kind: "collection", name: collection.name().to_string() })?;
            sql.push_str(" AND m.collection_id = ?");
            params.push(SqlValue::Integer(collection_id));
        }
        if let Some(category) = filter.category {
            if !self.check_category_exists(class, category)? {
                return Err(EngineError::NotFound { kind: "category", name: category.to_string() });
            }
            let category_id = self.get_category_id(class, category)?;
            sql.push_str(" AND obj.category_id = ?");
            params.push(SqlValue::Integer(category_id));
        }
        if let Some(names) = filter.property_names {
            if !names.is_empty() {
                let placeholders = vec!["?"; names.len()].join(", ");
                sql.push_str(&format!(" AND property.name IN ({placeholders})"));
                params.extend(names.iter().map(|n| SqlValue::Text(n.clone())));
            }
        }
        Ok(())
    }

    /// Remove `data_id` and every `t_band`/`t_tag`/`t_text` row that
    /// references it. No original algorithm to ground this on (upstream
    /// leaves deletion unimplemented); the cascade follows the schema's
    /// foreign keys directly.
    pub fn delete_property(&self, data_id: i64) -> Result<()> {
        let txn = self.storage().transaction()?;
        txn.storage().execute("DELETE FROM t_band WHERE data_id = ?", &[&data_id])?;
        txn.storage().execute("DELETE FROM t_tag WHERE data_id = ?", &[&data_id])?;
        txn.storage().execute("DELETE FROM t_text WHERE data_id = ?", &[&data_id])?;
        let affected = txn.storage().execute("DELETE FROM t_data WHERE data_id = ?", &[&data_id])?;
        if affected == 0 {
            return Err(EngineError::NotFound { kind: "property", name: data_id.to_string() });
        }
        txn.commit()
    }
}

fn first_i64(row: &[SqlValue]) -> i64 {
    match &row[0] {
        SqlValue::Integer(i) => *i,
        other => value_to_string(other).parse().unwrap_or_default(),
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Text(s) => s.parse().ok(),
        _ => None,
    }
}

fn split_concat(value: &SqlValue) -> Vec<String> {
    match value {
        SqlValue::Null => Vec::new(),
        SqlValue::Text(s) => s.split(',').map(|s| s.to_string()).collect(),
        other => vec![value_to_string(other)],
    }
}

fn field_str(record: &HashMap<String, Value>, key: &str) -> Result<String> {
    record
        .get(key)
        .map(Value::as_str_lossy)
        .ok_or_else(|| EngineError::KeyError { fields: vec![key.to_string()] })
}

fn field_class(record: &HashMap<String, Value>, key: &str) -> Result<Class> {
    let name = field_str(record, key)?;
    Class::from_name(&name).ok_or(EngineError::NotFound { kind: "class", name })
}

fn field_collection(record: &HashMap<String, Value>, key: &str) -> Result<Collection> {
    let name = field_str(record, key)?;
    Collection::from_name(&name).ok_or(EngineError::NotFound { kind: "collection", name })
}
