//! Membership creation: the parent/child/collection edges between objects.

use rusqlite::types::Value as SqlValue;

use crate::error::{EngineError, Result};
use crate::schema::{Class, Collection};
use crate::value::Value;
use std::collections::HashMap;

use super::Engine;

impl Engine {
    pub fn check_membership_exists(
        &self,
        parent_name: &str,
        child_name: &str,
        collection: Collection,
    ) -> Result<bool> {
        Ok(self.get_membership_id(parent_name, child_name, collection).is_ok())
    }

    /// Link `parent_name` to `child_name` under `collection`, returning the
    /// new membership's id. Fails if the membership already exists.
    pub fn add_membership(
        &self,
        parent: Class,
        child: Class,
        parent_name: &str,
        child_name: &str,
        collection: Collection,
    ) -> Result<i64> {
        if self.check_membership_exists(parent_name, child_name, collection)? {
            return Err(EngineError::NameError {
                name: format!("{parent_name} -> {child_name}"),
                context: format!("a '{}' membership between these objects already exists", collection.name()),
            });
        }
        let parent_id = self.get_object_id(parent, parent_name, None)?;
        let child_id = self.get_object_id(child, child_name, None)?;
        let collection_id = self.get_collection_id(collection, parent, child)?;

        self.storage().execute(
            "INSERT INTO t_membership (parent_class_id, child_class_id, collection_id, parent_object_id, child_object_id) \
             VALUES (?, ?, ?, ?, ?)",
            &[
                &self.get_class_id(parent)?,
                &self.get_class_id(child)?,
                &collection_id,
                &parent_id,
                &child_id,
            ],
        )?;
        Ok(self.storage().last_insert_rowid())
    }

    /// Bulk-create memberships from id-keyed records. Every record must carry
    /// exactly the keys `parent_class_id`, `parent_object_id`,
    /// `collection_id`, `child_class_id`, `child_object_id`; a record missing
    /// any of them fails the whole batch with a key error. The ids are taken
    /// on faith and inserted in a single batch, with no existence re-check
    /// and no silent skip of bad rows.
    pub fn add_memberships_from_records(&self, records: &[HashMap<String, Value>]) -> Result<usize> {
        const REQUIRED: [&str; 5] = [
            "parent_class_id",
            "parent_object_id",
            "collection_id",
            "child_class_id",
            "child_object_id",
        ];
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let missing: Vec<String> = REQUIRED
                .iter()
                .filter(|k| !record.contains_key(**k))
                .map(|k| k.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(EngineError::KeyError { fields: missing });
            }
            rows.push(vec![
                SqlValue::Integer(field_id(record, "parent_class_id")?),
                SqlValue::Integer(field_id(record, "child_class_id")?),
                SqlValue::Integer(field_id(record, "collection_id")?),
                SqlValue::Integer(field_id(record, "parent_object_id")?),
                SqlValue::Integer(field_id(record, "child_object_id")?),
            ]);
        }

        let sql = "INSERT INTO t_membership \
                    (parent_class_id, child_class_id, collection_id, parent_object_id, child_object_id) \
                    VALUES (?, ?, ?, ?, ?)";
        self.storage().executemany(sql, &rows)?;
        Ok(rows.len())
    }

    pub fn delete_membership(&self, membership_id: i64) -> Result<()> {
        let affected = self
            .storage()
            .execute("DELETE FROM t_membership WHERE membership_id = ?", &[&membership_id])?;
        if affected == 0 {
            return Err(EngineError::NotFound { kind: "membership", name: membership_id.to_string() });
        }
        Ok(())
    }
}

fn field_id(record: &HashMap<String, Value>, key: &str) -> Result<i64> {
    record
        .get(key)
        .ok_or_else(|| EngineError::KeyError { fields: vec![key.to_string()] })?
        .as_i64()
}
