//! Object lifecycle: creation (with the automatic system membership), deep
//! copy, and cascade deletion.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::schema::{default_collection_for, Class, Collection};
use crate::value::{validate_string, Value};

use super::Engine;

impl Engine {
    /// Create an object of `class`, defaulting its category to `"-"` when
    /// none is given, and wire up its automatic system membership (under
    /// `collection`, or the class's naive default when omitted). Returns
    /// the new object's id.
    pub fn add_object(
        &self,
        class: Class,
        name: &str,
        category: Option<&str>,
        description: Option<&str>,
        collection: Option<Collection>,
    ) -> Result<i64> {
        validate_string(name)?;
        if self.check_object_exists(class, name)? {
            return Err(EngineError::NameError {
                name: name.to_string(),
                context: format!("a '{}' object with this name already exists", class.name()),
            });
        }

        let category = category.unwrap_or("-");
        let category_id = self.add_category(class, category)?;
        let class_id = self.get_class_id(class)?;
        let guid = Uuid::new_v4().to_string();

        self.storage().execute(
            "INSERT INTO t_object (class_id, category_id, name, GUID, description) VALUES (?, ?, ?, ?, ?)",
            &[&class_id, &category_id, &name, &guid, &description],
        )?;
        let object_id = self.storage().last_insert_rowid();

        if class != Class::System {
            let collection = match collection {
                Some(c) => c,
                None => default_collection_for(class)?,
            };
            self.add_membership(Class::System, class, "System", name, collection)?;
        }
        Ok(object_id)
    }

    /// Bulk-create objects from loosely-typed records (`class`, `name`, and
    /// optionally `category`/`description`/`collection`). A record missing
    /// its required keys fails the whole batch; a record naming an object
    /// that already exists is skipped.
    pub fn add_objects(&self, records: &[HashMap<String, Value>]) -> Result<usize> {
        let txn = self.storage().transaction()?;
        let mut created = 0usize;
        for record in records {
            let class_name = record
                .get("class")
                .map(Value::as_str_lossy)
                .ok_or_else(|| EngineError::KeyError { fields: vec!["class".into()] })?;
            let name = record
                .get("name")
                .map(Value::as_str_lossy)
                .ok_or_else(|| EngineError::KeyError { fields: vec!["name".into()] })?;
            let class = Class::from_name(&class_name).ok_or(EngineError::NotFound {
                kind: "class",
                name: class_name,
            })?;
            let category = record.get("category").map(Value::as_str_lossy);
            let description = record.get("description").map(Value::as_str_lossy);
            let collection = record
                .get("collection")
                .map(Value::as_str_lossy)
                .and_then(|n| Collection::from_name(&n));

            if self.check_object_exists(class, &name)? {
                tracing::warn!(name, class = class.name(), "skipping duplicate object record");
                continue;
            }
            self.add_object(class, &name, category.as_deref(), description.as_deref(), collection)?;
            created += 1;
        }
        txn.commit()?;
        Ok(created)
    }

    /// Deep-copy `name` (of `class`) to `new_name` under the same category.
    /// When `copy_properties` is set, also clones Data/Tag/Text/Band rows
    /// through the mapped memberships.
    ///
    /// Preserves an upstream quirk rather than fixing it: the original name
    /// is not threaded through to the per-membership copy below (the new
    /// name is used as both the "original" and "new" side of that lookup),
    /// so right after creation the brand-new object never has non-system
    /// memberships to find and the per-membership mapping always comes
    /// back empty. When that happens, the system membership is mapped
    /// instead (old system membership → new system membership), which is
    /// what actually carries properties across in practice.
    pub fn copy_object(&self, class: Class, name: &str, new_name: &str, copy_properties: bool) -> Result<i64> {
        if self.check_object_exists(class, new_name)? {
            return Err(EngineError::NameError {
                name: new_name.to_string(),
                context: "an object with the new name already exists".to_string(),
            });
        }
        let source_id = self.get_object_id(class, name, None)?;
        let row = self
            .storage()
            .fetchone(
                "SELECT cat.name FROM t_object obj \
                 JOIN t_category cat ON obj.category_id = cat.category_id \
                 WHERE obj.object_id = ?",
                &[&source_id],
            )?
            .ok_or(EngineError::NotFound { kind: "object", name: name.to_string() })?;
        let category = crate::storage::value_to_string(&row[0]);

        let new_id = self.add_object(class, new_name, Some(&category), None, None)?;

        // Bug preserved from upstream: `new_name` is passed for both the
        // "original" and "new" side of the per-membership copy below.
        let mut membership_mapping = self.copy_object_memberships(class, new_name, new_name)?;

        if membership_mapping.is_empty() {
            let original_system = self.get_system_membership_id(class, name)?;
            let new_system = self.get_system_membership_id(class, new_name)?;
            membership_mapping.insert(original_system, new_system);
        }

        if copy_properties {
            self.copy_object_properties(&membership_mapping)?;
        }
        Ok(new_id)
    }

    fn copy_object_memberships(&self, class: Class, original_name: &str, new_name: &str) -> Result<HashMap<i64, i64>> {
        // `new_name` stands in for the true original name here too,
        // matching the call site's bug: right after creation the new
        // object has no non-system memberships, so this is always empty.
        let memberships = self.get_object_memberships(class, new_name, false).unwrap_or_default();

        // `membership_mapping` is reset on every iteration upstream, so
        // only the last membership processed survives; preserved here too.
        let mut membership_mapping: HashMap<i64, i64> = HashMap::new();
        for membership in memberships {
            membership_mapping = HashMap::new();
            let (Some(parent_class), Some(child_class), Some(collection)) = (
                Class::from_name(&membership.parent_class),
                Class::from_name(&membership.child_class),
                Collection::from_name(&membership.collection),
            ) else {
                continue;
            };

            let result = if membership.child_name == original_name {
                self.get_membership_id(&membership.parent_name, original_name, collection).and_then(|old_id| {
                    self.add_membership(parent_class, child_class, &membership.parent_name, new_name, collection)
                        .map(|new_id| (old_id, new_id))
                })
            } else if membership.parent_name == original_name {
                self.get_membership_id(original_name, &membership.child_name, collection).and_then(|old_id| {
                    self.add_membership(parent_class, child_class, new_name, &membership.child_name, collection)
                        .map(|new_id| (old_id, new_id))
                })
            } else {
                continue;
            };

            match result {
                Ok((old_id, new_id)) => {
                    membership_mapping.insert(old_id, new_id);
                }
                Err(err) => tracing::warn!(%err, original_name, new_name, "could not recreate membership during object copy"),
            }
        }
        Ok(membership_mapping)
    }

    /// Clone Data rows through `mapping` (old membership id → new membership
    /// id), then derive a second mapping from old to new `data_id` by
    /// rejoining on `(membership_id, property_id, value)` and use it to
    /// carry each Data row's Tag/Text/Band children across. Mirrors
    /// upstream's two-stage temp-table join; all in one transaction.
    fn copy_object_properties(&self, mapping: &HashMap<i64, i64>) -> Result<()> {
        if mapping.is_empty() {
            return Ok(());
        }
        let txn = self.storage().transaction()?;
        txn.storage().execute("CREATE TEMPORARY TABLE temp_mapping (old_id INTEGER, new_id INTEGER)", &[])?;
        for (&old_id, &new_id) in mapping {
            txn.storage()
                .execute("INSERT INTO temp_mapping (old_id, new_id) VALUES (?, ?)", &[&old_id, &new_id])?;
        }
        txn.storage().execute(
            "INSERT INTO t_data (membership_id, property_id, value, state) \
             SELECT tm.new_id, d.property_id, d.value, d.state \
             FROM t_data d JOIN temp_mapping tm ON d.membership_id = tm.old_id",
            &[],
        )?;

        txn.storage().execute("CREATE TEMPORARY TABLE temp_data_mapping (old_id INTEGER, new_id INTEGER)", &[])?;
        txn.storage().execute(
            "INSERT INTO temp_data_mapping (old_id, new_id) \
             SELECT old_d.data_id, new_d.data_id \
             FROM t_data old_d \
             JOIN temp_mapping tm ON old_d.membership_id = tm.old_id \
             JOIN t_data new_d ON new_d.membership_id = tm.new_id \
                AND new_d.property_id = old_d.property_id \
                AND new_d.value = old_d.value \
             WHERE new_d.data_id NOT IN (SELECT data_id FROM t_tag)",
            &[],
        )?;

        txn.storage().execute(
            "INSERT INTO t_tag (data_id, object_id, state, action_id) \
             SELECT tdm.new_id, t.object_id, t.state, t.action_id \
             FROM t_tag t JOIN temp_data_mapping tdm ON t.data_id = tdm.old_id",
            &[],
        )?;
        txn.storage().execute(
            "INSERT INTO t_text (data_id, class_id, value, state, action_id) \
             SELECT tdm.new_id, t.class_id, t.value, t.state, t.action_id \
             FROM t_text t JOIN temp_data_mapping tdm ON t.data_id = tdm.old_id",
            &[],
        )?;
        txn.storage().execute(
            "INSERT INTO t_band (data_id, band_id, state) \
             SELECT tdm.new_id, b.band_id, b.state \
             FROM t_band b JOIN temp_data_mapping tdm ON b.data_id = tdm.old_id",
            &[],
        )?;

        txn.storage().execute("DROP TABLE temp_mapping", &[])?;
        txn.storage().execute("DROP TABLE temp_data_mapping", &[])?;
        txn.commit()
    }

    /// Remove `name` (of `class`) and every membership, property, tag,
    /// text, and band row that references it. There is no original
    /// algorithm this is ported from (upstream leaves deletion
    /// unimplemented); the cascade here follows the schema's foreign keys
    /// directly: data rows depend on memberships, memberships depend on
    /// objects.
    pub fn delete_object(&self, class: Class, name: &str) -> Result<()> {
        let object_id = self.get_object_id(class, name, None)?;
        let txn = self.storage().transaction()?;
        let membership_ids: Vec<i64> = txn
            .storage()
            .query(
                "SELECT membership_id FROM t_membership WHERE parent_object_id = ? OR child_object_id = ?",
                &[&object_id, &object_id],
            )?
            .into_iter()
            .map(|row| match &row[0] {
                rusqlite::types::Value::Integer(i) => *i,
                _ => 0,
            })
            .collect();
        for membership_id in &membership_ids {
            txn.storage().execute("DELETE FROM t_band WHERE data_id IN (SELECT data_id FROM t_data WHERE membership_id = ?)", &[membership_id])?;
            txn.storage().execute("DELETE FROM t_tag WHERE data_id IN (SELECT data_id FROM t_data WHERE membership_id = ?)", &[membership_id])?;
            txn.storage().execute("DELETE FROM t_text WHERE data_id IN (SELECT data_id FROM t_data WHERE membership_id = ?)", &[membership_id])?;
            txn.storage().execute("DELETE FROM t_data WHERE membership_id = ?", &[membership_id])?;
            txn.storage().execute("DELETE FROM t_membership WHERE membership_id = ?", &[membership_id])?;
        }
        txn.storage().execute("DELETE FROM t_attribute_data WHERE object_id = ?", &[&object_id])?;
        let affected = txn.storage().execute("DELETE FROM t_object WHERE object_id = ?", &[&object_id])?;
        if affected == 0 {
            return Err(EngineError::NotFound { kind: "object", name: name.to_string() });
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::properties::PropertyFilter;
    use crate::engine::Engine;

    fn seeded_engine() -> Engine {
        let engine = Engine::new_in_memory().unwrap();
        engine.create_schema(None).unwrap();
        engine
            .storage()
            .execute("INSERT INTO t_class (name) VALUES ('System'), ('Generator')", &[])
            .unwrap();
        engine
            .storage()
            .execute(
                "INSERT INTO t_collection (name, parent_class_id, child_class_id) VALUES ('Generators', 1, 2)",
                &[],
            )
            .unwrap();
        engine
            .storage()
            .execute("INSERT INTO t_category (name, class_id, rank) VALUES ('-', 1, 1)", &[])
            .unwrap();
        engine
            .storage()
            .execute(
                "INSERT INTO t_object (name, class_id, category_id, GUID) VALUES ('System', 1, 1, 'sys')",
                &[],
            )
            .unwrap();
        engine
    }

    #[test]
    fn add_object_creates_system_membership() {
        let engine = seeded_engine();
        let id = engine.add_object(Class::Generator, "Gen1", None, None, None).unwrap();
        assert!(id > 0);
        assert!(engine.check_membership_exists("System", "Gen1", Collection::Generators).unwrap());
    }

    #[test]
    fn add_object_rejects_duplicate_name() {
        let engine = seeded_engine();
        engine.add_object(Class::Generator, "Gen1", None, None, None).unwrap();
        assert!(engine.add_object(Class::Generator, "Gen1", None, None, None).is_err());
    }

    #[test]
    fn add_object_rejects_blank_name() {
        let engine = seeded_engine();
        assert!(engine.add_object(Class::Generator, "   ", None, None, None).is_err());
    }

    #[test]
    fn copy_object_only_carries_system_membership() {
        let engine = seeded_engine();
        engine.add_object(Class::Generator, "Gen1", None, None, None).unwrap();
        let new_id = engine.copy_object(Class::Generator, "Gen1", "Gen1 Copy", true).unwrap();
        assert!(new_id > 0);
        assert!(engine.check_membership_exists("System", "Gen1 Copy", Collection::Generators).unwrap());
    }

    #[test]
    fn copy_object_carries_properties_through_the_system_membership() {
        let engine = seeded_engine();
        engine.add_object(Class::Generator, "Gen1", None, None, None).unwrap();
        engine
            .storage()
            .execute("INSERT INTO t_property (name, collection_id) VALUES ('Max Capacity', 1)", &[])
            .unwrap();
        engine
            .add_property(Collection::Generators, Class::System, "System", Class::Generator, "Gen1", "Max Capacity", "100", None, None, None)
            .unwrap();

        engine.copy_object(Class::Generator, "Gen1", "Gen1 Copy", true).unwrap();
        let properties = engine.get_object_properties(Class::Generator, "Gen1 Copy", PropertyFilter::default()).unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].value, "100");
    }

    #[test]
    fn copy_object_skips_properties_when_not_requested() {
        let engine = seeded_engine();
        engine.add_object(Class::Generator, "Gen1", None, None, None).unwrap();
        engine
            .storage()
            .execute("INSERT INTO t_property (name, collection_id) VALUES ('Max Capacity', 1)", &[])
            .unwrap();
        engine
            .add_property(Collection::Generators, Class::System, "System", Class::Generator, "Gen1", "Max Capacity", "100", None, None, None)
            .unwrap();

        engine.copy_object(Class::Generator, "Gen1", "Gen1 Copy", false).unwrap();
        assert!(matches!(
            engine.get_object_properties(Class::Generator, "Gen1 Copy", PropertyFilter::default()),
            Err(EngineError::NoPropertiesError { .. })
        ));
    }

    #[test]
    fn delete_object_removes_its_memberships() {
        let engine = seeded_engine();
        engine.add_object(Class::Generator, "Gen1", None, None, None).unwrap();
        engine.delete_object(Class::Generator, "Gen1").unwrap();
        assert!(!engine.check_object_exists(Class::Generator, "Gen1").unwrap());
        assert!(engine.get_object_memberships(Class::System, "System", true).unwrap().is_empty());
    }
}
