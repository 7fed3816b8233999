//! Name/enum → id resolvers, existence checks, and catalog listings.

use rusqlite::types::Value as SqlValue;

use crate::error::{EngineError, Result};
use crate::schema::{default_collection_for, Class, Collection};
use crate::storage::value_to_string;

use super::Engine;

fn first_i64(row: &[SqlValue]) -> i64 {
    match &row[0] {
        SqlValue::Integer(i) => *i,
        other => value_to_string(other).parse().unwrap_or_default(),
    }
}

impl Engine {
    pub fn get_class_id(&self, class: Class) -> Result<i64> {
        let row = self
            .storage()
            .fetchone("SELECT class_id FROM t_class WHERE name = ?", &[&class.name()])?
            .ok_or(EngineError::NotFound { kind: "class", name: class.name().to_string() })?;
        Ok(first_i64(&row))
    }

    pub fn get_collection_id(&self, collection: Collection, parent: Class, child: Class) -> Result<i64> {
        let sql = "SELECT collection.collection_id FROM t_collection collection \
                    LEFT JOIN t_class parent_class ON collection.parent_class_id = parent_class.class_id \
                    LEFT JOIN t_class child_class ON collection.child_class_id = child_class.class_id \
                    WHERE collection.name = ? AND parent_class.name = ? AND child_class.name = ?";
        let row = self
            .storage()
            .fetchone(sql, &[&collection.name(), &parent.name(), &child.name()])?
            .ok_or(EngineError::NotFound { kind: "collection", name: collection.name().to_string() })?;
        Ok(first_i64(&row))
    }

    pub fn check_category_exists(&self, class: Class, name: &str) -> Result<bool> {
        let class_id = self.get_class_id(class)?;
        let row = self.storage().fetchone(
            "SELECT 1 FROM t_category WHERE name = ? AND class_id = ?",
            &[&name, &class_id],
        )?;
        Ok(row.is_some())
    }

    pub fn get_category_id(&self, class: Class, name: &str) -> Result<i64> {
        let sql = "SELECT category_id FROM t_category \
                    LEFT JOIN t_class ON t_class.class_id = t_category.class_id \
                    WHERE t_category.name = ? AND t_class.name = ?";
        let row = self
            .storage()
            .fetchone(sql, &[&name, &class.name()])?
            .ok_or(EngineError::NotFound { kind: "category", name: name.to_string() })?;
        Ok(first_i64(&row))
    }

    pub fn get_category_max_id(&self, class: Class) -> Result<i64> {
        let sql = "SELECT max(rank) FROM t_category \
                    LEFT JOIN t_class ON t_class.class_id = t_category.class_id \
                    WHERE t_class.name = ?";
        let row = self.storage().fetchone(sql, &[&class.name()])?;
        Ok(row.and_then(|r| match &r[0] {
            SqlValue::Null => None,
            v => Some(first_i64(std::slice::from_ref(v))),
        }).unwrap_or(0))
    }

    /// Create a category, or return the id of the one that already exists
    /// for this class.
    pub fn add_category(&self, class: Class, name: &str) -> Result<i64> {
        crate::value::validate_string(name)?;
        if self.check_category_exists(class, name)? {
            return self.get_category_id(class, name);
        }
        let class_id = self.get_class_id(class)?;
        let rank = self.get_category_max_id(class)?.max(1);
        self.storage().execute(
            "INSERT INTO t_category (class_id, name, rank) VALUES (?, ?, ?)",
            &[&class_id, &name, &rank],
        )?;
        Ok(self.storage().last_insert_rowid())
    }

    pub fn check_object_exists(&self, class: Class, name: &str) -> Result<bool> {
        let class_id = self.get_class_id(class)?;
        let row = self
            .storage()
            .fetchone("SELECT 1 FROM t_object WHERE name = ? AND class_id = ?", &[&name, &class_id])?;
        Ok(row.is_some())
    }

    pub fn get_object_id(&self, class: Class, name: &str, category: Option<&str>) -> Result<i64> {
        let mut sql = "SELECT object_id FROM t_object obj \
                        LEFT JOIN t_class ON t_class.class_id = obj.class_id \
                        WHERE obj.name = ? AND t_class.name = ?"
            .to_string();
        let category_id;
        let row = if let Some(category) = category {
            category_id = self.get_category_id(class, category)?;
            sql.push_str(" AND obj.category_id = ?");
            self.storage().fetchone(&sql, &[&name, &class.name(), &category_id])?
        } else {
            self.storage().fetchone(&sql, &[&name, &class.name()])?
        };
        let row = row.ok_or(EngineError::NotFound { kind: "object", name: name.to_string() })?;
        Ok(first_i64(&row))
    }

    pub fn get_objects_id(&self, names: &[String], class: Class) -> Result<Vec<i64>> {
        let class_id = self.get_class_id(class)?;
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!("SELECT object_id FROM t_object WHERE name IN ({placeholders}) AND class_id = ?");
        let mut params: Vec<&dyn rusqlite::ToSql> = names.iter().map(|n| n as &dyn rusqlite::ToSql).collect();
        params.push(&class_id);
        let rows = self.storage().query(&sql, &params)?;
        if rows.is_empty() {
            return Err(EngineError::NotFound { kind: "object", name: names.join(", ") });
        }
        Ok(rows.iter().map(|r| first_i64(r)).collect())
    }

    pub fn get_property_id(&self, property_name: &str, collection: Collection, parent: Class, child: Class) -> Result<i64> {
        let collection_id = self.get_collection_id(collection, parent, child)?;
        let row = self
            .storage()
            .fetchone(
                "SELECT property_id FROM t_property WHERE name = ? AND collection_id = ?",
                &[&property_name, &collection_id],
            )?
            .ok_or(EngineError::NotFound { kind: "property", name: property_name.to_string() })?;
        Ok(first_i64(&row))
    }

    pub fn get_membership_id(&self, parent_name: &str, child_name: &str, collection: Collection) -> Result<i64> {
        let sql = "SELECT membership_id FROM t_membership memberships \
                    LEFT JOIN t_object parent_object ON parent_object.object_id = memberships.parent_object_id \
                    LEFT JOIN t_object child_object ON child_object.object_id = memberships.child_object_id \
                    LEFT JOIN t_collection collection ON collection.collection_id = memberships.collection_id \
                    WHERE parent_object.name = ? AND child_object.name = ? AND collection.name = ?";
        let row = self
            .storage()
            .fetchone(sql, &[&parent_name, &child_name, &collection.name()])?
            .ok_or(EngineError::NotFound { kind: "membership", name: format!("{parent_name} -> {child_name}") })?;
        Ok(first_i64(&row))
    }

    pub fn check_scenario_exists(&self, name: &str) -> Result<bool> {
        let class_id = self.get_class_id(Class::Scenario)?;
        let row = self
            .storage()
            .fetchone("SELECT 1 FROM t_object WHERE name = ? AND class_id = ?", &[&name, &class_id])?;
        Ok(row.is_some())
    }

    pub fn get_scenario_id(&self, name: &str) -> Result<i64> {
        self.get_object_id(Class::Scenario, name, None)
    }

    /// Create a scenario object (class [`Class::Scenario`], collection
    /// [`Collection::Scenarios`]); fails with a name error if one already
    /// exists under that name.
    pub fn add_scenario(&self, name: &str, category: Option<&str>) -> Result<i64> {
        if self.check_scenario_exists(name)? {
            return Err(EngineError::NameError {
                name: name.to_string(),
                context: "a scenario with this name already exists".to_string(),
            });
        }
        self.add_object(Class::Scenario, name, category, None, Some(Collection::Scenarios))
    }

    pub fn get_attribute_id(&self, class: Class, name: &str) -> Result<i64> {
        let sql = "SELECT attribute_id FROM t_attribute \
                    LEFT JOIN t_class ON t_class.class_id = t_attribute.class_id \
                    WHERE t_attribute.name = ? AND t_class.name = ?";
        let row = self
            .storage()
            .fetchone(sql, &[&name, &class.name()])?
            .ok_or(EngineError::NotFound { kind: "attribute", name: name.to_string() })?;
        Ok(first_i64(&row))
    }

    /// Every property name admitted by `collection` between `parent` and
    /// `child`.
    pub fn list_valid_properties(&self, collection: Collection, parent: Class, child: Class) -> Result<Vec<String>> {
        let collection_id = self.get_collection_id(collection, parent, child)?;
        let rows = self
            .storage()
            .query("SELECT name FROM t_property WHERE collection_id = ?", &[&collection_id])?;
        Ok(rows.iter().map(|r| value_to_string(&r[0])).collect())
    }

    pub fn check_property_exists(&self, collection: Collection, child: Class, names: &[&str], parent: Option<Class>) -> Result<bool> {
        let valid = self.list_valid_properties(collection, parent.unwrap_or(Class::System), child)?;
        Ok(names.iter().all(|n| valid.iter().any(|v| v == n)))
    }

    /// True if `name` (of `class`) has at least one property row matching
    /// the given filters.
    pub fn has_properties(&self, class: Class, name: &str, collection: Option<Collection>, category: Option<&str>) -> Result<bool> {
        let collection = match collection {
            Some(c) => c,
            None => default_collection_for(class)?,
        };
        let _ = collection; // resolved for parity with upstream; filtering happens via name/category only here
        let mut sql = "SELECT 1 FROM t_object o \
                        JOIN t_class c ON o.class_id = c.class_id \
                        JOIN t_category cat ON o.category_id = cat.category_id \
                        JOIN t_membership m ON m.child_object_id = o.object_id \
                        JOIN t_data d ON d.membership_id = m.membership_id \
                        JOIN t_property p ON d.property_id = p.property_id \
                        WHERE o.name = ?"
            .to_string();
        let category_id;
        let row = if let Some(category) = category {
            if !self.check_category_exists(class, category)? {
                return Err(EngineError::NotFound { kind: "category", name: category.to_string() });
            }
            category_id = self.get_category_id(class, category)?;
            sql.push_str(" AND cat.category_id = ? LIMIT 1");
            self.storage().fetchone(&sql, &[&name, &category_id])?
        } else {
            sql.push_str(" LIMIT 1");
            self.storage().fetchone(&sql, &[&name])?
        };
        Ok(row.is_some())
    }

    /// The id of `name`'s (of `class`) system membership, i.e. the
    /// membership whose parent class is `System`.
    pub fn get_system_membership_id(&self, class: Class, name: &str) -> Result<i64> {
        let object_id = self.get_object_id(class, name, None)?;
        let sql = "SELECT mem.membership_id FROM t_membership mem \
                    LEFT JOIN t_class parent_class ON mem.parent_class_id = parent_class.class_id \
                    WHERE mem.child_object_id = ? AND parent_class.name = 'System' LIMIT 1";
        let row = self
            .storage()
            .fetchone(sql, &[&object_id])?
            .ok_or(EngineError::NotFound { kind: "membership", name: format!("system membership for {name}") })?;
        Ok(first_i64(&row))
    }

    /// All non-system memberships involving `name` (of `class`).
    pub fn get_object_memberships(&self, class: Class, name: &str, include_system: bool) -> Result<Vec<MembershipRow>> {
        let object_id = self.get_object_id(class, name, None)?;
        let mut sql = "SELECT mem.membership_id, parent_object.name, child_object.name, \
                        parent_class.name, child_class.name, collections.name \
                        FROM t_membership mem \
                        INNER JOIN t_object parent_object ON mem.parent_object_id = parent_object.object_id \
                        INNER JOIN t_object child_object ON mem.child_object_id = child_object.object_id \
                        LEFT JOIN t_class parent_class ON mem.parent_class_id = parent_class.class_id \
                        LEFT JOIN t_class child_class ON mem.child_class_id = child_class.class_id \
                        LEFT JOIN t_collection collections ON mem.collection_id = collections.collection_id \
                        WHERE (child_object.object_id = ? OR parent_object.object_id = ?)"
            .to_string();
        if !include_system {
            sql.push_str(" AND parent_class.name <> 'System'");
        }
        let rows = self.storage().query(&sql, &[&object_id, &object_id])?;
        Ok(rows
            .into_iter()
            .map(|row| MembershipRow {
                membership_id: first_i64(&row[0..1]),
                parent_name: value_to_string(&row[1]),
                child_name: value_to_string(&row[2]),
                parent_class: value_to_string(&row[3]),
                child_class: value_to_string(&row[4]),
                collection: value_to_string(&row[5]),
            })
            .collect())
    }
}

/// One row of [`Engine::get_object_memberships`].
#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub membership_id: i64,
    pub parent_name: String,
    pub child_name: String,
    pub parent_class: String,
    pub child_class: String,
    pub collection: String,
}
