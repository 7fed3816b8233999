//! Common test utilities for plexus-store tests.
//!
//! Tests exercise `Engine` only through its public API, the same as any
//! downstream consumer, so catalog rows are seeded the way a real database
//! gets them: imported from a small `MasterDataSet` fixture.

use std::io::Write;

use plexus_store::{Class, Collection, Engine};

const FIXTURE: &str = r#"<MasterDataSet xmlns="http://tempuri.org/MasterDataSet.xsd">
    <t_class><class_id>1</class_id><name>System</name></t_class>
    <t_class><class_id>2</class_id><name>Generator</name></t_class>
    <t_class><class_id>3</class_id><name>Fuel</name></t_class>
    <t_class><class_id>4</class_id><name>Scenario</name></t_class>
    <t_collection><collection_id>1</collection_id><name>Generators</name><parent_class_id>1</parent_class_id><child_class_id>2</child_class_id></t_collection>
    <t_collection><collection_id>2</collection_id><name>Fuels</name><parent_class_id>2</parent_class_id><child_class_id>3</child_class_id></t_collection>
    <t_collection><collection_id>3</collection_id><name>Scenarios</name><parent_class_id>1</parent_class_id><child_class_id>4</child_class_id></t_collection>
    <t_property><property_id>1</property_id><name>Max Capacity</name><collection_id>1</collection_id></t_property>
    <t_property><property_id>2</property_id><name>Price</name><collection_id>2</collection_id></t_property>
    <t_category><category_id>1</category_id><name>-</name><class_id>1</class_id><rank>1</rank></t_category>
    <t_category><category_id>2</category_id><name>-</name><class_id>2</class_id><rank>1</rank></t_category>
    <t_category><category_id>3</category_id><name>-</name><class_id>3</class_id><rank>1</rank></t_category>
    <t_category><category_id>4</category_id><name>-</name><class_id>4</class_id><rank>1</rank></t_category>
    <t_object><object_id>1</object_id><name>System</name><class_id>1</class_id><category_id>1</category_id><GUID>sys</GUID></t_object>
</MasterDataSet>"#;

/// An engine with a minimal catalog (System/Generator/Fuel/Scenario
/// classes, their collections and one property each, and the root System
/// object) loaded through the same XML import path a real model uses.
pub fn seeded_engine() -> Engine {
    let mut file = tempfile::NamedTempFile::new().expect("create fixture file");
    file.write_all(FIXTURE.as_bytes()).expect("write fixture");
    Engine::from_xml(file.path(), None).expect("import fixture")
}

pub const GENERATOR: Class = Class::Generator;
pub const FUEL: Class = Class::Fuel;
pub const GENERATORS: Collection = Collection::Generators;
pub const FUELS: Collection = Collection::Fuels;
