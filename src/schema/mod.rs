//! The static catalog of table names, entity kinds, and relationship kinds.
//!
//! Everything here is a closed enumeration fixed at compile time: classes
//! and collections never come from user input, only from this module's
//! variants, so mismatched names are caught by the compiler rather than by
//! a runtime lookup miss.

use crate::error::{EngineError, Result};

/// One entry of the schema catalog: a table name paired with the name of
/// its id (primary key) column, if it has a conventional one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub table: &'static str,
    pub id_column: Option<&'static str>,
}

macro_rules! schema_catalog {
    ($($variant:ident => ($table:literal, $id:expr)),+ $(,)?) => {
        /// Every table the store's DDL creates, addressable by a stable name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum SchemaEntry {
            $($variant),+
        }

        impl SchemaEntry {
            pub const ALL: &'static [SchemaEntry] = &[$(SchemaEntry::$variant),+];

            pub fn descriptor(self) -> Schema {
                match self {
                    $(SchemaEntry::$variant => Schema { table: $table, id_column: $id }),+
                }
            }
        }
    };
}

schema_catalog! {
    Attributes => ("t_attribute", Some("attribute_id")),
    AttributeData => ("t_attribute_data", Some("attribute_id")),
    Class => ("t_class", Some("class_id")),
    ClassGroup => ("t_class_group", Some("class_group_id")),
    Objects => ("t_object", Some("object_id")),
    Categories => ("t_category", Some("category_id")),
    Collection => ("t_collection", Some("collection_id")),
    CollectionReport => ("t_collection_report", None),
    Memberships => ("t_membership", Some("membership_id")),
    Property => ("t_property", Some("property_id")),
    PropertyGroup => ("t_property_group", Some("property_group_id")),
    PropertyReport => ("t_property_report", None),
    PropertyTag => ("t_property_tag", None),
    Data => ("t_data", Some("data_id")),
    Band => ("t_band", Some("band_id")),
    Report => ("t_report", None),
    DateFrom => ("t_date_from", None),
    DateTo => ("t_date_to", None),
    MemoData => ("t_memo_data", None),
    Message => ("t_message", None),
    Action => ("t_action", None),
    Config => ("t_config", None),
    Tags => ("t_tag", Some("tag_id")),
    Text => ("t_text", Some("text_id")),
    Units => ("t_unit", Some("unit_id")),
}

/// Look up a [`SchemaEntry`] by its table name.
pub fn str_to_schema(table: &str) -> Option<SchemaEntry> {
    SchemaEntry::ALL
        .iter()
        .copied()
        .find(|entry| entry.descriptor().table == table)
}

/// An entity kind. The string each variant carries is the catalog name
/// stored in `t_class.name` and used verbatim in XML output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    System,
    Generator,
    Fuel,
    Battery,
    Storage,
    Emission,
    Reserve,
    Region,
    Zone,
    Node,
    Line,
    Transformer,
    Interface,
    DataFile,
    Timeslice,
    Scenario,
    Model,
    Horizon,
    Report,
    Pasa,
    MtSchedule,
    StSchedule,
    Transmission,
    Diagnostic,
    Production,
    Performance,
    Variable,
    Constraint,
}

impl Class {
    pub fn name(self) -> &'static str {
        match self {
            Class::System => "System",
            Class::Generator => "Generator",
            Class::Fuel => "Fuel",
            Class::Battery => "Battery",
            Class::Storage => "Storage",
            Class::Emission => "Emission",
            Class::Reserve => "Reserve",
            Class::Region => "Region",
            Class::Zone => "Zone",
            Class::Node => "Node",
            Class::Line => "Line",
            Class::Transformer => "Transformer",
            Class::Interface => "Interface",
            Class::DataFile => "Data File",
            Class::Timeslice => "Timeslice",
            Class::Scenario => "Scenario",
            Class::Model => "Model",
            Class::Horizon => "Horizon",
            Class::Report => "Report",
            Class::Pasa => "PASA",
            Class::MtSchedule => "MTSchedule",
            Class::StSchedule => "STSchedule",
            Class::Transmission => "Transmission",
            Class::Diagnostic => "Diagnostic",
            Class::Production => "Production",
            Class::Performance => "Performance",
            Class::Variable => "Variable",
            Class::Constraint => "Constraint",
        }
    }

    pub fn from_name(name: &str) -> Option<Class> {
        Some(match name {
            "System" => Class::System,
            "Generator" => Class::Generator,
            "Fuel" => Class::Fuel,
            "Battery" => Class::Battery,
            "Storage" => Class::Storage,
            "Emission" => Class::Emission,
            "Reserve" => Class::Reserve,
            "Region" => Class::Region,
            "Zone" => Class::Zone,
            "Node" => Class::Node,
            "Line" => Class::Line,
            "Transformer" => Class::Transformer,
            "Interface" => Class::Interface,
            "Data File" => Class::DataFile,
            "Timeslice" => Class::Timeslice,
            "Scenario" => Class::Scenario,
            "Model" => Class::Model,
            "Horizon" => Class::Horizon,
            "Report" => Class::Report,
            "PASA" => Class::Pasa,
            "MTSchedule" => Class::MtSchedule,
            "STSchedule" => Class::StSchedule,
            "Transmission" => Class::Transmission,
            "Diagnostic" => Class::Diagnostic,
            "Production" => Class::Production,
            "Performance" => Class::Performance,
            "Variable" => Class::Variable,
            "Constraint" => Class::Constraint,
            _ => return None,
        })
    }
}

/// A relationship kind: "this collection admits these properties between a
/// parent of this kind and a child of this kind."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Generators,
    Fuels,
    HeadStorage,
    TailStorage,
    Nodes,
    Storages,
    Emissions,
    Reserves,
    Batteries,
    Regions,
    Zones,
    Region,
    Zone,
    Lines,
    NodeFrom,
    NodeTo,
    Transformers,
    Interfaces,
    Models,
    Scenario,
    Scenarios,
    Horizon,
    Horizons,
    Report,
    Reports,
    ReferenceNode,
    Pasa,
    MtSchedule,
    StSchedule,
    Transmission,
    Production,
    Diagnostic,
    Diagnostics,
    Performance,
    DataFiles,
    Constraint,
    Constraints,
    Variables,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Generators => "Generators",
            Collection::Fuels => "Fuels",
            Collection::HeadStorage => "HeadStorage",
            Collection::TailStorage => "TailStorage",
            Collection::Nodes => "Nodes",
            Collection::Storages => "Storages",
            Collection::Emissions => "Emissions",
            Collection::Reserves => "Reserves",
            Collection::Batteries => "Batteries",
            Collection::Regions => "Regions",
            Collection::Zones => "Zones",
            Collection::Region => "Region",
            Collection::Zone => "Zone",
            Collection::Lines => "Lines",
            Collection::NodeFrom => "NodeFrom",
            Collection::NodeTo => "NodeTo",
            Collection::Transformers => "Transformers",
            Collection::Interfaces => "Interfaces",
            Collection::Models => "Models",
            Collection::Scenario => "Scenario",
            Collection::Scenarios => "Scenarios",
            Collection::Horizon => "Horizon",
            Collection::Horizons => "Horizons",
            Collection::Report => "Report",
            Collection::Reports => "Reports",
            Collection::ReferenceNode => "ReferenceNode",
            Collection::Pasa => "PASA",
            Collection::MtSchedule => "MTSchedule",
            Collection::StSchedule => "STSchedule",
            Collection::Transmission => "Transmission",
            Collection::Production => "Production",
            Collection::Diagnostic => "Diagnostic",
            Collection::Diagnostics => "Diagnostics",
            Collection::Performance => "Performance",
            Collection::DataFiles => "DataFiles",
            Collection::Constraint => "Constraint",
            Collection::Constraints => "Constraints",
            Collection::Variables => "Variables",
        }
    }

    pub fn from_name(name: &str) -> Option<Collection> {
        Some(match name {
            "Generators" => Collection::Generators,
            "Fuels" => Collection::Fuels,
            "HeadStorage" => Collection::HeadStorage,
            "TailStorage" => Collection::TailStorage,
            "Nodes" => Collection::Nodes,
            "Storages" => Collection::Storages,
            "Emissions" => Collection::Emissions,
            "Reserves" => Collection::Reserves,
            "Batteries" => Collection::Batteries,
            "Regions" => Collection::Regions,
            "Zones" => Collection::Zones,
            "Region" => Collection::Region,
            "Zone" => Collection::Zone,
            "Lines" => Collection::Lines,
            "NodeFrom" => Collection::NodeFrom,
            "NodeTo" => Collection::NodeTo,
            "Transformers" => Collection::Transformers,
            "Interfaces" => Collection::Interfaces,
            "Models" => Collection::Models,
            "Scenario" => Collection::Scenario,
            "Scenarios" => Collection::Scenarios,
            "Horizon" => Collection::Horizon,
            "Horizons" => Collection::Horizons,
            "Report" => Collection::Report,
            "Reports" => Collection::Reports,
            "ReferenceNode" => Collection::ReferenceNode,
            "PASA" => Collection::Pasa,
            "MTSchedule" => Collection::MtSchedule,
            "STSchedule" => Collection::StSchedule,
            "Transmission" => Collection::Transmission,
            "Production" => Collection::Production,
            "Diagnostic" => Collection::Diagnostic,
            "Diagnostics" => Collection::Diagnostics,
            "Performance" => Collection::Performance,
            "DataFiles" => Collection::DataFiles,
            "Constraint" => Collection::Constraint,
            "Constraints" => Collection::Constraints,
            "Variables" => Collection::Variables,
            _ => return None,
        })
    }
}

/// The conventional collection used when auto-creating a system membership
/// for an object of `class`.
///
/// The rule is literal pluralization of the class name (`"{class}s"`),
/// falling back to the bare class name when the pluralized form isn't a
/// known collection, with one hardcoded exception (`DataFile`). This is a
/// naive rule inherited unchanged from upstream: it has no entry that
/// resolves to `Collection::Batteries` (the naive concatenation produces
/// "Batterys", not "Batteries"), so callers adding a `Battery` object must
/// pass an explicit collection rather than relying on this default.
pub fn default_collection_for(class: Class) -> Result<Collection> {
    if class == Class::DataFile {
        return Ok(Collection::DataFiles);
    }
    let plural = format!("{}s", class.name());
    if let Some(coll) = Collection::from_name(&plural) {
        return Ok(coll);
    }
    if let Some(coll) = Collection::from_name(class.name()) {
        return Ok(coll);
    }
    Err(EngineError::NotFound {
        kind: "collection",
        name: format!("default collection for class '{}'", class.name()),
    })
}
