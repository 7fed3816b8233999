//! Bridges the relational store and the vendor XML serialization.
//!
//! Parsing builds a tag-indexed in-memory cache ([`reader::XmlDataSet`]);
//! writing walks the live database table-by-table and streams a flat
//! element tree ([`writer::write_master_dataset`]).

pub mod reader;
pub mod writer;

pub const NAMESPACE: &str = "http://tempuri.org/MasterDataSet.xsd";
pub const ROOT_TAG: &str = "MasterDataSet";

pub use reader::XmlDataSet;
pub use writer::write_master_dataset;
