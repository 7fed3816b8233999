//! Unit tests for plexus-store.
//!
//! This file serves as the entry point for all unit tests.

#[path = "common/mod.rs"]
mod common;

#[path = "unit/objects_tests.rs"]
mod objects_tests;

#[path = "unit/properties_tests.rs"]
mod properties_tests;

#[path = "unit/xml_roundtrip_tests.rs"]
mod xml_roundtrip_tests;

#[path = "unit/usage_tests.rs"]
mod usage_tests;
