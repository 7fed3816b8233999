//! plexus-store: an in-memory-first, schema-aware relational store for
//! power-systems model databases.
//!
//! An [`Engine`] wraps a SQLite connection (`rusqlite`), resolves the
//! fixed catalog of entity/collection/property names declared in
//! [`schema`], and round-trips whole databases to the vendor XML format
//! via [`xmlcodec`].

pub mod engine;
pub mod error;
pub mod schema;
pub mod storage;
pub mod value;
pub mod xmlcodec;

pub use engine::properties::{PropertyFilter, PropertyRecord};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use schema::{Class, Collection, SchemaEntry};
pub use value::Value;
