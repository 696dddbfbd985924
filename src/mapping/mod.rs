//! Mapping model the join tree is built from: tables and columns with stable
//! identities, dynamic entity beans, column binders, inflaters, relation
//! fixers and the YAML mapping configuration.

pub mod binder;
pub mod config;
pub mod entity;
pub mod errors;
pub mod inflater;
pub mod relation;
pub mod table;
pub mod value;

pub use binder::{BindError, ColumnBinder, ColumnBinderRegistry, SqlType};
pub use config::{Mapping, MappingConfig};
pub use entity::{Entity, EntityRef, EntitySet};
pub use errors::MappingError;
pub use inflater::{EntityInflater, EntityMerger, RecordInflater, RecordMerger, RowTransformer};
pub use relation::{DuplicateKeyFn, JoinRowListener, RelationFixer};
pub use table::{Column, ColumnId, Table};
pub use value::{EntityIdentifier, Value};
