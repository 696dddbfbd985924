//! Relation wiring and the other per-join callbacks supplied by configuration.

use super::entity::EntityRef;
use super::value::Value;
use crate::hydrator::errors::HydrationError;
use crate::hydrator::row::{ColumnValues, RowView};
use std::fmt;
use std::sync::Arc;

type FixerFn = dyn Fn(&EntityRef, &EntityRef) + Send + Sync;

/// Computes a custom "already wired" key for a relation from the current row.
/// Needed when several collections hang off the same parent and the default
/// (parent, child type, child id, node) key cannot tell fan-out rows apart.
pub type DuplicateKeyFn =
    Arc<dyn Fn(&RowView<'_>) -> Result<Vec<Value>, HydrationError> + Send + Sync>;

/// Notified with the parent bean and the passive join's column values
pub type JoinRowListener = Arc<dyn Fn(&EntityRef, &ColumnValues) + Send + Sync>;

/// Wires a child bean onto its parent: `(parent, child)`
#[derive(Clone)]
pub struct RelationFixer {
    apply: Arc<FixerFn>,
    description: String,
}

impl RelationFixer {
    pub fn new(
        description: impl Into<String>,
        apply: impl Fn(&EntityRef, &EntityRef) + Send + Sync + 'static,
    ) -> Self {
        Self {
            apply: Arc::new(apply),
            description: description.into(),
        }
    }

    /// One-to-one: set `parent.<property> = child`
    pub fn to_property(property: impl Into<String>) -> Self {
        let property = property.into();
        let description = format!("set {}", property);
        Self::new(description, move |parent, child| {
            parent.borrow_mut().set_reference(property.clone(), child.clone());
        })
    }

    /// One-to-many: append child to `parent.<collection>`, creating it on first use
    pub fn to_collection(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let description = format!("add to {}", collection);
        Self::new(description, move |parent, child| {
            parent
                .borrow_mut()
                .add_to_collection(&collection, child.clone());
        })
    }

    /// Also wire `child.<property>` back to the parent (weak reference)
    pub fn with_back_reference(self, property: impl Into<String>) -> Self {
        let property = property.into();
        let forward = self.apply;
        let description = format!("{} <-> {}", self.description, property);
        Self::new(description, move |parent, child| {
            forward(parent, child);
            child.borrow_mut().set_back_reference(property.clone(), parent);
        })
    }

    pub fn apply(&self, parent: &EntityRef, child: &EntityRef) {
        (self.apply)(parent, child)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for RelationFixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationFixer")
            .field("description", &self.description)
            .finish()
    }
}
