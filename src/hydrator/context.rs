use super::errors::HydrationError;
use super::row::{ColumnDecoder, Row, RowDecoder, RowView};
use crate::join_tree::JoinNodeName;
use crate::mapping::entity::{EntityKey, EntityRef};
use crate::mapping::table::Column;
use crate::mapping::value::{EntityIdentifier, Value};
use std::collections::{HashMap, HashSet};

/// A relation edge wired during one load: (parent bean, child type, child id,
/// relation node). The parent is compared by reference, not by content, since
/// its content is still being assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationIdentifier {
    root: EntityKey,
    related_type: String,
    related_identifier: EntityIdentifier,
    node: JoinNodeName,
}

impl RelationIdentifier {
    pub fn new(
        root: &EntityRef,
        related_type: impl Into<String>,
        related_identifier: EntityIdentifier,
        node: JoinNodeName,
    ) -> Self {
        Self {
            root: root.key(),
            related_type: related_type.into(),
            related_identifier,
            node,
        }
    }
}

/// Key recorded in the treated-relations set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TreatedRelation {
    Relation(RelationIdentifier),
    /// Result of a relation's custom duplicate-key function
    Custom { node: JoinNodeName, key: Vec<Value> },
}

/// State of one hydration call. Created fresh by every
/// [`TreeInflater::transform`](super::TreeInflater::transform) and dropped at
/// its end; never shared between calls.
pub struct TreeInflationContext<'a> {
    entity_cache: HashMap<(String, EntityIdentifier), EntityRef>,
    treated_relations: HashSet<TreatedRelation>,
    row_decoder: &'a RowDecoder,
    rows_read: usize,
}

impl<'a> TreeInflationContext<'a> {
    pub fn new(row_decoder: &'a RowDecoder) -> Self {
        Self {
            entity_cache: HashMap::new(),
            treated_relations: HashSet::new(),
            row_decoder,
            rows_read: 0,
        }
    }

    /// Cached bean of that type and identifier, or the one built by `factory`
    pub fn compute_if_absent(
        &mut self,
        entity_type: &str,
        identifier: &EntityIdentifier,
        factory: impl FnOnce() -> Result<EntityRef, HydrationError>,
    ) -> Result<EntityRef, HydrationError> {
        let key = (entity_type.to_string(), identifier.clone());
        if let Some(existing) = self.entity_cache.get(&key) {
            return Ok(existing.clone());
        }
        let created = factory()?;
        log::trace!("Created {}#{}", entity_type, identifier);
        self.entity_cache.insert(key, created.clone());
        Ok(created)
    }

    pub fn cached(&self, entity_type: &str, identifier: &EntityIdentifier) -> Option<&EntityRef> {
        self.entity_cache
            .get(&(entity_type.to_string(), identifier.clone()))
    }

    /// Mark a relation as wired, returns false if it already was
    pub fn mark_as_treated(&mut self, relation: TreatedRelation) -> bool {
        self.treated_relations.insert(relation)
    }

    pub fn is_treated(&self, relation: &TreatedRelation) -> bool {
        self.treated_relations.contains(relation)
    }

    pub fn row_view<'r>(&'r self, row: &'r Row, decoder: &'r ColumnDecoder) -> RowView<'r> {
        RowView::new(row, decoder, self.row_decoder)
    }

    /// Out-of-band lookup of any node's column in the given row
    pub fn give_value<'r>(
        &self,
        row: &'r Row,
        node: &JoinNodeName,
        column: &Column,
    ) -> Result<&'r Value, HydrationError> {
        self.row_decoder.get(row, node, column)
    }

    pub(crate) fn row_read(&mut self) {
        self.rows_read += 1;
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn entity_count(&self) -> usize {
        self.entity_cache.len()
    }

    pub fn treated_relation_count(&self) -> usize {
        self.treated_relations.len()
    }
}
