//! Row consumers mirroring the join tree one-to-one.

use super::context::{RelationIdentifier, TreatedRelation, TreeInflationContext};
use super::errors::HydrationError;
use super::row::{ColumnDecoder, ColumnValues, Row, RowDecoder};
use crate::join_tree::{JoinKind, JoinNode, JoinNodeName, JoinTree};
use crate::mapping::entity::EntityRef;
use crate::mapping::inflater::{EntityInflater, RowTransformer};
use crate::mapping::relation::{DuplicateKeyFn, JoinRowListener, RelationFixer};
use crate::mapping::table::Column;
use std::sync::Arc;

/// Creates (or fetches) the root bean of a row
pub(crate) struct RootConsumer {
    inflater: Arc<dyn EntityInflater>,
    decoder: ColumnDecoder,
    transformer: Box<dyn RowTransformer>,
}

impl RootConsumer {
    pub(crate) fn build(tree: &JoinTree, row_decoder: &RowDecoder) -> Result<Self, HydrationError> {
        let decoder = row_decoder.decoder_for(tree.root().name())?.clone();
        let inflater = Arc::clone(tree.root_inflater());
        Ok(Self {
            transformer: inflater.row_transformer(decoder.clone()),
            inflater,
            decoder,
        })
    }

    pub(crate) fn consume(
        &self,
        row: &Row,
        context: &mut TreeInflationContext<'_>,
    ) -> Result<Option<EntityRef>, HydrationError> {
        let Some(identifier) = self.inflater.extract_identifier(row, &self.decoder) else {
            return Ok(None);
        };
        context
            .compute_if_absent(self.inflater.entity_type(), &identifier, || {
                self.transformer.transform(row)
            })
            .map(Some)
    }
}

pub(crate) struct RelationConsumer {
    node: JoinNodeName,
    inflater: Arc<dyn EntityInflater>,
    decoder: ColumnDecoder,
    transformer: Box<dyn RowTransformer>,
    fixer: RelationFixer,
    duplicate_key: Option<DuplicateKeyFn>,
}

impl RelationConsumer {
    /// Returns the child bean, `None` when the row carries no child
    fn consume(
        &self,
        row: &Row,
        parent: &EntityRef,
        context: &mut TreeInflationContext<'_>,
    ) -> Result<Option<EntityRef>, HydrationError> {
        let Some(identifier) = self.inflater.extract_identifier(row, &self.decoder) else {
            return Ok(None);
        };
        let entity_type = self.inflater.entity_type();
        let child = context.compute_if_absent(entity_type, &identifier, || {
            self.transformer.transform(row)
        })?;

        let relation = match &self.duplicate_key {
            Some(duplicate_key) => TreatedRelation::Custom {
                node: self.node.clone(),
                key: duplicate_key(&context.row_view(row, &self.decoder))?,
            },
            None => TreatedRelation::Relation(RelationIdentifier::new(
                parent,
                entity_type,
                identifier.clone(),
                self.node.clone(),
            )),
        };
        if context.mark_as_treated(relation) {
            self.fixer.apply(parent, &child);
            log::trace!(
                "Wired {}#{} ({}) on join '{}'",
                entity_type,
                identifier,
                self.fixer.description(),
                self.node
            );
        }
        Ok(Some(child))
    }
}

pub(crate) struct MergeConsumer {
    transformer: Box<dyn RowTransformer>,
}

pub(crate) struct PassiveConsumer {
    columns: Vec<Column>,
    decoder: ColumnDecoder,
    listener: Option<JoinRowListener>,
}

pub(crate) enum Consumer {
    Relation(RelationConsumer),
    Merge(MergeConsumer),
    Passive(PassiveConsumer),
}

pub(crate) struct ConsumerNode {
    pub(crate) consumer: Consumer,
    pub(crate) children: Vec<ConsumerNode>,
}

impl ConsumerNode {
    /// Consumer trees for the children of `node`
    pub(crate) fn build_children(
        tree: &JoinTree,
        node: &JoinNode,
        row_decoder: &RowDecoder,
    ) -> Result<Vec<ConsumerNode>, HydrationError> {
        node.children()
            .iter()
            .filter_map(|child| tree.get(*child))
            .map(|child| Self::build(tree, child, row_decoder))
            .collect()
    }

    fn build(
        tree: &JoinTree,
        node: &JoinNode,
        row_decoder: &RowDecoder,
    ) -> Result<ConsumerNode, HydrationError> {
        let decoder = row_decoder.decoder_for(node.name())?.clone();
        let consumer = match node.kind() {
            JoinKind::Relation(relation) => Consumer::Relation(RelationConsumer {
                node: node.name().clone(),
                inflater: Arc::clone(&relation.inflater),
                transformer: relation.inflater.row_transformer(decoder.clone()),
                decoder,
                fixer: relation.fixer.clone(),
                duplicate_key: relation.duplicate_key.clone(),
            }),
            JoinKind::Merge(merge) => Consumer::Merge(MergeConsumer {
                transformer: merge.merger.row_transformer(decoder),
            }),
            JoinKind::Passive(passive) => Consumer::Passive(PassiveConsumer {
                columns: passive.columns.clone(),
                decoder,
                listener: passive.listener.clone(),
            }),
            JoinKind::Root(_) => {
                return Err(HydrationError::UnsupportedJoin {
                    name: node.name().to_string(),
                    kind: node.kind().label().to_string(),
                })
            }
        };
        Ok(ConsumerNode {
            consumer,
            children: Self::build_children(tree, node, row_decoder)?,
        })
    }

    /// Apply this node to the row; returns the bean its children hang off,
    /// `None` to stop descending this branch
    pub(crate) fn consume(
        &self,
        row: &Row,
        current: EntityRef,
        context: &mut TreeInflationContext<'_>,
    ) -> Result<Option<EntityRef>, HydrationError> {
        match &self.consumer {
            Consumer::Passive(passive) => {
                if let Some(listener) = &passive.listener {
                    let values = ColumnValues::read(&passive.columns, row, &passive.decoder);
                    listener(&current, &values);
                }
                Ok(Some(current))
            }
            Consumer::Merge(merge) => {
                merge.transformer.apply_row_to_bean(row, &current)?;
                Ok(Some(current))
            }
            Consumer::Relation(relation) => relation.consume(row, &current, context),
        }
    }
}
