use super::consumer::{ConsumerNode, RootConsumer};
use super::context::TreeInflationContext;
use super::errors::HydrationError;
use super::row::{Row, RowDecoder};
use crate::join_tree::JoinTree;
use crate::mapping::entity::{EntityRef, EntitySet};
use crate::query_builder::QueryMapping;
use std::collections::VecDeque;

/// Turns the flat rows of a join tree select into a deduplicated bean graph.
///
/// The inflater itself is immutable and can serve concurrent loads: all
/// per-load state lives in a [`TreeInflationContext`] created by each call.
pub struct TreeInflater {
    root: RootConsumer,
    consumers: Vec<ConsumerNode>,
    row_decoder: RowDecoder,
}

impl TreeInflater {
    /// Mirror the tree with consumers bound to the query's column aliases.
    /// Fails if `mapping` lacks aliases for one of the tree's nodes.
    pub fn new(tree: &JoinTree, mapping: &QueryMapping) -> Result<Self, HydrationError> {
        let row_decoder = RowDecoder::from_mapping(mapping);
        let root = RootConsumer::build(tree, &row_decoder)?;
        let consumers = ConsumerNode::build_children(tree, tree.root(), &row_decoder)?;
        Ok(Self {
            root,
            consumers,
            row_decoder,
        })
    }

    pub fn row_decoder(&self) -> &RowDecoder {
        &self.row_decoder
    }

    /// Hydrate an in-memory row stream
    pub fn transform<I>(&self, rows: I, expected_size: usize) -> Result<EntitySet, HydrationError>
    where
        I: IntoIterator<Item = Row>,
    {
        self.try_transform(rows.into_iter().map(Ok), expected_size)
    }

    /// Hydrate a fallible row stream, such as a database cursor. The first
    /// error aborts the whole call; no partial result is returned.
    pub fn try_transform<I, E>(&self, rows: I, expected_size: usize) -> Result<EntitySet, E>
    where
        I: IntoIterator<Item = Result<Row, E>>,
        E: From<HydrationError>,
    {
        let mut context = TreeInflationContext::new(&self.row_decoder);
        let mut result = EntitySet::with_capacity(expected_size);
        for row in rows {
            let row = row?;
            context.row_read();
            if let Some(bean) = self.transform_row(&row, &mut context)? {
                result.insert(bean);
            }
        }
        log::debug!(
            "Hydrated {} rows into {} root beans ({} beans, {} relations)",
            context.rows_read(),
            result.len(),
            context.entity_count(),
            context.treated_relation_count()
        );
        Ok(result)
    }

    fn transform_row(
        &self,
        row: &Row,
        context: &mut TreeInflationContext<'_>,
    ) -> Result<Option<EntityRef>, HydrationError> {
        let Some(root_bean) = self.root.consume(row, context)? else {
            return Ok(None);
        };

        // breadth-first: a node's parent bean exists before the node runs
        let mut queue: VecDeque<(&ConsumerNode, EntityRef)> = self
            .consumers
            .iter()
            .map(|consumer| (consumer, root_bean.clone()))
            .collect();
        while let Some((node, current)) = queue.pop_front() {
            if let Some(next) = node.consume(row, current, context)? {
                queue.extend(node.children.iter().map(|child| (child, next.clone())));
            }
        }
        Ok(Some(root_bean))
    }
}
