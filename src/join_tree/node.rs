//! Join node model.
//!
//! Nodes live in the arena of their [`JoinTree`](super::JoinTree) and refer to
//! each other by [`NodeId`]. Each non-root node is one SQL join step and falls
//! in one of three kinds:
//! - relation: a one-to-one or one-to-many edge to another mapped entity
//! - merge: columns completing the parent's bean (inheritance, secondary table)
//! - passive: a plain SQL join with an optional row listener, builds nothing

use crate::mapping::inflater::{EntityInflater, EntityMerger};
use crate::mapping::relation::{DuplicateKeyFn, JoinRowListener, RelationFixer};
use crate::mapping::table::{Column, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of a join node, unique within a tree and kept by projection, so that
/// it also locates "the same" join across trees of one forest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JoinNodeName(String);

impl JoinNodeName {
    pub const ROOT: &'static str = "ROOT";

    pub fn new(name: impl Into<String>) -> Self {
        JoinNodeName(name.into())
    }

    pub fn root() -> Self {
        JoinNodeName(Self::ROOT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinNodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arena index of a node inside its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    Outer,
}

/// Join condition: `parent.left_column = node.right_column`
#[derive(Debug, Clone)]
pub struct JoinLink {
    pub left_column: Column,
    pub right_column: Column,
    pub join_type: JoinType,
}

#[derive(Debug, Clone)]
pub struct RootJoin {
    pub inflater: Arc<dyn EntityInflater>,
}

#[derive(Clone)]
pub struct RelationJoin {
    pub link: JoinLink,
    pub inflater: Arc<dyn EntityInflater>,
    pub fixer: RelationFixer,
    /// Columns selected on top of the inflater's ones
    pub extra_columns: Vec<Column>,
    pub duplicate_key: Option<DuplicateKeyFn>,
}

impl fmt::Debug for RelationJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationJoin")
            .field("link", &self.link)
            .field("entity_type", &self.inflater.entity_type())
            .field("fixer", &self.fixer)
            .field("extra_columns", &self.extra_columns)
            .field("duplicate_key", &self.duplicate_key.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MergeJoin {
    pub link: JoinLink,
    pub merger: Arc<dyn EntityMerger>,
}

#[derive(Clone)]
pub struct PassiveJoin {
    pub link: JoinLink,
    pub columns: Vec<Column>,
    pub listener: Option<JoinRowListener>,
}

impl fmt::Debug for PassiveJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassiveJoin")
            .field("link", &self.link)
            .field("columns", &self.columns)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum JoinKind {
    Root(RootJoin),
    Relation(RelationJoin),
    Merge(MergeJoin),
    Passive(PassiveJoin),
}

impl JoinKind {
    pub fn label(&self) -> &'static str {
        match self {
            JoinKind::Root(_) => "root",
            JoinKind::Relation(_) => "relation",
            JoinKind::Merge(_) => "merge",
            JoinKind::Passive(_) => "passive",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinNode {
    pub(crate) name: JoinNodeName,
    pub(crate) table: Arc<Table>,
    pub(crate) alias: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) excluded_from_ddl: bool,
    pub(crate) kind: JoinKind,
}

impl JoinNode {
    pub fn name(&self) -> &JoinNodeName {
        &self.name
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn kind(&self) -> &JoinKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, JoinKind::Root(_))
    }

    pub fn is_excluded_from_ddl(&self) -> bool {
        self.excluded_from_ddl
    }

    /// Join condition, `None` for the root
    pub fn link(&self) -> Option<&JoinLink> {
        match &self.kind {
            JoinKind::Root(_) => None,
            JoinKind::Relation(relation) => Some(&relation.link),
            JoinKind::Merge(merge) => Some(&merge.link),
            JoinKind::Passive(passive) => Some(&passive.link),
        }
    }

    pub(crate) fn link_mut(&mut self) -> Option<&mut JoinLink> {
        match &mut self.kind {
            JoinKind::Root(_) => None,
            JoinKind::Relation(relation) => Some(&mut relation.link),
            JoinKind::Merge(merge) => Some(&mut merge.link),
            JoinKind::Passive(passive) => Some(&mut passive.link),
        }
    }

    /// Columns this node adds to the select clause
    pub fn selectable_columns(&self) -> Vec<Column> {
        match &self.kind {
            JoinKind::Root(root) => root.inflater.selectable_columns(),
            JoinKind::Relation(relation) => {
                let mut columns = relation.inflater.selectable_columns();
                for extra in &relation.extra_columns {
                    if !columns.iter().any(|c| c.id() == extra.id()) {
                        columns.push(extra.clone());
                    }
                }
                columns
            }
            JoinKind::Merge(merge) => merge.merger.selectable_columns(),
            JoinKind::Passive(passive) => passive.columns.clone(),
        }
    }
}

/// Parameters of a relation join
pub struct RelationJoinSpec {
    pub table: Arc<Table>,
    pub inflater: Arc<dyn EntityInflater>,
    pub left_column: Column,
    pub right_column: Column,
    pub alias: Option<String>,
    pub join_type: JoinType,
    pub fixer: RelationFixer,
    pub extra_columns: Vec<Column>,
    pub duplicate_key: Option<DuplicateKeyFn>,
}

impl RelationJoinSpec {
    /// Outer relation join without alias, extra columns or custom duplicate key
    pub fn new(
        table: Arc<Table>,
        inflater: Arc<dyn EntityInflater>,
        left_column: Column,
        right_column: Column,
        fixer: RelationFixer,
    ) -> Self {
        Self {
            table,
            inflater,
            left_column,
            right_column,
            alias: None,
            join_type: JoinType::Outer,
            fixer,
            extra_columns: Vec::new(),
            duplicate_key: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn extra_columns(mut self, columns: Vec<Column>) -> Self {
        self.extra_columns = columns;
        self
    }

    pub fn duplicate_key(mut self, key: DuplicateKeyFn) -> Self {
        self.duplicate_key = Some(key);
        self
    }
}

/// Parameters of a merge join
pub struct MergeJoinSpec {
    pub table: Arc<Table>,
    pub merger: Arc<dyn EntityMerger>,
    pub left_column: Column,
    pub right_column: Column,
    pub alias: Option<String>,
    pub join_type: JoinType,
}

impl MergeJoinSpec {
    /// Inner merge join without alias
    pub fn new(
        table: Arc<Table>,
        merger: Arc<dyn EntityMerger>,
        left_column: Column,
        right_column: Column,
    ) -> Self {
        Self {
            table,
            merger,
            left_column,
            right_column,
            alias: None,
            join_type: JoinType::Inner,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }
}

/// Parameters of a passive join
pub struct PassiveJoinSpec {
    pub table: Arc<Table>,
    pub left_column: Column,
    pub right_column: Column,
    pub alias: Option<String>,
    pub join_type: JoinType,
    pub columns: Vec<Column>,
    pub listener: Option<JoinRowListener>,
}

impl PassiveJoinSpec {
    /// Outer passive join selecting nothing and notifying nobody
    pub fn new(table: Arc<Table>, left_column: Column, right_column: Column) -> Self {
        Self {
            table,
            left_column,
            right_column,
            alias: None,
            join_type: JoinType::Outer,
            columns: Vec::new(),
            listener: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn listener(mut self, listener: JoinRowListener) -> Self {
        self.listener = Some(listener);
        self
    }
}
