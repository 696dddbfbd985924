use super::errors::JoinTreeError;
use super::node::{
    JoinKind, JoinLink, JoinNode, JoinNodeName, MergeJoin, MergeJoinSpec, NodeId, PassiveJoin,
    PassiveJoinSpec, RelationJoin, RelationJoinSpec, RootJoin,
};
use crate::mapping::inflater::EntityInflater;
use crate::mapping::table::{Column, Table};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Forest-unique tree of joins rooted at one entity.
///
/// Nodes are stored in an arena; `registry` indexes them by name. Every
/// non-root node is reachable from the root through `children` links and
/// `registry.len() == nodes.len()` at all times.
#[derive(Debug)]
pub struct JoinTree {
    id: u64,
    nodes: Vec<JoinNode>,
    registry: HashMap<JoinNodeName, NodeId>,
}

impl JoinTree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new(
        table: Arc<Table>,
        inflater: Arc<dyn EntityInflater>,
        alias: Option<String>,
    ) -> Self {
        let root = JoinNode {
            name: JoinNodeName::root(),
            table,
            alias,
            parent: None,
            children: Vec::new(),
            excluded_from_ddl: false,
            kind: JoinKind::Root(RootJoin { inflater }),
        };
        let mut registry = HashMap::new();
        registry.insert(root.name.clone(), Self::ROOT);
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: vec![root],
            registry,
        }
    }

    pub fn root(&self) -> &JoinNode {
        &self.nodes[Self::ROOT.0]
    }

    pub fn root_inflater(&self) -> &Arc<dyn EntityInflater> {
        match &self.root().kind {
            JoinKind::Root(root) => &root.inflater,
            _ => unreachable!("node 0 is always the root"),
        }
    }

    pub fn node(&self, name: &JoinNodeName) -> Option<&JoinNode> {
        self.registry.get(name).map(|id| &self.nodes[id.0])
    }

    /// Node behind `id`, `None` when the id does not index this tree
    pub fn get(&self, id: NodeId) -> Option<&JoinNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds no join besides its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.keys().map(|n| n.to_string()).collect();
        names.sort();
        names
    }

    fn resolve(&self, name: &JoinNodeName) -> Result<NodeId, JoinTreeError> {
        self.registry
            .get(name)
            .copied()
            .ok_or_else(|| JoinTreeError::UnknownNode {
                name: name.to_string(),
                known: self.node_names(),
            })
    }

    pub fn add_relation_join(
        &mut self,
        parent: &JoinNodeName,
        spec: RelationJoinSpec,
    ) -> Result<JoinNodeName, JoinTreeError> {
        let link = JoinLink {
            left_column: spec.left_column,
            right_column: spec.right_column,
            join_type: spec.join_type,
        };
        let kind = JoinKind::Relation(RelationJoin {
            link: link.clone(),
            inflater: spec.inflater,
            fixer: spec.fixer,
            extra_columns: spec.extra_columns,
            duplicate_key: spec.duplicate_key,
        });
        self.attach(parent, spec.table, spec.alias, &link, kind)
    }

    pub fn add_merge_join(
        &mut self,
        parent: &JoinNodeName,
        spec: MergeJoinSpec,
    ) -> Result<JoinNodeName, JoinTreeError> {
        let link = JoinLink {
            left_column: spec.left_column,
            right_column: spec.right_column,
            join_type: spec.join_type,
        };
        let kind = JoinKind::Merge(MergeJoin {
            link: link.clone(),
            merger: spec.merger,
        });
        self.attach(parent, spec.table, spec.alias, &link, kind)
    }

    pub fn add_passive_join(
        &mut self,
        parent: &JoinNodeName,
        spec: PassiveJoinSpec,
    ) -> Result<JoinNodeName, JoinTreeError> {
        let link = JoinLink {
            left_column: spec.left_column,
            right_column: spec.right_column,
            join_type: spec.join_type,
        };
        let kind = JoinKind::Passive(PassiveJoin {
            link: link.clone(),
            columns: spec.columns,
            listener: spec.listener,
        });
        self.attach(parent, spec.table, spec.alias, &link, kind)
    }

    fn attach(
        &mut self,
        parent: &JoinNodeName,
        table: Arc<Table>,
        alias: Option<String>,
        link: &JoinLink,
        kind: JoinKind,
    ) -> Result<JoinNodeName, JoinTreeError> {
        let parent_id = self.resolve(parent)?;
        let parent_node = &self.nodes[parent_id.0];
        check_column_in_table(&link.left_column, &parent_node.table, &parent_node.name)?;
        let name = self.generate_name();
        check_column_in_table(&link.right_column, &table, &name)?;

        let id = self.push(JoinNode {
            name: name.clone(),
            table,
            alias,
            parent: Some(parent_id),
            children: Vec::new(),
            excluded_from_ddl: false,
            kind,
        });
        log::trace!(
            "Attached {} join '{}' under '{}'",
            self.nodes[id.0].kind.label(),
            name,
            parent
        );
        Ok(name)
    }

    fn push(&mut self, node: JoinNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        if let Some(parent) = node.parent {
            self.nodes[parent.0].children.push(id);
        }
        self.registry.insert(node.name.clone(), id);
        self.nodes.push(node);
        id
    }

    fn generate_name(&self) -> JoinNodeName {
        loop {
            let suffix = Uuid::new_v4().simple().to_string();
            let name = JoinNodeName::new(format!("{:x}-{}", self.id, &suffix[..8]));
            if !self.registry.contains_key(&name) {
                return name;
            }
        }
    }

    /// All nodes, breadth-first, a parent always before its children
    pub fn iter_breadth_first(&self) -> BreadthFirst<'_> {
        let mut queue = VecDeque::new();
        queue.push_back(Self::ROOT);
        BreadthFirst { tree: self, queue }
    }

    /// Visit every join node breadth-first and pre-order, root excluded
    pub fn foreach_join(&self, mut visitor: impl FnMut(&JoinNode)) {
        for node in self.iter_breadth_first().skip(1) {
            visitor(node);
        }
    }

    pub fn depth_of(&self, name: &JoinNodeName) -> Option<usize> {
        let mut id = *self.registry.get(name)?;
        let mut depth = 0;
        while let Some(parent) = self.nodes[id.0].parent {
            depth += 1;
            id = parent;
        }
        Some(depth)
    }

    /// Exclude the node's table from [`give_tables`](Self::give_tables), for joins that only
    /// read tables owned by another mapping
    pub fn mark_excluded_from_ddl(&mut self, name: &JoinNodeName) -> Result<(), JoinTreeError> {
        let id = self.resolve(name)?;
        self.nodes[id.0].excluded_from_ddl = true;
        Ok(())
    }

    /// Distinct tables of the tree, skipping nodes marked as excluded from DDL.
    /// Clones of one table share its name and are listed once.
    pub fn give_tables(&self) -> Vec<Arc<Table>> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.iter_breadth_first()
            .filter(|node| !node.excluded_from_ddl)
            .filter(|node| seen.insert(node.table.name()))
            .map(|node| Arc::clone(&node.table))
            .collect()
    }

    /// Copy this tree's joins under `anchor` of `target`.
    ///
    /// Each copy keeps its source name and kind; its left column is replaced by
    /// the same-named column of its new parent's table. Every copy is checked
    /// before the first one is attached, so on error `target` is unchanged.
    pub fn project_to(
        &self,
        target: &mut JoinTree,
        anchor: &JoinNodeName,
    ) -> Result<(), JoinTreeError> {
        let staged = self.stage_projection(target, anchor)?;
        let projected = staged.len();
        for copy in staged {
            let parent = copy.parent.map(|id| target.nodes[id.0].name.clone());
            let name = copy.name.clone();
            target.push(copy);
            log::trace!(
                "Projected join '{}' onto tree {:x} under '{}'",
                name,
                target.id,
                parent.unwrap_or_else(JoinNodeName::root)
            );
        }
        log::debug!("Projected {} joins onto tree {:x}", projected, target.id);
        Ok(())
    }

    /// Copies of this tree's joins in breadth-first order, parents pointing at
    /// the ids they will receive once pushed onto `target` in that order
    fn stage_projection(
        &self,
        target: &JoinTree,
        anchor: &JoinNodeName,
    ) -> Result<Vec<JoinNode>, JoinTreeError> {
        let anchor_id = target.resolve(anchor)?;
        let base = target.nodes.len();
        let mut staged: Vec<JoinNode> = Vec::with_capacity(self.nodes.len() - 1);
        let mut names: HashSet<&JoinNodeName> = HashSet::new();
        let mut queue: VecDeque<(NodeId, NodeId)> = self
            .root()
            .children
            .iter()
            .map(|child| (*child, anchor_id))
            .collect();

        while let Some((source_id, target_parent)) = queue.pop_front() {
            let source = &self.nodes[source_id.0];
            if target.registry.contains_key(&source.name) || !names.insert(&source.name) {
                return Err(JoinTreeError::DuplicateNodeName {
                    name: source.name.to_string(),
                });
            }

            let parent_table = match target_parent.0.checked_sub(base) {
                Some(index) => Arc::clone(&staged[index].table),
                None => Arc::clone(&target.nodes[target_parent.0].table),
            };
            let mut copy = JoinNode {
                name: source.name.clone(),
                table: Arc::clone(&source.table),
                alias: source.alias.clone(),
                parent: Some(target_parent),
                children: Vec::new(),
                excluded_from_ddl: source.excluded_from_ddl,
                kind: source.kind.clone(),
            };
            if let Some(link) = copy.link_mut() {
                let rebound = parent_table
                    .find_column(link.left_column.name())
                    .ok_or_else(|| JoinTreeError::MissingJoinColumn {
                        table: parent_table.name().to_string(),
                        column: link.left_column.name().to_string(),
                    })?;
                link.left_column = rebound.clone();
            }

            let copy_id = NodeId(base + staged.len());
            staged.push(copy);
            queue.extend(source.children.iter().map(|child| (*child, copy_id)));
        }
        Ok(staged)
    }
}

fn check_column_in_table(
    column: &Column,
    table: &Table,
    node: &JoinNodeName,
) -> Result<(), JoinTreeError> {
    if table.columns().iter().any(|c| c.id() == column.id()) {
        Ok(())
    } else {
        Err(JoinTreeError::ColumnNotInTable {
            column: column.to_string(),
            table: table.name().to_string(),
            node: node.to_string(),
        })
    }
}

pub struct BreadthFirst<'a> {
    tree: &'a JoinTree,
    queue: VecDeque<NodeId>,
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = &'a JoinNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        let node = &self.tree.nodes[id.0];
        self.queue.extend(node.children.iter().copied());
        Some(node)
    }
}
