use super::fixtures::{relation, root_tree, table};
use entitygraph::hydrator::{Row, TreeInflater};
use entitygraph::join_tree::{JoinNodeName, JoinTree};
use entitygraph::mapping::{ColumnBinderRegistry, EntityIdentifier, RelationFixer, Value};
use entitygraph::query_builder::{build_select_query, where_root_identifier_in};
use std::collections::HashSet;
use test_case::test_case;

/// Tree -> Tree -> ... self-referencing chain over one shared table
fn self_join_chain(depth: usize) -> JoinTree {
    let tree_table = table("Tree", &["parentId"]);
    let mut tree = root_tree(&tree_table);
    let mut parent = JoinNodeName::root();
    for _ in 0..depth {
        parent = tree
            .add_relation_join(
                &parent,
                relation(&tree_table, "parentId", &tree_table, "id", RelationFixer::to_property("parent")),
            )
            .unwrap();
    }
    tree
}

#[test_case(1, &["Tree", "Tree_1"] ; "single self join")]
#[test_case(3, &["Tree", "Tree_1", "Tree_2", "Tree_3"] ; "self join chain")]
fn test_self_join_table_aliases(depth: usize, expected: &[&str]) {
    let tree = self_join_chain(depth);
    let mapping = build_select_query(&tree, &ColumnBinderRegistry::default()).unwrap();

    let aliases: Vec<&str> = tree
        .iter_breadth_first()
        .map(|node| mapping.table_alias_of(node.name()).unwrap())
        .collect();
    assert_eq!(aliases, expected);
    assert_eq!(mapping.column_binders.len(), expected.len() * 2);
}

#[test]
fn test_self_join_column_alias_sets_are_disjoint() {
    let tree = self_join_chain(1);
    let mapping = build_select_query(&tree, &ColumnBinderRegistry::default()).unwrap();

    assert_eq!(
        mapping.sql(),
        "SELECT Tree.id AS Tree_id, Tree.parentId AS Tree_parentId, \
         Tree_1.id AS Tree_1_id, Tree_1.parentId AS Tree_1_parentId \
         FROM Tree LEFT OUTER JOIN Tree AS Tree_1 ON Tree.parentId = Tree_1.id"
    );

    let sets: Vec<HashSet<&String>> = tree
        .iter_breadth_first()
        .map(|node| mapping.node_aliases[node.name()].values().collect())
        .collect();
    assert_eq!(sets.len(), 2);
    assert!(sets[0].is_disjoint(&sets[1]));
}

#[test]
fn test_cloned_table_columns_are_distinct_identity_keys() {
    let tree_table = table("Tree", &["parentId"]);
    let parent_table = tree_table.clone_table().into_shared();
    let mut tree = root_tree(&tree_table);
    tree.add_relation_join(
        &JoinNodeName::root(),
        relation(&tree_table, "parentId", &parent_table, "id", RelationFixer::to_property("parent")),
    )
    .unwrap();
    let mapping = build_select_query(&tree, &ColumnBinderRegistry::default()).unwrap();

    let root_id = tree_table.find_column("id").unwrap();
    let clone_id = parent_table.find_column("id").unwrap();
    assert_ne!(root_id.id(), clone_id.id());
    assert_eq!(mapping.column_aliases[&root_id.id()], "Tree_id");
    assert_eq!(mapping.column_aliases[&clone_id.id()], "Tree_1_id");
}

#[test]
fn test_explicit_alias_collision_is_rejected() {
    let order = table("Order", &[]);
    let line = table("Line", &["orderId"]);
    let mut tree = JoinTree::new(
        std::sync::Arc::clone(&order),
        std::sync::Arc::new(entitygraph::mapping::RecordInflater::for_table("Order", &order)),
        Some("x".to_string()),
    );
    tree.add_relation_join(
        &JoinNodeName::root(),
        relation(&order, "id", &line, "orderId", RelationFixer::to_collection("lines")).alias("x"),
    )
    .unwrap();

    assert!(matches!(
        build_select_query(&tree, &ColumnBinderRegistry::default()),
        Err(entitygraph::query_builder::QueryBuildError::DuplicateAlias { alias, .. }) if alias == "x"
    ));
}

#[test]
fn test_root_identifier_filter_binds_parameters() {
    let order = table("Order", &[]);
    let tree = root_tree(&order);
    let binders = ColumnBinderRegistry::default();
    let mapping = build_select_query(&tree, &binders).unwrap();

    let ids = vec![
        EntityIdentifier::single("3"),
        EntityIdentifier::single(4),
    ];
    let statement =
        where_root_identifier_in(&mapping, &order.primary_key(), &ids, &binders).unwrap();
    assert_eq!(
        statement.sql,
        "SELECT Order.id AS Order_id FROM Order WHERE Order.id IN (?, ?)"
    );
    // text ids are coerced by the integer binder
    assert_eq!(statement.parameters, vec![Value::Integer(3), Value::Integer(4)]);
}

#[test]
fn test_self_referencing_tree_hydrates_shared_instances() {
    let tree_table = table("Tree", &["parentId"]);
    let parent_table = tree_table.clone_table().into_shared();
    let mut tree = root_tree(&tree_table);
    tree.add_relation_join(
        &JoinNodeName::root(),
        relation(&tree_table, "parentId", &parent_table, "id", RelationFixer::to_property("parent")),
    )
    .unwrap();
    let mapping = build_select_query(&tree, &ColumnBinderRegistry::default()).unwrap();
    let inflater = TreeInflater::new(&tree, &mapping).unwrap();

    // node 2 is both a root and the parent of node 1, and its own parent
    let rows = [(1, 2), (2, 2)].map(|(id, parent_id)| {
        Row::new()
            .with("Tree_id", id)
            .with("Tree_parentId", parent_id)
            .with("Tree_1_id", parent_id)
            .with("Tree_1_parentId", 2)
    });
    let result = inflater.transform(rows, 2).unwrap().into_vec();
    assert_eq!(result.len(), 2);
    let (first, second) = (&result[0], &result[1]);

    let first_parent = first.borrow().reference("parent").unwrap().clone();
    assert!(first_parent.ptr_eq(second));
    let second_parent = second.borrow().reference("parent").unwrap().clone();
    assert!(second_parent.ptr_eq(second));
    assert!(!first.ptr_eq(second));
}
