use super::fixtures::{ids_of, relation, root_tree, table};
use entitygraph::hydrator::{Row, TreeInflater};
use entitygraph::join_tree::{JoinNodeName, PassiveJoinSpec};
use entitygraph::mapping::{ColumnBinderRegistry, EntityRef, RelationFixer, Value};
use entitygraph::query_builder::build_select_query;
use std::sync::{Arc, Mutex};

fn inflater(tree: &entitygraph::join_tree::JoinTree) -> TreeInflater {
    let mapping = build_select_query(tree, &ColumnBinderRegistry::default()).unwrap();
    TreeInflater::new(tree, &mapping).unwrap()
}

#[test]
fn test_order_with_line_items_and_notes() {
    let order = table("Order", &[]);
    let line = table("LineItem", &["orderId"]);
    let note = table("Note", &["orderId"]);
    let mut tree = root_tree(&order);
    tree.add_relation_join(
        &JoinNodeName::root(),
        relation(&order, "id", &line, "orderId", RelationFixer::to_collection("lines")),
    )
    .unwrap();
    tree.add_relation_join(
        &JoinNodeName::root(),
        relation(&order, "id", &note, "orderId", RelationFixer::to_collection("notes")),
    )
    .unwrap();
    let inflater = inflater(&tree);

    // 2 line items x 3 notes
    let mut rows = Vec::new();
    for line_id in [10, 11] {
        for note_id in [20, 21, 22] {
            rows.push(
                Row::new()
                    .with("Order_id", 1)
                    .with("LineItem_id", line_id)
                    .with("LineItem_orderId", 1)
                    .with("Note_id", note_id)
                    .with("Note_orderId", 1),
            );
        }
    }
    assert_eq!(rows.len(), 6);

    let result = inflater.transform(rows, 1).unwrap();
    assert_eq!(result.len(), 1);
    let order = result.iter().next().unwrap().borrow();
    assert_eq!(ids_of(order.collection("lines").unwrap()), vec![10, 11]);
    assert_eq!(ids_of(order.collection("notes").unwrap()), vec![20, 21, 22]);
}

#[test]
fn test_same_identifier_yields_same_bean() {
    let order = table("Order", &[]);
    let line = table("LineItem", &["orderId", "productId"]);
    let product = table("Product", &[]);
    let mut tree = root_tree(&order);
    let lines = tree
        .add_relation_join(
            &JoinNodeName::root(),
            relation(&order, "id", &line, "orderId", RelationFixer::to_collection("lines")),
        )
        .unwrap();
    tree.add_relation_join(
        &lines,
        relation(&line, "productId", &product, "id", RelationFixer::to_property("product")),
    )
    .unwrap();
    let inflater = inflater(&tree);

    let rows = [(1, 10), (1, 11), (2, 12)].map(|(order_id, line_id)| {
        Row::new()
            .with("Order_id", order_id)
            .with("LineItem_id", line_id)
            .with("LineItem_orderId", order_id)
            .with("LineItem_productId", 7)
            .with("Product_id", 7)
    });
    let result = inflater.transform(rows, 2).unwrap();
    assert_eq!(result.len(), 2);

    let products: Vec<EntityRef> = result
        .iter()
        .flat_map(|order| order.borrow().collection("lines").unwrap().to_vec())
        .map(|line| line.borrow().reference("product").unwrap().clone())
        .collect();
    assert_eq!(products.len(), 3);
    assert!(products[0].ptr_eq(&products[1]));
    assert!(products[1].ptr_eq(&products[2]));
}

#[test]
fn test_parent_wired_before_child_in_each_row() {
    let root = table("Root", &[]);
    let a = table("A", &["rootId"]);
    let a1 = table("A1", &["aId"]);
    let events = Arc::new(Mutex::new(Vec::new()));

    let recorder = |level: &'static str| {
        let sink = Arc::clone(&events);
        RelationFixer::new(level, move |_: &EntityRef, child: &EntityRef| {
            let id = child.borrow().property("id").cloned().unwrap();
            sink.lock().unwrap().push(format!("{}:{}", level, id));
        })
    };

    let mut tree = root_tree(&root);
    let a_node = tree
        .add_relation_join(&JoinNodeName::root(), relation(&root, "id", &a, "rootId", recorder("A")))
        .unwrap();
    tree.add_relation_join(&a_node, relation(&a, "id", &a1, "aId", recorder("A1")))
        .unwrap();
    let inflater = inflater(&tree);

    let rows = [(1, 10), (1, 11), (2, 12)].map(|(a_id, a1_id)| {
        Row::new()
            .with("Root_id", 1)
            .with("A_id", a_id)
            .with("A_rootId", 1)
            .with("A1_id", a1_id)
            .with("A1_aId", a_id)
    });
    inflater.transform(rows, 1).unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["A:1", "A1:10", "A1:11", "A:2", "A1:12"]
    );
}

#[test]
fn test_passive_only_tree_returns_root_beans() {
    let order = table("Order", &[]);
    let tag = table("Tag", &["orderId"]);
    let audit = table("Audit", &["orderId"]);
    let mut tree = root_tree(&order);
    for joined in [&tag, &audit] {
        tree.add_passive_join(
            &JoinNodeName::root(),
            PassiveJoinSpec::new(
                Arc::clone(joined),
                order.find_column("id").unwrap().clone(),
                joined.find_column("orderId").unwrap().clone(),
            ),
        )
        .unwrap();
    }
    let inflater = inflater(&tree);

    let rows = [(1, 100, 200), (1, 101, 200), (2, 102, 201)].map(|(order_id, tag_id, audit_id)| {
        Row::new()
            .with("Order_id", order_id)
            .with("Tag_id", tag_id)
            .with("Audit_id", audit_id)
    });
    let result = inflater.transform(rows, 2).unwrap();

    assert_eq!(ids_of(&result.into_vec()), vec![1, 2]);
}

#[test]
fn test_repeated_child_rows_wire_once() {
    let order = table("Order", &[]);
    let line = table("LineItem", &["orderId"]);
    let mut tree = root_tree(&order);
    tree.add_relation_join(
        &JoinNodeName::root(),
        relation(&order, "id", &line, "orderId", RelationFixer::to_collection("lines")),
    )
    .unwrap();
    let inflater = inflater(&tree);

    let rows = [10, 11, 12, 10, 11, 12, 12].map(|line_id| {
        Row::new()
            .with("Order_id", 1)
            .with("LineItem_id", line_id)
            .with("LineItem_orderId", 1)
    });
    let result = inflater.transform(rows, 1).unwrap();
    let order = result.iter().next().unwrap().borrow();
    assert_eq!(ids_of(order.collection("lines").unwrap()), vec![10, 11, 12]);
    assert_eq!(order.property("id"), Some(&Value::Integer(1)));
}
