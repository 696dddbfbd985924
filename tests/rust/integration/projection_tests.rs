use super::fixtures::{ids_of, relation, root_tree, table};
use entitygraph::hydrator::{HydrationError, Row, RowView, TreeInflater};
use entitygraph::join_tree::{JoinNodeName, JoinTree, JoinTreeError};
use entitygraph::mapping::{ColumnBinderRegistry, DuplicateKeyFn, RelationFixer, Value};
use entitygraph::query_builder::build_select_query;
use std::sync::Arc;

/// Order -> lines -> product, where the product wiring is keyed by the
/// position of the line it hangs off (looked up on the `lines` node)
fn order_lines_template() -> (JoinTree, JoinNodeName, JoinNodeName) {
    let order = table("Order", &["customerId"]);
    let line = table("LineItem", &["orderId", "productId", "position"]);
    let product = table("Product", &[]);

    let mut template = root_tree(&order);
    let lines = template
        .add_relation_join(
            &JoinNodeName::root(),
            relation(&order, "id", &line, "orderId", RelationFixer::to_collection("lines")),
        )
        .unwrap();

    let lines_node = lines.clone();
    let position = line.find_column("position").unwrap().clone();
    let product_id = product.find_column("id").unwrap().clone();
    let key: DuplicateKeyFn = Arc::new(move |view: &RowView<'_>| {
        Ok(vec![
            view.value_of(&lines_node, &position)?.clone(),
            view.value(&product_id).clone(),
        ])
    });
    let products = template
        .add_relation_join(
            &lines,
            relation(&line, "productId", &product, "id", RelationFixer::to_collection("products"))
                .duplicate_key(key),
        )
        .unwrap();
    (template, lines, products)
}

#[test]
fn test_projected_nodes_keep_names_and_resolve_lookups() {
    let (template, lines, products) = order_lines_template();
    let order_table = Arc::clone(template.root().table());

    let customer = table("Customer", &[]);
    let mut tree = root_tree(&customer);
    let orders = tree
        .add_relation_join(
            &JoinNodeName::root(),
            relation(&customer, "id", &order_table, "customerId", RelationFixer::to_collection("orders")),
        )
        .unwrap();
    template.project_to(&mut tree, &orders).unwrap();

    assert_eq!(tree.len(), 4);
    assert_eq!(tree.depth_of(&lines), Some(2));
    assert_eq!(tree.depth_of(&products), Some(3));

    let mapping = build_select_query(&tree, &ColumnBinderRegistry::default()).unwrap();
    let inflater = TreeInflater::new(&tree, &mapping).unwrap();

    // the same product on two lines at different positions
    let rows = [(10, 0), (11, 1)].map(|(line_id, position)| {
        Row::new()
            .with("Customer_id", 1)
            .with("Order_id", 5)
            .with("Order_customerId", 1)
            .with("LineItem_id", line_id)
            .with("LineItem_orderId", 5)
            .with("LineItem_productId", 7)
            .with("LineItem_position", position)
            .with("Product_id", 7)
    });
    let result = inflater.transform(rows, 1).unwrap();

    let customer = result.iter().next().unwrap().borrow();
    let order = customer.collection("orders").unwrap()[0].borrow();
    let lines = order.collection("lines").unwrap();
    assert_eq!(ids_of(lines), vec![10, 11]);
    for line in lines {
        assert_eq!(ids_of(line.borrow().collection("products").unwrap()), vec![7]);
    }
}

#[test]
fn test_projection_requires_matching_left_column() {
    let (template, _, _) = order_lines_template();

    // anchor table has no `id` column for the lines join to hang off
    let mut holder = entitygraph::mapping::Table::new("Holder");
    holder.add_primary_key("code", entitygraph::mapping::SqlType::Text);
    let holder = holder.into_shared();
    let mut tree = root_tree(&holder);

    assert_eq!(
        template.project_to(&mut tree, &JoinNodeName::root()),
        Err(JoinTreeError::MissingJoinColumn {
            table: "Holder".to_string(),
            column: "id".to_string(),
        })
    );
}

#[test]
fn test_duplicate_key_lookup_of_unknown_node_aborts() {
    let order = table("Order", &[]);
    let line = table("LineItem", &["orderId"]);
    let ghost = JoinNodeName::new("ghost");
    let order_id = order.find_column("id").unwrap().clone();
    let key: DuplicateKeyFn = Arc::new(move |view: &RowView<'_>| {
        Ok(vec![view.value_of(&ghost, &order_id)?.clone()])
    });

    let mut tree = root_tree(&order);
    tree.add_relation_join(
        &JoinNodeName::root(),
        relation(&order, "id", &line, "orderId", RelationFixer::to_collection("lines"))
            .duplicate_key(key),
    )
    .unwrap();
    let mapping = build_select_query(&tree, &ColumnBinderRegistry::default()).unwrap();
    let inflater = TreeInflater::new(&tree, &mapping).unwrap();

    let rows = vec![Row::new()
        .with("Order_id", 1)
        .with("LineItem_id", 2)
        .with("LineItem_orderId", Value::Integer(1))];
    match inflater.transform(rows, 1) {
        Err(HydrationError::UnknownJoinNode { name, known }) => {
            assert_eq!(name, "ghost");
            assert_eq!(known.len(), 2);
            assert!(known.contains(&"ROOT".to_string()));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_rejected_projection_attaches_nothing() {
    let line = table("Line", &["productId", "tagId"]);
    let product = table("Product", &[]);
    let tag = table("Tag", &[]);
    let mut template = root_tree(&line);
    let product_node = template
        .add_relation_join(
            &JoinNodeName::root(),
            relation(&line, "productId", &product, "id", RelationFixer::to_property("product")),
        )
        .unwrap();
    template
        .add_relation_join(
            &JoinNodeName::root(),
            relation(&line, "tagId", &tag, "id", RelationFixer::to_property("tag")),
        )
        .unwrap();

    // the anchor can carry the product join but not the tag join
    let anchor = table("Line", &["productId"]);
    let mut tree = root_tree(&anchor);
    let before = build_select_query(&tree, &ColumnBinderRegistry::default())
        .unwrap()
        .sql();

    assert!(matches!(
        template.project_to(&mut tree, &JoinNodeName::root()),
        Err(JoinTreeError::MissingJoinColumn { column, .. }) if column == "tagId"
    ));
    assert_eq!(tree.len(), 1);
    assert!(tree.node(&product_node).is_none());
    let after = build_select_query(&tree, &ColumnBinderRegistry::default())
        .unwrap()
        .sql();
    assert_eq!(before, after);
}
