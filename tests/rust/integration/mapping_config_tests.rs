use entitygraph::config::LoaderConfig;
use entitygraph::loader::{EntityGraphLoader, InMemoryExecutor};
use entitygraph::mapping::{ColumnBinderRegistry, EntityIdentifier, MappingConfig, MappingError, Value};
use std::io::Write;
use std::sync::Arc;

const SHOP: &str = r#"
tables:
  - name: Order
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: label, type: text }
  - name: LineItem
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: orderId, type: integer }
      - { name: productId, type: integer }
  - name: Product
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: title, type: text }
  - name: ExpressOrder
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: courier, type: text }
entities:
  - { name: Order, table: Order }
  - { name: LineItem, table: LineItem, properties: { id: id } }
  - { name: Product, table: Product }
root: Order
joins:
  - type: merge
    label: express
    parent: root
    table: ExpressOrder
    left: id
    right: id
    join_type: outer
  - type: relation
    label: lines
    parent: root
    entity: LineItem
    left: id
    right: orderId
    collection: lines
    back_reference: order
  - type: relation
    label: product
    parent: lines
    entity: Product
    left: productId
    right: id
    property: product
"#;

fn rows() -> serde_json::Value {
    serde_json::json!([
        { "Order_id": 1, "Order_label": "first", "ExpressOrder_courier": "bike",
          "LineItem_id": 10, "LineItem_orderId": 1, "LineItem_productId": 7,
          "Product_id": 7, "Product_title": "pen" },
        { "Order_id": 1, "Order_label": "first", "ExpressOrder_courier": "bike",
          "LineItem_id": 11, "LineItem_orderId": 1, "LineItem_productId": 7,
          "Product_id": 7, "Product_title": "pen" },
        { "Order_id": 2, "Order_label": "second", "ExpressOrder_courier": null,
          "LineItem_id": null, "LineItem_orderId": null, "LineItem_productId": null,
          "Product_id": null, "Product_title": null }
    ])
}

#[test]
fn test_yaml_mapping_loads_graph() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SHOP.as_bytes()).unwrap();
    let mapping = MappingConfig::from_yaml_file(file.path())
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(mapping.labels.len(), 4);

    let loader = EntityGraphLoader::new(
        Arc::new(mapping.tree),
        ColumnBinderRegistry::default(),
        LoaderConfig::default(),
    )
    .unwrap();
    let sql = loader.mapping().sql();
    assert!(sql.contains("LEFT OUTER JOIN ExpressOrder ON Order.id = ExpressOrder.id"));
    assert!(sql.contains("LEFT OUTER JOIN Product ON LineItem.productId = Product.id"));

    let executor = InMemoryExecutor::from_json(&rows()).unwrap();
    let result = loader.select_all(&executor).unwrap();
    assert_eq!(result.len(), 2);

    let first = result.iter().next().unwrap().clone();
    let order = first.borrow();
    assert_eq!(order.property("courier"), Some(&Value::from("bike")));
    let lines = order.collection("lines").unwrap();
    assert_eq!(lines.len(), 2);
    let back = lines[0].borrow().back_reference("order").unwrap();
    assert!(back.ptr_eq(&first));
    // LineItem maps only its id
    assert_eq!(lines[0].borrow().properties().len(), 1);

    let product_a = lines[0].borrow().reference("product").unwrap().clone();
    let product_b = lines[1].borrow().reference("product").unwrap().clone();
    assert!(product_a.ptr_eq(&product_b));

    let json = first.to_json();
    assert_eq!(json["lines"][0]["product"]["title"], "pen");
}

#[test]
fn test_join_before_its_parent_is_rejected() {
    let yaml = SHOP.replace("parent: lines", "parent: later");
    let err = MappingConfig::from_yaml_str(&yaml)
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, MappingError::UnknownParent { label, .. } if label == "product"));
}

#[test]
fn test_unknown_entity_is_rejected() {
    let yaml = SHOP.replace("entity: Product", "entity: Widget");
    assert!(matches!(
        MappingConfig::from_yaml_str(&yaml).unwrap().build(),
        Err(MappingError::UnknownEntity { name }) if name == "Widget"
    ));
}

const TREE: &str = r#"
tables:
  - name: Tree
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: code, type: text }
      - { name: parentCode, type: text }
entities:
  - { name: Tree, table: Tree, id: code }
root: Tree
joins:
  - type: relation
    label: parent
    parent: root
    entity: Tree
    left: parentCode
    right: code
    property: parent
"#;

#[test]
fn test_yaml_self_relation_loads_by_code() {
    let mapping = MappingConfig::from_yaml_str(TREE).unwrap().build().unwrap();
    let loader = EntityGraphLoader::new(
        Arc::new(mapping.tree),
        ColumnBinderRegistry::default(),
        LoaderConfig::default(),
    )
    .unwrap();
    let query = loader.mapping();
    assert_eq!(query.column_aliases.len(), query.column_binders.len());
    assert!(query
        .sql()
        .contains("LEFT OUTER JOIN Tree AS Tree_1 ON Tree.parentCode = Tree_1.code"));

    // "b" is a root, the parent of "a" and its own parent
    let executor = InMemoryExecutor::from_json(&serde_json::json!([
        { "Tree_code": "a", "Tree_id": 1, "Tree_parentCode": "b",
          "Tree_1_code": "b", "Tree_1_id": 2, "Tree_1_parentCode": "b" },
        { "Tree_code": "b", "Tree_id": 2, "Tree_parentCode": "b",
          "Tree_1_code": "b", "Tree_1_id": 2, "Tree_1_parentCode": "b" }
    ]))
    .unwrap();
    let ids = [EntityIdentifier::single("a"), EntityIdentifier::single("b")];
    let result = loader.select_by_ids(&executor, &ids).unwrap().into_vec();

    let executed = executor.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].sql.ends_with("WHERE Tree.code IN (?, ?)"));

    assert_eq!(result.len(), 2);
    let (a, b) = (&result[0], &result[1]);
    assert_eq!(a.borrow().property("code"), Some(&Value::from("a")));
    assert!(a.borrow().reference("parent").unwrap().ptr_eq(b));
    assert!(b.borrow().reference("parent").unwrap().ptr_eq(b));
}
