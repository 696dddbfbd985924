use super::fixtures::{ids_of, relation, root_tree, table};
use entitygraph::config::LoaderConfig;
use entitygraph::join_tree::{JoinNodeName, JoinTree};
use entitygraph::loader::{
    EntityGraphLoader, ExecutorError, LoadError, RawRow, ResultSet, SqlExecutor,
};
use entitygraph::mapping::{ColumnBinderRegistry, EntityIdentifier, RelationFixer, Value};
use entitygraph::query_builder::PreparedStatement;
use mockall::mock;
use mockall::predicate::function;
use std::sync::Arc;

mock! {
    pub Executor {}

    impl SqlExecutor for Executor {
        fn execute(&self, statement: &PreparedStatement) -> Result<ResultSet, ExecutorError>;
    }
}

fn order_tree() -> Arc<JoinTree> {
    let order = table("Order", &[]);
    let line = table("Line", &["orderId"]);
    let mut tree = root_tree(&order);
    tree.add_relation_join(
        &JoinNodeName::root(),
        relation(&order, "id", &line, "orderId", RelationFixer::to_collection("lines")),
    )
    .unwrap();
    Arc::new(tree)
}

/// Rows an executor would return for the ids bound in the statement: one
/// order with two lines each, cells as text the way some drivers hand them out
fn rows_for(parameters: &[Value]) -> Vec<RawRow> {
    let mut rows = Vec::new();
    for parameter in parameters {
        let order_id = parameter.as_i64().unwrap();
        for line in 0..2 {
            let mut row = RawRow::new();
            row.insert("Order_id".to_string(), Value::Text(order_id.to_string()));
            row.insert("Line_id".to_string(), Value::Integer(order_id * 10 + line));
            row.insert("Line_orderId".to_string(), Value::Integer(order_id));
            rows.push(row);
        }
    }
    rows
}

fn loader(in_operator_max_size: usize) -> EntityGraphLoader {
    let config = LoaderConfig {
        in_operator_max_size,
        log_sql: true,
        ..LoaderConfig::default()
    };
    EntityGraphLoader::new(order_tree(), ColumnBinderRegistry::default(), config).unwrap()
}

#[test]
fn test_driver_rejection_carries_sql() {
    let loader = loader(10);
    let expected_sql = loader.mapping().sql();

    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .times(1)
        .returning(|_| Err(ExecutorError::Rejected("syntax error".to_string())));

    let err = loader.select_all(&executor).unwrap_err();
    assert_eq!(
        err,
        LoadError::Execution {
            sql: expected_sql,
            source: ExecutorError::Rejected("syntax error".to_string()),
        }
    );
    assert!(err.to_string().contains("syntax error"));
}

#[test]
fn test_select_by_ids_runs_one_query_per_chunk() {
    let loader = loader(2);

    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .with(function(|statement: &PreparedStatement| {
            statement.parameters.len() <= 2 && statement.sql.contains(" IN (")
        }))
        .times(3)
        .returning(|statement| Ok(ResultSet::from_rows(rows_for(&statement.parameters))));

    let ids: Vec<EntityIdentifier> = (1i64..=5).map(EntityIdentifier::single).collect();
    let result = loader.select_by_ids(&executor, &ids).unwrap();

    assert_eq!(ids_of(&result.into_vec()), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_select_by_ids_wires_children_across_chunks() {
    let loader = loader(1);

    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .times(2)
        .returning(|statement| Ok(ResultSet::from_rows(rows_for(&statement.parameters))));

    let ids = [EntityIdentifier::single(4), EntityIdentifier::single(9)];
    let result = loader.select_by_ids(&executor, &ids).unwrap();

    let lines: Vec<Vec<i64>> = result
        .iter()
        .map(|order| ids_of(order.borrow().collection("lines").unwrap()))
        .collect();
    assert_eq!(lines, vec![vec![40, 41], vec![90, 91]]);
}

#[test]
fn test_failure_in_later_chunk_aborts_whole_load() {
    let loader = loader(1);

    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .with(function(|statement: &PreparedStatement| {
            statement.parameters == vec![Value::Integer(1)]
        }))
        .returning(|statement| Ok(ResultSet::from_rows(rows_for(&statement.parameters))));
    executor
        .expect_execute()
        .with(function(|statement: &PreparedStatement| {
            statement.parameters == vec![Value::Integer(2)]
        }))
        .returning(|_| Err(ExecutorError::Rejected("timeout".to_string())));

    let ids = [EntityIdentifier::single(1), EntityIdentifier::single(2)];
    assert!(matches!(
        loader.select_by_ids(&executor, &ids),
        Err(LoadError::Execution { source: ExecutorError::Rejected(_), .. })
    ));
}
