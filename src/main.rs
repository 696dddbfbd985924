use anyhow::{bail, Context};
use clap::Parser;
use dotenvy::dotenv;
use entitygraph::config::LoaderConfig;
use entitygraph::join_tree::JoinNodeName;
use entitygraph::loader::{EntityGraphLoader, InMemoryExecutor};
use entitygraph::mapping::{
    ColumnBinderRegistry, EntityIdentifier, EntityInflater, EntitySet, Mapping, MappingConfig, Value,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// EntityGraph - print the select of a join tree mapping and hydrate rows through it
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML mapping declaring tables, entities and joins
    #[arg(long)]
    mapping: PathBuf,

    /// YAML loader configuration (defaults to ENTITYGRAPH_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of result rows (`{ "alias": value }` objects) to hydrate
    #[arg(long)]
    rows: Option<PathBuf>,

    /// Root identifier to filter on; composite identifiers are comma separated
    #[arg(long = "id")]
    ids: Vec<String>,

    /// Log executed statements
    #[arg(long)]
    log_sql: bool,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_yaml_file(path)
            .with_context(|| format!("loading loader config {}", path.display()))?,
        None => LoaderConfig::from_env().context("loading loader config from environment")?,
    };
    config.log_sql |= cli.log_sql;

    let Mapping { tree, labels, .. } = MappingConfig::from_yaml_file(&cli.mapping)?.build()?;
    let tree = Arc::new(tree);
    let binders = ColumnBinderRegistry::default();
    let loader = EntityGraphLoader::new(Arc::clone(&tree), binders.clone(), config)?;

    println!("{}\n", loader.mapping().sql());
    print_aliases(&loader, &labels);

    let Some(rows_path) = &cli.rows else {
        return Ok(());
    };
    let content = std::fs::read_to_string(rows_path)
        .with_context(|| format!("reading rows {}", rows_path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    let executor = InMemoryExecutor::from_json(&json)?;

    let result = if cli.ids.is_empty() {
        loader.select_all(&executor)?
    } else {
        let ids = parse_identifiers(&cli.ids, &loader, &binders)?;
        loader.select_by_ids(&executor, &ids)?
    };
    log::info!("Loaded {} root beans", result.len());
    println!("\n{}", serde_json::to_string_pretty(&graph_json(&result))?);
    Ok(())
}

fn print_aliases(loader: &EntityGraphLoader, labels: &HashMap<String, JoinNodeName>) {
    let label_of: HashMap<&JoinNodeName, &str> =
        labels.iter().map(|(label, name)| (name, label.as_str())).collect();
    let mapping = loader.mapping();
    for node in loader.tree().iter_breadth_first() {
        let label = label_of.get(node.name()).copied().unwrap_or("?");
        let table_alias = mapping.table_alias_of(node.name()).unwrap_or("?");
        println!(
            "{} ({}, {} AS {})",
            label,
            node.kind().label(),
            node.table().name(),
            table_alias
        );
        for column in node.selectable_columns() {
            if let Some(alias) = mapping.alias_of(node.name(), &column) {
                println!("  {:<24} {}", column.to_string(), alias);
            }
        }
    }
}

fn parse_identifiers(
    raw: &[String],
    loader: &EntityGraphLoader,
    binders: &ColumnBinderRegistry,
) -> anyhow::Result<Vec<EntityIdentifier>> {
    let key = loader.tree().root_inflater().identifier_columns();
    let mut ids = Vec::with_capacity(raw.len());
    for text in raw {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        if parts.len() != key.len() {
            bail!(
                "identifier '{}' has {} parts, root identifier has {} columns",
                text,
                parts.len(),
                key.len()
            );
        }
        let mut values = Vec::with_capacity(parts.len());
        for (part, column) in parts.into_iter().zip(key) {
            values.push(binders.binder_for(column)?.write(&Value::from(part))?);
        }
        match EntityIdentifier::from_values(values) {
            Some(id) => ids.push(id),
            None => bail!("identifier '{}' is empty or null", text),
        }
    }
    Ok(ids)
}

fn graph_json(result: &EntitySet) -> serde_json::Value {
    serde_json::Value::Array(result.iter().map(|bean| bean.to_json()).collect())
}
