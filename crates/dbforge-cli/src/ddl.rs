use crate::cli::DdlArgs;
use crate::config::{SchemaConfig, SchemaFile, TableConfig};
use dbforge::{Database, MemoryExecutor};
use std::sync::Arc;

pub fn run(args: DdlArgs) -> anyhow::Result<()> {
    let config = SchemaConfig::load(args.config)?;
    let prefix = args
        .prefix
        .unwrap_or_else(|| config.file.prefix.clone());
    let sql = render(&config.file, &prefix, &args.tables)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, sql)
                .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{sql}"),
    }
    Ok(())
}

/// Render CREATE TABLE statements for `only` (every table when empty).
pub fn render(file: &SchemaFile, prefix: &str, only: &[String]) -> anyhow::Result<String> {
    for name in only {
        if !file.tables.iter().any(|t| t.name.trim() == name) {
            anyhow::bail!("unknown table: {name}");
        }
    }

    // Rendering never executes anything; the memory executor only supplies
    // the prefix and literal escaping.
    let db = Database::new(Arc::new(MemoryExecutor::with_prefix(prefix)))
        .with_forge_config(file.forge_config());

    let mut out = String::new();
    for table in file
        .tables
        .iter()
        .filter(|t| only.is_empty() || only.iter().any(|n| n == t.name.trim()))
    {
        let sql = create_table_sql(&db, table, file.if_not_exists)?;
        out.push_str(&sql);
        out.push_str(";\n\n");
    }
    Ok(out)
}

fn create_table_sql(
    db: &Database,
    table: &TableConfig,
    if_not_exists: bool,
) -> anyhow::Result<String> {
    let mut forge = db.forge();
    if table.id {
        forge.add_id();
    }
    forge.add_fields(
        table
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.spec.clone())),
    );
    forge.add_key(&table.primary_key, true);
    for key in &table.keys {
        forge.add_key(key, false);
    }
    for fk in &table.foreign_keys {
        forge.add_foreign_key(fk.clone());
    }
    forge
        .to_create_table_sql(&table.name, if_not_exists)
        .map_err(|e| anyhow::anyhow!("table {}: {e}", table.name))
}
