use crate::cli::InitArgs;
use std::path::Path;

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    write_template(&args.config)
}

fn write_template(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing file: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create directory {}: {e}", parent.display())
            })?;
        }
    }

    std::fs::write(path, TEMPLATE.trim_start())
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

const TEMPLATE: &str = r#"
prefix = "wp_"
if_not_exists = true

[options]
engine = "InnoDB"
charset = "utf8mb4"
collate = "utf8mb4_unicode_520_ci"

[[tables]]
name = "posts"
id = true
keys = [["author_id"], ["status", "created_at"]]
fields = [
  { name = "author_id", type = "BIGINT", constraint = 20, unsigned = true },
  { name = "title", type = "VARCHAR", constraint = 200 },
  { name = "status", type = "ENUM", constraint = ["draft", "publish"], default = "draft" },
  { name = "excerpt", type = "TEXT", null = true },
  { name = "created_at", type = "DATETIME" },
]

# [[tables.foreign_keys]]
# field = "author_id"
# reference_table = "users"
# reference_field = "ID"
# on_delete = "cascade" # cascade | restrict | set_null | set_default | no_action
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaFile;

    #[test]
    fn template_is_a_valid_schema() {
        let file = SchemaFile::parse(TEMPLATE).unwrap();
        assert_eq!(file.tables.len(), 1);
        assert_eq!(file.tables[0].fields.len(), 5);
    }
}
