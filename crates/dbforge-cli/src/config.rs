use dbforge::{FieldSpec, ForeignKey, ForgeConfig};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SchemaConfig {
    #[allow(dead_code)]
    pub config_path: PathBuf,
    pub file: SchemaFile,
}

impl SchemaConfig {
    pub fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read schema file {}: {e}",
                config_path.display()
            )
        })?;

        let file = SchemaFile::parse(&raw).map_err(|e| {
            anyhow::anyhow!(
                "failed to parse schema file {}: {e}",
                config_path.display()
            )
        })?;

        Ok(Self { config_path, file })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_if_not_exists")]
    pub if_not_exists: bool,

    #[serde(default)]
    pub options: Option<TableOptions>,

    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

fn default_if_not_exists() -> bool {
    true
}

/// Table options. Unset entries keep the library defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableOptions {
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: String,

    /// Add the auto-increment `id` primary key
    #[serde(default)]
    pub id: bool,

    #[serde(default)]
    pub fields: Vec<FieldConfig>,

    #[serde(default)]
    pub primary_key: Vec<String>,

    #[serde(default)]
    pub keys: Vec<Vec<String>>,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(flatten)]
    pub spec: FieldSpec,
}

impl SchemaFile {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let file: SchemaFile = toml::from_str(raw)?;
        file.validate()?;
        Ok(file)
    }

    pub fn forge_config(&self) -> ForgeConfig {
        let mut config = ForgeConfig::default();
        if let Some(options) = &self.options {
            if let Some(engine) = &options.engine {
                config = config.engine(engine.clone());
            }
            if let Some(charset) = &options.charset {
                config = config.charset(charset.clone());
            }
            if let Some(collate) = &options.collate {
                config = config.collate(collate.clone());
            }
        }
        config
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = BTreeSet::new();
        for table in &self.tables {
            let name = table.name.trim();
            if name.is_empty() {
                anyhow::bail!("tables[].name must not be empty");
            }
            if !seen.insert(name) {
                anyhow::bail!("table {name} is defined twice");
            }
            if !table.id && table.fields.is_empty() {
                anyhow::bail!("table {name} has no fields");
            }
            for field in &table.fields {
                if field.name.trim().is_empty() {
                    anyhow::bail!("table {name}: fields[].name must not be empty");
                }
                if field.spec.sql_type.trim().is_empty() {
                    anyhow::bail!("table {name}: field {} has no type", field.name);
                }
            }
        }
        Ok(())
    }
}
