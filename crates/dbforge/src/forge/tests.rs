use super::*;
use crate::memory::{Call, MemoryExecutor};

fn forge() -> (Arc<MemoryExecutor>, SchemaForge) {
    let ex = Arc::new(MemoryExecutor::new());
    let forge = SchemaForge::with_config(
        ex.clone(),
        Arc::new(DbConfig::default()),
        ForgeConfig::bare(),
    );
    (ex, forge)
}

#[test]
fn nullability_defaults_to_not_null() {
    let (_, forge) = forge();
    let spec = FieldSpec::new("varchar").constraint(100);
    assert_eq!(
        forge.build_field_definition("title", &spec),
        "`title` VARCHAR(100) NOT NULL"
    );
    assert_eq!(
        forge.build_field_definition("title", &spec.nullable()),
        "`title` VARCHAR(100) NULL"
    );
}

#[test]
fn field_definition_renders_every_attribute() {
    let (_, forge) = forge();
    let spec = FieldSpec::new("INT")
        .constraint(11)
        .unsigned()
        .default_value(0)
        .auto_increment();
    assert_eq!(
        forge.build_field_definition("hits", &spec),
        "`hits` INT(11) UNSIGNED NOT NULL DEFAULT '0' AUTO_INCREMENT"
    );

    let status = FieldSpec::new("ENUM")
        .constraint(["draft", "it's"])
        .default_value("draft");
    assert_eq!(
        forge.build_field_definition("status", &status),
        "`status` ENUM('draft','it\\'s') NOT NULL DEFAULT 'draft'"
    );

    let price = FieldSpec::new("DECIMAL")
        .constraint("10,2")
        .nullable()
        .default_value(crate::Value::Null);
    assert_eq!(
        forge.build_field_definition("price", &price),
        "`price` DECIMAL(10,2) NULL DEFAULT NULL"
    );
}

#[test]
fn create_table_renders_keys_and_references() {
    let ex = Arc::new(MemoryExecutor::with_prefix("wp_"));
    let mut forge = SchemaForge::with_config(
        ex.clone(),
        Arc::new(DbConfig::default()),
        ForgeConfig::new().engine("InnoDB"),
    );
    forge
        .add_id()
        .add_field("author_id", FieldSpec::new("BIGINT").constraint(20).unsigned())
        .add_field("slug", FieldSpec::new("VARCHAR").constraint(200))
        .add_key(["author_id", "slug"], false)
        .add_key(["slug"], true)
        .add_foreign_key(
            ForeignKey::new("author_id", "users", "ID").on_delete(ReferentialAction::SetNull),
        );

    let sql = forge.to_create_table_sql("posts", true).unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE IF NOT EXISTS `wp_posts` (\n\
         `id` BIGINT(20) UNSIGNED NOT NULL AUTO_INCREMENT,\n\
         `author_id` BIGINT(20) UNSIGNED NOT NULL,\n\
         `slug` VARCHAR(200) NOT NULL,\n\
         PRIMARY KEY (`id`, `slug`),\n\
         KEY `author_id_slug` (`author_id`, `slug`),\n\
         FOREIGN KEY (`author_id`) REFERENCES `wp_users` (`ID`) \
         ON DELETE SET NULL ON UPDATE CASCADE\n\
         ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE utf8mb4_unicode_520_ci"
    );

    assert!(forge.create_table("posts", true));
    assert!(forge.is_pristine());
    assert_eq!(ex.calls(), vec![Call::Reconcile(sql)]);
}

#[test]
fn create_table_without_fields_is_refused() {
    let (ex, mut forge) = forge();
    forge.add_key(["id"], true);
    assert!(!forge.create_table("t", false));
    assert!(forge.is_pristine());
    assert!(ex.calls().is_empty());
    assert!(forge.last_error().unwrap().contains("no fields"));
}

#[test]
fn single_statement_operations_leave_state_alone() {
    let (ex, mut forge) = forge();
    forge.add_field("kept", FieldSpec::new("INT"));

    assert!(forge.drop_table("old", true));
    assert!(forge.rename_table("a", "b"));
    assert!(forge.add_column(
        "t",
        [
            ("views", FieldSpec::new("INT").default_value(0)),
            ("note", FieldSpec::new("TEXT").nullable().after("views")),
        ],
    ));
    assert!(forge.drop_column("t", "note"));
    assert!(forge.modify_column(
        "t",
        [
            ("views", FieldSpec::new("BIGINT")),
            ("title", FieldSpec::new("VARCHAR").constraint(255).rename_to("headline")),
        ],
    ));

    assert_eq!(
        ex.statements(),
        vec![
            "DROP TABLE IF EXISTS `old`",
            "ALTER TABLE `a` RENAME TO `b`",
            "ALTER TABLE `t` ADD COLUMN `views` INT NOT NULL DEFAULT '0', \
             ADD COLUMN `note` TEXT NULL AFTER `views`",
            "ALTER TABLE `t` DROP COLUMN `note`",
            "ALTER TABLE `t` MODIFY COLUMN `views` BIGINT NOT NULL, \
             CHANGE `title` `headline` VARCHAR(255) NOT NULL",
        ]
    );
    assert!(!forge.is_pristine());
}

#[test]
fn empty_alter_is_refused() {
    let (ex, mut forge) = forge();
    assert!(!forge.add_column("t", Vec::<(&str, FieldSpec)>::new()));
    assert!(!forge.rename_table("a", " "));
    assert!(ex.calls().is_empty());
}

#[test]
fn add_field_replaces_same_name() {
    let (_, mut forge) = forge();
    forge
        .add_field("a", FieldSpec::new("INT"))
        .add_field("b", FieldSpec::new("INT"))
        .add_field("a", FieldSpec::new("TEXT"));
    let sql = forge.to_create_table_sql("t", false).unwrap();
    assert_eq!(sql, "CREATE TABLE `t` (\n`a` TEXT NOT NULL,\n`b` INT NOT NULL\n)");
}

#[test]
fn field_spec_deserializes_from_toml_shape() {
    let spec: FieldSpec = serde_json::from_value(serde_json::json!({
        "type": "enum",
        "constraint": ["a", "b"],
        "null": true,
        "default": "a"
    }))
    .unwrap();
    assert_eq!(spec.constraint, Some(Constraint::List(vec!["a".into(), "b".into()])));
    assert!(spec.null);
    assert!(!spec.unsigned);

    let fk: ForeignKey = serde_json::from_value(serde_json::json!({
        "field": "user_id",
        "reference_table": "users",
        "reference_field": "ID",
        "on_update": "restrict"
    }))
    .unwrap();
    assert_eq!(fk.on_delete, ReferentialAction::Cascade);
    assert_eq!(fk.on_update, ReferentialAction::Restrict);
}
