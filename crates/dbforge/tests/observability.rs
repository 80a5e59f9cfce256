//! Monitor events, failure reporting and the global database slot.

use dbforge::{
    CollectingMonitor, Database, DbConfig, FieldSpec, MemoryExecutor, QueryKind, QueryOutcome,
    global,
};
use std::sync::Arc;

fn monitored() -> (Arc<MemoryExecutor>, Arc<CollectingMonitor>, Database) {
    let ex = Arc::new(MemoryExecutor::new());
    let monitor = Arc::new(CollectingMonitor::new());
    let config = DbConfig::new().debug(true).monitor(monitor.clone());
    let db = Database::new(ex.clone()).with_config(config);
    (ex, monitor, db)
}

#[test]
fn every_statement_reaches_the_monitor() {
    let (ex, monitor, db) = monitored();
    ex.push_scalar(3);

    let mut qb = db.builder();
    qb.from("posts").get();
    qb.count_all_results_from("posts");
    qb.set("title", "x").insert("posts");
    qb.set("title", "y").where_("id", 1).update("posts");
    qb.delete_where("posts", [("id", 1)]);
    db.forge()
        .add_field("a", FieldSpec::new("INT"))
        .create_table("t", true);

    let kinds: Vec<QueryKind> = monitor.events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            QueryKind::Select,
            QueryKind::Select,
            QueryKind::Insert,
            QueryKind::Update,
            QueryKind::Delete,
            QueryKind::Ddl,
        ]
    );
    assert_eq!(monitor.events()[0].outcome, QueryOutcome::Rows(0));
    assert_eq!(
        monitor.statements()[2],
        "INSERT INTO `posts` (`title`) VALUES ('x')"
    );
}

#[test]
fn failures_are_reported_as_error_outcomes() {
    let (ex, monitor, db) = monitored();
    ex.push_query_error("Unknown column 'nope'");

    let rs = db.builder().select("nope").get_from("posts");
    assert!(rs.is_empty());

    let events = monitor.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].outcome.is_error());
    assert_eq!(events[0].sql, "SELECT nope FROM posts");
}

#[test]
fn refused_writes_never_reach_the_monitor() {
    let (_, monitor, db) = monitored();
    assert!(!db.builder().set("a", 1).update("t"));
    assert!(monitor.events().is_empty());
}

#[test]
fn global_slot_installs_once() {
    let db = Database::new(Arc::new(MemoryExecutor::new()));
    let installed = global::install(db).unwrap();
    assert!(Arc::ptr_eq(&installed, &global::get().unwrap()));

    let again = Database::new(Arc::new(MemoryExecutor::new()));
    assert!(global::install(again).is_err());
    assert_eq!(global::get().unwrap().builder().get_from("t").num_rows(), 0);
}
