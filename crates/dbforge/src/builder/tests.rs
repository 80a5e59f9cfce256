use super::*;
use crate::config::WhereMode;
use crate::memory::{Call, MemoryExecutor};
use crate::row::Row;
use crate::value::{ColumnMap, Value, raw};

fn builder() -> (Arc<MemoryExecutor>, QueryBuilder) {
    let ex = Arc::new(MemoryExecutor::new());
    let qb = QueryBuilder::new(ex.clone());
    (ex, qb)
}

// ── Rendering ──

#[test]
fn where_groups_render_and_then_or() {
    let (_, mut qb) = builder();
    qb.from("posts")
        .where_("a", 1)
        .where_("b", "x")
        .or_where("c", 2)
        .or_like("d", "e", LikeSide::After);
    assert_eq!(
        qb.to_sql(),
        "SELECT * FROM posts WHERE (a = 1 AND b = 'x') OR (c = 2 OR d LIKE 'e%')"
    );
}

#[test]
fn or_group_alone_has_no_leading_or() {
    let (_, mut qb) = builder();
    qb.from("t").or_where("c", 2).or_where("d", 3);
    assert_eq!(qb.to_sql(), "SELECT * FROM t WHERE (c = 2 OR d = 3)");

    qb.reset().from("t");
    assert_eq!(qb.to_sql(), "SELECT * FROM t");
}

#[test]
fn and_group_orders_wheres_before_in_before_like() {
    let (_, mut qb) = builder();
    qb.from("t")
        .like("n", "x", LikeSide::Both)
        .where_not_in("k", ["z"])
        .where_in("id", [1, 2])
        .where_("s", "p");
    assert_eq!(
        qb.to_sql(),
        "SELECT * FROM t WHERE (s = 'p' AND id IN (1, 2) AND k NOT IN ('z') AND n LIKE '%x%')"
    );
}

#[test]
fn empty_in_lists_are_ignored() {
    let (_, mut qb) = builder();
    qb.where_in("id", Vec::<i64>::new())
        .where_not_in("id", Vec::<&str>::new());
    assert!(qb.is_pristine());
}

#[test]
fn key_operators_and_null_tests() {
    let (_, mut qb) = builder();
    qb.from("users")
        .where_("age >", 18)
        .where_("score <=", 9.5)
        .where_("deleted_at", None::<i64>)
        .where_("status !=", Value::Null)
        .where_("updated_at >", raw("created_at"));
    assert_eq!(
        qb.to_sql(),
        "SELECT * FROM users WHERE (age > 18 AND score <= 9.5 AND deleted_at IS NULL \
         AND status IS NOT NULL AND updated_at > created_at)"
    );
}

#[test]
fn values_are_escaped() {
    let (_, mut qb) = builder();
    qb.from("t").where_("name", "O'Brien");
    assert_eq!(qb.to_sql(), "SELECT * FROM t WHERE (name = 'O\\'Brien')");
}

#[test]
fn like_neutralizes_wildcards() {
    let (_, mut qb) = builder();
    qb.from("t").like("name", "50%", LikeSide::Both);
    assert_eq!(qb.to_sql(), "SELECT * FROM t WHERE (name LIKE '%50\\\\%%')");

    qb.reset()
        .from("t")
        .not_like("name", "a_b", LikeSide::Before)
        .like_raw("slug", "x_%", LikeSide::After);
    assert_eq!(
        qb.to_sql(),
        "SELECT * FROM t WHERE (name NOT LIKE '%a\\\\_b' AND slug LIKE 'x_%%')"
    );
}

#[test]
fn joins_are_uppercased_and_prefixed() {
    let ex = Arc::new(MemoryExecutor::with_prefix("wp_"));
    let mut qb = QueryBuilder::new(ex);
    qb.select("p.ID, u.name")
        .from("posts p")
        .join("users u", "u.ID = p.post_author", " left ")
        .join("meta m", "m.post_id = p.ID", "")
        .inner_join("other.tags t", "t.post_id = p.ID");
    assert_eq!(
        qb.to_sql(),
        "SELECT p.ID, u.name FROM wp_posts p \
         LEFT JOIN wp_users u ON u.ID = p.post_author \
         JOIN wp_meta m ON m.post_id = p.ID \
         INNER JOIN other.tags t ON t.post_id = p.ID"
    );
}

#[test]
fn unknown_direction_sorts_ascending() {
    let (_, mut qb) = builder();
    qb.from("t")
        .order_by("x", "sideways")
        .order_by("y", "desc")
        .order_by_desc("z");
    assert_eq!(qb.to_sql(), "SELECT * FROM t ORDER BY x ASC, y DESC, z DESC");
}

#[test]
fn offset_needs_limit() {
    let (_, mut qb) = builder();
    qb.from("t").offset(20);
    assert_eq!(qb.to_sql(), "SELECT * FROM t");

    qb.limit(10);
    assert_eq!(qb.to_sql(), "SELECT * FROM t LIMIT 10 OFFSET 20");

    qb.reset().from("t").paginate(3, 10);
    assert_eq!(qb.to_sql(), "SELECT * FROM t LIMIT 10 OFFSET 20");

    qb.reset().from("t").paginate(0, 0);
    assert_eq!(qb.to_sql(), "SELECT * FROM t LIMIT 1 OFFSET 0");
}

#[test]
fn paginate_saturates_huge_pages() {
    let (_, mut qb) = builder();
    qb.from("t").paginate(u64::MAX, 2);
    assert_eq!(
        qb.to_sql(),
        format!("SELECT * FROM t LIMIT 2 OFFSET {}", u64::MAX)
    );
}

#[test]
fn group_having_and_aggregates() {
    let (_, mut qb) = builder();
    qb.select("author")
        .select_max("price", "")
        .select_sum("qty", "total")
        .distinct()
        .from("orders")
        .group_by("author, status")
        .having("COUNT(*) >", 1);
    assert_eq!(
        qb.to_sql(),
        "SELECT DISTINCT author, MAX(price) AS price, SUM(qty) AS total FROM orders \
         GROUP BY author, status HAVING COUNT(*) > 1"
    );
}

#[test]
fn count_query_wraps_grouped_selects() {
    let (_, mut qb) = builder();
    qb.from("t").where_("a", 1).order_by("x", "ASC").limit(5);
    assert_eq!(
        qb.to_count_sql(),
        "SELECT COUNT(*) AS numrows FROM t WHERE (a = 1)"
    );

    qb.reset().select("a").distinct().from("t");
    assert_eq!(
        qb.to_count_sql(),
        "SELECT COUNT(*) AS numrows FROM (SELECT DISTINCT a FROM t) AS dbforge_count"
    );
}

// ── Execution ──

#[test]
fn get_runs_resets_and_records_last_query() {
    let (ex, mut qb) = builder();
    ex.push_rows(vec![Row::new().with("id", 1), Row::new().with("id", 2)]);

    let rs = qb.from("t").where_("a", 1).get();
    assert_eq!(rs.num_rows(), 2);
    assert!(qb.is_pristine());
    assert_eq!(qb.last_query(), Some("SELECT * FROM t WHERE (a = 1)"));
    assert_eq!(ex.statements(), vec!["SELECT * FROM t WHERE (a = 1)"]);

    // Nothing leaks into the next query.
    qb.get_from("u");
    assert_eq!(qb.last_query(), Some("SELECT * FROM u"));
}

#[test]
fn failed_get_yields_empty_set_and_error() {
    let (ex, mut qb) = builder();
    ex.push_query_error("table t doesn't exist");

    let rs = qb.get_from("t");
    assert!(rs.is_empty());
    assert!(qb.is_pristine());
    let err = qb.error();
    assert!(err.message.unwrap().contains("doesn't exist"));
    assert_eq!(err.query.as_deref(), Some("SELECT * FROM t"));
}

#[test]
fn get_where_applies_limit_and_offset() {
    let (ex, mut qb) = builder();
    qb.get_where("t", [("status", "draft")], Some(5), Some(10));
    assert_eq!(
        ex.statements(),
        vec!["SELECT * FROM t WHERE (status = 'draft') LIMIT 5 OFFSET 10"]
    );
}

#[test]
fn get_limit_applies_limit_and_offset() {
    let (ex, mut qb) = builder();
    qb.get_limit("t", Some(5), Some(10));
    qb.get_limit("t", None, None);
    assert_eq!(
        ex.statements(),
        vec!["SELECT * FROM t LIMIT 5 OFFSET 10", "SELECT * FROM t"]
    );
}

#[test]
fn counts_degrade_to_zero() {
    let (ex, mut qb) = builder();
    ex.push_scalar(42);
    assert_eq!(qb.where_("a", 1).count_all_results_from("t"), 42);
    assert!(qb.is_pristine());

    ex.fail_on("COUNT(*)");
    assert_eq!(qb.count_all_results_from("t"), 0);
    assert!(qb.error().message.is_some());
}

#[test]
fn count_all_keeps_accumulated_state() {
    let (ex, mut qb) = builder();
    ex.seed("t", [one("id", 1), one("id", 2)]);
    qb.from("other").where_("x", 1);
    assert_eq!(qb.count_all("t"), 2);
    assert!(!qb.is_pristine());
    assert_eq!(qb.to_sql(), "SELECT * FROM other WHERE (x = 1)");
}

#[test]
fn successful_count_all_clears_previous_error() {
    let (ex, mut qb) = builder();
    ex.seed("t", [one("id", 1)]);
    ex.push_query_error("lost connection");
    qb.get_from("t");
    assert!(qb.error().message.is_some());

    assert_eq!(qb.count_all("t"), 1);
    assert_eq!(qb.error().message, None);
}

#[test]
fn refusal_outranks_earlier_executor_failure() {
    let (ex, mut qb) = builder();
    ex.fail_on("TRUNCATE");
    assert!(!qb.truncate("t"));
    assert!(qb.error().message.unwrap().contains("injected failure"));

    assert!(!qb.set("a", 1).update("t"));
    let err = qb.error();
    assert!(err.message.unwrap().contains("no WHERE conditions"));
    assert_eq!(err.query.as_deref(), Some("TRUNCATE TABLE t"));
}

// ── Writes ──

#[test]
fn structured_update_passes_equalities_as_map() {
    let (ex, mut qb) = builder();
    assert!(qb.set("title", "x").where_("id", 5).update("posts"));
    assert!(qb.is_pristine());

    let calls = ex.calls();
    let Some(Call::Update { conditions, data, .. }) = calls.last() else {
        panic!("expected update_rows, got {calls:?}");
    };
    assert_eq!(conditions.get("id"), Some(&Value::Int(5)));
    assert_eq!(data.get("title"), Some(&Value::from("x")));
    assert_eq!(
        qb.last_query(),
        Some("UPDATE `posts` SET `title` = 'x' WHERE `id` = 5")
    );
}

#[test]
fn structured_update_renders_what_a_map_cannot_hold() {
    let (ex, mut qb) = builder();
    assert!(
        qb.set("status", "trash")
            .where_("author", 3)
            .where_in("id", [1, 2])
            .update("posts")
    );
    assert_eq!(
        ex.statements(),
        vec!["UPDATE posts SET `status` = 'trash' WHERE (author = 3 AND id IN (1, 2))"]
    );

    // The same column twice.
    qb.set("n", 1).where_("a", 1).where_("a", 2).update("t");
    assert_eq!(
        ex.statements().last().map(String::as_str),
        Some("UPDATE t SET `n` = 1 WHERE (a = 1 AND a = 2)")
    );
}

#[test]
fn legacy_update_drops_non_equalities() {
    let ex = Arc::new(MemoryExecutor::new());
    let config = Arc::new(DbConfig::new().where_mode(WhereMode::Legacy));
    let mut qb = QueryBuilder::with_config(ex.clone(), config);

    assert!(
        qb.set("status", "trash")
            .where_("author", 3)
            .where_in("id", [1, 2])
            .update("posts")
    );
    let calls = ex.calls();
    let Some(Call::Update { conditions, .. }) = calls.last() else {
        panic!("expected update_rows, got {calls:?}");
    };
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions.get("author"), Some(&Value::Int(3)));
}

#[test]
fn raw_set_values_render_the_statement() {
    let (ex, mut qb) = builder();
    assert!(qb.set("hits", raw("hits + 1")).where_("id", 7).update("posts"));
    assert_eq!(
        ex.statements(),
        vec!["UPDATE posts SET `hits` = hits + 1 WHERE (id = 7)"]
    );

    assert!(qb.set("created", raw("NOW()")).set("name", "a").insert("log"));
    assert_eq!(
        ex.statements().last().map(String::as_str),
        Some("INSERT INTO log (`created`, `name`) VALUES (NOW(), 'a')")
    );
}

#[test]
fn raw_set_keeps_expression_keys_as_rendered() {
    let (ex, mut qb) = builder();
    qb.from("t").where_("LOWER(slug)", "x");
    assert_eq!(qb.to_sql(), "SELECT * FROM t WHERE (LOWER(slug) = 'x')");

    assert!(
        qb.reset()
            .set("hits", raw("hits + 1"))
            .where_("LOWER(slug)", "x")
            .where_("DATE(p.created)", "2024-01-01")
            .update("t")
    );
    assert_eq!(
        ex.statements(),
        vec![
            "UPDATE t SET `hits` = hits + 1 \
             WHERE (LOWER(slug) = 'x' AND DATE(p.created) = '2024-01-01')"
        ]
    );
}

#[test]
fn legacy_raw_set_renders_only_surviving_conditions() {
    let ex = Arc::new(MemoryExecutor::new());
    let config = Arc::new(DbConfig::new().where_mode(WhereMode::Legacy));
    let mut qb = QueryBuilder::with_config(ex.clone(), config);

    assert!(
        qb.set("hits", raw("hits + 1"))
            .where_("id", 7)
            .where_("age >", 18)
            .update("posts")
    );
    assert_eq!(
        ex.statements(),
        vec!["UPDATE posts SET `hits` = hits + 1 WHERE (id = 7)"]
    );
}

#[test]
fn writes_without_conditions_are_refused() {
    let (ex, mut qb) = builder();
    assert!(!qb.set("a", 1).update("t"));
    assert!(!qb.delete("t"));
    assert!(!qb.insert("t"));
    assert!(ex.calls().is_empty());
    assert!(qb.is_pristine());
    assert!(qb.error().message.unwrap().contains("no values"));
}

#[test]
fn delete_by_map_and_rendered() {
    let (ex, mut qb) = builder();
    ex.seed("t", [one("id", 1), one("id", 2)]);

    assert!(qb.delete_where("t", [("id", 1)]));
    assert_eq!(ex.rows("t").len(), 1);

    assert!(qb.where_("id >", 0).delete("t"));
    assert_eq!(
        ex.statements().last().map(String::as_str),
        Some("DELETE FROM t WHERE (id > 0)")
    );
}

#[test]
fn whole_table_statements_keep_state() {
    let (ex, mut qb) = builder();
    ex.seed("t", [one("id", 1)]);
    qb.from("x").where_("a", 1);
    assert!(qb.empty_table("t"));
    assert!(ex.rows("t").is_empty());
    assert!(qb.truncate("t"));
    assert!(!qb.is_pristine());
    assert_eq!(qb.last_query(), Some("TRUNCATE TABLE t"));
}

fn one(column: &str, value: impl Into<Value>) -> ColumnMap {
    let mut map = ColumnMap::new();
    map.insert(column.to_string(), value.into());
    map
}
