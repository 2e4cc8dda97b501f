//! End-to-end tests of the query facade against pooled SQLite data sources.

mod common;

use common::{Account, Fixture};
use sqlweave::{
    assert_weave_error, Condition, ConditionSet, NamedParams, OrderBy, PageRequest, PageResult, Row, Value,
    WeaveError,
};

fn seed(fixture: &Fixture, count: i64) {
    let session = fixture.session();
    let template = session.template();
    for i in 1..=count {
        template
            .insert("accounts", &Account::new(&format!("owner{:02}", i), i * 10))
            .unwrap();
    }
}

#[test]
fn test_select_with_mixed_conditions() {
    let fixture = Fixture::new(&["main"]);
    seed(&fixture, 10);
    let session = fixture.session();

    let conditions = ConditionSet::all()
        .ge("balance", 30)
        .group(
            ConditionSet::any()
                .is_in("owner", vec!["owner03", "owner09"])
                .between("balance", 95, 100),
        );
    let accounts: Vec<Account> = session
        .template()
        .select_ordered("accounts", &conditions, &[OrderBy::desc("balance")])
        .unwrap();

    let owners: Vec<&str> = accounts.iter().map(|a| a.owner.as_str()).collect();
    assert_eq!(owners, vec!["owner10", "owner09", "owner03"]);
    assert!(fixture.all_idle());
}

#[test]
fn test_update_and_delete_by_condition() {
    let fixture = Fixture::new(&["main"]);
    seed(&fixture, 5);
    let session = fixture.session();
    let template = session.template();

    let mut patch = Row::new();
    patch.insert("balance".to_string(), serde_json::json!(0));
    let updated = template
        .update("accounts", &patch, &ConditionSet::all().lt("balance", 30))
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(
        template
            .count("accounts", &ConditionSet::all().eq("balance", 0))
            .unwrap(),
        2
    );

    let deleted = template
        .delete("accounts", &ConditionSet::all().with(Condition::raw("balance = ? or owner = ?", vec![
            Value::Integer(0),
            Value::Text("owner05".to_string()),
        ])))
        .unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(fixture.count("main", "accounts"), 2);
}

#[test]
fn test_destructive_policy_runs_before_connection_resolution() {
    // a single-connection pool whose only connection is held: any resolution would time out
    let fixture = Fixture::with_pool_size(&["main"], 1);
    let held = fixture.registry.get("main").unwrap().connection().unwrap();
    let session = fixture.session();
    let template = session.template();

    assert_weave_error!(
        template.delete("accounts", &ConditionSet::all()),
        WeaveError::ConditionRequired("delete"),
        "delete without conditions"
    );
    assert_weave_error!(
        template.update("accounts", &Account::new("x", 1), &ConditionSet::any()),
        WeaveError::ConditionRequired("update"),
        "update without conditions"
    );
    assert_weave_error!(
        template.query_rows("select * from accounts where id = {id}", NamedParams::new()),
        WeaveError::MissingParameter(_),
        "missing named parameter"
    );
    assert_eq!(fixture.registry.checked_out(), 1);
    drop(held);
}

#[test]
fn test_select_one_duplicates() {
    let fixture = Fixture::new(&["main"]);
    let session = fixture.session();
    let template = session.template();
    template.insert("accounts", &Account::new("twin", 1)).unwrap();
    template.insert("accounts", &Account::new("twin", 1)).unwrap();

    let duplicate: sqlweave::Result<Option<Account>> = template.select_one(
        "select * from accounts where owner = {owner}",
        NamedParams::new().with("owner", "twin"),
    );
    assert_weave_error!(duplicate, WeaveError::MultipleRows(2), "duplicate rows");

    let nobody: Option<Account> = template
        .select_one(
            "select * from accounts where owner = {owner}",
            NamedParams::new().with("owner", "nobody"),
        )
        .unwrap();
    assert_eq!(nobody, None);
    assert!(fixture.all_idle());
}

#[test]
fn test_pages_with_default_and_custom_count() {
    let fixture = Fixture::new(&["main"]);
    seed(&fixture, 25);
    let session = fixture.session();
    let template = session.template();

    let request = PageRequest::new(1, 10).with_params(NamedParams::new().with("min", 0));
    let first: PageResult<Account> = template
        .select_page("select * from accounts where balance > {min} order by id", &request)
        .unwrap();
    assert_eq!(first.total_count, 25);
    assert_eq!(first.page_total, 3);
    assert_eq!(first.rows.len(), 10);
    assert!(first.has_next());

    // 20 matching rows: an exact multiple adds no extra page
    let request = PageRequest::new(2, 10).with_params(NamedParams::new().with("max", 200));
    let second: PageResult<Account> = template
        .select_page_with_count(
            "select * from accounts where balance <= {max} order by id",
            "select count(*) as total from accounts where balance <= {max}",
            &request,
        )
        .unwrap();
    assert_eq!(second.total_count, 20);
    assert_eq!(second.page_total, 2);
    assert_eq!(second.rows.first().map(|a| a.owner.as_str()), Some("owner11"));
    assert!(!second.has_next());

    let invalid: sqlweave::Result<PageResult<Account>> =
        template.select_page("select * from accounts", &PageRequest::new(1, 0));
    assert_weave_error!(invalid, WeaveError::InvalidPage(_), "zero page size");
}

#[test]
fn test_rows_and_positional_args() {
    let fixture = Fixture::new(&["main"]);
    seed(&fixture, 3);
    let session = fixture.session();
    let template = session.template();

    let rows = template
        .query_rows(
            "select owner, balance * 2 as doubled from accounts where id between ? and ? order by id",
            vec![Value::Integer(2), Value::Integer(3)],
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["owner"], serde_json::json!("owner02"));
    assert_eq!(rows[1]["doubled"], serde_json::json!(60));
}

#[test]
fn test_unknown_data_source() {
    let fixture = Fixture::new(&["main"]);
    let session = fixture.session();
    assert_weave_error!(
        session.template_for("missing"),
        WeaveError::UnknownDataSource(_),
        "unknown data source"
    );
}
