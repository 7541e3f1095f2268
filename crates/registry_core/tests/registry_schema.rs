use registry_core::registry::latest_version;
use registry_core::{
    ensure_registry_schema, row, CrudError, CrudRepository, DbError, Params, PrimaryKey,
    SqliteCrud, Store, Value, REGISTRY_TABLES,
};
use tempfile::TempDir;

fn setup() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("registry.db"));
    ensure_registry_schema(&store).unwrap();
    (dir, store)
}

fn user_version(store: &Store) -> i64 {
    let row = store
        .fetch_one("PRAGMA user_version;", &Params::new())
        .unwrap()
        .unwrap();
    match row.get("user_version") {
        Some(Value::Integer(version)) => *version,
        other => panic!("unexpected user_version: {other:?}"),
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

#[test]
fn bootstrap_creates_every_registry_table() {
    let (_dir, store) = setup();
    let crud = SqliteCrud::new(&store);

    assert_eq!(user_version(&store), i64::from(latest_version()));
    for table in REGISTRY_TABLES {
        let schema = crud.table_schema(table).unwrap();
        assert!(!schema.is_empty(), "{table} has no columns");
    }
}

#[test]
fn bootstrap_is_idempotent() {
    let (_dir, store) = setup();
    let crud = SqliteCrud::new(&store);
    crud.create("invoices", &row([("invoice_number", text("INV-1"))]))
        .unwrap();

    ensure_registry_schema(&store).unwrap();
    assert_eq!(user_version(&store), i64::from(latest_version()));
    assert_eq!(crud.read("invoices", None).unwrap().len(), 1);
}

#[test]
fn newer_store_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("future.db"));
    store
        .execute_write("PRAGMA user_version = 999;", &Params::new())
        .unwrap();

    let err = ensure_registry_schema(&store).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn registry_primary_keys() {
    let (_dir, store) = setup();
    let crud = SqliteCrud::new(&store);

    assert_eq!(
        crud.primary_key("invoices").unwrap(),
        PrimaryKey::Single("ID".to_string())
    );
    assert!(crud.primary_key("outstanding_table").unwrap().is_empty());
    assert!(crud.primary_key("daily_summary").unwrap().is_empty());
}

#[test]
fn deleting_an_invoice_cascades_to_its_notes() {
    let (_dir, store) = setup();
    let crud = SqliteCrud::new(&store);

    let invoice_id = crud
        .create(
            "invoices",
            &row([
                ("invoice_number", text("INV-7")),
                ("vendor_name", text("Acme")),
                ("price", Value::Integer(1200)),
            ]),
        )
        .unwrap();
    crud.create(
        "credits_debits_notes",
        &row([
            ("invoice_id", Value::Integer(invoice_id)),
            ("note_number", text("CN-1")),
            ("note_type", text("credit")),
            ("price", Value::Integer(200)),
        ]),
    )
    .unwrap();

    assert_eq!(crud.delete("invoices", &row([("id", invoice_id)])).unwrap(), 1);
    assert!(crud.read("credits_debits_notes", None).unwrap().is_empty());
}

#[test]
fn notes_for_missing_invoice_violate_foreign_key() {
    let (_dir, store) = setup();
    let crud = SqliteCrud::new(&store);

    let err = crud
        .create(
            "credits_debits_notes",
            &row([("invoice_id", Value::Integer(404)), ("note_number", text("DN-1"))]),
        )
        .unwrap_err();
    assert!(matches!(err, CrudError::Db(_)));
}

#[test]
fn daily_summary_view_is_readable_through_crud() {
    let (_dir, store) = setup();
    let crud = SqliteCrud::new(&store);
    for number in ["INV-1", "INV-2"] {
        crud.create(
            "invoices",
            &row([("invoice_number", text(number)), ("due_date", text("2025-03-01"))]),
        )
        .unwrap();
    }

    let summary = crud
        .read("daily_summary", Some(&row([("due_date", text("2025-03-01"))])))
        .unwrap();
    assert_eq!(
        summary,
        vec![row([
            ("due_date", text("2025-03-01")),
            ("total_outstanding", Value::Integer(0)),
            ("total_payment", Value::Integer(0)),
            ("total_invoices", Value::Integer(2)),
        ])]
    );
}
