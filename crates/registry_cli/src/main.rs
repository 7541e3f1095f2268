//! Registry inspection entry point.
//!
//! # Responsibility
//! - Open a registry store, bring its schema up to date and print it.
//! - Dump the rows of one table as JSON for quick local checks.
//!
//! Usage: `registry-cli <db_path> schema` or `registry-cli <db_path> rows <table>`.
//! Set `REGISTRY_LOG_DIR` to an absolute directory to enable file logging.

use log::{info, warn};
use registry_core::{
    core_version, default_log_level, ensure_registry_schema, init_logging, CrudRepository,
    SqliteCrud, Store, Value, REGISTRY_TABLES,
};
use serde_json::{json, Map};
use std::process::ExitCode;

const USAGE: &str = "usage: registry-cli <db_path> schema | registry-cli <db_path> rows <table>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<String, String> {
    if let Ok(log_dir) = std::env::var("REGISTRY_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }

    let (db_path, command) = match args {
        [db_path, command, ..] => (db_path, command.as_str()),
        _ => return Err(USAGE.to_string()),
    };

    let store = Store::open(db_path);
    if store.is_degraded() {
        warn!(
            "event=cli_command module=cli status=degraded command={} db_path={}",
            command, db_path
        );
    }
    ensure_registry_schema(&store).map_err(|err| err.to_string())?;
    info!(
        "event=cli_command module=cli status=start command={} version={}",
        command,
        core_version()
    );

    let crud = SqliteCrud::new(&store);
    let output = match (command, args.get(2)) {
        ("schema", None) => describe_schema(&crud)?,
        ("rows", Some(table)) => dump_rows(&crud, table)?,
        _ => return Err(USAGE.to_string()),
    };
    serde_json::to_string_pretty(&output).map_err(|err| err.to_string())
}

fn describe_schema(crud: &SqliteCrud<'_>) -> Result<serde_json::Value, String> {
    let mut tables = Map::new();
    for table in REGISTRY_TABLES {
        let columns = crud.table_schema(table).map_err(|err| err.to_string())?;
        let primary_key = crud.primary_key(table).map_err(|err| err.to_string())?;
        tables.insert(
            table.to_string(),
            json!({ "primary_key": primary_key, "columns": columns }),
        );
    }
    Ok(serde_json::Value::Object(tables))
}

fn dump_rows(crud: &SqliteCrud<'_>, table: &str) -> Result<serde_json::Value, String> {
    let rows = crud.read(table, None).map_err(|err| err.to_string())?;
    Ok(serde_json::Value::Array(
        rows.into_iter()
            .map(|row| {
                serde_json::Value::Object(
                    row.into_iter()
                        .map(|(column, value)| (column, value_to_json(value)))
                        .collect(),
                )
            })
            .collect(),
    ))
}

fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(value) => json!(value),
        Value::Real(value) => json!(value),
        Value::Text(value) => serde_json::Value::String(value),
        Value::Blob(bytes) => json!(bytes),
    }
}
