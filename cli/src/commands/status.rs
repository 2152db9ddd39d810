use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::config::Config;

#[derive(Serialize)]
struct Status {
    backend: &'static str,
    endpoint: Option<String>,
    project_id: Option<String>,
    database_id: Option<String>,
    bucket_id: String,
    collections: Vec<String>,
    local_db: String,
    failure_log: String,
    pending_failures: Vec<String>,
    failure_log_modified: Option<String>,
}

pub(crate) fn cmd_status(config: &Config, json: bool) -> Result<()> {
    let backend = &config.backend;
    let failures = config.failure_log();
    let modified = std::fs::metadata(failures.path())
        .and_then(|m| m.modified())
        .ok()
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string());

    let status = Status {
        backend: if backend.remote().is_ok() {
            "appwrite"
        } else {
            "unconfigured (use --local)"
        },
        endpoint: backend.endpoint.clone(),
        project_id: backend.project_id.clone(),
        database_id: backend.database_id.clone(),
        bucket_id: backend.bucket_id.clone(),
        collections: backend
            .collections
            .all()
            .iter()
            .map(ToString::to_string)
            .collect(),
        local_db: config.local_db_path.display().to_string(),
        failure_log: failures.path().display().to_string(),
        pending_failures: failures.load(),
        failure_log_modified: modified,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Setting")]
        key: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let row = |key: &'static str, value: String| Row { key, value };
    let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| "(unset)".to_string());
    let rows = vec![
        row("Backend", status.backend.to_string()),
        row("Endpoint", or_unset(&status.endpoint)),
        row("Project", or_unset(&status.project_id)),
        row("Database", or_unset(&status.database_id)),
        row("Bucket", status.bucket_id.clone()),
        row("Collections", status.collections.join(", ")),
        row("Data dir", config.data_dir.display().to_string()),
        row("Local DB", status.local_db.clone()),
        row("Failure log", status.failure_log.clone()),
    ];
    println!("{}", Table::new(&rows).with(Style::rounded()));

    if status.pending_failures.is_empty() {
        println!("No pending failures; the next seed processes every menu item.");
    } else {
        println!(
            "{} item(s) pending retry (recorded {}):",
            status.pending_failures.len(),
            status.failure_log_modified.as_deref().unwrap_or("unknown")
        );
        for name in &status.pending_failures {
            println!("  - {name}");
        }
    }
    Ok(())
}
