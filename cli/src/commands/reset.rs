use anyhow::Result;

use menuseed_core::reset::reset_all;

use super::Stores;
use super::helpers::{confirm, print_json};
use crate::config::Config;

pub(crate) async fn cmd_reset(
    config: &Config,
    stores: &Stores,
    yes: bool,
    json: bool,
) -> Result<()> {
    let collections = &config.backend.collections;
    if !yes {
        let question = format!(
            "Delete every document in {} and every file in bucket '{}' ({})?",
            collections.all().join(", "),
            config.backend.bucket_id,
            stores.label()
        );
        if !confirm(&question)? {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let summary = reset_all(
        stores.documents(),
        stores.objects(),
        collections,
        &config.backend.bucket_id,
        &config.failure_log(),
    )
    .await?;

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "Deleted {} document(s) and {} file(s).",
            summary.documents_deleted, summary.files_deleted
        );
    }
    Ok(())
}
