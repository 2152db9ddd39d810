//! The seed pipeline: reconcile reference data, pick the resume set, import
//! menu items in bounded groups, and record what failed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::batch::run_batches;
use crate::dataset::Dataset;
use crate::failures::FailureLog;
use crate::images::ImageTransfer;
use crate::models::{MenuCustomization, MenuDocument, MenuItem, new_id, to_fields};
use crate::reconcile::{IdMap, find_by, reconcile_all};
use crate::resume::select_items;

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Collection ids on the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collections {
    pub categories: String,
    pub customizations: String,
    pub menu: String,
    pub menu_customizations: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            categories: "categories".to_string(),
            customizations: "customization".to_string(),
            menu: "menu".to_string(),
            menu_customizations: "menu_customization".to_string(),
        }
    }
}

impl Collections {
    /// All collections, in the order a reset should clear them.
    #[must_use]
    pub fn all(&self) -> [&str; 4] {
        [
            &self.categories,
            &self.customizations,
            &self.menu,
            &self.menu_customizations,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub collections: Collections,
    pub bucket: String,
    /// Where images are downloaded before upload.
    pub scratch_dir: PathBuf,
    pub concurrency: usize,
    pub max_retries: u32,
}

impl SeedOptions {
    pub fn new(bucket: impl Into<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            collections: Collections::default(),
            bucket: bucket.into(),
            scratch_dir: scratch_dir.into(),
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Name→id maps for reference data, valid for one run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIds {
    pub categories: IdMap,
    pub customizations: IdMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Imported { menu_id: String, links: usize },
    AlreadyPresent { menu_id: String },
    Failed { reason: String },
}

impl ItemOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !matches!(self, ItemOutcome::Failed { .. })
    }

    #[must_use]
    pub fn menu_id(&self) -> Option<&str> {
        match self {
            ItemOutcome::Imported { menu_id, .. } | ItemOutcome::AlreadyPresent { menu_id } => {
                Some(menu_id.as_str())
            }
            ItemOutcome::Failed { .. } => None,
        }
    }
}

/// Summary of one seed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    /// Menu items in the dataset.
    pub total: usize,
    /// Menu items processed this run.
    pub selected: usize,
    /// Whether the run was narrowed to a previous run's failures.
    pub resumed: bool,
    pub groups: usize,
    pub imported: usize,
    pub already_present: usize,
    pub links_created: usize,
    pub failed: Vec<String>,
    pub failure_log_saved: bool,
}

impl SeedReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.imported + self.already_present
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn summary_line(&self) -> String {
        format!("{}/{} succeeded", self.succeeded(), self.selected)
    }
}

pub struct Importer<'a> {
    backend: Backend<'a>,
    options: &'a SeedOptions,
    failures: &'a FailureLog,
}

impl<'a> Importer<'a> {
    pub fn new(backend: Backend<'a>, options: &'a SeedOptions, failures: &'a FailureLog) -> Self {
        Self {
            backend,
            options,
            failures,
        }
    }

    /// Ensure every category and customization exists exactly once.
    ///
    /// Runs strictly in sequence; any error aborts the run.
    pub async fn reconcile_reference_data(&self, dataset: &Dataset) -> Result<ReferenceIds> {
        let collections = &self.options.collections;
        let categories = reconcile_all(
            self.backend.documents,
            &collections.categories,
            &dataset.categories,
        )
        .await
        .context("Failed to reconcile categories")?;
        let customizations = reconcile_all(
            self.backend.documents,
            &collections.customizations,
            &dataset.customizations,
        )
        .await
        .context("Failed to reconcile customizations")?;
        Ok(ReferenceIds {
            categories,
            customizations,
        })
    }

    /// Import one menu item. Never fails the batch: errors become
    /// [`ItemOutcome::Failed`].
    pub async fn import_item(&self, item: &MenuItem, refs: &ReferenceIds) -> ItemOutcome {
        match self.try_import_item(item, refs).await {
            Ok(outcome) => {
                match &outcome {
                    ItemOutcome::Imported { links, .. } => {
                        info!(item = %item.name, links, "menu item created");
                    }
                    ItemOutcome::AlreadyPresent { .. } => {
                        info!(item = %item.name, "menu item already present, skipping");
                    }
                    ItemOutcome::Failed { reason } => {
                        warn!(item = %item.name, reason = %reason, "menu item failed");
                    }
                }
                outcome
            }
            Err(e) => {
                warn!(item = %item.name, error = %format!("{e:#}"), "menu item failed");
                ItemOutcome::Failed {
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    async fn try_import_item(&self, item: &MenuItem, refs: &ReferenceIds) -> Result<ItemOutcome> {
        let collections = &self.options.collections;
        let documents = self.backend.documents;

        if let Some(existing) = find_by(documents, &collections.menu, "name", &item.name)
            .await
            .context("Failed to look up menu item")?
        {
            return Ok(ItemOutcome::AlreadyPresent {
                menu_id: existing.id,
            });
        }

        let Some(category_id) = refs.categories.get(&item.category_name) else {
            return Ok(ItemOutcome::Failed {
                reason: format!("unknown category '{}'", item.category_name),
            });
        };

        let transfer = ImageTransfer {
            fetcher: self.backend.fetcher,
            objects: self.backend.objects,
            bucket: &self.options.bucket,
            scratch_dir: &self.options.scratch_dir,
            max_retries: self.options.max_retries,
        };
        let Some(image_url) = transfer.upload(&item.image_url).await else {
            return Ok(ItemOutcome::Failed {
                reason: format!("could not transfer image {}", item.image_url),
            });
        };

        let doc = MenuDocument::from_source(item, category_id, image_url);
        let created = documents
            .create_document(&collections.menu, &new_id(), &to_fields("menu", &doc)?)
            .await
            .context("Failed to create menu document")?;

        let mut links = 0;
        for name in &item.customizations {
            let Some(customization_id) = refs.customizations.get(name) else {
                debug!(item = %item.name, customization = %name, "unknown customization, skipping");
                continue;
            };
            let link = MenuCustomization {
                menu: created.id.clone(),
                customization: customization_id.to_string(),
            };
            documents
                .create_document(
                    &collections.menu_customizations,
                    &new_id(),
                    &to_fields("menu customization", &link)?,
                )
                .await
                .with_context(|| format!("Failed to link customization '{name}'"))?;
            links += 1;
        }

        Ok(ItemOutcome::Imported {
            menu_id: created.id,
            links,
        })
    }

    /// Run the whole pipeline against `dataset`.
    pub async fn run(&self, dataset: &Dataset) -> Result<SeedReport> {
        info!(
            categories = dataset.categories.len(),
            customizations = dataset.customizations.len(),
            menu = dataset.menu.len(),
            "starting seed"
        );

        tokio::fs::create_dir_all(&self.options.scratch_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create scratch directory: {}",
                    self.options.scratch_dir.display()
                )
            })?;

        let refs = self.reconcile_reference_data(dataset).await?;

        let selection = select_items(&dataset.menu, self.failures);
        let outcome = run_batches(&selection.items, self.options.concurrency, |item| {
            self.import_item(item, &refs)
        })
        .await;

        let mut report = SeedReport {
            total: dataset.menu.len(),
            selected: selection.items.len(),
            resumed: selection.resumed,
            groups: outcome.groups,
            ..SeedReport::default()
        };
        for (item, result) in outcome.results {
            match result {
                ItemOutcome::Imported { links, .. } => {
                    report.imported += 1;
                    report.links_created += links;
                }
                ItemOutcome::AlreadyPresent { .. } => report.already_present += 1,
                ItemOutcome::Failed { .. } => report.failed.push(item.name.clone()),
            }
        }

        report.failure_log_saved = match self.failures.save(&report.failed) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not record failures");
                false
            }
        };

        info!(summary = %report.summary_line(), "seed finished");
        Ok(report)
    }
}
