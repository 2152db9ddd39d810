use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::models::{Category, Customization, MenuItem, Named};

/// The static menu dataset a seed run imports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub categories: Vec<Category>,
    pub customizations: Vec<Customization>,
    pub menu: Vec<MenuItem>,
}

impl Dataset {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let dataset: Dataset =
            serde_json::from_reader(reader).context("Failed to parse dataset JSON")?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_reader(json.as_bytes())
    }

    /// Load a dataset file. Relative image paths resolve against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset: {}", path.display()))?;
        let mut dataset = Self::from_reader(file)
            .with_context(|| format!("Invalid dataset: {}", path.display()))?;
        dataset.resolve_image_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(dataset)
    }

    /// Turn image references without a URL scheme into `file://` URLs under `base`.
    pub fn resolve_image_paths(&mut self, base: &Path) {
        for item in &mut self.menu {
            if !item.image_url.contains("://") {
                item.image_url = format!("file://{}", base.join(&item.image_url).display());
            }
        }
    }

    /// Names are identity keys, so each section must be free of duplicates.
    pub fn validate(&self) -> Result<()> {
        check_unique("category", &self.categories)?;
        check_unique("customization", &self.customizations)?;
        check_unique("menu item", &self.menu)?;
        Ok(())
    }

    /// Menu items whose category is not part of the dataset.
    #[must_use]
    pub fn orphaned_items(&self) -> Vec<&MenuItem> {
        let known: HashSet<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
        self.menu
            .iter()
            .filter(|m| !known.contains(m.category_name.as_str()))
            .collect()
    }
}

fn check_unique<T: Named>(what: &str, records: &[T]) -> Result<()> {
    let mut seen = HashSet::new();
    for record in records {
        let name = record.name();
        if name.trim().is_empty() {
            bail!("Empty {what} name in dataset");
        }
        if !seen.insert(name) {
            bail!("Duplicate {what} name in dataset: '{name}'");
        }
    }
    Ok(())
}
