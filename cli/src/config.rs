use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use menuseed_core::failures::FailureLog;
use menuseed_core::importer::Collections;
use std::path::PathBuf;

pub const DEFAULT_BUCKET_ID: &str = "menu-images";

pub struct Config {
    pub cache_dir: PathBuf,
    pub data_dir: PathBuf,
    pub local_db_path: PathBuf,
    pub backend: BackendSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let proj_dirs =
            ProjectDirs::from("", "", "menuseed").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        let cache_dir = proj_dirs.cache_dir().to_path_buf();
        for dir in [&data_dir, &cache_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        let local_db_path = data_dir.join("local.db");
        let backend = BackendSettings::from_lookup(|key| std::env::var(key).ok());

        Ok(Config {
            cache_dir,
            data_dir,
            local_db_path,
            backend,
        })
    }

    pub fn failure_log(&self) -> FailureLog {
        FailureLog::in_dir(&self.cache_dir)
    }

    /// Where the bundled sample menu and its images are unpacked.
    pub fn sample_dir(&self) -> PathBuf {
        self.cache_dir.join("sample")
    }

    /// Scratch directory for images on their way to the object store.
    pub fn image_scratch_dir(&self) -> PathBuf {
        self.cache_dir.join("images")
    }
}

/// Backend settings read from `APPWRITE_*` environment variables.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub endpoint: Option<String>,
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub database_id: Option<String>,
    pub bucket_id: String,
    pub collections: Collections,
}

/// Everything needed to talk to a live Appwrite project.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
}

impl BackendSettings {
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Collections::default();
        Self {
            endpoint: get("APPWRITE_ENDPOINT").map(|e| e.trim_end_matches('/').to_string()),
            project_id: get("APPWRITE_PROJECT_ID"),
            api_key: get("APPWRITE_API_KEY"),
            database_id: get("APPWRITE_DATABASE_ID"),
            bucket_id: get("APPWRITE_BUCKET_ID").unwrap_or_else(|| DEFAULT_BUCKET_ID.to_string()),
            collections: Collections {
                categories: get("APPWRITE_CATEGORIES_COLLECTION_ID")
                    .unwrap_or(defaults.categories),
                customizations: get("APPWRITE_CUSTOMIZATIONS_COLLECTION_ID")
                    .unwrap_or(defaults.customizations),
                menu: get("APPWRITE_MENU_COLLECTION_ID").unwrap_or(defaults.menu),
                menu_customizations: get("APPWRITE_MENU_CUSTOMIZATIONS_COLLECTION_ID")
                    .unwrap_or(defaults.menu_customizations),
            },
        }
    }

    pub fn remote(&self) -> Result<RemoteSettings> {
        let missing: Vec<&str> = [
            ("APPWRITE_ENDPOINT", &self.endpoint),
            ("APPWRITE_PROJECT_ID", &self.project_id),
            ("APPWRITE_API_KEY", &self.api_key),
            ("APPWRITE_DATABASE_ID", &self.database_id),
        ]
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| *k)
        .collect();

        if !missing.is_empty() {
            bail!(
                "Missing backend configuration: {}. Set them in the environment or a .env file, or pass --local",
                missing.join(", ")
            );
        }

        Ok(RemoteSettings {
            endpoint: self.endpoint.clone().unwrap_or_default(),
            project_id: self.project_id.clone().unwrap_or_default(),
            api_key: self.api_key.clone().unwrap_or_default(),
            database_id: self.database_id.clone().unwrap_or_default(),
        })
    }
}
