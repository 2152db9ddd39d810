mod helpers;
mod menu;
mod reset;
mod seed;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::appwrite::AppwriteClient;
use crate::config::Config;
use menuseed_core::backend::{DocumentStore, ObjectStore};
use menuseed_core::db::LocalBackend;

pub(crate) use menu::{cmd_categories, cmd_menu};
pub(crate) use reset::cmd_reset;
pub(crate) use seed::{SeedArgs, cmd_seed};
pub(crate) use status::cmd_status;

/// The document and object stores a command runs against.
pub(crate) enum Stores {
    Remote(AppwriteClient),
    Local(LocalBackend),
}

impl Stores {
    /// `local` is `None` for the live backend, `Some(None)` for the default
    /// local database, `Some(Some(path))` for an explicit one.
    pub(crate) fn open(config: &Config, local: Option<Option<PathBuf>>) -> Result<Self> {
        match local {
            None => {
                let remote = config.backend.remote()?;
                info!(endpoint = %remote.endpoint, "using Appwrite backend");
                Ok(Stores::Remote(AppwriteClient::new(&remote)?))
            }
            Some(path) => {
                let path = path.unwrap_or_else(|| config.local_db_path.clone());
                info!(path = %path.display(), "using local backend");
                Ok(Stores::Local(LocalBackend::open(&path)?))
            }
        }
    }

    pub(crate) fn documents(&self) -> &dyn DocumentStore {
        match self {
            Stores::Remote(client) => client,
            Stores::Local(local) => local,
        }
    }

    pub(crate) fn objects(&self) -> &dyn ObjectStore {
        match self {
            Stores::Remote(client) => client,
            Stores::Local(local) => local,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Stores::Remote(_) => "appwrite",
            Stores::Local(_) => "local",
        }
    }
}
