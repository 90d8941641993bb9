//! Admin panels
//!
//! The platform panel covers marketplace-wide resources; a store panel covers
//! one store's resources with `{store_id}` resolved in every path.

use crate::api::{ApiClient, ApiHttpClient, AuthContext, StoredToken};
use crate::config::Config;
use crate::controller::{ResourceListController, DEFAULT_SEARCH_DEBOUNCE};
use crate::resource::pagination::DEFAULT_LIMIT;
use crate::resource::registry::{Panel, Registry};
use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Factory for the controllers of one panel
#[derive(Clone)]
pub struct AdminPanel {
    client: ApiClient,
    registry: Arc<Registry>,
    panel: Panel,
    store_id: Option<String>,
    page_size: u32,
    debounce: Duration,
}

impl AdminPanel {
    pub fn platform(client: ApiClient, registry: Registry) -> Self {
        Self {
            client,
            registry: Arc::new(registry),
            panel: Panel::Platform,
            store_id: None,
            page_size: DEFAULT_LIMIT,
            debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }

    pub fn store(client: ApiClient, registry: Registry, store_id: &str) -> Self {
        Self {
            panel: Panel::Store,
            store_id: Some(store_id.to_string()),
            ..Self::platform(client, registry)
        }
    }

    /// Build a panel from persisted config and environment overrides
    pub fn from_config(config: &Config, panel: Panel) -> Result<Self> {
        let auth = AuthContext::new(StoredToken::new(config.effective_token_file()));
        let http = ApiHttpClient::with_timeout(config.request_timeout())?;
        let client = ApiClient::new(&config.effective_api_url(), auth, http)?;

        let mut registry = Registry::embedded();
        if let Some(path) = &config.resource_overrides {
            registry.extend_from_file(path)?;
        }

        let admin = match panel {
            Panel::Platform => Self::platform(client, registry),
            Panel::Store => {
                let store_id = config
                    .store_id
                    .as_deref()
                    .context("The store panel needs a store_id in the config")?;
                Self::store(client, registry, store_id)
            }
        };

        Ok(admin
            .with_page_size(config.page_size)
            .with_debounce(config.search_debounce()))
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn store_id(&self) -> Option<&str> {
        self.store_id.as_deref()
    }

    /// Resource keys shown in this panel's navigation
    pub fn resource_keys(&self) -> Vec<&str> {
        self.registry.keys_for_panel(self.panel)
    }

    /// Controller for one of this panel's resources
    pub fn controller(&self, key: &str) -> Result<ResourceListController> {
        let def = self
            .registry
            .get(key)
            .ok_or_else(|| anyhow!("Unknown resource: {}", key))?;

        if def.panel != self.panel {
            bail!("{} does not belong to the {:?} panel", key, self.panel);
        }

        let def = match &self.store_id {
            Some(store_id) => def.scoped_to_store(store_id),
            None if def.needs_store_scope() => bail!("{} needs a store id", key),
            None => def.clone(),
        };

        let limit = def.default_limit.unwrap_or(self.page_size);
        tracing::debug!("Opening {} ({}) with page size {}", key, def.path, limit);

        Ok(ResourceListController::new(self.client.clone(), def)
            .with_page_size(limit)
            .with_debounce(self.debounce))
    }
}
