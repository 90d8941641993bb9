//! Resource Registry - Load resource definitions from JSON
//!
//! Every admin page is described by a [`ResourceDef`]: where its endpoint
//! lives, how items are identified, which filters it offers and how it
//! exports. Definitions for both panels are embedded at compile time; a YAML
//! override file can replace or add definitions at runtime.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/platform.json"),
    include_str!("../resources/store.json"),
];

/// Placeholder in store-panel paths
pub const STORE_ID_PLACEHOLDER: &str = "{store_id}";

/// Reserved free-text filter name
pub const SEARCH_FILTER: &str = "search";

const DEFAULT_ID_FIELD: &str = "id";

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

/// Which admin panel a resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    #[default]
    Platform,
    Store,
}

/// How a filter value is compared against a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Field equals the value (status, category, role)
    #[default]
    Exact,
    /// Case-insensitive substring over one or more fields
    Search,
    /// Field date falls inside an inclusive range
    DateRange,
}

/// Filter definition from JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterDef {
    pub name: String,
    #[serde(default)]
    pub kind: FilterKind,
    /// Field path to compare; defaults to the filter name
    #[serde(default)]
    pub field: Option<String>,
    /// Fields for search filters; empty means the resource's searchable fields
    #[serde(default)]
    pub fields: Vec<String>,
    /// Allowed values for enum filters (for building select boxes)
    #[serde(default)]
    pub options: Vec<String>,
}

impl FilterDef {
    pub fn exact(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FilterKind::Exact,
            field: None,
            fields: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn search(name: &str) -> Self {
        Self {
            kind: FilterKind::Search,
            ..Self::exact(name)
        }
    }

    pub fn date_range(name: &str, field: &str) -> Self {
        Self {
            kind: FilterKind::DateRange,
            field: Some(field.to_string()),
            ..Self::exact(name)
        }
    }

    pub fn field_path(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

/// Where filtering and pagination happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Filters and page/limit are sent as query parameters
    #[default]
    Server,
    /// The full set is fetched once and filtered/paged locally
    Client,
}

/// Where exports are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Serialize the current view locally
    #[default]
    Client,
    /// Download from a dedicated backend endpoint
    Server,
}

/// Export configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExportDef {
    #[serde(default)]
    pub mode: ExportMode,
    /// Endpoint path for server exports; defaults to `{path}/export`
    #[serde(default)]
    pub path: Option<String>,
    /// Column order for CSV; empty means every field seen
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Status derived from a validity window when the server omits it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DerivedStatusDef {
    #[serde(default = "default_status_field")]
    pub field: String,
    pub start_field: String,
    pub end_field: String,
}

fn default_status_field() -> String {
    "status".to_string()
}

/// Resource definition from JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceDef {
    /// Registry key, filled in on load
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub panel: Panel,
    pub display_name: String,
    /// Collection path relative to the API base URL
    pub path: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Dot path to the item array inside `data`; empty when `data` is the array
    #[serde(default)]
    pub response_path: String,
    #[serde(default)]
    pub searchable_fields: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterDef>,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub default_limit: Option<u32>,
    #[serde(default)]
    pub filter_mode: FilterMode,
    #[serde(default)]
    pub export: ExportDef,
    #[serde(default)]
    pub derived_status: Option<DerivedStatusDef>,
    /// Create/update bodies go out as multipart forms (image uploads)
    #[serde(default)]
    pub multipart: bool,
}

impl ResourceDef {
    /// Minimal definition; remaining settings via the `with_*` builders
    pub fn new(key: &str, path: &str) -> Self {
        Self {
            key: key.to_string(),
            panel: Panel::Platform,
            display_name: key.to_string(),
            path: path.to_string(),
            id_field: default_id_field(),
            response_path: String::new(),
            searchable_fields: Vec::new(),
            filters: Vec::new(),
            required_fields: Vec::new(),
            default_limit: None,
            filter_mode: FilterMode::Server,
            export: ExportDef::default(),
            derived_status: None,
            multipart: false,
        }
    }

    pub fn with_searchable(mut self, fields: &[&str]) -> Self {
        self.searchable_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_filter(mut self, filter: FilterDef) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    pub fn with_export(mut self, export: ExportDef) -> Self {
        self.export = export;
        self
    }

    pub fn with_derived_status(mut self, start_field: &str, end_field: &str) -> Self {
        self.derived_status = Some(DerivedStatusDef {
            field: default_status_field(),
            start_field: start_field.to_string(),
            end_field: end_field.to_string(),
        });
        self
    }

    /// Filter definition by name
    pub fn filter(&self, name: &str) -> Option<&FilterDef> {
        self.filters.iter().find(|f| f.name == name)
    }

    /// Comparison kind for a filter, including undeclared ones
    pub fn filter_kind(&self, name: &str) -> FilterKind {
        match self.filter(name) {
            Some(def) => def.kind,
            None if name == SEARCH_FILTER => FilterKind::Search,
            None => FilterKind::Exact,
        }
    }

    pub fn export_path(&self) -> String {
        self.export
            .path
            .clone()
            .unwrap_or_else(|| format!("{}/export", self.path.trim_end_matches('/')))
    }

    /// Copy with `{store_id}` substituted in every path
    pub fn scoped_to_store(&self, store_id: &str) -> Self {
        let mut def = self.clone();
        def.path = def.path.replace(STORE_ID_PLACEHOLDER, store_id);
        def.export.path = def
            .export
            .path
            .map(|p| p.replace(STORE_ID_PLACEHOLDER, store_id));
        def
    }

    pub fn needs_store_scope(&self) -> bool {
        self.path.contains(STORE_ID_PLACEHOLDER)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
struct ResourceFile {
    #[serde(default)]
    panel: Panel,
    #[serde(default)]
    resources: HashMap<String, ResourceDef>,
}

/// Lookup table of resource definitions
#[derive(Debug, Clone, Default)]
pub struct Registry {
    resources: HashMap<String, ResourceDef>,
}

impl Registry {
    /// Registry of the embedded definitions
    pub fn embedded() -> Self {
        get_registry().clone()
    }

    fn parse_embedded() -> Result<Self> {
        let mut registry = Self::default();
        for content in RESOURCE_FILES {
            let file: ResourceFile =
                serde_json::from_str(content).context("Failed to parse embedded resource JSON")?;
            registry.merge(file);
        }
        Ok(registry)
    }

    fn merge(&mut self, file: ResourceFile) {
        for (key, mut def) in file.resources {
            def.key = key.clone();
            def.panel = file.panel;
            self.resources.insert(key, def);
        }
    }

    /// Replace or add definitions from YAML (same shape as the JSON files)
    pub fn extend_from_yaml(&mut self, content: &str) -> Result<usize> {
        let file: ResourceFile =
            serde_yaml::from_str(content).context("Failed to parse resource overrides")?;
        let count = file.resources.len();
        self.merge(file);
        Ok(count)
    }

    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resource overrides {:?}", path))?;
        let count = self.extend_from_yaml(&content)?;
        tracing::info!("Loaded {} resource overrides from {:?}", count, path);
        Ok(count)
    }

    pub fn get(&self, key: &str) -> Option<&ResourceDef> {
        self.resources.get(key)
    }

    /// Keys of one panel, sorted
    pub fn keys_for_panel(&self, panel: Panel) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .resources
            .values()
            .filter(|def| def.panel == panel)
            .map(|def| def.key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        Registry::parse_embedded().unwrap_or_else(|e| {
            tracing::error!("{:#}", e);
            Registry::default()
        })
    })
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().get(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_files_parse() {
        let registry = Registry::parse_embedded().expect("embedded resource JSON must parse");
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_products_resource_exists() {
        let products = get_resource("products").expect("products should exist");
        assert_eq!(products.display_name, "Products");
        assert_eq!(products.panel, Panel::Platform);
        assert!(products.required_fields.contains(&"name".to_string()));
        assert_eq!(products.filter_kind(SEARCH_FILTER), FilterKind::Search);
    }

    #[test]
    fn test_store_resources_are_scoped() {
        let registry = get_registry();
        let keys = registry.keys_for_panel(Panel::Store);
        assert!(keys.contains(&"store-products"));
        for key in keys {
            let def = registry.get(key).unwrap();
            assert!(def.needs_store_scope(), "{} should carry {{store_id}}", key);
        }
    }

    #[test]
    fn test_scoped_to_store_substitutes_paths() {
        let def = get_resource("store-orders").unwrap().scoped_to_store("st-9");
        assert_eq!(def.path, "stores/st-9/orders");
        assert!(!def.export_path().contains(STORE_ID_PLACEHOLDER));
    }

    #[test]
    fn test_promotions_derive_status() {
        let promotions = get_resource("promotions").unwrap();
        let derived = promotions.derived_status.as_ref().unwrap();
        assert_eq!(derived.field, "status");
    }

    #[test]
    fn test_yaml_override_replaces_definition() {
        let mut registry = Registry::embedded();
        let yaml = r#"
panel: platform
resources:
  products:
    display_name: Catalog
    path: catalog/items
    filter_mode: client
"#;
        assert_eq!(registry.extend_from_yaml(yaml).unwrap(), 1);
        let products = registry.get("products").unwrap();
        assert_eq!(products.path, "catalog/items");
        assert_eq!(products.filter_mode, FilterMode::Client);
        assert_eq!(products.key, "products");
    }

    #[test]
    fn test_undeclared_filter_defaults_to_exact() {
        let def = ResourceDef::new("things", "things");
        assert_eq!(def.filter_kind("status"), FilterKind::Exact);
        assert_eq!(def.export_path(), "things/export");
    }
}
