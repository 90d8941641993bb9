//! Resource abstraction layer
//!
//! This module provides a data-driven approach to the admin panels' list
//! pages. Resource definitions are loaded from JSON files at compile time,
//! so a new admin page is a new definition rather than new code.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource definitions from embedded JSON
//! - [`fetcher`] - Fetches one page and maps the raw response
//! - [`filter`] - Filter state, matching and query serialization
//! - [`pagination`] - Page/limit/total with clamping
//! - [`validate`] - Required-field checks before create/update
//! - [`export`] - CSV/JSON serialization of the current view
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `platform.json` - Platform admin panel (stores, customers, orders, ...)
//! - `store.json` - Store admin panel, paths scoped by `{store_id}`

pub mod export;
pub mod fetcher;
pub mod filter;
pub mod model;
pub mod pagination;
pub mod registry;
pub mod validate;

pub use export::{ExportBlob, ExportFormat};
pub use fetcher::{fetch_page, PageResult};
pub use filter::{filter_items, FilterState, FilterValue};
pub use model::Resource;
pub use pagination::PaginationState;
pub use registry::{
    get_registry, get_resource, ExportDef, ExportMode, FilterDef, FilterKind, FilterMode, Panel,
    Registry, ResourceDef, SEARCH_FILTER,
};
