//! Data layer for the platform and store admin panels of an alcohol delivery
//! marketplace.
//!
//! Every admin page is a list of one resource type (stores, orders,
//! promotions, ...) with filters, pagination and CRUD. A single
//! [`ResourceListController`] drives all of them from a [`ResourceDef`].
//!
//! ```ignore
//! use cellar_admin::{AdminPanel, Config, FilterValue, Panel};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let panel = AdminPanel::from_config(&Config::load(), Panel::Platform)?;
//!     let orders = panel.controller("orders")?;
//!     orders.set_filter("status", FilterValue::from_input("Pending"));
//!     orders.load().await?;
//!     println!("{} pending orders", orders.pagination().total());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod logging;
pub mod notice;
pub mod panel;
pub mod resource;

pub use api::{ApiClient, ApiError, AuthContext, Payload, StaticToken, StoredToken, TokenProvider};
pub use config::Config;
pub use controller::{BulkRemoval, ListState, LoadOutcome, RequestLifecycle, ResourceListController};
pub use logging::{setup_logging, LogLevel};
pub use notice::{Notice, NoticeBoard, NoticeLevel, Operation};
pub use panel::AdminPanel;
pub use resource::{
    ExportBlob, ExportFormat, FilterState, FilterValue, PaginationState, Panel, Resource, ResourceDef,
};
