// src/config/mod.rs

//! Loading deployment inputs from TOML files.
//!
//! - `model.rs`: file-level shapes of the inventory and roles files.
//! - `loader.rs`: reads the files through the [`FileSystem`](crate::fs::FileSystem)
//!   seam and assembles an [`InventoryContext`](crate::inventory::InventoryContext).

pub mod loader;
pub mod model;

pub use loader::{load_context, load_services, parse_service};
pub use model::{InventoryFile, RolesFile};
