//! # Trueno-Datamodel
//!
//! Item-model to chart-data resolution for 3D scatter visualizations.
//!
//! Tabular sources publish change events; a role mapping says which table
//! roles feed each chart attribute; a resolver turns the table into an
//! ordered array of positioned items; and a proxy owns that array, exposes
//! an edit API, and tells renderers what changed.
//!
//! ## Pipeline
//!
//! - **Source**: [`source::SourceTable`] plus the in-memory [`source::ItemTable`]
//! - **Mapping**: [`mapping::RoleMapping`] from [`mapping::Role`] to table roles
//! - **Tracker**: [`tracker::ChangeTracker`] collapses bursts into one resolve
//! - **Resolver**: [`resolver::resolve`] walks the table in row-major order
//! - **Proxy**: [`proxy::ScatterDataProxy`] owns the array and publishes events
//!
//! [`item_model::ItemModelScatterProxy`] wires all of them together.
//!
//! ## Quick Start
//!
//! ```rust
//! use trueno_datamodel::prelude::*;
//!
//! let mut table = ItemTable::new(["lon", "alt"], 1);
//! table.append_row(vec![vec![CellValue::from(12.5), CellValue::from(300.0)]]);
//! let table = table.into_shared();
//!
//! let mut proxy = ItemModelScatterProxy::with_source(
//!     table.clone(),
//!     RoleMapping::positions("lon", "alt", ""),
//! );
//! proxy.process_pending();
//! assert_eq!(proxy.proxy().item_count(), 1);
//!
//! table.borrow_mut().set_data(0, 0, 1, 450.0).unwrap();
//! proxy.process_pending();
//! assert_eq!(proxy.proxy().item_at(0).map(DataItem::y), Some(450.0));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Positioned chart data items.
pub mod item;

/// Extents of resolved data.
pub mod geometry;

/// Tabular data sources and their change events.
pub mod source;

/// Role mappings from chart attributes to table roles.
pub mod mapping;

// ============================================================================
// Pipeline Modules
// ============================================================================

/// Dirty-flag change tracking.
pub mod tracker;

/// Table to data array resolution.
pub mod resolver;

/// Data array ownership and change notification.
pub mod proxy;

/// Source-driven scatter proxy.
pub mod item_model;

/// Spectrum and flat-row builders.
pub mod spectrum;

// ============================================================================
// Configuration & Errors
// ============================================================================

/// YAML configuration.
pub mod config;

/// Error types for trueno-datamodel operations.
pub mod error;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use trueno_datamodel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::geometry::Bounds3;
    pub use crate::item::{DataArray, DataItem};
    pub use crate::item_model::ItemModelScatterProxy;
    pub use crate::mapping::{Role, RoleMapping, RoleSpec};
    pub use crate::proxy::{ProxyEvent, ScatterDataProxy};
    pub use crate::source::{CellValue, ItemTable, SharedTable, SourceTable, TableEvent};
    pub use crate::spectrum::{SpectrumBuilder, SpectrumElement, SpectrumHistory};
    pub use crate::tracker::ChangeTracker;
}

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export glam for the vector and quaternion types used in items.
pub use glam;
