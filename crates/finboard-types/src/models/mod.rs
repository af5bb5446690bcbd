//! Core domain models for Finboard.
//!
//! This module contains the shared data structures used by the engine and CLI.

mod fetch;
mod field;
mod widget;

// Re-export all models
pub use fetch::FetchOutcome;
pub use field::{FieldDescriptor, StructuralType};
pub use widget::{
    auth_pair, default_cache_ttl, default_refresh_interval, DashboardConfig, DisplayMode, FieldFormat,
    WidgetConfig, WidgetField, DASHBOARD_CONFIG_VERSION,
};
