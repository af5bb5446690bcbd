//! # Finboard Types
//!
//! Core types, models, and error definitions for Finboard.
//!
//! This crate provides the foundational type system shared by the engine and
//! the CLI:
//!
//! - **`error`** - Typed error hierarchy for fetching and configuration
//! - **`models`** - Domain models (widget configuration, field descriptors, fetch outcomes)
//!
//! ## Architecture Role
//!
//! `finboard-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          finboard-types (this crate)
//!                  │
//!                  ▼
//!            finboard-core
//!                  │
//!                  ▼
//!            finboard-cli
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for persisted dashboard configuration
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, FetchError};

// Re-export core model types
pub use models::{
    auth_pair, DashboardConfig, DisplayMode, FetchOutcome, FieldDescriptor, FieldFormat, StructuralType,
    WidgetConfig, WidgetField,
};
