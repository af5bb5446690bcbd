//! # Finboard Core
//!
//! The engine behind Finboard widgets.
//!
//! ```text
//! finboard-core/src/
//! ├── fetch/      # FetchPipeline: cache, rate limits, transports, retry
//! ├── fields/     # discovery, path resolution, row location
//! ├── modules/    # dashboard config, formatting, refresh scheduler, logging
//! └── utils/      # time helpers
//! ```
//!
//! A widget's stored field paths are captured once with
//! [`fields::discover`] and re-evaluated against every response with
//! [`fields::resolve`]. The [`fetch::FetchPipeline`] owns all shared
//! mutable state (rate-limit windows and cached responses); create one per
//! process and share it behind an `Arc`.

#![cfg_attr(
    test,
    allow(clippy::panic, clippy::print_stdout, clippy::float_cmp, clippy::unwrap_used, clippy::expect_used)
)]

pub mod error;
pub mod fetch;
pub mod fields;
pub mod modules;
pub mod utils;

pub use error::{AppError, AppResult};
pub use fetch::{FetchConfig, FetchPipeline, FetchRequest};
pub use fields::{discover, discover_fields, resolve};
pub use modules::{WidgetRefresher, WidgetSnapshot};
