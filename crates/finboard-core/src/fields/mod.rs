//! Field discovery and path resolution over untyped JSON.
//!
//! Discovery samples one response into a [`FieldDescriptor`] tree at
//! configuration time. Resolution evaluates the stored path text against
//! every later response and never panics on malformed input.
//!
//! [`FieldDescriptor`]: finboard_types::FieldDescriptor

pub mod discover;
pub mod resolve;
pub mod rows;

pub use discover::{discover, discover_fields, sample_preview, SAMPLE_PREVIEW_CHARS};
pub use resolve::{resolve, resolve_owned};
pub use rows::{chart_points, filter_rows, locate_rows, resolve_in_row, sort_rows, ChartPoint, RowSet, SortDirection};
