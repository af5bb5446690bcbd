//! Resilient API client.
//!
//! ```text
//! FetchPipeline::fetch
//!   ├── cache/        signature + TTL store (checked first)
//!   ├── rate_limit/   per-origin windows (checked before every attempt)
//!   ├── transport.rs  direct reqwest GET, one passthrough fallback
//!   ├── retry/        429 window wait, 5xx exponential backoff
//!   └── payload.rs    provider error-key conventions
//! ```

pub mod cache;
pub mod config;
pub mod payload;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;
pub mod transport;

pub use cache::{CacheEntry, CacheStore, FileCacheStore, MemoryCacheStore, RequestSignature, ResponseCache};
pub use config::FetchConfig;
pub use pipeline::{FetchPipeline, FetchRequest};
pub use rate_limit::{BlockStatus, RateLimitRegistry, RateLimitWindow};
pub use transport::{DirectTransport, PassthroughTransport, Transport, TransportFailure, TransportResponse};
