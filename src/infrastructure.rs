//! Infrastructure layer for HTTP fetching, HTML parsing, persistence
//! and configuration.
//!
//! Everything here implements a seam from `domain::services` or
//! `crawl_engine::coordinator`; the engine core never depends on this
//! module.

pub mod config; // Configuration loading and validation
pub mod http_fetcher; // Rate-limited reqwest fetch collaborator
pub mod jsonl_sink; // JSON-lines output sink
pub mod logging; // Logging infrastructure
pub mod selector_adapter; // Selector-driven site adapter
pub mod snapshot; // Persisted run state

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, CrawlerConfig, EntryUrl, LoggingConfig};
pub use http_fetcher::{HttpFetcher, HttpFetcherConfig};
pub use jsonl_sink::JsonlSink;
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use selector_adapter::{SelectorConfig, SelectorSiteAdapter};
pub use snapshot::SnapshotStore;
