//! Catalog Crawler - E-commerce Catalog Crawling Engine
//!
//! Crawls e-commerce catalogs to a complete, deduplicated product set:
//! category discovery, pagination enumeration, and a price-range
//! binary-splitting workaround for sites that cap how many listing
//! pages one view may serve.

// Module declarations
pub mod crawl_engine;
pub mod domain;
pub mod infrastructure;

// Re-export the pieces a run is assembled from
pub use crawl_engine::{EngineSettings, RunCoordinator, RunSummary};
pub use domain::{CrawlTask, ProductRecord, TaskLabel};
pub use infrastructure::{AppConfig, ConfigManager};
