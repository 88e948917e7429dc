//! Collaborator seams of the crawl engine.
//!
//! The engine core touches the outside world only through these traits:
//! the fetch layer, the per-site extractor plugin, and the output sink.
//! One implementation per site of [`SiteAdapter`] is the whole surface
//! a new shop integration has to provide.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{ExtractionError, FetchError};
use crate::domain::pricing::PriceRange;
use crate::domain::product::ProductRecord;
use crate::domain::task::{CrawlTask, TaskContext, TaskLabel};

/// Rendering mode requested from the fetch layer.
///
/// Some shops only serve real markup to a scripted browser; the hint is
/// forwarded per label and honoring it is the collaborator's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    Static,
    Scripted,
}

/// Request metadata passed alongside the URL.
#[derive(Debug, Clone)]
pub struct FetchHints {
    pub render_mode: RenderMode,
}

impl Default for FetchHints {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Static,
        }
    }
}

/// A fetched page body plus the response status it arrived with.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Fetch collaborator: retrieves one page or fails with a typed error.
/// Session pooling, proxy rotation and politeness are its own concern;
/// the core only signals "this response looked blocked" back as
/// [`FetchError::Blocked`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, hints: &FetchHints) -> Result<FetchedPage, FetchError>;
}

/// Signals the router reads off a listing page to pick its transition.
#[derive(Debug, Clone, Default)]
pub struct ListingView {
    /// Absolute URLs of sub-category listings, empty when the page
    /// lists products directly.
    pub subcategories: Vec<String>,
    /// Breadcrumb path as rendered on this page.
    pub category_path: Vec<String>,
    /// Reported total item count of the (possibly filtered) view.
    pub total_items: Option<u64>,
    /// Reported pagination page count of the view.
    pub page_count: Option<u32>,
    /// Price filter bounds reported for the view (slider min/max).
    pub price_bounds: Option<PriceRange>,
}

/// Extractor output for one page.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ProductRecord>,
    /// Additional tasks the extractor wants scheduled (detail pages,
    /// variant listings); deduplicated by the frontier like any other.
    pub follow_ups: Vec<CrawlTask>,
}

/// Per-site extractor plugin.
///
/// Parsing is synchronous CPU work on an already-fetched body; URL
/// building is here because pagination and price-filter query shapes
/// are site-specific (`?page=N`, `?PgID=N`, `?startPos=N`, ...).
pub trait SiteAdapter: Send + Sync {
    /// Read the routing signals from a listing page.
    fn parse_listing(
        &self,
        page: &FetchedPage,
        context: &TaskContext,
    ) -> Result<ListingView, ExtractionError>;

    /// Extract product records (and optional follow-up tasks) from a page.
    fn extract(
        &self,
        page: &FetchedPage,
        context: &TaskContext,
    ) -> Result<Extraction, ExtractionError>;

    /// URL of page `page` (1-based) of a listing, optionally scoped to
    /// a price range.
    fn page_url(&self, base_url: &str, range: Option<&PriceRange>, page: u32) -> String;

    /// URL of a listing filtered to a price range.
    fn range_url(&self, base_url: &str, range: &PriceRange) -> String;

    /// Rendering mode this site needs for a given task label.
    fn render_mode(&self, _label: TaskLabel) -> RenderMode {
        RenderMode::Static
    }
}

/// Output sink for accepted records. At-most-once emission per item id
/// is the ledger's guarantee, not the sink's.
#[async_trait]
pub trait ProductSink: Send + Sync {
    async fn emit(&self, record: &ProductRecord) -> anyhow::Result<()>;
}
