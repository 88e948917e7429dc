//! Crawl task model: the unit of work flowing through the frontier.

use serde::{Deserialize, Serialize};

use crate::domain::pricing::PriceRange;

/// Routing label of a task; the router selects its handling branch from
/// this tag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskLabel {
    /// Category discovery: the page may list sub-categories or products.
    Discover,
    /// A listing page reached through pagination enumeration.
    Paginate,
    /// A price-filtered listing whose page count decides split vs paginate.
    SplitRange,
    /// Leaf extraction: run the extractor, nothing else is enumerated.
    Extract,
}

impl TaskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "DISCOVER",
            Self::Paginate => "PAGINATE",
            Self::SplitRange => "SPLIT_RANGE",
            Self::Extract => "EXTRACT",
        }
    }
}

impl std::fmt::Display for TaskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auxiliary fields a handler needs to resume processing.
///
/// Copied forward into child tasks, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    /// Unfiltered category listing URL the task descends from.
    pub base_url: Option<String>,
    /// Ordered breadcrumb path accumulated during discovery.
    pub category_path: Vec<String>,
    /// Price filter attached to SPLIT_RANGE / range-scoped pagination.
    pub price_range: Option<PriceRange>,
    /// 1-based page index for pagination tasks.
    pub page: Option<u32>,
}

impl TaskContext {
    /// Child context scoped to a price range, keeping the lineage fields.
    pub fn with_range(&self, range: PriceRange) -> Self {
        Self {
            price_range: Some(range),
            page: None,
            ..self.clone()
        }
    }

    /// Child context for one pagination page of the same view.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }
}

/// A unit of crawl work. Immutable after creation; consumed exactly once
/// by a fetch+handle cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,
    pub label: TaskLabel,
    pub context: TaskContext,
}

impl CrawlTask {
    pub fn new(url: impl Into<String>, label: TaskLabel, context: TaskContext) -> Self {
        Self {
            url: url.into(),
            label,
            context,
        }
    }

    /// Seed task for a configured entry URL.
    pub fn seed(url: impl Into<String>, label: TaskLabel) -> Self {
        let url = url.into();
        let context = TaskContext {
            base_url: Some(url.clone()),
            ..TaskContext::default()
        };
        Self::new(url, label, context)
    }

    /// Identity of the task inside the frontier.
    ///
    /// Two tasks with the same URL are still distinct work when their
    /// price range or page index differ (the same listing URL is
    /// revisited with different filter query parameters), so those
    /// context fields join the digest.
    pub fn dedupe_key(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.url.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.label.as_str().as_bytes());
        if let Some(range) = &self.context.price_range {
            hasher.update(format!("\nrange:{range}").as_bytes());
        }
        if let Some(page) = self.context.page {
            hasher.update(format!("\npage:{page}").as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_key_is_stable() {
        let a = CrawlTask::seed("https://shop.example/tv", TaskLabel::Discover);
        let b = CrawlTask::seed("https://shop.example/tv", TaskLabel::Discover);
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn test_dedupe_key_separates_labels() {
        let discover = CrawlTask::seed("https://shop.example/tv", TaskLabel::Discover);
        let paginate = CrawlTask::seed("https://shop.example/tv", TaskLabel::Paginate);
        assert_ne!(discover.dedupe_key(), paginate.dedupe_key());
    }

    #[test]
    fn test_dedupe_key_separates_ranges() {
        let ctx = TaskContext::default();
        let lo = CrawlTask::new(
            "https://shop.example/tv",
            TaskLabel::SplitRange,
            ctx.with_range(PriceRange::try_new(0, 50).unwrap()),
        );
        let hi = CrawlTask::new(
            "https://shop.example/tv",
            TaskLabel::SplitRange,
            ctx.with_range(PriceRange::try_new(51, 100).unwrap()),
        );
        assert_ne!(lo.dedupe_key(), hi.dedupe_key());
    }

    #[test]
    fn test_child_context_keeps_lineage() {
        let mut ctx = TaskContext::default();
        ctx.base_url = Some("https://shop.example/tv".into());
        ctx.category_path = vec!["Elektro".into(), "TV".into()];
        let child = ctx.with_range(PriceRange::try_new(10, 20).unwrap());
        assert_eq!(child.base_url.as_deref(), Some("https://shop.example/tv"));
        assert_eq!(child.category_path, ctx.category_path);
        assert!(child.page.is_none());
    }
}
