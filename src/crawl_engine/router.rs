//! Label-driven request routing.
//!
//! The router is the state machine of the crawl: it inspects a
//! completed fetch's task label plus the listing signals on the page,
//! then either enqueues child tasks into the frontier (sub-categories,
//! pagination pages, split sub-ranges) or runs the extractor and
//! forwards records to the item ledger.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::crawl_engine::frontier::Frontier;
use crate::crawl_engine::ledger::{ItemLedger, Offer};
use crate::crawl_engine::range_splitter::{self, SplitDecision};
use crate::domain::errors::{ExtractionError, TaskError, TaskResult};
use crate::domain::pricing::PriceRange;
use crate::domain::services::{FetchedPage, ListingView, SiteAdapter};
use crate::domain::stats::RunStats;
use crate::domain::task::{CrawlTask, TaskContext, TaskLabel};

/// Pagination limits of the target site.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    /// Last page index the site will serve for one listing/filter view.
    pub page_cap: u32,
    /// Items per listing page.
    pub page_size: u32,
}

pub struct Router {
    adapter: Arc<dyn SiteAdapter>,
    frontier: Arc<Frontier>,
    ledger: Arc<ItemLedger>,
    stats: Arc<RunStats>,
    limits: PageLimits,
}

impl Router {
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        frontier: Arc<Frontier>,
        ledger: Arc<ItemLedger>,
        stats: Arc<RunStats>,
        limits: PageLimits,
    ) -> Self {
        Self {
            adapter,
            frontier,
            ledger,
            stats,
            limits,
        }
    }

    /// Dispatch a completed fetch to the branch its label selects.
    pub async fn handle(&self, task: &CrawlTask, page: &FetchedPage) -> TaskResult<()> {
        match task.label {
            TaskLabel::Discover => self.handle_discover(task, page).await,
            TaskLabel::SplitRange => self.handle_split_range(task, page).await,
            TaskLabel::Paginate | TaskLabel::Extract => self.handle_extract(task, page).await,
        }
    }

    /// Category discovery: fan out into sub-categories, or plan the
    /// enumeration of a direct product listing.
    async fn handle_discover(&self, task: &CrawlTask, page: &FetchedPage) -> TaskResult<()> {
        let listing = self.adapter.parse_listing(page, &task.context)?;
        let context = self.descend_context(task, &listing);

        if !listing.subcategories.is_empty() {
            let children: Vec<CrawlTask> = listing
                .subcategories
                .iter()
                .map(|url| {
                    CrawlTask::new(
                        url.clone(),
                        TaskLabel::Discover,
                        TaskContext {
                            base_url: Some(url.clone()),
                            ..context.clone()
                        },
                    )
                })
                .collect();
            let added = self.frontier.add_all(children).await;
            self.stats.add_urls(added);
            info!("[DISCOVER] found {added} subcategories --- {}", task.url);
            return Ok(());
        }

        // The page lists products directly.
        let Some(total) = listing.total_items else {
            debug!("[DISCOVER] no reported count, extracting single page --- {}", task.url);
            return self.handle_extract(task, page).await;
        };

        if range_splitter::fits_under_cap(total, self.limits.page_size, self.limits.page_cap) {
            let pages = range_splitter::pages_for(total, self.limits.page_size);
            let added = self
                .enqueue_pages(task, &context, None, pages, TaskLabel::Paginate)
                .await;
            self.stats.add_pages(added);
            info!(
                "[DISCOVER] {total} products over {pages} pages --- {}",
                task.url
            );
            // Page 1 is the page we are holding.
            return self.handle_extract(task, page).await;
        }

        // The count cannot be exposed through ordinary pagination:
        // route the category through price-range splitting instead of
        // enqueueing pages that the site would refuse.
        let domain = listing
            .price_bounds
            .ok_or_else(|| ExtractionError::missing_signal(&task.url, "price bounds"))?;
        let split = CrawlTask::new(
            self.adapter.range_url(self.base_url(task), &domain),
            TaskLabel::SplitRange,
            context.with_range(domain),
        );
        info!(
            "[DISCOVER] {total} products exceed page cap, splitting {domain} --- {}",
            task.url
        );
        self.frontier.add(split).await;
        Ok(())
    }

    /// A price-filtered view: paginate it, bisect it, or record the
    /// unrecoverable single-price bucket.
    async fn handle_split_range(&self, task: &CrawlTask, page: &FetchedPage) -> TaskResult<()> {
        let listing = self.adapter.parse_listing(page, &task.context)?;
        let context = self.descend_context(task, &listing);
        let assigned = task
            .context
            .price_range
            .ok_or_else(|| ExtractionError::missing_signal(&task.url, "price range"))?;
        let range = refine_range(assigned, listing.price_bounds);
        let page_count = listing.page_count.unwrap_or(1);

        match range_splitter::decide(range, page_count, self.limits.page_cap) {
            SplitDecision::Paginate => {
                let added = self
                    .enqueue_pages(task, &context, Some(range), page_count, TaskLabel::Paginate)
                    .await;
                self.stats.add_pages(added);
                debug!(
                    "[SPLIT_RANGE] {range} fits in {page_count} pages --- {}",
                    task.url
                );
                self.handle_extract(task, page).await
            }
            SplitDecision::Exhausted => {
                self.stats.inc_range_exhausted();
                warn!(
                    "[SPLIT_RANGE] single-price bucket {range} still reports {page_count} pages, \
                     accepting truncation past page {} --- {}",
                    self.limits.page_cap, task.url
                );
                let added = self
                    .enqueue_pages(task, &context, Some(range), self.limits.page_cap, TaskLabel::Extract)
                    .await;
                self.stats.add_pages(added);
                self.handle_extract(task, page).await
            }
            SplitDecision::Split(low, high) => {
                self.stats.inc_range_splits();
                info!(
                    "[SPLIT_RANGE] {range} over cap ({page_count} pages), bisecting into {low} / {high} --- {}",
                    task.url
                );
                let base = self.base_url(task).to_string();
                let children = vec![
                    CrawlTask::new(
                        self.adapter.range_url(&base, &low),
                        TaskLabel::SplitRange,
                        context.with_range(low),
                    ),
                    CrawlTask::new(
                        self.adapter.range_url(&base, &high),
                        TaskLabel::SplitRange,
                        context.with_range(high),
                    ),
                ];
                self.frontier.add_all(children).await;
                Ok(())
            }
        }
    }

    /// Leaf handling: extract records, offer them to the ledger,
    /// schedule any extractor follow-ups.
    async fn handle_extract(&self, task: &CrawlTask, page: &FetchedPage) -> TaskResult<()> {
        let extraction = self.adapter.extract(page, &task.context)?;
        let found = extraction.records.len();
        let mut accepted = 0u64;
        for record in extraction.records {
            match self.ledger.offer(record).await {
                Ok(Offer::Accepted) => accepted += 1,
                Ok(Offer::Duplicate) => {}
                Err(err) => return Err(TaskError::sink(err)),
            }
        }
        if !extraction.follow_ups.is_empty() {
            self.frontier.add_all(extraction.follow_ups).await;
        }
        debug!(
            "[{}] stored {accepted}/{found} items --- {}",
            task.label, task.url
        );
        Ok(())
    }

    /// Enqueue pages `2..=pages` of a view (page 1 is always the page
    /// being handled); returns how many were newly added.
    async fn enqueue_pages(
        &self,
        task: &CrawlTask,
        context: &TaskContext,
        range: Option<PriceRange>,
        pages: u32,
        label: TaskLabel,
    ) -> u64 {
        if pages < 2 {
            return 0;
        }
        let base = self.base_url(task).to_string();
        let scoped = match range {
            Some(r) => context.with_range(r),
            None => context.clone(),
        };
        let children: Vec<CrawlTask> = (2..=pages)
            .map(|index| {
                CrawlTask::new(
                    self.adapter.page_url(&base, range.as_ref(), index),
                    label,
                    scoped.with_page(index),
                )
            })
            .collect();
        self.frontier.add_all(children).await
    }

    /// Context for children of this task, picking up the breadcrumb
    /// path the page rendered.
    fn descend_context(&self, task: &CrawlTask, listing: &ListingView) -> TaskContext {
        let mut context = task.context.clone();
        if !listing.category_path.is_empty() {
            context.category_path = listing.category_path.clone();
        }
        if context.base_url.is_none() {
            context.base_url = Some(task.url.clone());
        }
        context
    }

    fn base_url<'a>(&self, task: &'a CrawlTask) -> &'a str {
        task.context.base_url.as_deref().unwrap_or(&task.url)
    }
}

/// Narrow an assigned range to the bounds the filtered page reports,
/// when they are consistent. Rozetka-style sliders echo the true
/// min/max of the filtered view; trusting them speeds up convergence,
/// but bounds outside the assigned range (or a malformed slider) must
/// never widen it.
fn refine_range(assigned: PriceRange, reported: Option<PriceRange>) -> PriceRange {
    match reported {
        Some(r) if r.min >= assigned.min && r.max <= assigned.max => r,
        _ => assigned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_range_accepts_narrower() {
        let assigned = PriceRange::try_new(0, 100).unwrap();
        let reported = PriceRange::try_new(10, 90).unwrap();
        assert_eq!(refine_range(assigned, Some(reported)), reported);
    }

    #[test]
    fn test_refine_range_rejects_wider_or_missing() {
        let assigned = PriceRange::try_new(10, 90).unwrap();
        let wider = PriceRange::try_new(0, 100).unwrap();
        assert_eq!(refine_range(assigned, Some(wider)), assigned);
        assert_eq!(refine_range(assigned, None), assigned);
    }
}
