//! Selector-driven site adapter.
//!
//! The reference [`SiteAdapter`] implementation: everything
//! site-specific lives in a [`SelectorConfig`] (CSS selectors for the
//! listing signals and product cells, query parameter names for
//! pagination and the price filter), so a new shop integration is a
//! config file rather than code. Selectors are compiled once at
//! startup; an invalid selector is a configuration error, not a crawl
//! failure.

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::domain::errors::ExtractionError;
use crate::domain::pricing::{parse_price, PriceRange};
use crate::domain::product::ProductRecord;
use crate::domain::services::{
    Extraction, FetchedPage, ListingView, RenderMode, SiteAdapter,
};
use crate::domain::task::{TaskContext, TaskLabel};

/// CSS selectors and URL shapes for one shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Sub-category links on a category page.
    pub subcategory_link: String,
    /// Breadcrumb trail entries.
    pub breadcrumb: String,
    /// Element whose text is the total item count of the view.
    pub total_count: String,
    /// Last pagination element; its text is the view's page count.
    pub last_page: String,
    /// Price slider bound inputs (the `value` attribute carries the bound).
    pub price_min_input: String,
    pub price_max_input: String,
    /// One product cell in the listing grid.
    pub product_cell: String,
    /// Attribute on the cell carrying the site's item id.
    pub item_id_attr: String,
    /// Optional attribute on the cell carrying the item name; falls
    /// back to the link text.
    pub item_name_attr: Option<String>,
    /// Product link inside a cell.
    pub item_link: String,
    /// Current price inside a cell.
    pub price: String,
    /// Strike-through pre-discount price inside a cell.
    pub original_price: String,
    /// Product image inside a cell.
    pub image: String,
    /// Marker present in a cell when the item is not in stock.
    pub out_of_stock_marker: String,
    /// Currency code attached to extracted records.
    pub currency: String,
    /// Query parameter for the 1-based page index.
    pub page_param: String,
    /// Query parameters for the price filter bounds.
    pub price_min_param: String,
    pub price_max_param: String,
    /// Whether this shop only serves real markup to a scripted browser.
    #[serde(default)]
    pub scripted_rendering: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            subcategory_link: "div.subcategory-tree-list a".to_string(),
            breadcrumb: "p#breadcrumbs > a".to_string(),
            total_count: "#total-products-category".to_string(),
            last_page: "li.pagination__item:last-child".to_string(),
            price_min_input: r#"input.slider-filter__input[formcontrolname="min"]"#.to_string(),
            price_max_input: r#"input.slider-filter__input[formcontrolname="max"]"#.to_string(),
            product_cell: "div.category-page-item".to_string(),
            item_id_attr: "data-id".to_string(),
            item_name_attr: Some("data-name".to_string()),
            item_link: "h3 a".to_string(),
            price: ".price .tooltip".to_string(),
            original_price: ".price del".to_string(),
            image: "a.item-thumbnail-link img".to_string(),
            out_of_stock_marker: ".availability-container .delivery-info a.red".to_string(),
            currency: "CZK".to_string(),
            page_param: "page".to_string(),
            price_min_param: "priceMin".to_string(),
            price_max_param: "priceMax".to_string(),
            scripted_rendering: false,
        }
    }
}

/// Compiled selector set.
struct Selectors {
    subcategory_link: Selector,
    breadcrumb: Selector,
    total_count: Selector,
    last_page: Selector,
    price_min_input: Selector,
    price_max_input: Selector,
    product_cell: Selector,
    item_link: Selector,
    price: Selector,
    original_price: Selector,
    image: Selector,
    out_of_stock_marker: Selector,
}

pub struct SelectorSiteAdapter {
    config: SelectorConfig,
    selectors: Selectors,
}

fn compile(selector: &str, name: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| anyhow::anyhow!("invalid CSS selector for '{name}': {selector} ({e})"))
}

impl SelectorSiteAdapter {
    pub fn new(config: SelectorConfig) -> Result<Self> {
        let selectors = Selectors {
            subcategory_link: compile(&config.subcategory_link, "subcategory_link")?,
            breadcrumb: compile(&config.breadcrumb, "breadcrumb")?,
            total_count: compile(&config.total_count, "total_count")?,
            last_page: compile(&config.last_page, "last_page")?,
            price_min_input: compile(&config.price_min_input, "price_min_input")?,
            price_max_input: compile(&config.price_max_input, "price_max_input")?,
            product_cell: compile(&config.product_cell, "product_cell")?,
            item_link: compile(&config.item_link, "item_link")?,
            price: compile(&config.price, "price")?,
            original_price: compile(&config.original_price, "original_price")?,
            image: compile(&config.image, "image")?,
            out_of_stock_marker: compile(&config.out_of_stock_marker, "out_of_stock_marker")?,
        };
        Ok(Self { config, selectors })
    }

    /// Resolve a possibly relative href against the page URL.
    fn absolute_url(page_url: &str, href: &str) -> Option<String> {
        match Url::parse(href) {
            Ok(url) => Some(url.to_string()),
            Err(_) => Url::parse(page_url)
                .ok()
                .and_then(|base| base.join(href).ok())
                .map(|url| url.to_string()),
        }
    }

    fn extract_cell(&self, cell: ElementRef<'_>, page: &FetchedPage, category: &[String]) -> Option<ProductRecord> {
        let item_id = cell.value().attr(&self.config.item_id_attr)?.trim().to_string();
        if item_id.is_empty() {
            return None;
        }

        let link = cell.select(&self.selectors.item_link).next();
        let item_url = link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| Self::absolute_url(&page.url, href))
            .unwrap_or_default();

        let item_name = self
            .config
            .item_name_attr
            .as_deref()
            .and_then(|attr| cell.value().attr(attr))
            .map(|name| name.replace(['\n', '\r'], " ").trim().to_string())
            .or_else(|| link.map(|a| a.text().collect::<String>().trim().to_string()))
            .unwrap_or_default();

        let current_price = cell
            .select(&self.selectors.price)
            .next()
            .and_then(|el| parse_price(&el.text().collect::<String>()));
        let original_price = cell
            .select(&self.selectors.original_price)
            .next()
            .and_then(|el| parse_price(&el.text().collect::<String>()));

        let image_url = cell
            .select(&self.selectors.image)
            .next()
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
            .and_then(|src| Self::absolute_url(&page.url, src));

        let in_stock = cell
            .select(&self.selectors.out_of_stock_marker)
            .next()
            .is_none();

        Some(ProductRecord {
            item_id,
            item_name,
            item_url,
            current_price,
            discounted: original_price.is_some(),
            original_price,
            currency: Some(self.config.currency.clone()),
            category: category.to_vec(),
            in_stock,
            image_url,
        })
    }

    fn breadcrumbs(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.selectors.breadcrumb)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    }

    fn with_param(url: &str, key: &str, value: impl std::fmt::Display) -> String {
        if url.contains('?') {
            format!("{url}&{key}={value}")
        } else {
            format!("{url}?{key}={value}")
        }
    }
}

/// Digits-only count reading ("1 234 products" -> 1234).
fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

impl SiteAdapter for SelectorSiteAdapter {
    fn parse_listing(
        &self,
        page: &FetchedPage,
        _context: &TaskContext,
    ) -> Result<ListingView, ExtractionError> {
        let document = Html::parse_document(&page.body);

        let subcategories: Vec<String> = document
            .select(&self.selectors.subcategory_link)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| Self::absolute_url(&page.url, href))
            .collect();

        let total_items = document
            .select(&self.selectors.total_count)
            .next()
            .and_then(|el| parse_count(&el.text().collect::<String>()));

        let page_count = document
            .select(&self.selectors.last_page)
            .next()
            .and_then(|el| parse_count(&el.text().collect::<String>()))
            .map(|count| count.min(u64::from(u32::MAX)) as u32);

        let bound = |selector: &Selector| {
            document
                .select(selector)
                .next()
                .and_then(|el| el.value().attr("value"))
                .and_then(|value| parse_count(value))
                .map(|value| value as i64)
        };
        let price_bounds = match (
            bound(&self.selectors.price_min_input),
            bound(&self.selectors.price_max_input),
        ) {
            (Some(min), Some(max)) => PriceRange::try_new(min, max),
            _ => None,
        };

        Ok(ListingView {
            subcategories,
            category_path: self.breadcrumbs(&document),
            total_items,
            page_count,
            price_bounds,
        })
    }

    fn extract(
        &self,
        page: &FetchedPage,
        context: &TaskContext,
    ) -> Result<Extraction, ExtractionError> {
        let document = Html::parse_document(&page.body);
        let mut category = self.breadcrumbs(&document);
        if category.is_empty() {
            category = context.category_path.clone();
        }

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for cell in document.select(&self.selectors.product_cell) {
            match self.extract_cell(cell, page, &category) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("skipped {skipped} product cells without an item id --- {}", page.url);
        }

        Ok(Extraction {
            records,
            follow_ups: Vec::new(),
        })
    }

    fn page_url(&self, base_url: &str, range: Option<&PriceRange>, page: u32) -> String {
        let url = match range {
            Some(r) => self.range_url(base_url, r),
            None => base_url.to_string(),
        };
        Self::with_param(&url, &self.config.page_param, page)
    }

    fn range_url(&self, base_url: &str, range: &PriceRange) -> String {
        let url = Self::with_param(base_url, &self.config.price_min_param, range.min);
        Self::with_param(&url, &self.config.price_max_param, range.max)
    }

    fn render_mode(&self, _label: TaskLabel) -> RenderMode {
        if self.config.scripted_rendering {
            RenderMode::Scripted
        } else {
            RenderMode::Static
        }
    }
}
