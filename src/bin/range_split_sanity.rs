//! Range-splitter sanity runner against a synthetic catalog.
//!
//! This binary simulates a category whose item count exceeds what the
//! page cap can expose, runs the split decision loop the router would
//! drive through the frontier, and prints the resulting leaf ranges so
//! the decomposition can be eyeballed: disjoint, gap-free, every leaf
//! paginable.

use catalog_crawler::crawl_engine::range_splitter::{decide, pages_for, SplitDecision};
use catalog_crawler::domain::pricing::PriceRange;

const PAGE_CAP: u32 = 20;
const PAGE_SIZE: u32 = 60;

/// Synthetic catalog: items clustered toward the cheap end, with one
/// pathological single-price spike that cannot be split.
fn items_in(range: PriceRange) -> u64 {
    let mut count = 0u64;
    for price in range.min..=range.max {
        count += match price {
            0..=499 => 9,
            500..=4_999 => 2,
            _ => 0,
        };
        if price == 249 {
            // the spike: more items at one price than the cap can list
            count += u64::from(PAGE_CAP * PAGE_SIZE) + 500;
        }
    }
    count
}

fn main() {
    let full = PriceRange::try_new(0, 9_999).expect("valid bounds");
    println!(
        "catalog: {} items in {full}, cap {} pages x {} items",
        items_in(full),
        PAGE_CAP,
        PAGE_SIZE
    );

    let mut work = vec![full];
    let mut leaves = Vec::new();
    let mut splits = 0u32;
    let mut exhausted = Vec::new();

    while let Some(range) = work.pop() {
        let pages = pages_for(items_in(range), PAGE_SIZE);
        match decide(range, pages, PAGE_CAP) {
            SplitDecision::Paginate => leaves.push((range, pages)),
            SplitDecision::Exhausted => {
                exhausted.push(range);
                leaves.push((range, PAGE_CAP));
            }
            SplitDecision::Split(low, high) => {
                splits += 1;
                work.push(high);
                work.push(low);
            }
        }
    }

    leaves.sort_by_key(|(range, _)| range.min);
    println!("\n{} leaves after {splits} splits:", leaves.len());
    for (range, pages) in &leaves {
        let marker = if exhausted.contains(range) { "  ⚠️ truncated" } else { "" };
        println!("  {:>12}  {pages:>3} pages{marker}", range.to_string());
    }

    let mut expected_min = full.min;
    for (range, _) in &leaves {
        assert_eq!(range.min, expected_min, "gap or overlap at {range}");
        expected_min = range.max + 1;
    }
    assert_eq!(expected_min, full.max + 1, "decomposition must end at the domain max");
    println!("\n✅ decomposition covers {full} exactly ({} truncated bucket(s))", exhausted.len());
}
