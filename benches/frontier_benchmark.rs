//! Frontier dedup throughput benchmark.
//!
//! Every enqueue pays one digest plus one serialized membership check;
//! this keeps an eye on both, including the re-add (all-duplicate) path
//! that dominates late in a crawl.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;

use catalog_crawler::crawl_engine::frontier::Frontier;
use catalog_crawler::domain::pricing::PriceRange;
use catalog_crawler::domain::task::{CrawlTask, TaskContext, TaskLabel};

fn paginate_task(index: u32) -> CrawlTask {
    let context = TaskContext {
        base_url: Some("https://shop.example/tv".to_string()),
        category_path: vec!["Elektro".to_string(), "TV".to_string()],
        price_range: PriceRange::try_new(0, 5_000),
        page: Some(index),
    };
    CrawlTask::new(
        format!("https://shop.example/tv?priceMin=0&priceMax=5000&page={index}"),
        TaskLabel::Paginate,
        context,
    )
}

fn dedupe_key_digest(c: &mut Criterion) {
    let task = paginate_task(7);
    c.bench_function("dedupe_key_digest", |b| {
        b.iter(|| black_box(task.dedupe_key()));
    });
}

fn frontier_add_fresh(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    c.bench_function("frontier_add_1000_fresh", |b| {
        b.iter(|| {
            rt.block_on(async {
                let frontier = Frontier::new(3);
                for index in 0..1000 {
                    black_box(frontier.add(paginate_task(index)).await);
                }
            });
        });
    });
}

fn frontier_add_duplicates(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let frontier = rt.block_on(async {
        let frontier = Frontier::new(3);
        for index in 0..1000 {
            frontier.add(paginate_task(index)).await;
        }
        frontier
    });
    c.bench_function("frontier_readd_1000_duplicates", |b| {
        b.iter(|| {
            rt.block_on(async {
                for index in 0..1000 {
                    black_box(frontier.add(paginate_task(index)).await);
                }
            });
        });
    });
}

criterion_group!(
    benches,
    dedupe_key_digest,
    frontier_add_fresh,
    frontier_add_duplicates
);
criterion_main!(benches);
