//! Request pacing, bounded retry and cached catalog indexes.
//!
//! All outbound traffic of a connector flows through one [`HttpFetcher`],
//! which owns that connector's pacing watermark.

mod catalog_cache;
mod fetcher;
mod pacer;
mod retry;

pub use catalog_cache::{CatalogCache, CatalogEntry};
pub use fetcher::{
    ContentKind, FetchSettings, HttpFetcher, HttpRequest, HttpResponse, ReqwestTransport,
    Transport,
};
pub use pacer::Pacer;
pub use retry::{parse_retry_after, RetryPolicy};
