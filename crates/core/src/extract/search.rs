//! Listing search with sitemap fallback, shared by native connectors.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::text::prettify_identifier;
use crate::connector::{ConnectorError, MangaResult};
use crate::context::CallContext;
use crate::matching::QueryMatcher;
use crate::resilience::CatalogEntry;

/// Used when a caller passes a zero limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Upper bound on verification fetches per fallback search.
const MAX_FALLBACK_VERIFICATIONS: usize = 12;

/// The site-specific halves of a layered search.
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn source_key(&self) -> &str;

    /// Results from the site's own search/listing page, unfiltered.
    async fn search_listing(
        &self,
        ctx: &CallContext,
        query: &str,
    ) -> Result<Vec<MangaResult>, ConnectorError>;

    /// Full catalog for fallback matching; `None` when the site has none.
    async fn catalog(
        &self,
        _ctx: &CallContext,
    ) -> Option<Result<Arc<Vec<CatalogEntry>>, ConnectorError>> {
        None
    }

    /// Fetch a fallback candidate's page to confirm and enrich it.
    async fn verify(
        &self,
        ctx: &CallContext,
        entry: &CatalogEntry,
    ) -> Result<MangaResult, ConnectorError>;
}

/// Search `source` for `query`.
///
/// Listing results are filtered against the query. If fewer than `limit`
/// survive, or the listing was rate limited, catalog entries whose slug
/// matches the query (full tokens first, then without stop words) are
/// verified one by one and kept when their title or an alias matches.
pub async fn layered_search<S>(
    source: &S,
    ctx: &CallContext,
    query: &str,
    limit: usize,
) -> Result<Vec<MangaResult>, ConnectorError>
where
    S: SearchSource + ?Sized,
{
    let query = query.trim();
    if query.is_empty() {
        return Err(ConnectorError::InvalidInput("empty search query".to_string()));
    }
    let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };
    let matcher = QueryMatcher::new(query);
    if matcher.is_empty() {
        return Err(ConnectorError::InvalidInput(format!(
            "search query {:?} has no searchable text",
            query
        )));
    }

    let mut seen = HashSet::new();
    let mut results = Vec::new();
    let mut listing_error = None;

    match source.search_listing(ctx, query).await {
        Ok(listing) => {
            for item in listing {
                if matcher.matches_any(titles(&item)) && seen.insert(item.source_item_id.clone()) {
                    results.push(item);
                }
            }
        }
        Err(e) if e.is_rate_limited() => {
            warn!(connector = source.source_key(), error = %e, "Listing search rate limited");
            listing_error = Some(e);
        }
        Err(e) => return Err(e),
    }
    debug!(connector = source.source_key(), matches = results.len(), "Listing search done");

    if results.len() >= limit {
        results.truncate(limit);
        return Ok(results);
    }

    let catalog = match source.catalog(ctx).await {
        None => {
            return match listing_error {
                Some(e) => Err(e),
                None => Ok(results),
            }
        }
        Some(Ok(catalog)) => catalog,
        Some(Err(e)) if e.is_cancellation() || results.is_empty() => return Err(e),
        Some(Err(e)) => {
            warn!(connector = source.source_key(), error = %e, "Catalog unavailable, returning listing matches");
            return Ok(results);
        }
    };

    let candidates = fallback_candidates(&catalog, &matcher, &seen);
    info!(
        connector = source.source_key(),
        candidates = candidates.len(),
        "Falling back to sitemap catalog"
    );

    for entry in candidates.into_iter().take(MAX_FALLBACK_VERIFICATIONS) {
        if results.len() >= limit {
            break;
        }
        match source.verify(ctx, entry).await {
            Ok(item) => {
                let relevant = matcher.matches_any(titles(&item))
                    || titles(&item).any(|t| matcher.matches_relaxed(t));
                if relevant && seen.insert(item.source_item_id.clone()) {
                    results.push(item);
                }
            }
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => {
                debug!(connector = source.source_key(), url = %entry.url, error = %e, "Fallback candidate rejected");
            }
        }
    }

    results.truncate(limit);
    Ok(results)
}

fn titles(item: &MangaResult) -> impl Iterator<Item = &str> {
    std::iter::once(item.title.as_str()).chain(item.related_titles.iter().map(String::as_str))
}

/// Catalog entries whose slug matches, strict matches first.
fn fallback_candidates<'a>(
    catalog: &'a [CatalogEntry],
    matcher: &QueryMatcher,
    exclude: &HashSet<String>,
) -> Vec<&'a CatalogEntry> {
    let fresh = || catalog.iter().filter(move |e| !exclude.contains(&e.id));

    let strict: Vec<&CatalogEntry> = fresh()
        .filter(|e| matcher.matches(&prettify_identifier(&e.id)))
        .collect();
    if !strict.is_empty() {
        return strict;
    }
    fresh()
        .filter(|e| matcher.matches_relaxed(&prettify_identifier(&e.id)))
        .collect()
}
