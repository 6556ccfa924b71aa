use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, warn};

use super::{Enrichment, MetadataProvider};
use crate::classify::MediaType;

const CACHE_CAPACITY: u64 = 10_000;

/// Wraps a provider with a TTL cache and swallows its failures.
///
/// Both hits and "no such title" answers are cached; transport errors are
/// not, so the next release of the same title tries again.
pub struct MetadataEnricher {
    provider: Arc<dyn MetadataProvider>,
    cache: Cache<(MediaType, String), Option<Enrichment>>,
}

impl MetadataEnricher {
    pub fn new(provider: Arc<dyn MetadataProvider>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { provider, cache }
    }

    /// Looks up `title`, returning `None` on any failure or empty result.
    pub async fn enrich(&self, media_type: MediaType, title: &str) -> Option<Enrichment> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let key = (media_type, title.to_lowercase());
        if let Some(cached) = self.cache.get(&key) {
            debug!(%media_type, title, "Enrichment cache hit");
            return cached;
        }

        match self.provider.lookup(media_type, title).await {
            Ok(result) => {
                if result.is_none() {
                    debug!(%media_type, title, "No metadata match");
                }
                self.cache.insert(key, result.clone());
                result
            }
            Err(e) => {
                warn!(%media_type, title, error = %e, "Metadata lookup failed");
                None
            }
        }
    }
}
