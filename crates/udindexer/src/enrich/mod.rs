//! Best-effort metadata enrichment from an external identity service.

pub mod enricher;
pub mod error;
pub mod tmdb;

use async_trait::async_trait;

use crate::classify::MediaType;

pub use enricher::MetadataEnricher;
pub use error::EnrichmentError;
pub use tmdb::TmdbClient;

/// Identifiers and names resolved for one classified title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub tmdb_id: i64,
    /// IMDb id, `tt` prefixed.
    pub external_id: Option<String>,
    pub canonical_title: Option<String>,
    pub original_title: Option<String>,
    /// First air date for series, release date for movies (`YYYY-MM-DD`).
    pub release_date: Option<String>,
    pub release_year: Option<u16>,
}

/// Resolves a title to external identifiers.
///
/// `Ok(None)` means the service answered but knows no such title.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn lookup(
        &self,
        media_type: MediaType,
        title: &str,
    ) -> Result<Option<Enrichment>, EnrichmentError>;
}

/// Leading four-digit year of a `YYYY-MM-DD` date.
pub fn year_of(date: &str) -> Option<u16> {
    let year = date.get(..4)?;
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_of() {
        assert_eq!(year_of("2019-03-01"), Some(2019));
        assert_eq!(year_of("1999"), Some(1999));
        assert_eq!(year_of(""), None);
        assert_eq!(year_of("19"), None);
        assert_eq!(year_of("abcd-01-01"), None);
    }
}
