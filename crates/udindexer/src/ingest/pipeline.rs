//! Dedup, classify, enrich, write: one descriptor into the catalog.

use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};

use crate::catalog::{release_repo, CatalogEntry, Database, DatabaseError};
use crate::classify::{classify_release, TitleClassifier};
use crate::descriptor::JobDescriptor;
use crate::enrich::MetadataEnricher;
use crate::error::{IndexerError, WorkerError};

/// How one ingest ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The identity was already in the catalog before we started.
    AlreadyCataloged,
    Cataloged(Box<CatalogEntry>),
    /// Another ingest of the same identity wrote first.
    LostRace,
}

pub struct IngestionPipeline {
    db: Database,
    classifier: Arc<dyn TitleClassifier>,
    enricher: Arc<MetadataEnricher>,
}

impl IngestionPipeline {
    pub fn new(
        db: Database,
        classifier: Arc<dyn TitleClassifier>,
        enricher: Arc<MetadataEnricher>,
    ) -> Self {
        Self {
            db,
            classifier,
            enricher,
        }
    }

    pub async fn ingest(&self, descriptor: JobDescriptor) -> Result<IngestOutcome, IndexerError> {
        let span = info_span!(
            "ingest",
            name = %descriptor.declared_name,
            size = descriptor.declared_size_bytes,
        );
        self.ingest_inner(descriptor).instrument(span).await
    }

    async fn ingest_inner(&self, descriptor: JobDescriptor) -> Result<IngestOutcome, IndexerError> {
        let filename = descriptor.declared_name.clone();
        let raw_size = descriptor.declared_size_bytes;

        let exists = self
            .blocking(move |db| release_repo::exists(db, &filename, raw_size))
            .await?;
        if exists {
            debug!("Already cataloged");
            return Ok(IngestOutcome::AlreadyCataloged);
        }

        let hints = self.classifier.classify(&descriptor.declared_name);
        let classification = classify_release(&hints);
        debug!(
            media_type = %classification.media_type,
            title = %classification.title,
            season = ?classification.season,
            episode = ?classification.episode,
            "Classified"
        );

        let enrichment = self
            .enricher
            .enrich(classification.media_type, &classification.title)
            .await
            .unwrap_or_default();

        let entry = CatalogEntry {
            filename: descriptor.declared_name,
            raw_size,
            media_type: classification.media_type,
            descriptor_file: Some(descriptor.descriptor_file),
            title: Some(classification.title).filter(|t| !t.is_empty()),
            year: classification.year,
            season: classification.season,
            episode: classification.episode,
            external_id: enrichment.external_id,
            tmdb_id: (enrichment.tmdb_id != 0).then_some(enrichment.tmdb_id),
            canonical_title: enrichment.canonical_title,
            original_title: enrichment.original_title,
            release_date: enrichment.release_date,
            release_year: enrichment.release_year,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let row = entry.clone();
        match self.blocking(move |db| release_repo::insert(db, &row)).await {
            Ok(()) => {
                info!(
                    media_type = %entry.media_type,
                    external_id = ?entry.external_id,
                    "Cataloged release"
                );
                Ok(IngestOutcome::Cataloged(Box::new(entry)))
            }
            Err(IndexerError::Database(DatabaseError::DuplicateKey { .. })) => {
                debug!("Concurrent ingest won the insert");
                Ok(IngestOutcome::LostRace)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs a catalog call off the async workers.
    async fn blocking<T, F>(&self, f: F) -> Result<T, IndexerError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, DatabaseError> + Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| WorkerError::TaskFailed(e.to_string()))?;
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{MediaType, ReleaseNameClassifier};
    use crate::descriptor::SourceKind;
    use crate::enrich::{Enrichment, EnrichmentError, MetadataProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MetadataProvider for FakeProvider {
        async fn lookup(
            &self,
            media_type: MediaType,
            title: &str,
        ) -> Result<Option<Enrichment>, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EnrichmentError::Status {
                    endpoint: "/search".to_string(),
                    status: 500,
                });
            }
            Ok(Some(Enrichment {
                tmdb_id: 42,
                external_id: Some("tt0000042".to_string()),
                canonical_title: Some(format!("{} ({})", title, media_type)),
                original_title: None,
                release_date: Some("2010-01-01".to_string()),
                release_year: Some(2010),
            }))
        }
    }

    fn pipeline(db: &Database, fail: bool) -> (IngestionPipeline, Arc<FakeProvider>) {
        let provider = Arc::new(FakeProvider {
            calls: AtomicUsize::new(0),
            fail,
        });
        let enricher = Arc::new(MetadataEnricher::new(
            provider.clone(),
            Duration::from_secs(60),
        ));
        let pipeline = IngestionPipeline::new(
            db.clone(),
            Arc::new(ReleaseNameClassifier::new()),
            enricher,
        );
        (pipeline, provider)
    }

    fn descriptor(name: &str, size: u64) -> JobDescriptor {
        JobDescriptor {
            declared_name: name.to_string(),
            declared_size_bytes: size,
            source_kind: SourceKind::Series,
            descriptor_file: format!("{}.nzb", name),
        }
    }

    #[tokio::test]
    async fn test_series_is_cataloged_with_enrichment() {
        let db = Database::open_in_memory().unwrap();
        let (pipeline, _) = pipeline(&db, false);

        let outcome = pipeline
            .ingest(descriptor("Show.S01E02.1080p.WEB.x264", 1_000_000_000))
            .await
            .unwrap();

        let entry = match outcome {
            IngestOutcome::Cataloged(entry) => entry,
            other => panic!("expected a new entry, got {:?}", other),
        };
        assert_eq!(entry.media_type, MediaType::Series);
        assert_eq!(entry.season, Some(1));
        assert_eq!(entry.episode.as_deref(), Some("E02"));
        assert_eq!(entry.tmdb_id, Some(42));
        assert_eq!(entry.external_id.as_deref(), Some("tt0000042"));

        let stored = release_repo::find(&db, "Show.S01E02.1080p.WEB.x264", 1_000_000_000)
            .unwrap()
            .unwrap();
        assert_eq!(stored, *entry);
    }

    #[tokio::test]
    async fn test_second_ingest_is_a_no_op() {
        let db = Database::open_in_memory().unwrap();
        let (pipeline, provider) = pipeline(&db, false);

        pipeline.ingest(descriptor("Movie.2020.1080p", 5)).await.unwrap();
        let second = pipeline.ingest(descriptor("Movie.2020.1080p", 5)).await.unwrap();

        assert_eq!(second, IngestOutcome::AlreadyCataloged);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        let (_, total) = release_repo::query(&db, &Default::default()).unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_enrichment_failure_does_not_block_write() {
        let db = Database::open_in_memory().unwrap();
        let (pipeline, _) = pipeline(&db, true);

        let outcome = pipeline.ingest(descriptor("Heat.1995.1080p", 9)).await.unwrap();

        let entry = match outcome {
            IngestOutcome::Cataloged(entry) => entry,
            other => panic!("expected a new entry, got {:?}", other),
        };
        assert_eq!(entry.media_type, MediaType::Movie);
        assert_eq!(entry.year, Some(1995));
        assert!(entry.external_id.is_none());
        assert!(entry.tmdb_id.is_none());
        assert!(entry.canonical_title.is_none());
    }

    /// Writes the same identity while classification runs, standing in for
    /// a concurrent ingest that wins the insert.
    struct RacingClassifier {
        db: Database,
        inner: ReleaseNameClassifier,
    }

    impl TitleClassifier for RacingClassifier {
        fn classify(&self, name: &str) -> crate::classify::TitleHints {
            let winner = CatalogEntry {
                filename: name.to_string(),
                raw_size: 5,
                media_type: MediaType::Movie,
                descriptor_file: None,
                title: None,
                year: None,
                season: None,
                episode: None,
                external_id: None,
                tmdb_id: None,
                canonical_title: Some("Winner".to_string()),
                original_title: None,
                release_date: None,
                release_year: None,
                created_at: "2026-01-01T00:00:00Z".to_string(),
            };
            release_repo::insert(&self.db, &winner).unwrap();
            self.inner.classify(name)
        }
    }

    #[tokio::test]
    async fn test_insert_race_is_reported_as_lost() {
        let db = Database::open_in_memory().unwrap();
        let provider = Arc::new(FakeProvider {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let pipeline = IngestionPipeline::new(
            db.clone(),
            Arc::new(RacingClassifier {
                db: db.clone(),
                inner: ReleaseNameClassifier::new(),
            }),
            Arc::new(MetadataEnricher::new(provider, Duration::from_secs(60))),
        );

        let outcome = pipeline.ingest(descriptor("Movie.2020.1080p", 5)).await.unwrap();

        assert_eq!(outcome, IngestOutcome::LostRace);
        let stored = release_repo::find(&db, "Movie.2020.1080p", 5).unwrap().unwrap();
        assert_eq!(stored.canonical_title.as_deref(), Some("Winner"));
    }
}
