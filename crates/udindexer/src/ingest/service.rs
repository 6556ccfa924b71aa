//! Bounded, supervised fan-out of ingests fed by the reconciliation engines.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use super::pipeline::{IngestOutcome, IngestionPipeline};
use crate::descriptor::JobDescriptor;
use crate::error::{IndexerError, WorkerError};
use crate::reconcile::DescriptorObserver;

/// Sending side of the ingestion queue. Never blocks.
#[derive(Clone)]
pub struct IngestionHandle {
    sender: mpsc::UnboundedSender<JobDescriptor>,
}

impl IngestionHandle {
    pub fn submit(&self, descriptor: JobDescriptor) -> Result<(), WorkerError> {
        self.sender
            .send(descriptor)
            .map_err(|_| WorkerError::ChannelClosed)
    }
}

impl DescriptorObserver for IngestionHandle {
    fn descriptor_parsed(&self, descriptor: &JobDescriptor) {
        if self.submit(descriptor.clone()).is_err() {
            warn!(
                name = %descriptor.declared_name,
                "Ingestion service is gone, descriptor not cataloged"
            );
        }
    }
}

/// Tally of finished ingests, returned when the service drains.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub cataloged: usize,
    pub already_cataloged: usize,
    pub lost_race: usize,
    pub failed: usize,
}

impl IngestStats {
    fn record(&mut self, finished: Result<Result<IngestOutcome, IndexerError>, JoinError>) {
        match finished {
            Ok(Ok(IngestOutcome::Cataloged(_))) => self.cataloged += 1,
            Ok(Ok(IngestOutcome::AlreadyCataloged)) => self.already_cataloged += 1,
            Ok(Ok(IngestOutcome::LostRace)) => self.lost_race += 1,
            Ok(Err(e)) => {
                error!(error = %e, "Ingest failed");
                self.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "Ingest task panicked");
                self.failed += 1;
            }
        }
    }
}

pub struct IngestionService {
    pipeline: Arc<IngestionPipeline>,
    concurrency: usize,
    receiver: mpsc::UnboundedReceiver<JobDescriptor>,
}

impl IngestionService {
    /// Creates the service and the handle feeding it. The service stops once
    /// every clone of the handle is dropped.
    pub fn new(pipeline: Arc<IngestionPipeline>, concurrency: usize) -> (Self, IngestionHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let service = Self {
            pipeline,
            concurrency: concurrency.max(1),
            receiver,
        };
        (service, IngestionHandle { sender })
    }

    /// Runs until the queue closes, then waits for outstanding ingests.
    pub async fn run(mut self) -> IngestStats {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut stats = IngestStats::default();

        info!(concurrency = self.concurrency, "Ingestion service started");

        loop {
            tokio::select! {
                next = self.receiver.recv() => {
                    let Some(descriptor) = next else {
                        break;
                    };
                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                        break;
                    };
                    let pipeline = Arc::clone(&self.pipeline);
                    tasks.spawn(async move {
                        let _permit = permit;
                        pipeline.ingest(descriptor).await
                    });
                }
                Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                    stats.record(finished);
                }
            }
        }

        info!(outstanding = tasks.len(), "Ingestion queue closed, draining");
        while let Some(finished) = tasks.join_next().await {
            stats.record(finished);
        }

        info!(
            cataloged = stats.cataloged,
            already_cataloged = stats.already_cataloged,
            lost_race = stats.lost_race,
            failed = stats.failed,
            "Ingestion service stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{release_repo, Database};
    use crate::classify::{MediaType, ReleaseNameClassifier};
    use crate::descriptor::SourceKind;
    use crate::enrich::{Enrichment, EnrichmentError, MetadataEnricher, MetadataProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many lookups run at once.
    struct SlowProvider {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl MetadataProvider for SlowProvider {
        async fn lookup(
            &self,
            _media_type: MediaType,
            _title: &str,
        ) -> Result<Option<Enrichment>, EnrichmentError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn service(db: &Database, concurrency: usize) -> (IngestionService, IngestionHandle, Arc<SlowProvider>) {
        let provider = Arc::new(SlowProvider {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let enricher = Arc::new(MetadataEnricher::new(provider.clone(), Duration::from_secs(60)));
        let pipeline = Arc::new(IngestionPipeline::new(
            db.clone(),
            Arc::new(ReleaseNameClassifier::new()),
            enricher,
        ));
        let (service, handle) = IngestionService::new(pipeline, concurrency);
        (service, handle, provider)
    }

    fn descriptor(name: &str) -> JobDescriptor {
        JobDescriptor {
            declared_name: name.to_string(),
            declared_size_bytes: 100,
            source_kind: SourceKind::Movie,
            descriptor_file: format!("{}.nzb", name),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_drains_queue_on_close() {
        let db = Database::open_in_memory().unwrap();
        let (service, handle, _) = service(&db, 2);

        for i in 0..6 {
            handle.submit(descriptor(&format!("Movie.{}.2020", i))).unwrap();
        }
        drop(handle);

        let stats = service.run().await;
        assert_eq!(stats.cataloged, 6);
        let (_, total) = release_repo::query(&db, &Default::default()).unwrap();
        assert_eq!(total, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let db = Database::open_in_memory().unwrap();
        let (service, handle, provider) = service(&db, 2);

        // Distinct titles so the enrichment cache never short-circuits.
        for title in ["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"] {
            handle.submit(descriptor(&format!("{}.2020.1080p", title))).unwrap();
        }
        drop(handle);

        service.run().await;
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_duplicate_submissions_yield_one_entry() {
        let db = Database::open_in_memory().unwrap();
        let (service, handle, _) = service(&db, 1);

        handle.descriptor_parsed(&descriptor("Movie.2020"));
        handle.descriptor_parsed(&descriptor("Movie.2020"));
        drop(handle);

        let stats = service.run().await;
        assert_eq!(stats.cataloged, 1);
        assert_eq!(stats.already_cataloged + stats.lost_race, 1);
        let (_, total) = release_repo::query(&db, &Default::default()).unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let db = Database::open_in_memory().unwrap();
        let (service, handle, _) = service(&db, 1);
        drop(service);

        assert!(matches!(
            handle.submit(descriptor("Late")),
            Err(WorkerError::ChannelClosed)
        ));
    }
}
