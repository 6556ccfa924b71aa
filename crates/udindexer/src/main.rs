use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use secrecy::SecretString;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use udindexer::config::{
    default_database_path, default_reconcile_workers, Settings, TmdbSettings,
    DEFAULT_TMDB_BASE_URL,
};
use udindexer::{
    Database, IngestionPipeline, IngestionService, IntakeWatcher, JobResult,
    MetadataEnricher, ReconcileEngine, ReleaseNameClassifier, SourceKind, SourceLayout,
    TmdbClient, WorkerPool,
};

/// Reconciles NZB announcements against the content mount and catalogs them.
#[derive(Parser, Debug)]
#[command(name = "udindexer", version, about)]
struct Args {
    /// Root under which each source's intake directory lives.
    #[arg(long, env = "BLACKHOLE_BASE_WATCH_PATH")]
    base_watch_path: PathBuf,

    /// Intake sub-path fed by the movie download manager.
    #[arg(long, env = "BLACKHOLE_RADARR_PATH")]
    radarr_path: String,

    /// Intake sub-path fed by the series download manager.
    #[arg(long, env = "BLACKHOLE_SONARR_PATH")]
    sonarr_path: String,

    /// Content mount searched for announced files.
    #[arg(long, env = "BLACKHOLE_UD_MOUNT_PATH")]
    mount_path: PathBuf,

    /// TMDB API key.
    #[arg(long, env = "TMDB_KEY", hide_env_values = true)]
    tmdb_key: String,

    #[arg(long, env = "TMDB_BASE_URL", default_value = DEFAULT_TMDB_BASE_URL)]
    tmdb_base_url: String,

    /// Catalog database file [default: ~/.udindexer/data/catalog.db]
    #[arg(long, env = "UDINDEXER_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Reconciliation threads per source [default: CPU count, at most 4]
    #[arg(long, env = "UDINDEXER_RECONCILE_WORKERS")]
    reconcile_workers: Option<usize>,

    /// Maximum ingests (and metadata lookups) in flight.
    #[arg(long, env = "UDINDEXER_INGEST_CONCURRENCY", default_value_t = 4)]
    ingest_concurrency: usize,

    /// Intake poll interval in seconds.
    #[arg(long, env = "UDINDEXER_POLL_INTERVAL_SECS", default_value_t = 2)]
    poll_interval_secs: u64,

    /// Per-request timeout for metadata lookups in seconds.
    #[arg(long, env = "UDINDEXER_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    http_timeout_secs: u64,

    /// How long metadata lookups stay cached, in seconds.
    #[arg(long, env = "UDINDEXER_CACHE_TTL_SECS", default_value_t = 3600)]
    cache_ttl_secs: u64,
}

impl Args {
    fn into_settings(self) -> Result<Settings> {
        let database_path = match self.db_path {
            Some(path) => path,
            None => default_database_path()
                .context("Cannot determine home directory; set UDINDEXER_DB_PATH")?,
        };

        let mut tmdb = TmdbSettings::new(SecretString::from(self.tmdb_key));
        tmdb.base_url = self.tmdb_base_url;
        tmdb.request_timeout = Duration::from_secs(self.http_timeout_secs);
        tmdb.cache_ttl = Duration::from_secs(self.cache_ttl_secs);

        Ok(Settings {
            base_watch_path: self.base_watch_path,
            movie_source: self.radarr_path,
            series_source: self.sonarr_path,
            content_mount: self.mount_path,
            database_path,
            tmdb,
            reconcile_workers: self
                .reconcile_workers
                .unwrap_or_else(default_reconcile_workers),
            ingest_concurrency: self.ingest_concurrency,
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
        })
    }
}

/// Everything running for one upstream source.
struct SourceRuntime {
    kind: SourceKind,
    pool: WorkerPool,
    watch_thread: JoinHandle<()>,
    drain_thread: JoinHandle<()>,
}

fn log_result(result: &JobResult) {
    debug!(
        job_id = %result.job_id,
        state = ?result.state,
        name = ?result.declared_name,
        error = ?result.error,
        "Job finished"
    );
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "udindexer=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = args
        .into_settings()?
        .validate()
        .context("Invalid configuration")?;
    ensure!(
        settings.content_mount.is_dir(),
        "Content mount {} is not a directory",
        settings.content_mount.display()
    );

    info!(
        base = %settings.base_watch_path.display(),
        mount = %settings.content_mount.display(),
        workers = settings.reconcile_workers,
        "Starting udindexer"
    );

    let db = Database::open(&settings.database_path).with_context(|| {
        format!(
            "Failed to open catalog at {}",
            settings.database_path.display()
        )
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("udindexer-ingest")
        .build()
        .context("Failed to start async runtime")?;

    let provider = Arc::new(TmdbClient::new(&settings.tmdb).context("Failed to build TMDB client")?);
    let enricher = Arc::new(MetadataEnricher::new(provider, settings.tmdb.cache_ttl));
    let pipeline = Arc::new(IngestionPipeline::new(
        db,
        Arc::new(ReleaseNameClassifier::new()),
        enricher,
    ));
    let (service, handle) = IngestionService::new(pipeline, settings.ingest_concurrency);
    let ingestion = runtime.spawn(service.run());

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            info!("Shutdown requested");
            flag.store(true, Ordering::Relaxed);
        })
        .context("Failed to install signal handler")?;
    }

    let mut sources = Vec::new();
    for kind in SourceKind::ALL {
        let layout = SourceLayout::new(kind, settings.source_root(kind));
        layout
            .bootstrap()
            .with_context(|| format!("Failed to prepare {} directories", kind))?;

        let engine = ReconcileEngine::new(layout.clone(), &settings.content_mount)
            .with_observer(Arc::new(handle.clone()));
        let pool = WorkerPool::new(Arc::new(engine), settings.reconcile_workers);

        let results = pool.results();
        let drain_thread = thread::Builder::new()
            .name(format!("results-{}", kind))
            .spawn(move || {
                for result in results.iter() {
                    log_result(&result);
                }
            })
            .context("Failed to spawn result thread")?;

        // The watch thread runs the startup recovery scan once it is live.
        let watcher = IntakeWatcher::new(layout, settings.poll_interval);
        let submitter = pool.submitter();
        let flag = Arc::clone(&shutdown);
        let watch_thread = thread::Builder::new()
            .name(format!("watch-{}", kind))
            .spawn(move || {
                let callback = move |job| {
                    if submitter.send(job).is_err() {
                        warn!("Worker pool closed, dropping discovered job");
                    }
                };
                if let Err(e) = watcher.watch(callback, flag) {
                    error!("Watcher for {} stopped: {}", kind, e);
                }
            })
            .context("Failed to spawn watch thread")?;

        sources.push(SourceRuntime {
            kind,
            pool,
            watch_thread,
            drain_thread,
        });
    }
    drop(handle);

    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(200));
    }

    for source in sources {
        if source.watch_thread.join().is_err() {
            error!("Watch thread for {} panicked", source.kind);
        }
        source.pool.shutdown();
        source.pool.wait();
        if source.drain_thread.join().is_err() {
            error!("Result thread for {} panicked", source.kind);
        }
    }

    let stats = runtime
        .block_on(ingestion)
        .context("Ingestion service panicked")?;
    info!(
        cataloged = stats.cataloged,
        failed = stats.failed,
        "Shutdown complete"
    );

    Ok(())
}
