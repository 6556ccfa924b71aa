pub mod settings;

pub use settings::{
    default_database_path, default_reconcile_workers, Settings, TmdbSettings,
    DEFAULT_TMDB_BASE_URL,
};
