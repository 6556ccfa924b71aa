pub mod job;
pub mod pool;
pub mod watcher;

pub use job::{Job, JobResult};
pub use pool::WorkerPool;
pub use watcher::IntakeWatcher;

// Re-export crossbeam_channel for use in main
pub use crossbeam_channel;
