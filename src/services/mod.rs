pub mod materializer;
pub mod retry;
pub mod scheduler;
pub mod shutdown;
pub mod sync_service;
pub mod walker;

pub use materializer::{Materializer, UrlResolution};
pub use retry::RetryPolicy;
pub use scheduler::SyncScheduler;
pub use shutdown::{Shutdown, shutdown_channel};
pub use sync_service::{SyncOptions, SyncService, SyncStats};
pub use walker::HierarchyWalker;
