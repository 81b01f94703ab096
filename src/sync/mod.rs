pub mod links;
pub mod paths;
pub mod staleness;

pub use links::{is_format_excluded, redirect_document, usable_download_url};
pub use paths::{PathResolver, slugify};
pub use staleness::{SyncState, carry_saved_at, is_stale, naive_timestamp, now};
