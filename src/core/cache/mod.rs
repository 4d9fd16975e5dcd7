pub mod model;
pub mod store;

pub use model::{CacheDocument, CacheEntry};
pub use store::{DownloadRecord, ModCache};

pub const CACHE_FILE_NAME: &str = "mod_cache.json";
