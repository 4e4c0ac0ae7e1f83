pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryActivityStorage;
pub use sqlite::SqliteActivityStorage;
pub use traits::ActivityStorage;

use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

/// Build the process-wide storage handle selected by configuration
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn ActivityStorage>> {
    match config.backend {
        StorageBackend::Sqlite => {
            info!("Opening SQLite activity store at {}", config.sqlite_path.display());
            Ok(Arc::new(SqliteActivityStorage::open(&config.sqlite_path)?))
        }
        StorageBackend::Memory => {
            info!("Using in-memory activity store");
            Ok(Arc::new(InMemoryActivityStorage::new()))
        }
    }
}
