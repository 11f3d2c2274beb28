//! Helper-data storage backends behind one `HelperStore` interface.

pub mod backend;
pub mod file;
pub mod memory;

use std::sync::Arc;

pub use backend::{BackendKind, HelperRef, HelperStore, StorageError};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::utils::config::StorageConfig;
use crate::utils::error::{IdentityError, Result};

/// Builds the configured backend. The variant set is closed on purpose:
/// new backends are added here, not discovered at runtime.
pub fn open_backend(config: &StorageConfig) -> Result<Arc<dyn HelperStore>> {
    match config.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryStore::new())),
        BackendKind::File => {
            let path = config.path.as_ref().ok_or_else(|| {
                IdentityError::Config("file backend requires storage.path".into())
            })?;
            Ok(Arc::new(FileStore::new(path)))
        }
    }
}
