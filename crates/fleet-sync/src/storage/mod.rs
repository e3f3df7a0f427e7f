pub mod cache;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use cache::{LocalCache, HISTORY_KEY, VEHICLES_KEY};
pub use memory::MemoryBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
pub use traits::KeyValueBackend;
