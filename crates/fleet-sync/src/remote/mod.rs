pub mod classify;
pub mod memory;
pub mod postgrest;
pub mod rows;
pub mod traits;

pub use classify::classify_provider_error;
pub use memory::{MemoryRemote, RemoteOp};
pub use postgrest::PostgrestStore;
pub use traits::RemoteStore;
