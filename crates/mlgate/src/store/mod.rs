pub mod error;
pub mod in_memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryProjectStore;
pub use traits::{ProjectStore, StoreEntry, Updater};
