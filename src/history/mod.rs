pub mod config;
pub mod store;
pub mod values;

pub use config::{ConfigHistory, HistoryEntry};
pub use store::{history_key, FileHistoryStore, HistoryStorage, MemoryHistoryStore, StoreError};
pub use values::{TrendSummary, ValuesHistory};
