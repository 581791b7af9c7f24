//! Persistence for beacon.
//!
//! Defines the store traits the pipeline and router depend on, plus two
//! implementations:
//! - `FsStore`: a directory of YAML documents and NDJSON logs
//! - `MemoryStore`: in-memory, with a switch for simulating outages

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use store::{DeliveryLog, FeedStore, PreferenceStore, RecordStore, Store};
