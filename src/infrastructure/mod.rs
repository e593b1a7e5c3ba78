//! Infrastructure layer: node stores and DI container
//!
//! This layer implements the store boundary trait and wires up services.

pub mod di;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::{FaultInjector, MemoryStore};
pub use traits::NodeStore;
