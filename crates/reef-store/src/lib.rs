mod ack;
mod error;
mod store;

pub use ack::{ItemAck, WriteAck};
pub use error::StoreError;
pub use store::{BulkItem, DocumentStream, Store};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;
