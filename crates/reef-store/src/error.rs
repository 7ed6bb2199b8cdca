use std::fmt;

use crate::ack::ItemAck;

#[derive(Debug)]
pub enum StoreError {
    /// The store could not be reached or stopped responding.
    Unavailable(String),
    /// The store refused a request it did receive.
    Rejected(String),
    /// A bulk submission died partway through; `completed` holds whatever
    /// per-item acknowledgements the store managed to return.
    BulkInterrupted {
        completed: Vec<ItemAck>,
        reason: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            StoreError::Rejected(msg) => write!(f, "store rejected request: {msg}"),
            StoreError::BulkInterrupted { completed, reason } => write!(
                f,
                "bulk submission interrupted after {} items: {reason}",
                completed.len()
            ),
        }
    }
}

impl std::error::Error for StoreError {}
