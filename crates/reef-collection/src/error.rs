use std::fmt;

use reef_query::CompileError;
use reef_store::StoreError;

use crate::codec::CodecError;
use crate::result::BulkResult;

#[derive(Debug)]
pub enum CollectionError {
    /// The expression could not be compiled. Local and deterministic;
    /// nothing reached the store.
    Compile(CompileError),
    Store(StoreError),
    Codec(String),
    /// A single-document read matched nothing. Distinct from transport
    /// failure: the store answered, the answer was empty.
    NotFound(&'static str),
    /// Cancelled before the store acknowledged. The attempt may or may not
    /// have applied; at-most-once is all that is guaranteed.
    Cancelled,
    /// A bulk submission died in flight. `partial` aggregates whatever
    /// per-item acknowledgements the store returned before failing.
    BulkSubmission { partial: BulkResult, reason: String },
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::Compile(e) => write!(f, "{e}"),
            CollectionError::Store(e) => write!(f, "{e}"),
            CollectionError::Codec(msg) => write!(f, "codec error: {msg}"),
            CollectionError::NotFound(collection) => {
                write!(f, "no document matched in '{collection}'")
            }
            CollectionError::Cancelled => {
                write!(f, "operation cancelled before the store acknowledged")
            }
            CollectionError::BulkSubmission { reason, .. } => {
                write!(f, "bulk submission failed: {reason}")
            }
        }
    }
}

impl std::error::Error for CollectionError {}

impl From<CompileError> for CollectionError {
    fn from(e: CompileError) -> Self {
        CollectionError::Compile(e)
    }
}

impl From<StoreError> for CollectionError {
    fn from(e: StoreError) -> Self {
        CollectionError::Store(e)
    }
}

impl From<CodecError> for CollectionError {
    fn from(e: CodecError) -> Self {
        CollectionError::Codec(e.0)
    }
}
