use bson::Document;
use reef_query::{FilterNode, FindOptions, ProjectionSpec, UpdateOp};
use serde::{Deserialize, Serialize};

use crate::ack::{ItemAck, WriteAck};
use crate::error::StoreError;

/// Lazy sequence of raw documents produced by a read request.
pub type DocumentStream = Box<dyn Iterator<Item = Result<Document, StoreError>> + Send>;

/// One write intent inside a bulk batch. Items are submitted in order and
/// the store acknowledges each item at the same index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkItem {
    Insert {
        document: Document,
    },
    ReplaceOne {
        filter: FilterNode,
        document: Document,
        upsert: bool,
    },
    UpdateOne {
        filter: FilterNode,
        ops: Vec<UpdateOp>,
        upsert: bool,
    },
    UpdateMany {
        filter: FilterNode,
        ops: Vec<UpdateOp>,
    },
    DeleteOne {
        filter: FilterNode,
    },
    DeleteMany {
        filter: FilterNode,
    },
}

/// Minimum capability surface the typed layer requires of a store.
///
/// Implementations are safe for concurrent use by multiple callers; any
/// retry policy lives behind this trait, never in front of it.
pub trait Store: Send + Sync {
    /// Issue one read request. Reads are side-effect-free, so a caller may
    /// restart a sequence by re-issuing the same request.
    fn find(
        &self,
        collection: &str,
        filter: Option<&FilterNode>,
        projection: Option<&ProjectionSpec>,
        options: &FindOptions,
    ) -> Result<DocumentStream, StoreError>;

    fn insert_one(&self, collection: &str, document: Document) -> Result<WriteAck, StoreError>;

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<WriteAck, StoreError>;

    fn replace_one(
        &self,
        collection: &str,
        filter: &FilterNode,
        document: Document,
        upsert: bool,
    ) -> Result<WriteAck, StoreError>;

    fn update_one(
        &self,
        collection: &str,
        filter: &FilterNode,
        ops: &[UpdateOp],
        upsert: bool,
    ) -> Result<WriteAck, StoreError>;

    fn update_many(
        &self,
        collection: &str,
        filter: &FilterNode,
        ops: &[UpdateOp],
    ) -> Result<WriteAck, StoreError>;

    fn delete_one(&self, collection: &str, filter: &FilterNode) -> Result<WriteAck, StoreError>;

    fn delete_many(&self, collection: &str, filter: &FilterNode) -> Result<WriteAck, StoreError>;

    /// Apply a heterogeneous batch in item order, one acknowledgement per
    /// item. Items are independent: a failed item does not roll back the
    /// ones that succeeded.
    fn bulk_write(
        &self,
        collection: &str,
        items: &[BulkItem],
    ) -> Result<Vec<ItemAck>, StoreError>;

    fn count(&self, collection: &str, filter: Option<&FilterNode>) -> Result<u64, StoreError>;
}
