use bson::Bson;
use reef_store::WriteAck;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneResult {
    pub inserted_id: Bson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<Bson>,
}

/// Outcome of a replace: how many documents the filter matched, or the id
/// the store minted when the write upserted instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceResult {
    pub matched_count: u64,
    pub acknowledged: bool,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    pub acknowledged: bool,
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted_count: u64,
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemFailure {
    pub index: usize,
    pub reason: String,
}

/// Aggregate of a bulk submission. Counts cover the items that applied;
/// `failures` lists the ones that did not, in item order. Applied items
/// are never rolled back on account of failed ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    pub inserted_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    pub upserted_count: u64,
    pub failures: Vec<BulkItemFailure>,
}

impl BulkResult {
    pub(crate) fn absorb(&mut self, ack: &WriteAck) {
        self.inserted_count += ack.inserted_ids.len() as u64;
        self.matched_count += ack.matched;
        self.modified_count += ack.modified;
        self.deleted_count += ack.deleted;
        self.upserted_count += u64::from(ack.upserted_id.is_some());
    }
}

impl From<WriteAck> for InsertOneResult {
    fn from(ack: WriteAck) -> Self {
        Self {
            inserted_id: ack.inserted_ids.into_iter().next().unwrap_or(Bson::Null),
        }
    }
}

impl From<WriteAck> for InsertManyResult {
    fn from(ack: WriteAck) -> Self {
        Self {
            inserted_ids: ack.inserted_ids,
        }
    }
}

impl From<WriteAck> for ReplaceResult {
    fn from(ack: WriteAck) -> Self {
        Self {
            matched_count: ack.matched,
            acknowledged: ack.acknowledged,
            upserted_id: ack.upserted_id,
        }
    }
}

impl From<WriteAck> for UpdateResult {
    fn from(ack: WriteAck) -> Self {
        Self {
            matched_count: ack.matched,
            modified_count: ack.modified,
            acknowledged: ack.acknowledged,
            upserted_id: ack.upserted_id,
        }
    }
}

impl From<WriteAck> for DeleteResult {
    fn from(ack: WriteAck) -> Self {
        Self {
            deleted_count: ack.deleted,
            acknowledged: ack.acknowledged,
        }
    }
}
