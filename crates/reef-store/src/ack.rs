use bson::Bson;
use serde::{Deserialize, Serialize};

/// Raw acknowledgement of a single write, exactly as a store reports it.
///
/// Shapes vary by operation (inserts fill `inserted_ids`, updates fill
/// `matched`/`modified`, and so on); the typed layer normalizes these into
/// per-operation results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteAck {
    pub acknowledged: bool,
    pub matched: u64,
    pub modified: u64,
    pub deleted: u64,
    pub inserted_ids: Vec<Bson>,
    pub upserted_id: Option<Bson>,
}

/// Per-item acknowledgement within a bulk response, in item order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemAck {
    Applied(WriteAck),
    Failed(String),
}
