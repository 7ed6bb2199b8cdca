use std::collections::HashMap;
use std::sync::RwLock;

use bson::{Bson, Document};
use reef_query::{CompareOp, FilterNode, FindOptions, ProjectionSpec, UpdateOp};

use crate::ack::{ItemAck, WriteAck};
use crate::error::StoreError;
use crate::store::{BulkItem, DocumentStream, Store};

use super::{apply, eval};

const ID_FIELD: &str = "_id";

/// Reference in-process store: insertion-ordered collections of raw
/// documents. Correctness over throughput; meant for tests and embedded
/// use, not as a storage engine.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

fn ensure_id(document: &mut Document) -> Bson {
    match document.get(ID_FIELD) {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(bson::oid::ObjectId::new());
            document.insert(ID_FIELD, id.clone());
            id
        }
    }
}

/// Seed an upserted document from the filter's equality conditions, the
/// way a store derives the base document for an unmatched upsert.
fn seed_from_filter(document: &mut Document, filter: &FilterNode) {
    match filter {
        FilterNode::Compare {
            path,
            op: CompareOp::Eq,
            value,
        } => {
            let _ = apply::apply_ops(
                document,
                &[UpdateOp::Set {
                    path: path.clone(),
                    value: value.clone(),
                }],
            );
        }
        FilterNode::And(children) => {
            for child in children {
                seed_from_filter(document, child);
            }
        }
        _ => {}
    }
}

// Per-collection primitives; the trait methods lock once and delegate so
// that bulk_write can reuse them under a single write guard.

fn insert_locked(docs: &mut Vec<Document>, mut document: Document) -> WriteAck {
    let id = ensure_id(&mut document);
    docs.push(document);
    WriteAck {
        acknowledged: true,
        inserted_ids: vec![id],
        ..WriteAck::default()
    }
}

fn replace_one_locked(
    docs: &mut Vec<Document>,
    filter: &FilterNode,
    mut document: Document,
    upsert: bool,
) -> WriteAck {
    if let Some(existing) = docs.iter_mut().find(|doc| eval::matches(doc, filter)) {
        // Replacement keeps the identifier of the document it replaces.
        if let Some(id) = existing.get(ID_FIELD) {
            document.insert(ID_FIELD, id.clone());
        }
        let modified = u64::from(*existing != document);
        *existing = document;
        return WriteAck {
            acknowledged: true,
            matched: 1,
            modified,
            ..WriteAck::default()
        };
    }

    if upsert {
        let id = ensure_id(&mut document);
        docs.push(document);
        return WriteAck {
            acknowledged: true,
            upserted_id: Some(id),
            ..WriteAck::default()
        };
    }

    WriteAck {
        acknowledged: true,
        ..WriteAck::default()
    }
}

fn update_locked(
    docs: &mut Vec<Document>,
    filter: &FilterNode,
    ops: &[UpdateOp],
    upsert: bool,
    limit_one: bool,
) -> Result<WriteAck, String> {
    let mut matched = 0u64;
    let mut modified = 0u64;
    for doc in docs.iter_mut() {
        if !eval::matches(doc, filter) {
            continue;
        }
        matched += 1;
        if apply::apply_ops(doc, ops)? {
            modified += 1;
        }
        if limit_one {
            break;
        }
    }

    if matched == 0 && upsert {
        let mut document = Document::new();
        seed_from_filter(&mut document, filter);
        apply::apply_ops(&mut document, ops)?;
        let id = ensure_id(&mut document);
        docs.push(document);
        return Ok(WriteAck {
            acknowledged: true,
            upserted_id: Some(id),
            ..WriteAck::default()
        });
    }

    Ok(WriteAck {
        acknowledged: true,
        matched,
        modified,
        ..WriteAck::default()
    })
}

fn delete_locked(docs: &mut Vec<Document>, filter: &FilterNode, limit_one: bool) -> WriteAck {
    let deleted = if limit_one {
        match docs.iter().position(|doc| eval::matches(doc, filter)) {
            Some(index) => {
                docs.remove(index);
                1
            }
            None => 0,
        }
    } else {
        let before = docs.len();
        docs.retain(|doc| !eval::matches(doc, filter));
        (before - docs.len()) as u64
    };

    WriteAck {
        acknowledged: true,
        matched: deleted,
        deleted,
        ..WriteAck::default()
    }
}

fn apply_item(docs: &mut Vec<Document>, item: &BulkItem) -> Result<WriteAck, String> {
    match item {
        BulkItem::Insert { document } => Ok(insert_locked(docs, document.clone())),
        BulkItem::ReplaceOne {
            filter,
            document,
            upsert,
        } => Ok(replace_one_locked(docs, filter, document.clone(), *upsert)),
        BulkItem::UpdateOne {
            filter,
            ops,
            upsert,
        } => update_locked(docs, filter, ops, *upsert, true),
        BulkItem::UpdateMany { filter, ops } => update_locked(docs, filter, ops, false, false),
        BulkItem::DeleteOne { filter } => Ok(delete_locked(docs, filter, true)),
        BulkItem::DeleteMany { filter } => Ok(delete_locked(docs, filter, false)),
    }
}

impl Store for MemoryStore {
    fn find(
        &self,
        collection: &str,
        filter: Option<&FilterNode>,
        projection: Option<&ProjectionSpec>,
        options: &FindOptions,
    ) -> Result<DocumentStream, StoreError> {
        let collections = self.collections.read().unwrap();
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.is_none_or(|f| eval::matches(doc, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(collections);

        if !options.sort.is_empty() {
            docs.sort_by(|a, b| eval::compare_docs(a, b, &options.sort));
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let docs = docs.into_iter().skip(skip);
        let mut docs: Vec<Document> = match options.limit {
            Some(limit) => docs.take(limit as usize).collect(),
            None => docs.collect(),
        };

        if let Some(spec) = projection {
            for doc in &mut docs {
                *doc = eval::apply_projection(doc, spec, ID_FIELD);
            }
        }

        // batch_size is a wire hint; there is no wire here.
        Ok(Box::new(docs.into_iter().map(Ok)))
    }

    fn insert_one(&self, collection: &str, document: Document) -> Result<WriteAck, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        Ok(insert_locked(docs, document))
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<WriteAck, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        let mut inserted_ids = Vec::with_capacity(documents.len());
        for document in documents {
            inserted_ids.extend(insert_locked(docs, document).inserted_ids);
        }
        Ok(WriteAck {
            acknowledged: true,
            inserted_ids,
            ..WriteAck::default()
        })
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: &FilterNode,
        document: Document,
        upsert: bool,
    ) -> Result<WriteAck, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        Ok(replace_one_locked(docs, filter, document, upsert))
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &FilterNode,
        ops: &[UpdateOp],
        upsert: bool,
    ) -> Result<WriteAck, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        update_locked(docs, filter, ops, upsert, true).map_err(StoreError::Rejected)
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &FilterNode,
        ops: &[UpdateOp],
    ) -> Result<WriteAck, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        update_locked(docs, filter, ops, false, false).map_err(StoreError::Rejected)
    }

    fn delete_one(&self, collection: &str, filter: &FilterNode) -> Result<WriteAck, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        Ok(delete_locked(docs, filter, true))
    }

    fn delete_many(&self, collection: &str, filter: &FilterNode) -> Result<WriteAck, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        Ok(delete_locked(docs, filter, false))
    }

    fn bulk_write(
        &self,
        collection: &str,
        items: &[BulkItem],
    ) -> Result<Vec<ItemAck>, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        Ok(items
            .iter()
            .map(|item| match apply_item(docs, item) {
                Ok(ack) => ItemAck::Applied(ack),
                Err(reason) => ItemAck::Failed(reason),
            })
            .collect())
    }

    fn count(&self, collection: &str, filter: Option<&FilterNode>) -> Result<u64, StoreError> {
        let collections = self.collections.read().unwrap();
        let count = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.is_none_or(|f| eval::matches(doc, f)))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }
}
