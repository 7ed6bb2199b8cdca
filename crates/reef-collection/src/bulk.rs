use std::marker::PhantomData;
use std::sync::Arc;

use reef_query::{Doc, Predicate, Update, compile_predicate, compile_update};
use reef_store::{BulkItem, ItemAck, Store, StoreError};
use tracing::{debug, warn};

use crate::codec::{BsonCodec, Codec};
use crate::error::CollectionError;
use crate::result::{BulkItemFailure, BulkResult};

/// Accumulates heterogeneous write intents and submits them as one batch.
///
/// Every add-operation compiles and encodes immediately, so a malformed
/// filter or update fails at the call site rather than after a batch of
/// other work has been queued. Item order is preserved end-to-end into the
/// submitted request. Submitting consumes the writer; there is no way to
/// reuse one after its batch has gone out.
///
/// A writer belongs to one caller: it is not `Clone` and its buffer is
/// mutated only through `&mut self`.
pub struct BulkWriter<T, S, C = BsonCodec> {
    store: Arc<S>,
    codec: C,
    items: Vec<BulkItem>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S, C> BulkWriter<T, S, C>
where
    T: Doc + 'static,
    S: Store,
    C: Codec<T>,
{
    pub(crate) fn new(store: Arc<S>, codec: C) -> Self {
        Self {
            store,
            codec,
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert(&mut self, document: &T) -> Result<&mut Self, CollectionError> {
        let document = self.codec.encode(document)?;
        self.items.push(BulkItem::Insert { document });
        Ok(self)
    }

    pub fn replace_one(
        &mut self,
        filter: Predicate,
        document: &T,
        upsert: bool,
    ) -> Result<&mut Self, CollectionError> {
        let filter = compile_predicate(&T::schema(), &filter)?;
        let document = self.codec.encode(document)?;
        self.items.push(BulkItem::ReplaceOne {
            filter,
            document,
            upsert,
        });
        Ok(self)
    }

    pub fn update_one(
        &mut self,
        filter: Predicate,
        update: &Update,
        upsert: bool,
    ) -> Result<&mut Self, CollectionError> {
        let schema = T::schema();
        let filter = compile_predicate(&schema, &filter)?;
        let ops = compile_update(&schema, update)?;
        self.items.push(BulkItem::UpdateOne {
            filter,
            ops,
            upsert,
        });
        Ok(self)
    }

    pub fn update_many(
        &mut self,
        filter: Predicate,
        update: &Update,
    ) -> Result<&mut Self, CollectionError> {
        let schema = T::schema();
        let filter = compile_predicate(&schema, &filter)?;
        let ops = compile_update(&schema, update)?;
        self.items.push(BulkItem::UpdateMany { filter, ops });
        Ok(self)
    }

    pub fn delete_one(&mut self, filter: Predicate) -> Result<&mut Self, CollectionError> {
        let filter = compile_predicate(&T::schema(), &filter)?;
        self.items.push(BulkItem::DeleteOne { filter });
        Ok(self)
    }

    pub fn delete_many(&mut self, filter: Predicate) -> Result<&mut Self, CollectionError> {
        let filter = compile_predicate(&T::schema(), &filter)?;
        self.items.push(BulkItem::DeleteMany { filter });
        Ok(self)
    }

    /// Send the batch and reduce the store's per-item acknowledgements
    /// into one aggregate. Item failures land in `BulkResult::failures`;
    /// a transport failure mid-batch surfaces as `BulkSubmission` carrying
    /// the aggregate of whatever the store acknowledged first.
    pub fn submit(self) -> Result<BulkResult, CollectionError> {
        debug!(
            collection = T::COLLECTION,
            items = self.items.len(),
            "bulk submit"
        );
        let acks = match self.store.bulk_write(T::COLLECTION, &self.items) {
            Ok(acks) => acks,
            Err(StoreError::BulkInterrupted { completed, reason }) => {
                return Err(CollectionError::BulkSubmission {
                    partial: reduce(&completed),
                    reason,
                });
            }
            Err(e) => {
                return Err(CollectionError::BulkSubmission {
                    partial: BulkResult::default(),
                    reason: e.to_string(),
                });
            }
        };

        let result = reduce(&acks);
        if !result.failures.is_empty() {
            warn!(
                collection = T::COLLECTION,
                failed = result.failures.len(),
                "bulk items failed"
            );
        }
        Ok(result)
    }
}

fn reduce(acks: &[ItemAck]) -> BulkResult {
    let mut result = BulkResult::default();
    for (index, ack) in acks.iter().enumerate() {
        match ack {
            ItemAck::Applied(ack) => result.absorb(ack),
            ItemAck::Failed(reason) => result.failures.push(BulkItemFailure {
                index,
                reason: reason.clone(),
            }),
        }
    }
    result
}
