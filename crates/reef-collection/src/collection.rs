use std::marker::PhantomData;
use std::sync::Arc;

use reef_query::{
    Doc, FilterNode, FindOptions, Predicate, Projection, Update, compile_predicate,
    compile_projection, compile_update,
};
use reef_store::Store;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::bulk::BulkWriter;
use crate::codec::{BsonCodec, Codec};
use crate::cursor::Cursor;
use crate::error::CollectionError;
use crate::result::{
    DeleteResult, InsertManyResult, InsertOneResult, ReplaceResult, UpdateResult,
};

/// Typed handle over one collection of `T` documents.
///
/// Cheap to clone and safe for concurrent callers; every operation
/// compiles its expressions first, so a bad filter or update fails at the
/// call site before anything reaches the store.
pub struct Collection<T, S, C = BsonCodec> {
    store: Arc<S>,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S, C: Clone> Clone for Collection<T, S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codec: self.codec.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, S> Collection<T, S>
where
    T: Doc + Serialize + DeserializeOwned + 'static,
    S: Store,
{
    pub fn new(store: impl Into<Arc<S>>) -> Self {
        Self::with_codec(store, BsonCodec)
    }
}

impl<T, S, C> Collection<T, S, C>
where
    T: Doc + 'static,
    S: Store,
    C: Codec<T> + Clone + Send + Sync + 'static,
{
    pub fn with_codec(store: impl Into<Arc<S>>, codec: C) -> Self {
        Self {
            store: store.into(),
            codec,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    fn compile_filter(&self, filter: &Predicate) -> Result<FilterNode, CollectionError> {
        Ok(compile_predicate(&T::schema(), filter)?)
    }

    // ── Read operations ─────────────────────────────────────────

    /// Issue one read request and decode results lazily through the codec.
    pub fn find(
        &self,
        filter: Option<Predicate>,
        options: &FindOptions,
    ) -> Result<Cursor<T>, CollectionError> {
        let node = filter
            .as_ref()
            .map(|f| self.compile_filter(f))
            .transpose()?;
        debug!(collection = T::COLLECTION, "find");
        let stream = self
            .store
            .find(T::COLLECTION, node.as_ref(), None, options)?;
        let codec = self.codec.clone();
        Ok(Cursor::new(
            stream,
            Box::new(move |doc| Ok(codec.decode(doc)?)),
        ))
    }

    /// A projected read. The wire shape is no longer a `T`, so rows decode
    /// into a caller-chosen type via serde rather than the collection codec.
    pub fn find_projected<R>(
        &self,
        filter: Option<Predicate>,
        projection: &Projection,
        options: &FindOptions,
    ) -> Result<Cursor<R>, CollectionError>
    where
        R: DeserializeOwned + 'static,
    {
        let schema = T::schema();
        let node = filter
            .as_ref()
            .map(|f| compile_predicate(&schema, f))
            .transpose()?;
        let spec = compile_projection(&schema, projection)?;
        debug!(collection = T::COLLECTION, "find projected");
        let stream = self
            .store
            .find(T::COLLECTION, node.as_ref(), Some(&spec), options)?;
        Ok(Cursor::new(
            stream,
            Box::new(|doc| {
                bson::deserialize_from_document(doc).map_err(|e| CollectionError::Codec(e.to_string()))
            }),
        ))
    }

    /// First matching document in the store's natural order. Matching
    /// nothing is a reportable condition, not an empty success: callers
    /// asking for exactly one document usually cannot proceed without it.
    pub fn find_one(&self, filter: Option<Predicate>) -> Result<T, CollectionError> {
        let options = FindOptions {
            limit: Some(1),
            ..FindOptions::default()
        };
        match self.find(filter, &options)?.next() {
            Some(result) => result,
            None => Err(CollectionError::NotFound(T::COLLECTION)),
        }
    }

    pub fn count(&self, filter: Option<Predicate>) -> Result<u64, CollectionError> {
        let node = filter
            .as_ref()
            .map(|f| self.compile_filter(f))
            .transpose()?;
        Ok(self.store.count(T::COLLECTION, node.as_ref())?)
    }

    // ── Write operations ────────────────────────────────────────

    pub fn insert_one(&self, document: &T) -> Result<InsertOneResult, CollectionError> {
        let doc = self.codec.encode(document)?;
        debug!(collection = T::COLLECTION, "insert_one");
        Ok(self.store.insert_one(T::COLLECTION, doc)?.into())
    }

    pub fn insert_many(&self, documents: &[T]) -> Result<InsertManyResult, CollectionError> {
        let docs = documents
            .iter()
            .map(|document| self.codec.encode(document))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(collection = T::COLLECTION, count = docs.len(), "insert_many");
        Ok(self.store.insert_many(T::COLLECTION, docs)?.into())
    }

    pub fn replace_one(
        &self,
        filter: Predicate,
        replacement: &T,
        upsert: bool,
    ) -> Result<ReplaceResult, CollectionError> {
        let node = self.compile_filter(&filter)?;
        let doc = self.codec.encode(replacement)?;
        debug!(collection = T::COLLECTION, upsert, "replace_one");
        Ok(self
            .store
            .replace_one(T::COLLECTION, &node, doc, upsert)?
            .into())
    }

    pub fn update_one(
        &self,
        filter: Predicate,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateResult, CollectionError> {
        let node = self.compile_filter(&filter)?;
        let ops = compile_update(&T::schema(), update)?;
        debug!(collection = T::COLLECTION, upsert, "update_one");
        Ok(self
            .store
            .update_one(T::COLLECTION, &node, &ops, upsert)?
            .into())
    }

    pub fn update_many(
        &self,
        filter: Predicate,
        update: &Update,
    ) -> Result<UpdateResult, CollectionError> {
        let node = self.compile_filter(&filter)?;
        let ops = compile_update(&T::schema(), update)?;
        debug!(collection = T::COLLECTION, "update_many");
        Ok(self.store.update_many(T::COLLECTION, &node, &ops)?.into())
    }

    pub fn delete_one(&self, filter: Predicate) -> Result<DeleteResult, CollectionError> {
        let node = self.compile_filter(&filter)?;
        debug!(collection = T::COLLECTION, "delete_one");
        Ok(self.store.delete_one(T::COLLECTION, &node)?.into())
    }

    pub fn delete_many(&self, filter: Predicate) -> Result<DeleteResult, CollectionError> {
        let node = self.compile_filter(&filter)?;
        debug!(collection = T::COLLECTION, "delete_many");
        Ok(self.store.delete_many(T::COLLECTION, &node)?.into())
    }

    /// Start a bulk batch against this collection. The writer is
    /// single-use: submitting consumes it.
    pub fn bulk(&self) -> BulkWriter<T, S, C> {
        BulkWriter::new(Arc::clone(&self.store), self.codec.clone())
    }
}
