use reef_query::{Doc, FindOptions, Predicate, Projection, Update};
use reef_store::Store;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::bulk::BulkWriter;
use crate::codec::Codec;
use crate::collection::Collection;
use crate::error::CollectionError;
use crate::result::{
    BulkResult, DeleteResult, InsertManyResult, InsertOneResult, ReplaceResult, UpdateResult,
};

/// Run one blocking operation on a cooperative worker, racing it against
/// cancellation. A token that is already cancelled short-circuits before
/// dispatch; cancelling mid-flight abandons the attempt, which may or may
/// not have applied (at-most-once, no guaranteed effect).
async fn run<R, F>(cancel: &CancellationToken, op: F) -> Result<R, CollectionError>
where
    F: FnOnce() -> Result<R, CollectionError> + Send + 'static,
    R: Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(CollectionError::Cancelled);
    }
    let worker = tokio::task::spawn_blocking(op);
    tokio::select! {
        _ = cancel.cancelled() => Err(CollectionError::Cancelled),
        joined = worker => match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(CollectionError::Cancelled),
        },
    }
}

/// Suspending forms of the collection operations.
///
/// One wrapper over the same blocking core: each method clones the handle,
/// runs the corresponding `Collection` operation on a worker, and suspends
/// only at the store boundary. The compilers themselves never suspend.
pub struct TaskCollection<T, S, C> {
    inner: Collection<T, S, C>,
}

impl<T, S, C> Collection<T, S, C>
where
    T: Doc + Send + 'static,
    S: Store + 'static,
    C: Codec<T> + Clone + Send + Sync + 'static,
{
    pub fn tasks(&self) -> TaskCollection<T, S, C> {
        TaskCollection {
            inner: self.clone(),
        }
    }
}

impl<T, S, C> TaskCollection<T, S, C>
where
    T: Doc + Send + 'static,
    S: Store + 'static,
    C: Codec<T> + Clone + Send + Sync + 'static,
{
    /// Collects the matching page; a lazy cursor would otherwise block the
    /// async caller at each step.
    pub async fn find(
        &self,
        filter: Option<Predicate>,
        options: FindOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.find(filter, &options)?.collect()).await
    }

    pub async fn find_projected<R>(
        &self,
        filter: Option<Predicate>,
        projection: Projection,
        options: FindOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<R>, CollectionError>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let this = self.inner.clone();
        run(cancel, move || {
            this.find_projected(filter, &projection, &options)?.collect()
        })
        .await
    }

    pub async fn find_one(
        &self,
        filter: Option<Predicate>,
        cancel: &CancellationToken,
    ) -> Result<T, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.find_one(filter)).await
    }

    pub async fn count(
        &self,
        filter: Option<Predicate>,
        cancel: &CancellationToken,
    ) -> Result<u64, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.count(filter)).await
    }

    pub async fn insert_one(
        &self,
        document: T,
        cancel: &CancellationToken,
    ) -> Result<InsertOneResult, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.insert_one(&document)).await
    }

    pub async fn insert_many(
        &self,
        documents: Vec<T>,
        cancel: &CancellationToken,
    ) -> Result<InsertManyResult, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.insert_many(&documents)).await
    }

    pub async fn replace_one(
        &self,
        filter: Predicate,
        replacement: T,
        upsert: bool,
        cancel: &CancellationToken,
    ) -> Result<ReplaceResult, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.replace_one(filter, &replacement, upsert)).await
    }

    pub async fn update_one(
        &self,
        filter: Predicate,
        update: Update,
        upsert: bool,
        cancel: &CancellationToken,
    ) -> Result<UpdateResult, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.update_one(filter, &update, upsert)).await
    }

    pub async fn update_many(
        &self,
        filter: Predicate,
        update: Update,
        cancel: &CancellationToken,
    ) -> Result<UpdateResult, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.update_many(filter, &update)).await
    }

    pub async fn delete_one(
        &self,
        filter: Predicate,
        cancel: &CancellationToken,
    ) -> Result<DeleteResult, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.delete_one(filter)).await
    }

    pub async fn delete_many(
        &self,
        filter: Predicate,
        cancel: &CancellationToken,
    ) -> Result<DeleteResult, CollectionError> {
        let this = self.inner.clone();
        run(cancel, move || this.delete_many(filter)).await
    }
}

impl<T, S, C> BulkWriter<T, S, C>
where
    T: Doc + Send + 'static,
    S: Store + 'static,
    C: Codec<T> + Send + 'static,
{
    /// Suspending submit: same consume-on-submit semantics as the blocking
    /// form, raced against cancellation.
    pub async fn submit_task(self, cancel: &CancellationToken) -> Result<BulkResult, CollectionError> {
        run(cancel, move || self.submit()).await
    }
}
