mod bulk;
mod codec;
mod collection;
mod cursor;
mod error;
mod result;
mod task;

pub use bulk::BulkWriter;
pub use codec::{BsonCodec, Codec, CodecError};
pub use collection::Collection;
pub use cursor::Cursor;
pub use error::CollectionError;
pub use result::{
    BulkItemFailure, BulkResult, DeleteResult, InsertManyResult, InsertOneResult, ReplaceResult,
    UpdateResult,
};
pub use task::TaskCollection;

pub use tokio_util::sync::CancellationToken;
