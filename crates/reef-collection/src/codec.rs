use std::fmt;

use bson::Document;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug)]
pub struct CodecError(pub String);

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codec error: {}", self.0)
    }
}

impl std::error::Error for CodecError {}

/// Converts domain values to and from raw store documents.
///
/// Runs only at the executor boundary; the compilers never see a `T`.
pub trait Codec<T> {
    fn encode(&self, value: &T) -> Result<Document, CodecError>;
    fn decode(&self, document: Document) -> Result<T, CodecError>;
}

/// Serde-backed codec for any document type that derives
/// `Serialize`/`Deserialize`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonCodec;

impl<T> Codec<T> for BsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Document, CodecError> {
        bson::serialize_to_document(value).map_err(|e| CodecError(e.to_string()))
    }

    fn decode(&self, document: Document) -> Result<T, CodecError> {
        bson::deserialize_from_document(document).map_err(|e| CodecError(e.to_string()))
    }
}
