use bson::Document;
use reef_store::DocumentStream;

use crate::error::CollectionError;

/// Lazily decodes raw documents coming back from a read request.
///
/// Single-pass: reads are side-effect-free, so a caller restarts by
/// re-issuing the find rather than rewinding the cursor.
pub struct Cursor<R> {
    stream: DocumentStream,
    decode: Box<dyn Fn(Document) -> Result<R, CollectionError> + Send>,
}

impl<R> Cursor<R> {
    pub(crate) fn new(
        stream: DocumentStream,
        decode: Box<dyn Fn(Document) -> Result<R, CollectionError> + Send>,
    ) -> Self {
        Self { stream, decode }
    }
}

impl<R> Iterator for Cursor<R> {
    type Item = Result<R, CollectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.stream.next()? {
            Ok(document) => Some((self.decode)(document)),
            Err(e) => Some(Err(CollectionError::Store(e))),
        }
    }
}
