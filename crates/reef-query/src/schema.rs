use crate::path::FieldPath;

/// Declared shape of a document type.
///
/// The compilers resolve every `FieldPath` against this tree before
/// anything reaches a store, so an unknown field is a compile error at the
/// call site rather than a silently-empty match at query time.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar,
    Array(Box<Shape>),
    Document(Vec<(String, Shape)>),
}

impl Shape {
    pub fn scalar() -> Shape {
        Shape::Scalar
    }

    pub fn array(element: Shape) -> Shape {
        Shape::Array(Box::new(element))
    }

    pub fn document<I, N>(fields: I) -> Shape
    where
        I: IntoIterator<Item = (N, Shape)>,
        N: Into<String>,
    {
        Shape::Document(
            fields
                .into_iter()
                .map(|(name, shape)| (name.into(), shape))
                .collect(),
        )
    }

    /// Walk a dotted path through the tree. Returns `None` when any segment
    /// is unknown or navigates into a non-document field.
    pub fn resolve(&self, path: &FieldPath) -> Option<&Shape> {
        let mut current = self;
        for segment in path.segments() {
            match current {
                Shape::Document(fields) => {
                    current = fields
                        .iter()
                        .find(|(name, _)| name == segment)
                        .map(|(_, shape)| shape)?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Shape::Array(_))
    }
}

static ID_SHAPE: Shape = Shape::Scalar;

/// A document shape plus the name of its identifier field.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub id_field: &'static str,
    pub root: Shape,
}

impl Schema {
    pub fn new(root: Shape) -> Self {
        Self {
            id_field: "_id",
            root,
        }
    }

    pub fn with_id_field(mut self, id_field: &'static str) -> Self {
        self.id_field = id_field;
        self
    }

    /// Resolve a path, treating the identifier field as always present
    /// even when the declared shape omits it.
    pub fn resolve(&self, path: &FieldPath) -> Option<&Shape> {
        if path.as_str() == self.id_field {
            return Some(&ID_SHAPE);
        }
        self.root.resolve(path)
    }
}

/// Implemented by top-level document types: the collection they live in
/// and the shape their fields take.
pub trait Doc {
    /// Collection name within the store.
    const COLLECTION: &'static str;

    fn schema() -> Schema;
}
