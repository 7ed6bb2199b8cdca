mod compile;
mod filter;
mod options;
mod path;
mod predicate;
mod projection;
mod schema;
mod update;

pub use compile::{CompileError, compile_predicate, compile_projection, compile_update};
pub use filter::{CompareOp, FilterNode};
pub use options::{FindOptions, Sort, SortDirection};
pub use path::FieldPath;
pub use predicate::{Field, Predicate, field};
pub use projection::{Polarity, Projection, ProjectionSpec, ProjectionTerm};
pub use schema::{Doc, Schema, Shape};
pub use update::{Update, UpdateOp};
