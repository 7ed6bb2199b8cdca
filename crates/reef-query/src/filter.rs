use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::path::FieldPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A compiled filter: the backend-neutral tree a store consumes.
///
/// Every path in the tree has already been resolved against the document
/// shape by the predicate compiler. Built fresh per compilation and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    Compare {
        path: FieldPath,
        op: CompareOp,
        value: Bson,
    },
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    In {
        path: FieldPath,
        values: Vec<Bson>,
    },
    Exists {
        path: FieldPath,
        exists: bool,
    },
    Regex {
        path: FieldPath,
        pattern: String,
        case_insensitive: bool,
    },
}
