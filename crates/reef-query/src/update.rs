use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::path::FieldPath;

/// One mutation against a document. An update compiles to an ordered
/// sequence of these; stores apply them in the order given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOp {
    Set { path: FieldPath, value: Bson },
    Unset { path: FieldPath },
    Inc { path: FieldPath, amount: Bson },
    Push { path: FieldPath, value: Bson },
    Pull { path: FieldPath, value: Bson },
}

impl UpdateOp {
    pub fn path(&self) -> &FieldPath {
        match self {
            UpdateOp::Set { path, .. }
            | UpdateOp::Unset { path }
            | UpdateOp::Inc { path, .. }
            | UpdateOp::Push { path, .. }
            | UpdateOp::Pull { path, .. } => path,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            UpdateOp::Set { .. } => "set",
            UpdateOp::Unset { .. } => "unset",
            UpdateOp::Inc { .. } => "inc",
            UpdateOp::Push { .. } => "push",
            UpdateOp::Pull { .. } => "pull",
        }
    }
}

/// A typed update expression: each builder call appends one operation,
/// and call order is preserved all the way into the wire request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<FieldPath>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Set {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn unset(mut self, path: impl Into<FieldPath>) -> Self {
        self.ops.push(UpdateOp::Unset { path: path.into() });
        self
    }

    pub fn inc(mut self, path: impl Into<FieldPath>, amount: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Inc {
            path: path.into(),
            amount: amount.into(),
        });
        self
    }

    /// Append a value to an array field.
    pub fn push(mut self, path: impl Into<FieldPath>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Push {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    /// Remove every element equal to `value` from an array field.
    pub fn pull(mut self, path: impl Into<FieldPath>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Pull {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
