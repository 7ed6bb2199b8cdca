use serde::{Deserialize, Serialize};

use crate::path::FieldPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Include,
    Exclude,
}

/// A compiled projection: every entry shares one polarity.
///
/// The identifier field rides along with an inclusion list unless
/// `suppress_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    pub polarity: Polarity,
    pub paths: Vec<FieldPath>,
    pub suppress_id: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionTerm {
    Include(FieldPath),
    Exclude(FieldPath),
    /// Reserved for stores that evaluate computed members server-side.
    /// The typed compiler refuses it.
    Computed { name: String, body: bson::Document },
}

/// A typed projection expression: an ordered list of field selections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    terms: Vec<ProjectionTerm>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// An inclusion list over the given paths.
    pub fn fields<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<FieldPath>,
    {
        Self {
            terms: paths
                .into_iter()
                .map(|path| ProjectionTerm::Include(path.into()))
                .collect(),
        }
    }

    pub fn include(mut self, path: impl Into<FieldPath>) -> Self {
        self.terms.push(ProjectionTerm::Include(path.into()));
        self
    }

    pub fn exclude(mut self, path: impl Into<FieldPath>) -> Self {
        self.terms.push(ProjectionTerm::Exclude(path.into()));
        self
    }

    pub fn computed(mut self, name: impl Into<String>, body: bson::Document) -> Self {
        self.terms.push(ProjectionTerm::Computed {
            name: name.into(),
            body,
        });
        self
    }

    pub fn terms(&self) -> &[ProjectionTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
