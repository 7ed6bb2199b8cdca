use bson::Bson;

use crate::filter::CompareOp;
use crate::path::FieldPath;

/// A typed predicate expression over a document shape.
///
/// Built with [`field`] and composed with [`Predicate::and`] /
/// [`Predicate::or`] / [`Predicate::not`]. The set of variants is closed;
/// the compiler matches it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        path: FieldPath,
        op: CompareOp,
        value: Bson,
    },
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
    Not(Box<Predicate>),
    InSet {
        path: FieldPath,
        values: Vec<Bson>,
    },
    Exists {
        path: FieldPath,
        exists: bool,
    },
    Matches {
        path: FieldPath,
        pattern: String,
        case_insensitive: bool,
    },
    /// A raw filter fragment in the store's native syntax. Carried for wire
    /// passthrough; the typed compiler refuses it.
    Raw(bson::Document),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::AllOf(mut children) => {
                children.push(other);
                Predicate::AllOf(children)
            }
            first => Predicate::AllOf(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::AnyOf(mut children) => {
                children.push(other);
                Predicate::AnyOf(children)
            }
            first => Predicate::AnyOf(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    pub fn all_of(children: impl IntoIterator<Item = Predicate>) -> Predicate {
        Predicate::AllOf(children.into_iter().collect())
    }

    pub fn any_of(children: impl IntoIterator<Item = Predicate>) -> Predicate {
        Predicate::AnyOf(children.into_iter().collect())
    }
}

/// Entry point for building a predicate: a handle on one field of the
/// document shape.
pub fn field(path: impl Into<FieldPath>) -> Field {
    Field { path: path.into() }
}

#[derive(Debug, Clone)]
pub struct Field {
    path: FieldPath,
}

impl Field {
    /// Navigate into a nested field.
    pub fn dot(self, segment: &str) -> Field {
        Field {
            path: self.path.join(segment),
        }
    }

    fn compare(self, op: CompareOp, value: impl Into<Bson>) -> Predicate {
        Predicate::Compare {
            path: self.path,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Gte, value)
    }

    pub fn lt(self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<Bson>) -> Predicate {
        self.compare(CompareOp::Lte, value)
    }

    /// Membership in a literal set.
    pub fn in_set<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Predicate::InSet {
            path: self.path,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(self) -> Predicate {
        Predicate::Exists {
            path: self.path,
            exists: true,
        }
    }

    pub fn missing(self) -> Predicate {
        Predicate::Exists {
            path: self.path,
            exists: false,
        }
    }

    /// Match a regular expression against a string field.
    pub fn matches(self, pattern: impl Into<String>) -> Predicate {
        Predicate::Matches {
            path: self.path,
            pattern: pattern.into(),
            case_insensitive: false,
        }
    }

    pub fn matches_ignore_case(self, pattern: impl Into<String>) -> Predicate {
        Predicate::Matches {
            path: self.path,
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    pub fn starts_with(self, prefix: &str) -> Predicate {
        Predicate::Matches {
            path: self.path,
            pattern: format!("^{}", regex::escape(prefix)),
            case_insensitive: false,
        }
    }

    pub fn contains(self, needle: &str) -> Predicate {
        Predicate::Matches {
            path: self.path,
            pattern: regex::escape(needle),
            case_insensitive: false,
        }
    }
}
