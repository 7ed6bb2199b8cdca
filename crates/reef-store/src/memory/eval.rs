use std::cmp::Ordering;

use bson::{Bson, Document};
use reef_query::{CompareOp, FieldPath, FilterNode, Polarity, ProjectionSpec, Sort, SortDirection};
use regex::Regex;

/// Resolve a dotted path against a document. `None` when any segment is
/// missing or an intermediate is not a sub-document.
pub(crate) fn resolve_path<'a>(doc: &'a Document, path: &FieldPath) -> Option<&'a Bson> {
    let mut current = doc;
    let mut segments = path.segments().peekable();
    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        match value {
            Bson::Document(sub) => current = sub,
            _ => return None,
        }
    }
    None
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Compare two values if their types are comparable. Numbers compare
/// numerically across integer/double representations.
pub(crate) fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => (a == b).then_some(Ordering::Equal),
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}

/// Evaluate a filter against a document.
pub(crate) fn matches(doc: &Document, filter: &FilterNode) -> bool {
    match filter {
        FilterNode::Compare { path, op, value } => {
            let field = resolve_path(doc, path);
            match op {
                CompareOp::Eq => field.is_some_and(|f| values_equal(f, value)),
                CompareOp::Ne => !field.is_some_and(|f| values_equal(f, value)),
                CompareOp::Gt => {
                    field.is_some_and(|f| compare_values(f, value) == Some(Ordering::Greater))
                }
                CompareOp::Gte => field.is_some_and(|f| {
                    matches!(
                        compare_values(f, value),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                }),
                CompareOp::Lt => {
                    field.is_some_and(|f| compare_values(f, value) == Some(Ordering::Less))
                }
                CompareOp::Lte => field.is_some_and(|f| {
                    matches!(
                        compare_values(f, value),
                        Some(Ordering::Less | Ordering::Equal)
                    )
                }),
            }
        }
        FilterNode::And(children) => children.iter().all(|child| matches(doc, child)),
        FilterNode::Or(children) => children.iter().any(|child| matches(doc, child)),
        FilterNode::Not(inner) => !matches(doc, inner),
        FilterNode::In { path, values } => match resolve_path(doc, path) {
            // An array field is in the set when any element is.
            Some(Bson::Array(elements)) => elements
                .iter()
                .any(|element| values.iter().any(|value| values_equal(element, value))),
            Some(field) => values.iter().any(|value| values_equal(field, value)),
            None => false,
        },
        FilterNode::Exists { path, exists } => resolve_path(doc, path).is_some() == *exists,
        FilterNode::Regex {
            path,
            pattern,
            case_insensitive,
        } => {
            let Some(Bson::String(subject)) = resolve_path(doc, path) else {
                return false;
            };
            let pattern = if *case_insensitive {
                format!("(?i){pattern}")
            } else {
                pattern.clone()
            };
            Regex::new(&pattern).is_ok_and(|re| re.is_match(subject))
        }
    }
}

/// Total order over documents for a sort spec. Missing fields sort first.
pub(crate) fn compare_docs(a: &Document, b: &Document, sorts: &[Sort]) -> Ordering {
    for sort in sorts {
        let ord = match (resolve_path(a, &sort.field), resolve_path(b, &sort.field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        };
        let ord = match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn insert_path(doc: &mut Document, path: &FieldPath, value: Bson) {
    let mut current = doc;
    let mut segments = path.segments().peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment, value);
            return;
        }
        if !matches!(current.get(segment), Some(Bson::Document(_))) {
            current.insert(segment, Document::new());
        }
        current = match current.get_mut(segment) {
            Some(Bson::Document(sub)) => sub,
            _ => unreachable!(),
        };
    }
}

fn remove_path(doc: &mut Document, path: &FieldPath) {
    let mut current = doc;
    let mut segments = path.segments().peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.remove(segment);
            return;
        }
        current = match current.get_mut(segment) {
            Some(Bson::Document(sub)) => sub,
            _ => return,
        };
    }
}

/// Apply a projection to one document.
pub(crate) fn apply_projection(doc: &Document, spec: &ProjectionSpec, id_field: &str) -> Document {
    match spec.polarity {
        Polarity::Include => {
            let mut out = Document::new();
            if !spec.suppress_id
                && let Some(id) = doc.get(id_field)
            {
                out.insert(id_field, id.clone());
            }
            for path in &spec.paths {
                if let Some(value) = resolve_path(doc, path) {
                    insert_path(&mut out, path, value.clone());
                }
            }
            out
        }
        Polarity::Exclude => {
            let mut out = doc.clone();
            for path in &spec.paths {
                remove_path(&mut out, path);
            }
            if spec.suppress_id {
                out.remove(id_field);
            }
            out
        }
    }
}
