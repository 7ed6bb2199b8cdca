use bson::{Bson, Document};
use reef_query::{FieldPath, UpdateOp};

/// Walk to the parent of a dotted path, creating missing intermediate
/// sub-documents when `create` is set. Returns the parent document and the
/// leaf field name, or `None` when an intermediate is absent and `create`
/// is off.
fn parent_of<'a>(
    doc: &'a mut Document,
    path: &FieldPath,
    create: bool,
) -> Result<Option<(&'a mut Document, String)>, String> {
    let mut current = doc;
    let mut segments = path.segments().peekable();
    loop {
        let segment = segments.next().expect("field paths have at least one segment");
        if segments.peek().is_none() {
            return Ok(Some((current, segment.to_string())));
        }
        match current.get(segment) {
            Some(Bson::Document(_)) => {}
            Some(_) => {
                return Err(format!(
                    "path '{path}': intermediate '{segment}' is not a document"
                ));
            }
            None => {
                if !create {
                    return Ok(None);
                }
                current.insert(segment, Document::new());
            }
        }
        current = match current.get_mut(segment) {
            Some(Bson::Document(sub)) => sub,
            _ => unreachable!(),
        };
    }
}

fn set(doc: &mut Document, path: &FieldPath, value: &Bson) -> Result<bool, String> {
    let (parent, leaf) = parent_of(doc, path, true)?.expect("create mode always resolves");
    let previous = parent.insert(leaf, value.clone());
    Ok(previous.as_ref() != Some(value))
}

fn unset(doc: &mut Document, path: &FieldPath) -> Result<bool, String> {
    match parent_of(doc, path, false)? {
        Some((parent, leaf)) => Ok(parent.remove(&leaf).is_some()),
        None => Ok(false),
    }
}

/// Increment with numeric promotion: i32 arithmetic stays i32 until it
/// overflows into i64; any double operand promotes the result to double.
/// A missing field counts as zero of the increment's type.
fn inc(doc: &mut Document, path: &FieldPath, amount: &Bson) -> Result<bool, String> {
    let (parent, leaf) = parent_of(doc, path, true)?.expect("create mode always resolves");
    let current = parent.get(&leaf).cloned().unwrap_or(match amount {
        Bson::Int64(_) => Bson::Int64(0),
        Bson::Double(_) => Bson::Double(0.0),
        _ => Bson::Int32(0),
    });

    let next = match (&current, amount) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(i64::from(*a) + b),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a + i64::from(*b)),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a + b),
        (Bson::Int32(a), Bson::Double(b)) => Bson::Double(f64::from(*a) + b),
        (Bson::Int64(a), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (Bson::Double(a), Bson::Int32(b)) => Bson::Double(a + f64::from(*b)),
        (Bson::Double(a), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Bson::Double(a), Bson::Double(b)) => Bson::Double(a + b),
        _ => return Err(format!("cannot increment non-numeric field '{path}'")),
    };

    parent.insert(leaf, next);
    Ok(true)
}

fn push(doc: &mut Document, path: &FieldPath, value: &Bson) -> Result<bool, String> {
    let (parent, leaf) = parent_of(doc, path, true)?.expect("create mode always resolves");
    match parent.get_mut(&leaf) {
        Some(Bson::Array(elements)) => {
            elements.push(value.clone());
            Ok(true)
        }
        Some(_) => Err(format!("cannot push to non-array field '{path}'")),
        None => {
            parent.insert(leaf, Bson::Array(vec![value.clone()]));
            Ok(true)
        }
    }
}

fn pull(doc: &mut Document, path: &FieldPath, value: &Bson) -> Result<bool, String> {
    let Some((parent, leaf)) = parent_of(doc, path, false)? else {
        return Ok(false);
    };
    match parent.get_mut(&leaf) {
        Some(Bson::Array(elements)) => {
            let before = elements.len();
            elements.retain(|element| element != value);
            Ok(elements.len() != before)
        }
        Some(_) => Err(format!("cannot pull from non-array field '{path}'")),
        None => Ok(false),
    }
}

/// Apply an ordered operation sequence to one document. Returns whether
/// anything changed; an `Err` carries the per-item failure reason.
pub(crate) fn apply_ops(doc: &mut Document, ops: &[UpdateOp]) -> Result<bool, String> {
    let mut changed = false;
    for op in ops {
        changed |= match op {
            UpdateOp::Set { path, value } => set(doc, path, value)?,
            UpdateOp::Unset { path } => unset(doc, path)?,
            UpdateOp::Inc { path, amount } => inc(doc, path, amount)?,
            UpdateOp::Push { path, value } => push(doc, path, value)?,
            UpdateOp::Pull { path, value } => pull(doc, path, value)?,
        };
    }
    Ok(changed)
}
