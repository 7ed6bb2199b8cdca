use std::fmt;

use bson::Bson;
use regex::Regex;

use crate::filter::FilterNode;
use crate::path::FieldPath;
use crate::predicate::Predicate;
use crate::projection::{Polarity, Projection, ProjectionSpec, ProjectionTerm};
use crate::schema::{Schema, Shape};
use crate::update::{Update, UpdateOp};

/// Compilation error: always local and deterministic, reported before
/// anything reaches a store. Never worth retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    UnsupportedExpression(String),
    UnsupportedProjection(String),
    FieldNotFound(String),
    AmbiguousPolarity {
        include: String,
        exclude: String,
    },
    ConflictingUpdatePath {
        path: String,
        earlier: &'static str,
        later: &'static str,
    },
    InvalidOperand {
        path: String,
        expected: &'static str,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnsupportedExpression(msg) => {
                write!(f, "unsupported expression: {msg}")
            }
            CompileError::UnsupportedProjection(msg) => {
                write!(f, "unsupported projection: {msg}")
            }
            CompileError::FieldNotFound(path) => {
                write!(f, "field not found on document shape: {path}")
            }
            CompileError::AmbiguousPolarity { include, exclude } => write!(
                f,
                "projection mixes inclusion of '{include}' with exclusion of '{exclude}'"
            ),
            CompileError::ConflictingUpdatePath {
                path,
                earlier,
                later,
            } => write!(
                f,
                "update targets '{path}' with both {earlier} and {later}"
            ),
            CompileError::InvalidOperand { path, expected } => {
                write!(f, "operation on '{path}' requires {expected}")
            }
        }
    }
}

impl std::error::Error for CompileError {}

fn resolve<'a>(schema: &'a Schema, path: &FieldPath) -> Result<&'a Shape, CompileError> {
    schema
        .resolve(path)
        .ok_or_else(|| CompileError::FieldNotFound(path.to_string()))
}

// ── Predicate compilation ───────────────────────────────────────

/// Compile a typed predicate into the filter tree a store consumes.
///
/// Pure: compiling the same expression twice yields structurally identical
/// trees. The only rewriting is flattening of nested same-operator logical
/// groups, which never changes which documents match.
pub fn compile_predicate(
    schema: &Schema,
    predicate: &Predicate,
) -> Result<FilterNode, CompileError> {
    match predicate {
        Predicate::Compare { path, op, value } => {
            resolve(schema, path)?;
            Ok(FilterNode::Compare {
                path: path.clone(),
                op: *op,
                value: value.clone(),
            })
        }
        Predicate::InSet { path, values } => {
            resolve(schema, path)?;
            Ok(FilterNode::In {
                path: path.clone(),
                values: values.clone(),
            })
        }
        Predicate::Exists { path, exists } => {
            resolve(schema, path)?;
            Ok(FilterNode::Exists {
                path: path.clone(),
                exists: *exists,
            })
        }
        Predicate::Matches {
            path,
            pattern,
            case_insensitive,
        } => {
            resolve(schema, path)?;
            if let Err(e) = Regex::new(pattern) {
                return Err(CompileError::UnsupportedExpression(format!(
                    "invalid pattern '{pattern}': {e}"
                )));
            }
            Ok(FilterNode::Regex {
                path: path.clone(),
                pattern: pattern.clone(),
                case_insensitive: *case_insensitive,
            })
        }
        Predicate::AllOf(children) => compile_logical(schema, children, true),
        Predicate::AnyOf(children) => compile_logical(schema, children, false),
        Predicate::Not(inner) => Ok(FilterNode::Not(Box::new(compile_predicate(
            schema, inner,
        )?))),
        Predicate::Raw(_) => Err(CompileError::UnsupportedExpression(
            "raw filter fragments cannot be checked against a document shape".into(),
        )),
    }
}

fn compile_logical(
    schema: &Schema,
    children: &[Predicate],
    conjunction: bool,
) -> Result<FilterNode, CompileError> {
    if children.is_empty() {
        return Err(CompileError::UnsupportedExpression(
            "empty logical group".into(),
        ));
    }

    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        match (conjunction, compile_predicate(schema, child)?) {
            (true, FilterNode::And(inner)) => nodes.extend(inner),
            (false, FilterNode::Or(inner)) => nodes.extend(inner),
            (_, node) => nodes.push(node),
        }
    }

    if nodes.len() == 1 {
        return Ok(nodes.pop().unwrap());
    }
    Ok(if conjunction {
        FilterNode::And(nodes)
    } else {
        FilterNode::Or(nodes)
    })
}

// ── Projection compilation ──────────────────────────────────────

/// Compile a typed projection into a single-polarity spec.
///
/// The identifier field is implicitly included unless explicitly excluded;
/// excluding it does not count against the polarity invariant.
pub fn compile_projection(
    schema: &Schema,
    projection: &Projection,
) -> Result<ProjectionSpec, CompileError> {
    if projection.is_empty() {
        return Err(CompileError::UnsupportedProjection(
            "empty projection".into(),
        ));
    }

    let mut polarity: Option<Polarity> = None;
    let mut paths: Vec<FieldPath> = Vec::new();
    let mut suppress_id = false;
    let mut first_include: Option<String> = None;
    let mut first_exclude: Option<String> = None;

    for term in projection.terms() {
        match term {
            ProjectionTerm::Computed { name, .. } => {
                return Err(CompileError::UnsupportedProjection(format!(
                    "computed member '{name}': only direct field reads are supported"
                )));
            }
            ProjectionTerm::Include(path) => {
                resolve(schema, path)?;
                if let Some(exclude) = &first_exclude {
                    return Err(CompileError::AmbiguousPolarity {
                        include: path.to_string(),
                        exclude: exclude.clone(),
                    });
                }
                first_include.get_or_insert_with(|| path.to_string());
                polarity = Some(Polarity::Include);
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            }
            ProjectionTerm::Exclude(path) => {
                if path.as_str() == schema.id_field {
                    suppress_id = true;
                    continue;
                }
                resolve(schema, path)?;
                if let Some(include) = &first_include {
                    return Err(CompileError::AmbiguousPolarity {
                        include: include.clone(),
                        exclude: path.to_string(),
                    });
                }
                first_exclude.get_or_insert_with(|| path.to_string());
                polarity = Some(Polarity::Exclude);
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            }
        }
    }

    // A projection that only excludes the identifier is an exclusion list.
    Ok(ProjectionSpec {
        polarity: polarity.unwrap_or(Polarity::Exclude),
        paths,
        suppress_id,
    })
}

// ── Update compilation ──────────────────────────────────────────

/// Compile a typed update into its ordered operation sequence.
///
/// Two operations of different kind on one path are rejected outright;
/// repeated operations of the same kind are allowed, since order is
/// preserved and the store applies them in sequence.
pub fn compile_update(schema: &Schema, update: &Update) -> Result<Vec<UpdateOp>, CompileError> {
    if update.is_empty() {
        return Err(CompileError::UnsupportedExpression("empty update".into()));
    }

    let mut seen: Vec<(&FieldPath, &'static str)> = Vec::new();
    for op in update.ops() {
        let shape = resolve(schema, op.path())?;
        match op {
            UpdateOp::Inc { path, amount } => {
                if !matches!(amount, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) {
                    return Err(CompileError::InvalidOperand {
                        path: path.to_string(),
                        expected: "a numeric amount",
                    });
                }
            }
            UpdateOp::Push { path, .. } | UpdateOp::Pull { path, .. } => {
                if !shape.is_array() {
                    return Err(CompileError::InvalidOperand {
                        path: path.to_string(),
                        expected: "an array field",
                    });
                }
            }
            UpdateOp::Set { .. } | UpdateOp::Unset { .. } => {}
        }

        if let Some((_, earlier)) = seen
            .iter()
            .find(|(path, kind)| *path == op.path() && *kind != op.kind())
        {
            return Err(CompileError::ConflictingUpdatePath {
                path: op.path().to_string(),
                earlier,
                later: op.kind(),
            });
        }
        seen.push((op.path(), op.kind()));
    }

    Ok(update.ops().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CompareOp;
    use crate::predicate::field;

    fn schema() -> Schema {
        Schema::new(Shape::document([
            ("customer", Shape::scalar()),
            ("status", Shape::scalar()),
            ("total", Shape::scalar()),
            (
                "shipping",
                Shape::document([("city", Shape::scalar()), ("zip", Shape::scalar())]),
            ),
            ("tags", Shape::array(Shape::scalar())),
        ]))
    }

    // ── compile_predicate ───────────────────────────────────────

    #[test]
    fn compare_on_known_field() {
        let node = compile_predicate(&schema(), &field("total").gt(100)).unwrap();
        match node {
            FilterNode::Compare { path, op, value } => {
                assert_eq!(path.as_str(), "total");
                assert_eq!(op, CompareOp::Gt);
                assert_eq!(value, Bson::Int32(100));
            }
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn compare_on_navigated_field() {
        let node =
            compile_predicate(&schema(), &field("shipping").dot("city").eq("Lisbon")).unwrap();
        assert!(
            matches!(node, FilterNode::Compare { ref path, .. } if path.as_str() == "shipping.city")
        );
    }

    #[test]
    fn unknown_field_errors() {
        let err = compile_predicate(&schema(), &field("missing").eq(1)).unwrap_err();
        assert_eq!(err, CompileError::FieldNotFound("missing".into()));
    }

    #[test]
    fn unknown_nested_field_errors() {
        let err =
            compile_predicate(&schema(), &field("shipping").dot("country").eq("PT")).unwrap_err();
        assert_eq!(err, CompileError::FieldNotFound("shipping.country".into()));
    }

    #[test]
    fn id_field_resolves_without_declaration() {
        let node = compile_predicate(&schema(), &field("_id").eq("ord-1")).unwrap();
        assert!(matches!(node, FilterNode::Compare { .. }));
    }

    #[test]
    fn raw_fragment_is_refused() {
        let err = compile_predicate(&schema(), &Predicate::Raw(bson::doc! { "$where": "1" }))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedExpression(_)));
    }

    #[test]
    fn membership_compiles_to_in() {
        let node =
            compile_predicate(&schema(), &field("status").in_set(["open", "held"])).unwrap();
        match node {
            FilterNode::In { path, values } => {
                assert_eq!(path.as_str(), "status");
                assert_eq!(values.len(), 2);
            }
            other => panic!("expected In, got {other:?}"),
        }
    }

    #[test]
    fn nested_same_operator_groups_flatten() {
        let inner = field("customer").eq("ada").and(field("status").eq("open"));
        let expr = Predicate::all_of([inner, field("total").gt(10)]);
        let node = compile_predicate(&schema(), &expr).unwrap();
        match node {
            FilterNode::And(children) => {
                assert_eq!(children.len(), 3);
                assert!(children.iter().all(|c| matches!(c, FilterNode::Compare { .. })));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn mixed_operator_groups_do_not_flatten() {
        let any = field("status").eq("open").or(field("status").eq("held"));
        let expr = any.and(field("total").gt(10));
        let node = compile_predicate(&schema(), &expr).unwrap();
        match node {
            FilterNode::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], FilterNode::Or(_)));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn single_child_group_unwraps() {
        let expr = Predicate::all_of([field("status").eq("open")]);
        let node = compile_predicate(&schema(), &expr).unwrap();
        assert!(matches!(node, FilterNode::Compare { .. }));
    }

    #[test]
    fn empty_group_errors() {
        let err = compile_predicate(&schema(), &Predicate::all_of([])).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedExpression(_)));
    }

    #[test]
    fn not_recurses() {
        let node = compile_predicate(&schema(), &field("status").eq("open").not()).unwrap();
        match node {
            FilterNode::Not(inner) => assert!(matches!(*inner, FilterNode::Compare { .. })),
            other => panic!("expected Not, got {other:?}"),
        }
    }

    #[test]
    fn invalid_pattern_errors() {
        let err = compile_predicate(&schema(), &field("customer").matches("[oops")).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedExpression(_)));
    }

    #[test]
    fn compiling_twice_is_deterministic() {
        let expr = field("status")
            .in_set(["open", "held"])
            .and(field("total").gte(5).or(field("tags").exists()))
            .and(field("customer").starts_with("a"));
        let first = compile_predicate(&schema(), &expr).unwrap();
        let second = compile_predicate(&schema(), &expr).unwrap();
        assert_eq!(first, second);
    }

    // ── compile_projection ──────────────────────────────────────

    #[test]
    fn inclusion_list() {
        let spec =
            compile_projection(&schema(), &Projection::fields(["customer", "total"])).unwrap();
        assert_eq!(spec.polarity, Polarity::Include);
        assert_eq!(spec.paths.len(), 2);
        assert!(!spec.suppress_id);
    }

    #[test]
    fn exclusion_list() {
        let proj = Projection::new().exclude("shipping").exclude("tags");
        let spec = compile_projection(&schema(), &proj).unwrap();
        assert_eq!(spec.polarity, Polarity::Exclude);
        assert_eq!(spec.paths.len(), 2);
    }

    #[test]
    fn mixed_polarity_errors() {
        let proj = Projection::new().include("customer").exclude("status");
        let err = compile_projection(&schema(), &proj).unwrap_err();
        assert_eq!(
            err,
            CompileError::AmbiguousPolarity {
                include: "customer".into(),
                exclude: "status".into(),
            }
        );
    }

    #[test]
    fn mixed_polarity_errors_exclude_first() {
        let proj = Projection::new().exclude("status").include("customer");
        let err = compile_projection(&schema(), &proj).unwrap_err();
        assert!(matches!(err, CompileError::AmbiguousPolarity { .. }));
    }

    #[test]
    fn excluding_id_alongside_includes_is_allowed() {
        let proj = Projection::new().include("customer").exclude("_id");
        let spec = compile_projection(&schema(), &proj).unwrap();
        assert_eq!(spec.polarity, Polarity::Include);
        assert!(spec.suppress_id);
        assert_eq!(spec.paths.len(), 1);
    }

    #[test]
    fn excluding_only_id_is_an_exclusion_list() {
        let proj = Projection::new().exclude("_id");
        let spec = compile_projection(&schema(), &proj).unwrap();
        assert_eq!(spec.polarity, Polarity::Exclude);
        assert!(spec.suppress_id);
        assert!(spec.paths.is_empty());
    }

    #[test]
    fn computed_member_is_refused() {
        let proj = Projection::new()
            .include("customer")
            .computed("upper_name", bson::doc! { "$toUpper": "$customer" });
        let err = compile_projection(&schema(), &proj).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedProjection(_)));
    }

    #[test]
    fn unknown_projected_field_errors() {
        let proj = Projection::fields(["nope"]);
        let err = compile_projection(&schema(), &proj).unwrap_err();
        assert_eq!(err, CompileError::FieldNotFound("nope".into()));
    }

    #[test]
    fn empty_projection_errors() {
        let err = compile_projection(&schema(), &Projection::new()).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedProjection(_)));
    }

    #[test]
    fn duplicate_paths_collapse() {
        let proj = Projection::new().include("customer").include("customer");
        let spec = compile_projection(&schema(), &proj).unwrap();
        assert_eq!(spec.paths.len(), 1);
    }

    // ── compile_update ──────────────────────────────────────────

    #[test]
    fn ops_keep_call_order() {
        let update = Update::new()
            .set("status", "held")
            .inc("total", 5)
            .push("tags", "rush")
            .unset("shipping.zip");
        let ops = compile_update(&schema(), &update).unwrap();
        let kinds: Vec<_> = ops.iter().map(|op| op.kind()).collect();
        assert_eq!(kinds, ["set", "inc", "push", "unset"]);
    }

    #[test]
    fn set_and_inc_on_same_path_conflict() {
        let update = Update::new().set("total", 10).inc("total", 1);
        let err = compile_update(&schema(), &update).unwrap_err();
        assert_eq!(
            err,
            CompileError::ConflictingUpdatePath {
                path: "total".into(),
                earlier: "set",
                later: "inc",
            }
        );
    }

    #[test]
    fn repeated_same_kind_on_one_path_is_allowed() {
        let update = Update::new().set("status", "held").set("status", "open");
        let ops = compile_update(&schema(), &update).unwrap();
        assert_eq!(ops.len(), 2);

        let update = Update::new().inc("total", 1).inc("total", 2);
        assert!(compile_update(&schema(), &update).is_ok());
    }

    #[test]
    fn unknown_update_path_errors() {
        let update = Update::new().set("nope", 1);
        let err = compile_update(&schema(), &update).unwrap_err();
        assert_eq!(err, CompileError::FieldNotFound("nope".into()));
    }

    #[test]
    fn push_on_non_array_errors() {
        let update = Update::new().push("status", "x");
        let err = compile_update(&schema(), &update).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOperand { .. }));
    }

    #[test]
    fn pull_on_array_is_allowed() {
        let update = Update::new().pull("tags", "rush");
        assert!(compile_update(&schema(), &update).is_ok());
    }

    #[test]
    fn non_numeric_increment_errors() {
        let update = Update::new().inc("total", "five");
        let err = compile_update(&schema(), &update).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOperand { .. }));
    }

    #[test]
    fn empty_update_errors() {
        let err = compile_update(&schema(), &Update::new()).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedExpression(_)));
    }
}
