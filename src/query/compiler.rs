//! Filter tree → [`WhereClause`].

use super::filter::{FieldQueryFilter, FilterChild, QueryFilterSchema, QueryOperator};
use super::predicate::{Comparison, Predicate, WhereClause};
use crate::error::AppError;
use serde_json::Value;

/// Appends `node` to `clause`. Leaves join with the node's combinator; nested groups are
/// compiled into a fresh clause, passed through their `modify_query`, then joined the same way.
/// A node without children returns `clause` unchanged.
pub fn compile(mut clause: WhereClause, node: &QueryFilterSchema) -> Result<WhereClause, AppError> {
    for child in &node.children {
        match child {
            FilterChild::Field(field) => {
                clause.push(node.operator, field_predicate(field)?);
            }
            FilterChild::Group(group) => {
                let sub = Predicate::Group(compile(WhereClause::new(), group)?);
                let sub = match &group.modify_query {
                    Some(hook) => hook(sub),
                    None => sub,
                };
                if !sub.is_empty_group() {
                    clause.push(node.operator, sub);
                }
            }
        }
    }
    Ok(clause)
}

fn field_predicate(field: &FieldQueryFilter) -> Result<Predicate, AppError> {
    let column = field.id.clone();
    let compare = |op| Predicate::Compare {
        column: field.id.clone(),
        op,
        value: field.value.clone(),
    };
    Ok(match field.operator {
        QueryOperator::IsNull => Predicate::IsNull { column },
        QueryOperator::EqualTo => compare(Comparison::Eq),
        QueryOperator::NotEqual => compare(Comparison::NotEq),
        QueryOperator::LessThan => compare(Comparison::Lt),
        QueryOperator::GreaterThan => compare(Comparison::Gt),
        QueryOperator::Contains => Predicate::Contains {
            column,
            needle: match &field.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        },
        QueryOperator::In => Predicate::In {
            values: sequence(field)?,
            column,
        },
        QueryOperator::NotIn => Predicate::NotIn {
            values: sequence(field)?,
            column,
        },
        QueryOperator::Between | QueryOperator::Date => {
            let (low, high) = range(field)?;
            Predicate::Between { column, low, high }
        }
    })
}

fn sequence(field: &FieldQueryFilter) -> Result<Vec<Value>, AppError> {
    match &field.value {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(AppError::BadRequest(format!(
            "filter on '{}' expects an array value",
            field.id
        ))),
    }
}

fn range(field: &FieldQueryFilter) -> Result<(Value, Value), AppError> {
    match &field.value {
        Value::Array(items) if items.len() == 2 => Ok((items[0].clone(), items[1].clone())),
        _ => Err(AppError::BadRequest(format!(
            "filter on '{}' expects a [from, to] pair",
            field.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Combinator;
    use serde_json::json;

    fn seeded() -> WhereClause {
        WhereClause::new().and_where(Predicate::IsNull {
            column: "archived_at".into(),
        })
    }

    #[test]
    fn empty_node_is_identity() {
        for node in [QueryFilterSchema::and(), QueryFilterSchema::or()] {
            assert_eq!(compile(seeded(), &node).unwrap(), seeded());
            assert!(compile(WhereClause::new(), &node).unwrap().is_empty());
        }
    }

    #[test]
    fn leaves_use_parent_combinator() {
        let node = QueryFilterSchema::or()
            .field("age", QueryOperator::GreaterThan, json!(18))
            .field("name", QueryOperator::Contains, json!("ann"));
        let out = compile(WhereClause::new(), &node).unwrap();
        let connectives: Vec<Combinator> = out.clauses().iter().map(|(c, _)| *c).collect();
        assert_eq!(connectives, [Combinator::Or, Combinator::Or]);
        assert_eq!(
            out.clauses()[1].1,
            Predicate::Contains {
                column: "name".into(),
                needle: "ann".into()
            }
        );
    }

    #[test]
    fn nested_groups_become_single_predicates() {
        let node = QueryFilterSchema::and()
            .group(
                QueryFilterSchema::or()
                    .field("a", QueryOperator::EqualTo, json!(1))
                    .field("b", QueryOperator::EqualTo, json!(2)),
            )
            .group(
                QueryFilterSchema::or()
                    .field("c", QueryOperator::EqualTo, json!(3))
                    .field("d", QueryOperator::EqualTo, json!(4)),
            );
        let out = compile(WhereClause::new(), &node).unwrap();
        assert_eq!(out.clauses().len(), 2);
        for (connective, predicate) in out.clauses() {
            assert_eq!(*connective, Combinator::And);
            let Predicate::Group(inner) = predicate else {
                panic!("expected group");
            };
            assert!(inner.clauses().iter().all(|(c, _)| *c == Combinator::Or));
        }
    }

    #[test]
    fn empty_nested_group_contributes_nothing() {
        let node = QueryFilterSchema::and()
            .field("a", QueryOperator::EqualTo, json!(1))
            .group(QueryFilterSchema::or());
        assert_eq!(compile(WhereClause::new(), &node).unwrap().clauses().len(), 1);
    }

    #[test]
    fn modify_query_runs_on_nested_group() {
        let node = QueryFilterSchema::and().group(
            QueryFilterSchema::or()
                .field("a", QueryOperator::EqualTo, json!(1))
                .with_modify_query(|p| match p {
                    Predicate::Group(w) => Predicate::Group(w.or_where(Predicate::raw("owner_id = ?", vec![json!(9)]))),
                    other => other,
                }),
        );
        let out = compile(WhereClause::new(), &node).unwrap();
        let Predicate::Group(inner) = &out.clauses()[0].1 else {
            panic!("expected group");
        };
        assert_eq!(inner.clauses().len(), 2);
        assert!(matches!(inner.clauses()[1].1, Predicate::Raw { .. }));
    }

    #[test]
    fn range_and_sequence_shapes() {
        let between = QueryFilterSchema::and().field("n", QueryOperator::Between, json!([10, 20]));
        assert_eq!(
            compile(WhereClause::new(), &between).unwrap().clauses()[0].1,
            Predicate::Between {
                column: "n".into(),
                low: json!(10),
                high: json!(20)
            }
        );

        let bad = QueryFilterSchema::and().field("n", QueryOperator::Between, json!(10));
        assert!(matches!(compile(WhereClause::new(), &bad), Err(AppError::BadRequest(_))));
        let bad = QueryFilterSchema::and().field("n", QueryOperator::In, json!("x"));
        assert!(matches!(compile(WhereClause::new(), &bad), Err(AppError::BadRequest(_))));
    }
}
