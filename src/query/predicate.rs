//! Dialect-independent predicates and the where-clause builder state they accumulate into.

use super::filter::Combinator;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    Gt,
}

impl Comparison {
    pub fn as_sql(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "<>",
            Comparison::Lt => "<",
            Comparison::Gt => ">",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    IsNull { column: String },
    Compare { column: String, op: Comparison, value: Value },
    /// Case-insensitive substring; the renderer adds the wildcards.
    Contains { column: String, needle: String },
    In { column: String, values: Vec<Value> },
    NotIn { column: String, values: Vec<Value> },
    /// Inclusive on both ends.
    Between { column: String, low: Value, high: Value },
    Group(WhereClause),
    /// SQL fragment with `?` placeholders, rewritten per dialect.
    Raw { sql: String, params: Vec<Value> },
}

impl Predicate {
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Predicate::Raw {
            sql: sql.into(),
            params,
        }
    }

    pub fn is_empty_group(&self) -> bool {
        matches!(self, Predicate::Group(w) if w.is_empty())
    }
}

/// Ordered `(connective, predicate)` pairs rendered left to right. The first connective is not rendered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WhereClause {
    clauses: Vec<(Combinator, Predicate)>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(Combinator, Predicate)] {
        &self.clauses
    }

    pub fn push(&mut self, connective: Combinator, predicate: Predicate) {
        self.clauses.push((connective, predicate));
    }

    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.push(Combinator::And, predicate);
        self
    }

    pub fn or_where(mut self, predicate: Predicate) -> Self {
        self.push(Combinator::Or, predicate);
        self
    }

    /// Column equality map; `null` values match `IS NULL`.
    pub fn from_equality(query: &serde_json::Map<String, Value>) -> Self {
        let mut out = WhereClause::new();
        for (column, value) in query {
            let predicate = if value.is_null() {
                Predicate::IsNull {
                    column: column.clone(),
                }
            } else {
                Predicate::Compare {
                    column: column.clone(),
                    op: Comparison::Eq,
                    value: value.clone(),
                }
            };
            out.push(Combinator::And, predicate);
        }
        out
    }
}
