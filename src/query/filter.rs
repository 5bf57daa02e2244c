//! Filter tree exchanged with table views: `{operator: "and"|"or", children: [...]}`.

use super::predicate::Predicate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

/// Wire codes are single letters and must stay stable for existing clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOperator {
    #[serde(rename = "e")]
    EqualTo,
    #[serde(rename = "n")]
    NotEqual,
    #[serde(rename = "c")]
    Contains,
    #[serde(rename = "i")]
    In,
    #[serde(rename = "t")]
    NotIn,
    #[serde(rename = "l")]
    LessThan,
    #[serde(rename = "g")]
    GreaterThan,
    #[serde(rename = "b")]
    Between,
    #[serde(rename = "o")]
    IsNull,
    /// Relative dates are resolved client-side to a `[from, to]` pair.
    #[serde(rename = "d")]
    Date,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldQueryFilter {
    pub id: String,
    pub operator: QueryOperator,
    #[serde(default)]
    pub value: Value,
}

impl FieldQueryFilter {
    pub fn new(id: impl Into<String>, operator: QueryOperator, value: Value) -> Self {
        FieldQueryFilter {
            id: id.into(),
            operator,
            value,
        }
    }
}

/// Post-processes a nested group's compiled predicate before it joins its parent.
pub type ModifyQuery = Arc<dyn Fn(Predicate) -> Predicate + Send + Sync>;

#[derive(Clone, Serialize, Deserialize)]
pub struct QueryFilterSchema {
    pub operator: Combinator,
    #[serde(default)]
    pub children: Vec<FilterChild>,
    #[serde(skip)]
    pub modify_query: Option<ModifyQuery>,
}

impl std::fmt::Debug for QueryFilterSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFilterSchema")
            .field("operator", &self.operator)
            .field("children", &self.children)
            .field("modify_query", &self.modify_query.as_ref().map(|_| "Fn"))
            .finish()
    }
}

impl QueryFilterSchema {
    pub fn new(operator: Combinator) -> Self {
        QueryFilterSchema {
            operator,
            children: Vec::new(),
            modify_query: None,
        }
    }

    pub fn and() -> Self {
        Self::new(Combinator::And)
    }

    pub fn or() -> Self {
        Self::new(Combinator::Or)
    }

    pub fn field(mut self, id: &str, operator: QueryOperator, value: Value) -> Self {
        self.children
            .push(FilterChild::Field(FieldQueryFilter::new(id, operator, value)));
        self
    }

    pub fn group(mut self, group: QueryFilterSchema) -> Self {
        self.children.push(FilterChild::Group(group));
        self
    }

    pub fn with_modify_query<F>(mut self, hook: F) -> Self
    where
        F: Fn(Predicate) -> Predicate + Send + Sync + 'static,
    {
        self.modify_query = Some(Arc::new(hook));
        self
    }
}

impl Default for QueryFilterSchema {
    fn default() -> Self {
        Self::and()
    }
}

/// A child with an `id` is a field leaf; anything else must be a nested group.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterChild {
    Field(FieldQueryFilter),
    Group(QueryFilterSchema),
}
