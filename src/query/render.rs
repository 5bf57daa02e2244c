//! Renders predicates and CRUD statements for one dialect. Identifiers are quoted, values always bound.

use super::dialect::Dialect;
use super::filter::Combinator;
use super::predicate::{Predicate, WhereClause};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct SqlRenderer {
    dialect: Dialect,
}

impl SqlRenderer {
    pub fn new(dialect: Dialect) -> Self {
        SqlRenderer { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Quotes each dot-separated part, so `schema.table` stays qualified.
    pub fn quoted(&self, ident: &str) -> String {
        ident
            .split('.')
            .map(|part| match self.dialect {
                Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", part.replace('"', "\"\"")),
                Dialect::MySql => format!("`{}`", part.replace('`', "``")),
                Dialect::MsSql => format!("[{}]", part.replace(']', "]]")),
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn placeholder(&self, n: usize) -> String {
        match self.dialect {
            Dialect::Postgres => format!("${}", n),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
            Dialect::MsSql => format!("@p{}", n),
        }
    }

    fn bind(&self, q: &mut QueryBuf, v: Value) -> String {
        let n = q.push_param(v);
        self.placeholder(n)
    }

    /// Empty string when the clause has nothing to render.
    pub fn render_where(&self, clause: &WhereClause, q: &mut QueryBuf) -> String {
        let mut out = String::new();
        for (connective, predicate) in clause.clauses() {
            let rendered = self.render_predicate(predicate, q);
            if rendered.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push_str(match connective {
                    Combinator::And => " AND ",
                    Combinator::Or => " OR ",
                });
            }
            out.push_str(&rendered);
        }
        out
    }

    fn render_predicate(&self, predicate: &Predicate, q: &mut QueryBuf) -> String {
        match predicate {
            Predicate::IsNull { column } => format!("{} IS NULL", self.quoted(column)),
            Predicate::Compare { column, op, value } => {
                let ph = self.bind(q, value.clone());
                format!("{} {} {}", self.quoted(column), op.as_sql(), ph)
            }
            Predicate::Contains { column, needle } => {
                let ph = self.bind(q, Value::String(format!("%{}%", needle)));
                match self.dialect {
                    Dialect::Postgres => format!("{} ILIKE {}", self.quoted(column), ph),
                    _ => format!("LOWER({}) LIKE LOWER({})", self.quoted(column), ph),
                }
            }
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                format!("{} IN ({})", self.quoted(column), self.bind_list(q, values))
            }
            Predicate::NotIn { column, values } => {
                if values.is_empty() {
                    return "1 = 1".to_string();
                }
                format!("{} NOT IN ({})", self.quoted(column), self.bind_list(q, values))
            }
            Predicate::Between { column, low, high } => {
                let lo = self.bind(q, low.clone());
                let hi = self.bind(q, high.clone());
                format!("{} BETWEEN {} AND {}", self.quoted(column), lo, hi)
            }
            Predicate::Group(inner) => {
                let body = self.render_where(inner, q);
                if body.is_empty() {
                    body
                } else {
                    format!("({})", body)
                }
            }
            Predicate::Raw { sql, .. } if sql.trim().is_empty() => String::new(),
            Predicate::Raw { sql, params } => {
                let mut params = params.iter();
                let mut out = String::with_capacity(sql.len());
                for c in sql.chars() {
                    if c == '?' {
                        if let Some(v) = params.next() {
                            out.push_str(&self.bind(q, v.clone()));
                            continue;
                        }
                    }
                    out.push(c);
                }
                format!("({})", out)
            }
        }
    }

    fn bind_list(&self, q: &mut QueryBuf, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.bind(q, v.clone()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn column_list(&self, columns: &[String]) -> String {
        if columns.is_empty() {
            return "*".to_string();
        }
        columns
            .iter()
            .map(|c| self.quoted(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn where_suffix(&self, clause: &WhereClause, q: &mut QueryBuf) -> String {
        let rendered = self.render_where(clause, q);
        if rendered.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", rendered)
        }
    }

    pub fn select(
        &self,
        table: &str,
        columns: &[String],
        clause: &WhereClause,
        order: Option<&OrderBy>,
        page: Option<Page>,
    ) -> QueryBuf {
        let mut q = QueryBuf::new();
        let where_clause = self.where_suffix(clause, &mut q);
        let order_clause = order
            .map(|o| format!(" ORDER BY {} {}", self.quoted(&o.column), o.direction.as_sql()))
            .unwrap_or_default();
        let page_clause = match page {
            None => String::new(),
            Some(p) => match self.dialect {
                Dialect::MsSql => {
                    let needs_order = if order.is_none() { " ORDER BY (SELECT NULL)" } else { "" };
                    format!(
                        "{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                        needs_order, p.offset, p.limit
                    )
                }
                _ => format!(" LIMIT {} OFFSET {}", p.limit, p.offset),
            },
        };
        q.sql = format!(
            "SELECT {} FROM {}{}{}{}",
            self.column_list(columns),
            self.quoted(table),
            where_clause,
            order_clause,
            page_clause
        );
        q
    }

    pub fn count(&self, table: &str, clause: &WhereClause) -> QueryBuf {
        let mut q = QueryBuf::new();
        let where_clause = self.where_suffix(clause, &mut q);
        q.sql = format!("SELECT COUNT(*) AS count FROM {}{}", self.quoted(table), where_clause);
        q
    }

    /// First row matching every column of `equality`.
    pub fn select_first(&self, table: &str, columns: &[String], equality: &Map<String, Value>) -> QueryBuf {
        let mut q = QueryBuf::new();
        let where_clause = self.where_suffix(&WhereClause::from_equality(equality), &mut q);
        let cols = self.column_list(columns);
        q.sql = match self.dialect {
            Dialect::MsSql => format!("SELECT TOP 1 {} FROM {}{}", cols, self.quoted(table), where_clause),
            _ => format!("SELECT {} FROM {}{} LIMIT 1", cols, self.quoted(table), where_clause),
        };
        q
    }

    /// Whether `insert` reads back the primary key from the same statement.
    pub fn supports_returning(&self) -> bool {
        !matches!(self.dialect, Dialect::MySql)
    }

    pub fn insert(&self, table: &str, data: &Map<String, Value>, primary_field: &str) -> QueryBuf {
        let mut q = QueryBuf::new();
        let table = self.quoted(table);
        let pk = self.quoted(primary_field);
        let cols: Vec<String> = data.keys().map(|k| self.quoted(k)).collect();
        let placeholders: Vec<String> = data.values().map(|v| self.bind(&mut q, v.clone())).collect();
        q.sql = match (self.dialect, data.is_empty()) {
            (Dialect::MySql, true) => format!("INSERT INTO {} () VALUES ()", table),
            (Dialect::MySql, false) => format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                cols.join(", "),
                placeholders.join(", ")
            ),
            (Dialect::MsSql, true) => format!("INSERT INTO {} OUTPUT INSERTED.{} DEFAULT VALUES", table, pk),
            (Dialect::MsSql, false) => format!(
                "INSERT INTO {} ({}) OUTPUT INSERTED.{} VALUES ({})",
                table,
                cols.join(", "),
                pk,
                placeholders.join(", ")
            ),
            (_, true) => format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, pk),
            (_, false) => format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                table,
                cols.join(", "),
                placeholders.join(", "),
                pk
            ),
        };
        q
    }

    pub fn update(
        &self,
        table: &str,
        equality: &Map<String, Value>,
        data: &Map<String, Value>,
    ) -> Result<QueryBuf, AppError> {
        if data.is_empty() {
            return Err(AppError::BadRequest("update requires at least one column".into()));
        }
        let mut q = QueryBuf::new();
        let sets: Vec<String> = data
            .iter()
            .map(|(k, v)| {
                let ph = self.bind(&mut q, v.clone());
                format!("{} = {}", self.quoted(k), ph)
            })
            .collect();
        let where_clause = self.where_suffix(&WhereClause::from_equality(equality), &mut q);
        q.sql = format!("UPDATE {} SET {}{}", self.quoted(table), sets.join(", "), where_clause);
        Ok(q)
    }

    pub fn delete(&self, table: &str, equality: &Map<String, Value>) -> QueryBuf {
        let mut q = QueryBuf::new();
        let where_clause = self.where_suffix(&WhereClause::from_equality(equality), &mut q);
        q.sql = format!("DELETE FROM {}{}", self.quoted(table), where_clause);
        q
    }
}
