//! Parametrized statement builders.
//!
//! Identifiers (tables, joins, column lists, ORDER BY) are `&'static str`
//! fixed in code. Every caller-supplied value goes through `push_bind`.

use serde_json::Value;
use sitarida_core::{NumericMode, Patch, SqlValue};
use sqlx::mysql::MySql;
use sqlx::{Executor, QueryBuilder, Row};

use crate::error::StoreError;
use crate::row::{row_to_json, rows_to_json};

/// One WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// `col = ?`
    Eq(&'static str, SqlValue),
    /// `col <> ?`
    Ne(&'static str, SqlValue),
    /// `col >= ?`
    Gte(&'static str, SqlValue),
    /// `col LIKE %?%`, with LIKE wildcards in the needle escaped.
    Contains(&'static str, String),
    /// `col IN (?, ?, ...)`; an empty list matches nothing.
    In(&'static str, Vec<SqlValue>),
    /// Disjunction of the nested criteria; an empty list matches nothing.
    Any(Vec<Criterion>),
}

impl Criterion {
    /// Shorthand for [`Criterion::Eq`].
    pub fn eq(col: &'static str, v: impl Into<SqlValue>) -> Self {
        Criterion::Eq(col, v.into())
    }

    /// Shorthand for [`Criterion::Ne`].
    pub fn ne(col: &'static str, v: impl Into<SqlValue>) -> Self {
        Criterion::Ne(col, v.into())
    }

    /// Shorthand for [`Criterion::Gte`].
    pub fn gte(col: &'static str, v: impl Into<SqlValue>) -> Self {
        Criterion::Gte(col, v.into())
    }

    /// Shorthand for [`Criterion::Contains`].
    pub fn contains(col: &'static str, needle: impl Into<String>) -> Self {
        Criterion::Contains(col, needle.into())
    }
}

/// Escapes `%`, `_` and `\` so the needle matches literally inside LIKE.
#[must_use]
pub fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub(crate) fn push_value(qb: &mut QueryBuilder<'_, MySql>, v: &SqlValue) {
    match v {
        SqlValue::Int(n) => qb.push_bind(*n),
        SqlValue::Decimal(d) => qb.push_bind(*d),
        SqlValue::Float(f) => qb.push_bind(*f),
        SqlValue::Text(s) => qb.push_bind(s.clone()),
        SqlValue::Bool(b) => qb.push_bind(*b),
        SqlValue::DateTime(dt) => qb.push_bind(*dt),
        _ => qb.push_bind(Option::<i64>::None),
    };
}

fn push_criterion(qb: &mut QueryBuilder<'_, MySql>, c: &Criterion) {
    match c {
        Criterion::Eq(col, v) => {
            qb.push(*col).push(" = ");
            push_value(qb, v);
        }
        Criterion::Ne(col, v) => {
            qb.push(*col).push(" <> ");
            push_value(qb, v);
        }
        Criterion::Gte(col, v) => {
            qb.push(*col).push(" >= ");
            push_value(qb, v);
        }
        Criterion::Contains(col, needle) => {
            qb.push(*col)
                .push(" LIKE CONCAT('%', ")
                .push_bind(escape_like(needle))
                .push(", '%')");
        }
        Criterion::In(_, values) if values.is_empty() => {
            qb.push("1 = 0");
        }
        Criterion::In(col, values) => {
            qb.push(*col).push(" IN (");
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, v);
            }
            qb.push(")");
        }
        Criterion::Any(nested) if nested.is_empty() => {
            qb.push("1 = 0");
        }
        Criterion::Any(nested) => {
            qb.push("(");
            for (i, n) in nested.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_criterion(qb, n);
            }
            qb.push(")");
        }
    }
}

pub(crate) fn push_where(qb: &mut QueryBuilder<'_, MySql>, filters: &[Criterion]) {
    for (i, c) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_criterion(qb, c);
    }
}

/// A SELECT over a fixed source.
#[derive(Debug, Clone)]
pub struct Select {
    columns: &'static str,
    source: &'static str,
    filters: Vec<Criterion>,
    group_by: Option<&'static str>,
    order_by: Option<&'static str>,
    limit: Option<i64>,
}

impl Select {
    /// `SELECT {columns} FROM {source}`; `source` may contain joins.
    #[must_use]
    pub fn new(columns: &'static str, source: &'static str) -> Self {
        Self {
            columns,
            source,
            filters: Vec::new(),
            group_by: None,
            order_by: None,
            limit: None,
        }
    }

    /// Adds an AND-ed condition.
    #[must_use]
    pub fn filter(mut self, c: Criterion) -> Self {
        self.filters.push(c);
        self
    }

    /// Adds a condition only when present.
    #[must_use]
    pub fn filter_opt(mut self, c: Option<Criterion>) -> Self {
        self.filters.extend(c);
        self
    }

    /// Sets the GROUP BY list.
    #[must_use]
    pub fn group_by(mut self, group_by: &'static str) -> Self {
        self.group_by = Some(group_by);
        self
    }

    /// Sets the ORDER BY list.
    #[must_use]
    pub fn order_by(mut self, order_by: &'static str) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Caps the number of rows.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The conditions collected so far.
    #[must_use]
    pub fn criteria(&self) -> &[Criterion] {
        &self.filters
    }

    /// Renders the statement into a builder with all binds attached.
    #[must_use]
    pub fn builder(&self) -> QueryBuilder<'static, MySql> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.columns).push(" FROM ").push(self.source);
        push_where(&mut qb, &self.filters);
        if let Some(g) = self.group_by {
            qb.push(" GROUP BY ").push(g);
        }
        if let Some(o) = self.order_by {
            qb.push(" ORDER BY ").push(o);
        }
        if let Some(n) = self.limit {
            qb.push(" LIMIT ").push_bind(n);
        }
        qb
    }
}

/// Runs `select` and decodes every row.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn fetch_all<'c, E>(exec: E, select: &Select, mode: NumericMode) -> Result<Vec<Value>, StoreError>
where
    E: Executor<'c, Database = MySql>,
{
    let mut qb = select.builder();
    let rows = qb.build().fetch_all(exec).await?;
    Ok(rows_to_json(&rows, mode))
}

/// Runs `select` with `LIMIT 1` and decodes the row if any.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn fetch_optional<'c, E>(
    exec: E,
    select: &Select,
    mode: NumericMode,
) -> Result<Option<Value>, StoreError>
where
    E: Executor<'c, Database = MySql>,
{
    let mut qb = select.clone().limit(1).builder();
    let row = qb.build().fetch_optional(exec).await?;
    Ok(row.as_ref().map(|r| row_to_json(r, mode)))
}

/// Like [`fetch_optional`] but a missing row is [`StoreError::NotFound`].
///
/// # Errors
/// Returns [`StoreError::NotFound`] when no row matches.
pub async fn fetch_one<'c, E>(exec: E, select: &Select, mode: NumericMode) -> Result<Value, StoreError>
where
    E: Executor<'c, Database = MySql>,
{
    fetch_optional(exec, select, mode).await?.ok_or(StoreError::NotFound)
}

/// `SELECT COUNT(*) FROM {table} WHERE ...`.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn count<'c, E>(exec: E, table: &'static str, filters: &[Criterion]) -> Result<i64, StoreError>
where
    E: Executor<'c, Database = MySql>,
{
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(table);
    push_where(&mut qb, filters);
    let row = qb.build().fetch_one(exec).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

/// `true` when at least one row of `table` matches.
///
/// # Errors
/// Returns [`StoreError`] on any driver or server failure.
pub async fn exists<'c, E>(exec: E, table: &'static str, filters: &[Criterion]) -> Result<bool, StoreError>
where
    E: Executor<'c, Database = MySql>,
{
    let mut qb = QueryBuilder::new("SELECT 1 FROM ");
    qb.push(table);
    push_where(&mut qb, filters);
    qb.push(" LIMIT 1");
    let row = qb.build().fetch_optional(exec).await?;
    Ok(row.is_some())
}

/// Inserts one row and returns its AUTO_INCREMENT id (0 for natural keys).
///
/// # Errors
/// Returns [`StoreError::Duplicate`] on a unique-key clash, or another
/// [`StoreError`] on failure.
pub async fn insert<'c, E>(exec: E, table: &'static str, patch: &Patch) -> Result<u64, StoreError>
where
    E: Executor<'c, Database = MySql>,
{
    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(table).push(" (");
    for (i, (col, _)) in patch.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(col);
    }
    qb.push(") VALUES (");
    for (i, (_, v)) in patch.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, v);
    }
    qb.push(")");
    let done = qb.build().execute(exec).await?;
    Ok(done.last_insert_id())
}

/// `UPDATE {table} SET ... WHERE ...`; returns the affected row count.
///
/// # Errors
/// Returns [`StoreError::Unscoped`] when `filters` is empty, or another
/// [`StoreError`] on failure.
pub async fn update<'c, E>(
    exec: E,
    table: &'static str,
    patch: &Patch,
    filters: &[Criterion],
) -> Result<u64, StoreError>
where
    E: Executor<'c, Database = MySql>,
{
    if filters.is_empty() {
        return Err(StoreError::Unscoped("update"));
    }
    if patch.is_empty() {
        return Ok(0);
    }
    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(table).push(" SET ");
    for (i, (col, v)) in patch.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(col).push(" = ");
        push_value(&mut qb, v);
    }
    push_where(&mut qb, filters);
    let done = qb.build().execute(exec).await?;
    Ok(done.rows_affected())
}

/// `DELETE FROM {table} WHERE ...`; returns the deleted row count.
///
/// # Errors
/// Returns [`StoreError::Unscoped`] when `filters` is empty,
/// [`StoreError::ForeignKey`] when the row is still referenced, or another
/// [`StoreError`] on failure.
pub async fn delete<'c, E>(exec: E, table: &'static str, filters: &[Criterion]) -> Result<u64, StoreError>
where
    E: Executor<'c, Database = MySql>,
{
    if filters.is_empty() {
        return Err(StoreError::Unscoped("delete"));
    }
    let mut qb = QueryBuilder::new("DELETE FROM ");
    qb.push(table);
    push_where(&mut qb, filters);
    let done = qb.build().execute(exec).await?;
    Ok(done.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
        assert_eq!(escape_like("Sipirok"), "Sipirok");
    }

    #[test]
    fn select_renders_placeholders_for_every_value() {
        let select = Select::new("id, nmdesa", "refdesa")
            .filter(Criterion::eq("kddesa", 12_i64))
            .filter(Criterion::Any(vec![
                Criterion::contains("nmdesa", "tor"),
                Criterion::eq("kddesa", 7_i64),
            ]))
            .order_by("kddesa DESC")
            .limit(10);
        let qb = select.builder();
        assert_eq!(
            qb.sql(),
            "SELECT id, nmdesa FROM refdesa WHERE kddesa = ? AND (nmdesa LIKE CONCAT('%', ?, '%') OR kddesa = ?) ORDER BY kddesa DESC LIMIT ?"
        );
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let qb = Select::new("*", "t").filter(Criterion::In("a", Vec::new())).builder();
        assert_eq!(qb.sql(), "SELECT * FROM t WHERE 1 = 0");
    }

    #[test]
    fn in_list_binds_each_value() {
        let qb = Select::new("kdiku", "tbltargetindikator")
            .filter(Criterion::In("kdiku", vec!["1018".into(), "1019".into()]))
            .builder();
        assert_eq!(qb.sql(), "SELECT kdiku FROM tbltargetindikator WHERE kdiku IN (?, ?)");
    }
}
