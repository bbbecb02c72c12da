//! Postgres repository backed by a `sqlx` pool
//!
//! Rows come back as `row_to_json(t)` so any table decodes into a [`Row`]
//! without a per-model row mapper.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query::QueryScalar;
use sqlx::Postgres;
use tracing::debug;

use super::LocalRepository;
use crate::error::{ScotchError, ScotchResult};
use crate::model::Row;

/// Characters allowed in SQL identifiers (alphanumeric, underscore)
const ALLOWED_IDENTIFIER_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

/// Postgres identifier length limit
const MAX_IDENTIFIER_LEN: usize = 63;

type JsonQuery<'q> = QueryScalar<'q, Postgres, Value, PgArguments>;

#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> ScotchResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LocalRepository for PostgresRepository {
    async fn filter_by_equals(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> ScotchResult<Vec<Row>> {
        let sql = select_sql(table, field, false)?;
        debug!(sql = %sql, %value, "local filter");

        let rows = bind_value(sqlx::query_scalar(&sql), value)?
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(into_row).collect()
    }

    async fn first_by_equals(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> ScotchResult<Option<Row>> {
        let sql = select_sql(table, field, true)?;
        debug!(sql = %sql, %value, "local filter (first)");

        let row = bind_value(sqlx::query_scalar(&sql), value)?
            .fetch_optional(&self.pool)
            .await?;
        row.map(into_row).transpose()
    }
}

/// `SELECT row_to_json(t) FROM "table" AS t WHERE t."field" = $1`
fn select_sql(table: &str, field: &str, first: bool) -> ScotchResult<String> {
    let table = table
        .split('.')
        .map(quote_identifier)
        .collect::<ScotchResult<Vec<_>>>()?
        .join(".");
    let field = quote_identifier(field)?;

    let mut sql = format!(
        "SELECT row_to_json(t) FROM {} AS t WHERE t.{} = $1",
        table, field
    );
    if first {
        sql.push_str(" LIMIT 1");
    }
    Ok(sql)
}

fn quote_identifier(identifier: &str) -> ScotchResult<String> {
    if identifier.is_empty() || identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(ScotchError::configuration(format!(
            "identifier '{}' must be 1 to {} characters",
            identifier, MAX_IDENTIFIER_LEN
        )));
    }
    if let Some(c) = identifier.chars().find(|c| !ALLOWED_IDENTIFIER_CHARS.contains(*c)) {
        return Err(ScotchError::configuration(format!(
            "identifier '{}' contains invalid character '{}'",
            identifier, c
        )));
    }
    Ok(format!("\"{}\"", identifier))
}

fn bind_value<'q>(query: JsonQuery<'q>, value: &Value) -> ScotchResult<JsonQuery<'q>> {
    match value {
        Value::Number(n) if n.is_i64() => Ok(query.bind(n.as_i64())),
        Value::Number(n) => Ok(query.bind(n.as_f64())),
        Value::String(s) => Ok(query.bind(s.clone())),
        Value::Bool(b) => Ok(query.bind(*b)),
        other => Err(ScotchError::local_store(format!(
            "cannot filter on a {} value",
            json_kind(other)
        ))),
    }
}

fn into_row(value: Value) -> ScotchResult<Row> {
    match value {
        Value::Object(row) => Ok(row),
        other => Err(ScotchError::local_store(format!(
            "expected a row object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
