//! # PostgreSQL Backend
//!
//! [`ConnectionFactory`] producing one `sqlx` [`PgConnection`] per pooled
//! handle. Queries are rendered to parameterized SQL that returns every row as
//! `to_jsonb(...)`, so the data layer deals in JSON rows regardless of table.
//!
//! Identifiers (tables, columns, functions, casts) are validated against
//! `[a-z_][a-z0-9_]*` and always quoted; values are always bound, never
//! interpolated.

use crate::database::connection::{BackendConnection, ConnectionFactory, ConnectionParams};
use crate::database::query::{Filter, Query, QueryOperation, Row};
use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{Connection, PgConnection};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Opens PostgreSQL connections for the pool
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnectionFactory;

impl PgConnectionFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Arc<dyn BackendConnection>, BackendError> {
        if params.access_key.is_some() {
            debug!("Access key is not used by the PostgreSQL backend");
        }

        let connection = PgConnection::connect(&params.url)
            .await
            .map_err(map_sqlx_error)?;
        info!(url = %crate::config::redact_url(&params.url), "Opened PostgreSQL connection");

        Ok(Arc::new(PgBackendConnection {
            connection: Mutex::new(connection),
        }))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// One PostgreSQL session
pub struct PgBackendConnection {
    connection: Mutex<PgConnection>,
}

impl fmt::Debug for PgBackendConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgBackendConnection").finish_non_exhaustive()
    }
}

#[async_trait]
impl BackendConnection for PgBackendConnection {
    async fn execute(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        let statement = render(query).map_err(BackendError::new)?;
        debug!(query = %query.label(), sql = %statement.sql, "Executing statement");

        let mut sql = sqlx::query_scalar::<_, Value>(&statement.sql);
        for bind in statement.binds {
            sql = match bind {
                Bind::Text(text) => sql.bind(text),
                Bind::Json(json) => sql.bind(json),
            };
        }

        let mut connection = self.connection.lock().await;
        sql.fetch_all(&mut *connection).await.map_err(map_sqlx_error)
    }
}

fn map_sqlx_error(error: sqlx::Error) -> BackendError {
    match &error {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => BackendError::with_code(code.into_owned(), db.message()),
            None => BackendError::new(db.message()),
        },
        _ => BackendError::new(error.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
struct Statement {
    sql: String,
    binds: Vec<Bind>,
}

impl Statement {
    fn new() -> Self {
        Self {
            sql: String::new(),
            binds: Vec::new(),
        }
    }

    /// Register a bind value and return its `$n` placeholder
    fn bind(&mut self, bind: Bind) -> String {
        self.binds.push(bind);
        format!("${}", self.binds.len())
    }
}

fn ident(name: &str) -> Result<String, String> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(format!("\"{name}\""))
    } else {
        Err(format!("invalid identifier: {name:?}"))
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn columns(record: &Value) -> Result<Vec<String>, String> {
    let object: &Map<String, Value> = record
        .as_object()
        .ok_or_else(|| "record must be a JSON object".to_string())?;
    if object.is_empty() {
        return Err("record has no columns".to_string());
    }
    object.keys().map(|k| ident(k)).collect()
}

fn render(query: &Query) -> Result<Statement, String> {
    let mut statement = Statement::new();

    let sql = match &query.operation {
        QueryOperation::Probe => "SELECT to_jsonb(1)".to_string(),
        QueryOperation::Select => format!("SELECT to_jsonb(t) FROM {} AS t", ident(&query.table)?),
        QueryOperation::Insert(record) => {
            let table = ident(&query.table)?;
            let cols = columns(record)?.join(", ");
            let param = statement.bind(Bind::Json(record.clone()));
            format!(
                "INSERT INTO {table} AS t ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{table}, {param})"
            )
        }
        QueryOperation::Update(changes) => {
            let table = ident(&query.table)?;
            let cols = columns(changes)?;
            let param = statement.bind(Bind::Json(changes.clone()));
            let list = cols.join(", ");
            let target = if cols.len() == 1 {
                list.clone()
            } else {
                format!("({list})")
            };
            format!(
                "UPDATE {table} AS t SET {target} = (SELECT {list} FROM jsonb_populate_record(NULL::{table}, {param}))"
            )
        }
        QueryOperation::Rpc(args) => {
            let function = ident(&query.table)?;
            let mut rendered = Vec::with_capacity(args.len());
            for arg in args {
                let cast = match &arg.sql_type {
                    Some(sql_type) => {
                        ident(sql_type)?;
                        sql_type.clone()
                    }
                    None => "text".to_string(),
                };
                let param = statement.bind(Bind::Text(text_value(&arg.value)));
                rendered.push(format!("{} => {param}::{cast}", ident(&arg.name)?));
            }
            format!("SELECT to_jsonb(r) FROM {function}({}) AS r", rendered.join(", "))
        }
    };
    statement.sql = sql;

    if matches!(query.operation, QueryOperation::Probe | QueryOperation::Rpc(_)) {
        return Ok(statement);
    }

    let mut conditions = Vec::with_capacity(query.filters.len());
    for filter in &query.filters {
        conditions.push(match filter {
            Filter::Eq(column, value) => {
                let param = statement.bind(Bind::Text(text_value(value)));
                format!("t.{}::text = {param}", ident(column)?)
            }
            Filter::IsNull(column) => format!("t.{} IS NULL", ident(column)?),
        });
    }
    if !conditions.is_empty() {
        statement.sql.push_str(" WHERE ");
        statement.sql.push_str(&conditions.join(" AND "));
    }

    match &query.operation {
        QueryOperation::Select => {
            if let Some(order) = &query.order {
                let direction = if order.ascending { "ASC" } else { "DESC" };
                statement
                    .sql
                    .push_str(&format!(" ORDER BY t.{} {direction}", ident(&order.column)?));
            }
            if let Some(limit) = query.limit {
                statement.sql.push_str(&format!(" LIMIT {limit}"));
            }
        }
        _ => statement.sql.push_str(" RETURNING to_jsonb(t)"),
    }

    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_filtered_select() {
        let query = Query::select("workout_sessions")
            .eq("user_id", "u1")
            .is_null("deleted_at")
            .order_by("started_at", false)
            .limit(50);
        let statement = render(&query).unwrap();

        assert_eq!(
            statement.sql,
            "SELECT to_jsonb(t) FROM \"workout_sessions\" AS t \
             WHERE t.\"user_id\"::text = $1 AND t.\"deleted_at\" IS NULL \
             ORDER BY t.\"started_at\" DESC LIMIT 50"
        );
        assert_eq!(statement.binds, vec![Bind::Text("u1".into())]);
    }

    #[test]
    fn renders_insert_with_json_record() {
        let record = json!({"calories": 420, "user_id": "u1"});
        let statement = render(&Query::insert("nutrition_logs", record.clone())).unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO \"nutrition_logs\" AS t (\"calories\", \"user_id\") \
             SELECT \"calories\", \"user_id\" FROM jsonb_populate_record(NULL::\"nutrition_logs\", $1) \
             RETURNING to_jsonb(t)"
        );
        assert_eq!(statement.binds, vec![Bind::Json(record)]);
    }

    #[test]
    fn renders_update_with_filters_after_changes() {
        let query = Query::update("user_profiles", json!({"full_name": "Ada"})).eq("id", "u1");
        let statement = render(&query).unwrap();

        assert_eq!(
            statement.sql,
            "UPDATE \"user_profiles\" AS t SET \"full_name\" = \
             (SELECT \"full_name\" FROM jsonb_populate_record(NULL::\"user_profiles\", $1)) \
             WHERE t.\"id\"::text = $2 RETURNING to_jsonb(t)"
        );
        assert_eq!(statement.binds.len(), 2);
        assert_eq!(statement.binds[1], Bind::Text("u1".into()));
    }

    #[test]
    fn renders_rpc_with_named_casts() {
        let query = Query::rpc("get_user_activity_summary").typed_arg("user_uuid", "u1", "uuid");
        let statement = render(&query).unwrap();

        assert_eq!(
            statement.sql,
            "SELECT to_jsonb(r) FROM \"get_user_activity_summary\"(\"user_uuid\" => $1::uuid) AS r"
        );
    }

    #[test]
    fn rejects_unsafe_identifiers_and_empty_records() {
        assert!(render(&Query::select("users; DROP TABLE users")).is_err());
        assert!(render(&Query::select("meals").eq("Meal\"Type", "x")).is_err());
        assert!(render(&Query::insert("meals", json!({}))).is_err());
        assert!(render(&Query::update("meals", json!([1, 2]))).is_err());
    }

    #[test]
    fn non_string_filter_values_compare_as_text() {
        let statement = render(&Query::select("exercises").eq("is_active", true)).unwrap();
        assert_eq!(statement.binds, vec![Bind::Text("true".into())]);
    }
}
