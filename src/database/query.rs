//! # Backend Query Model
//!
//! A small, store-agnostic description of the operations the facade needs:
//! filtered selects, inserts, updates and stored-function calls. Backend
//! clients translate a [`Query`] into their own wire format (parameterized SQL
//! for PostgreSQL) and answer with rows as JSON objects.

use serde_json::Value;

/// A single result row, as a JSON object keyed by column name
pub type Row = Value;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperation {
    Select,
    /// Insert one record; the object's keys name the columns to write
    Insert(Value),
    /// Update matching records with the object's columns
    Update(Value),
    /// Call a stored function with named arguments
    Rpc(Vec<RpcArg>),
    /// Lightweight liveness probe
    Probe,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    IsNull(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcArg {
    pub name: String,
    pub value: Value,
    /// SQL type the argument is cast to, `text` when absent
    pub sql_type: Option<String>,
}

/// Query against a single table (or stored function for [`QueryOperation::Rpc`])
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub operation: QueryOperation,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<u32>,
    /// Caller expects at most one row
    pub single: bool,
}

impl Query {
    fn new(table: impl Into<String>, operation: QueryOperation) -> Self {
        Self {
            table: table.into(),
            operation,
            filters: Vec::new(),
            order: None,
            limit: None,
            single: false,
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(table, QueryOperation::Select)
    }

    pub fn insert(table: impl Into<String>, record: Value) -> Self {
        Self::new(table, QueryOperation::Insert(record)).single()
    }

    pub fn update(table: impl Into<String>, changes: Value) -> Self {
        Self::new(table, QueryOperation::Update(changes))
    }

    pub fn rpc(function: impl Into<String>) -> Self {
        Self::new(function, QueryOperation::Rpc(Vec::new()))
    }

    pub fn probe() -> Self {
        Self::new("", QueryOperation::Probe)
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.filters.push(Filter::IsNull(column.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self.limit = Some(1);
        self
    }

    /// Add a text-typed argument to a stored function call
    pub fn arg(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_arg(name.into(), value.into(), None)
    }

    /// Add an argument cast to `sql_type` (e.g. `uuid`) in a stored function call
    pub fn typed_arg(
        self,
        name: impl Into<String>,
        value: impl Into<Value>,
        sql_type: impl Into<String>,
    ) -> Self {
        self.push_arg(name.into(), value.into(), Some(sql_type.into()))
    }

    fn push_arg(mut self, name: String, value: Value, sql_type: Option<String>) -> Self {
        if let QueryOperation::Rpc(args) = &mut self.operation {
            args.push(RpcArg {
                name,
                value,
                sql_type,
            });
        }
        self
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self.operation,
            QueryOperation::Insert(_) | QueryOperation::Update(_)
        )
    }

    /// Short label for logs: `select:user_profiles`, `rpc:get_user_activity_summary`
    pub fn label(&self) -> String {
        let kind = match self.operation {
            QueryOperation::Select => "select",
            QueryOperation::Insert(_) => "insert",
            QueryOperation::Update(_) => "update",
            QueryOperation::Rpc(_) => "rpc",
            QueryOperation::Probe => return "probe".to_string(),
        };
        format!("{kind}:{}", self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_accumulates_filters_and_paging() {
        let query = Query::select("workout_sessions")
            .eq("user_id", "u1")
            .is_null("deleted_at")
            .order_by("started_at", false)
            .limit(50);

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0], Filter::Eq("user_id".into(), json!("u1")));
        assert_eq!(query.limit, Some(50));
        assert!(!query.order.as_ref().unwrap().ascending);
        assert_eq!(query.label(), "select:workout_sessions");
        assert!(!query.is_mutation());
    }

    #[test]
    fn insert_expects_a_single_row() {
        let query = Query::insert("nutrition_logs", json!({"user_id": "u1"}));
        assert!(query.single);
        assert!(query.is_mutation());
    }

    #[test]
    fn rpc_args_are_ignored_on_other_operations() {
        let rpc = Query::rpc("get_user_activity_summary").typed_arg("user_uuid", "u1", "uuid");
        match &rpc.operation {
            QueryOperation::Rpc(args) => {
                assert_eq!(args.len(), 1);
                assert_eq!(args[0].sql_type.as_deref(), Some("uuid"));
            }
            other => panic!("unexpected operation {other:?}"),
        }

        let select = Query::select("meals").arg("ignored", 1);
        assert_eq!(select.operation, QueryOperation::Select);
    }
}
