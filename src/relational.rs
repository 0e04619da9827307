use crate::config::PostgresConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::driver::TraceDriver;
use crate::error::{BuildError, SinkError};
use crate::record::TraceMap;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Opens connections to the audit database.
///
/// The Postgres implementation lives in [`crate::postgres`]; tests plug in
/// in-memory fakes.
#[async_trait]
pub trait AuditConnector: Send + Sync + 'static {
    type Connection: AuditConnection;

    async fn connect(&self, url: &str) -> Result<Self::Connection, SinkError>;
}

/// A single open connection to the audit database.
#[async_trait]
pub trait AuditConnection: Send + 'static {
    /// Create the audit table and its indexes if they do not exist.
    async fn ensure_schema(&mut self, table: &str) -> Result<(), SinkError>;

    /// Insert one row and return its server-assigned id.
    async fn insert(&mut self, table: &str, row: &AuditRow) -> Result<i64, SinkError>;

    async fn close(self) -> Result<(), SinkError>;
}

/// One row of the audit table.
///
/// `time_local` and `time_utc` record when the row was written; the
/// record's own `timestamp` field is not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRow {
    pub trace_id: String,
    pub time_local: NaiveDateTime,
    pub time_utc: NaiveDateTime,
    pub service: String,
    pub level: String,
    pub user: Option<String>,
    pub action: Option<String>,
    pub context: Option<String>,
    pub request: Option<Value>,
    pub response: Option<Value>,
    pub duration_ms: Option<f64>,
    pub tags: Option<String>,
    pub message_info: Option<String>,
    pub message_raw: Option<String>,
    pub flag_summary: i32,
}

impl AuditRow {
    /// Map a serialized record onto the table columns.
    ///
    /// `traceId`, `service` and `level` are `NOT NULL` columns and must be
    /// present as strings. Tags are comma-joined; `flagSummary` is always 0.
    pub fn from_record(
        record: &TraceMap,
        time_local: NaiveDateTime,
        time_utc: NaiveDateTime,
    ) -> Result<Self, SinkError> {
        Ok(Self {
            trace_id: required(record, "traceId")?,
            time_local,
            time_utc,
            service: required(record, "service")?,
            level: required(record, "level")?,
            user: text(record, "user"),
            action: text(record, "action"),
            context: text(record, "context"),
            request: object(record, "request"),
            response: object(record, "response"),
            duration_ms: record.get("durationMs").and_then(Value::as_f64),
            tags: joined_tags(record),
            message_info: text(record, "messageInfo"),
            message_raw: text(record, "messageRaw"),
            flag_summary: 0,
        })
    }
}

fn required(record: &TraceMap, key: &'static str) -> Result<String, SinkError> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(SinkError::MissingField(key))
}

fn text(record: &TraceMap, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn object(record: &TraceMap, key: &str) -> Option<Value> {
    record.get(key).filter(|v| !v.is_null()).cloned()
}

fn joined_tags(record: &TraceMap) -> Option<String> {
    let tags = record.get("tags")?.as_array()?;
    if tags.is_empty() {
        return None;
    }
    let parts: Vec<String> = tags
        .iter()
        .map(|tag| match tag {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    Some(parts.join(","))
}

/// Table names are interpolated into DDL, so only plain identifiers pass.
fn validate_table(table: &str) -> Result<(), BuildError> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(BuildError::InvalidConfig(format!("invalid table name {table:?}")))
    }
}

struct AuditState<T> {
    conn: Option<T>,
    migrated: bool,
}

/// Driver that inserts each record as a row of an audit table.
///
/// The connection is opened on the first `send`, and the table is
/// created (if absent) once per connection. A single connection is
/// shared, so sends are serialized through an internal lock.
pub struct RelationalDriver<C: AuditConnector> {
    db_url: String,
    table: String,
    connector: C,
    state: Mutex<AuditState<C::Connection>>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<C: AuditConnector> RelationalDriver<C> {
    /// Create a driver without connecting.
    ///
    /// **Returns**
    /// - `Err(BuildError::MissingDbUrl)` if `config.db_url` is unset or blank.
    /// - `Err(BuildError::InvalidConfig)` if the table name is not a plain
    ///   identifier.
    pub fn with_connector(config: &PostgresConfig, connector: C) -> Result<Self, BuildError> {
        let db_url = config
            .db_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(BuildError::MissingDbUrl)?
            .to_string();
        validate_table(&config.table)?;

        Ok(Self {
            db_url,
            table: config.table.clone(),
            connector,
            state: Mutex::new(AuditState {
                conn: None,
                migrated: false,
            }),
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.conn.is_some()
    }

    async fn write(
        &self,
        conn: &mut C::Connection,
        migrated: &mut bool,
        record: &TraceMap,
    ) -> Result<String, SinkError> {
        if !*migrated {
            conn.ensure_schema(&self.table).await?;
            *migrated = true;
            self.diagnostics
                .info(&format!("table {} verified/created", self.table));
        }

        let row = AuditRow::from_record(record, Local::now().naive_local(), Utc::now().naive_utc())?;
        let id = conn.insert(&self.table, &row).await?;
        Ok(id.to_string())
    }
}

#[async_trait]
impl<C: AuditConnector> TraceDriver for RelationalDriver<C> {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn send(&self, record: &TraceMap) -> Result<String, SinkError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.conn.is_none() {
            let conn = self.connector.connect(&self.db_url).await?;
            self.diagnostics.info("connected to PostgreSQL");
            state.conn = Some(conn);
        }

        // The connection never leaves the state, so it survives failed
        // writes and dropped futures alike. A failed schema setup leaves
        // `migrated` unset so the next send retries it.
        let AuditState {
            conn: Some(conn),
            migrated,
        } = state
        else {
            return Err(SinkError::connect("audit connection unavailable"));
        };
        self.write(conn, migrated, record).await
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.migrated = false;
        if let Some(conn) = state.conn.take() {
            if let Err(e) = conn.close().await {
                self.diagnostics
                    .warning(&format!("error while closing PostgreSQL connection: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn record(value: Value) -> TraceMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn maps_full_record_to_columns() {
        let record = record(json!({
            "traceId": "t-1",
            "timestamp": "2024-03-01T00:00:00.000Z",
            "service": "svc",
            "level": "ERROR",
            "action": "submit",
            "context": "checkout",
            "request": {"method": "POST", "path": "/pay"},
            "response": {"statusCode": 500},
            "messageInfo": "failed",
            "messageRaw": "stack",
            "durationMs": 42.5,
            "tags": ["a", "b", "c"]
        }));

        let row = AuditRow::from_record(&record, at(6), at(12)).unwrap();
        assert_eq!(row.trace_id, "t-1");
        assert_eq!(row.time_local, at(6));
        assert_eq!(row.time_utc, at(12));
        assert_eq!(row.level, "ERROR");
        assert_eq!(row.action.as_deref(), Some("submit"));
        assert_eq!(row.request, Some(json!({"method": "POST", "path": "/pay"})));
        assert_eq!(row.response, Some(json!({"statusCode": 500})));
        assert_eq!(row.duration_ms, Some(42.5));
        assert_eq!(row.tags.as_deref(), Some("a,b,c"));
        assert_eq!(row.user, None);
        assert_eq!(row.flag_summary, 0);
    }

    #[test]
    fn sparse_record_leaves_optional_columns_null() {
        let record = record(json!({
            "traceId": "t-2",
            "timestamp": "2024-03-01T00:00:00.000Z",
            "service": "svc",
            "level": "INFO",
            "action": ""
        }));
        let row = AuditRow::from_record(&record, at(0), at(6)).unwrap();
        assert_eq!(row.action.as_deref(), Some(""));
        assert!(row.context.is_none());
        assert!(row.request.is_none());
        assert!(row.response.is_none());
        assert!(row.tags.is_none());
        assert!(row.duration_ms.is_none());
    }

    #[test]
    fn missing_trace_id_is_rejected() {
        let record = record(json!({"service": "svc", "level": "INFO"}));
        let err = AuditRow::from_record(&record, at(0), at(0)).unwrap_err();
        assert!(matches!(err, SinkError::MissingField("traceId")));
    }

    #[test]
    fn table_names_must_be_identifiers() {
        assert!(validate_table("LGS_EDD_SDK_HIS").is_ok());
        assert!(validate_table("audit2").is_ok());
        assert!(validate_table("").is_err());
        assert!(validate_table("2audit").is_err());
        assert!(validate_table("logs; DROP TABLE x").is_err());
    }
}
