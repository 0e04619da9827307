use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Transport-agnostic serialized form of a [`TraceLog`].
///
/// Keys keep insertion order, so the mandatory fields always come first
/// followed by the optional ones in their declared order.
pub type TraceMap = Map<String, Value>;

/// HTTP headers attached to a request or response.
pub type Headers = BTreeMap<String, String>;

/// Severity of a trace record, using the upper-case wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Notice,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
        LogLevel::Alert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Notice => "NOTICE",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Alert => "ALERT",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`LogLevel`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    /// Level names are matched case-insensitively (`"error"` == `"ERROR"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

/// Inbound request metadata captured by a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub headers: Option<Headers>,
    pub body: Option<Value>,
}

impl RequestInfo {
    fn to_map(&self) -> TraceMap {
        let mut out = TraceMap::new();
        out.insert("method".into(), Value::String(self.method.clone()));
        out.insert("path".into(), Value::String(self.path.clone()));
        insert_headers(&mut out, self.headers.as_ref());
        insert_body(&mut out, self.body.as_ref());
        out
    }
}

/// Outbound response metadata captured by a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    pub status_code: u16,
    pub headers: Option<Headers>,
    pub body: Option<Value>,
}

impl ResponseInfo {
    fn to_map(&self) -> TraceMap {
        let mut out = TraceMap::new();
        out.insert("statusCode".into(), Value::from(self.status_code));
        insert_headers(&mut out, self.headers.as_ref());
        insert_body(&mut out, self.body.as_ref());
        out
    }
}

/// One normalized trace record.
///
/// `trace_id` is a caller-supplied correlation key and may repeat across
/// several records of the same logical operation. `timestamp` is already
/// formatted (see [`crate::clock`]).
#[derive(Debug, Clone, PartialEq)]
pub struct TraceLog {
    pub trace_id: String,
    pub timestamp: String,
    pub service: String,
    pub level: LogLevel,
    pub action: String,
    pub context: Option<String>,
    pub request: Option<RequestInfo>,
    pub response: Option<ResponseInfo>,
    pub message_info: Option<String>,
    pub message_raw: Option<String>,
    pub duration_ms: Option<f64>,
    pub tags: Option<Vec<String>>,
}

impl TraceLog {
    /// Serialize into the sparse wire mapping.
    ///
    /// `traceId`, `timestamp`, `service`, `level` and `action` are always
    /// present. Optional fields are appended only when set; empty strings,
    /// empty header maps, empty tag lists and `null` bodies count as unset.
    pub fn to_map(&self) -> TraceMap {
        let mut out = TraceMap::new();
        out.insert("traceId".into(), Value::String(self.trace_id.clone()));
        out.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        out.insert("service".into(), Value::String(self.service.clone()));
        out.insert("level".into(), Value::String(self.level.as_str().to_string()));
        out.insert("action".into(), Value::String(self.action.clone()));

        insert_text(&mut out, "context", self.context.as_deref());
        if let Some(request) = &self.request {
            out.insert("request".into(), Value::Object(request.to_map()));
        }
        if let Some(response) = &self.response {
            out.insert("response".into(), Value::Object(response.to_map()));
        }
        insert_text(&mut out, "messageInfo", self.message_info.as_deref());
        insert_text(&mut out, "messageRaw", self.message_raw.as_deref());
        if let Some(duration) = self.duration_ms {
            out.insert("durationMs".into(), number_or_string(duration));
        }
        if let Some(tags) = self.tags.as_ref().filter(|tags| !tags.is_empty()) {
            let tags = tags.iter().cloned().map(Value::String).collect();
            out.insert("tags".into(), Value::Array(tags));
        }
        out
    }
}

fn insert_text(out: &mut TraceMap, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        out.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn insert_headers(out: &mut TraceMap, headers: Option<&Headers>) {
    if let Some(headers) = headers.filter(|h| !h.is_empty()) {
        let headers = headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        out.insert("headers".into(), Value::Object(headers));
    }
}

fn insert_body(out: &mut TraceMap, body: Option<&Value>) {
    if let Some(body) = body.filter(|b| !b.is_null()) {
        out.insert("body".into(), body.clone());
    }
}

/// JSON has no NaN or infinity; those degrade to their string form.
fn number_or_string(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

/// Convert any serializable value into a JSON value, degrading to its
/// `Debug` representation when serde cannot represent it.
pub fn to_value_lossy<T>(value: &T) -> Value
where
    T: Serialize + fmt::Debug + ?Sized,
{
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{value:?}")))
}

/// Pretty-printed JSON text for human consumption.
pub fn render_pretty(record: &TraceMap) -> String {
    serde_json::to_string_pretty(record).unwrap_or_else(|_| format!("{record:?}"))
}

/// Compact UTF-8 JSON bytes, the payload format used on the wire.
pub fn render_bytes(record: &TraceMap) -> Vec<u8> {
    serde_json::to_vec(record).unwrap_or_else(|_| format!("{record:?}").into_bytes())
}
