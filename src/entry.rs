use crate::record::{to_value_lossy, Headers, LogLevel, RequestInfo, ResponseInfo, TraceLog};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Fields of a single `log` call.
///
/// Only the trace id is required; everything else defaults to unset,
/// with `level` defaulting to [`LogLevel::Info`] and `action` to `""`.
///
/// ```
/// use trace_log_dispatch::entry::LogEntry;
/// use trace_log_dispatch::record::LogLevel;
///
/// let entry = LogEntry::new("abc123")
///     .level(LogLevel::Error)
///     .action("submit")
///     .status_code(500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogEntry {
    trace_id: String,
    level: LogLevel,
    action: String,
    context: Option<String>,
    method: Option<String>,
    path: Option<String>,
    request_headers: Option<Headers>,
    request_body: Option<Value>,
    status_code: Option<u16>,
    response_headers: Option<Headers>,
    response_body: Option<Value>,
    message_info: Option<String>,
    message_raw: Option<String>,
    duration_ms: Option<f64>,
    tags: Option<Vec<String>>,
    service: Option<String>,
}

impl LogEntry {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            ..Self::default()
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// HTTP method; a request is only recorded when `path` is also set.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Request path; a request is only recorded when `method` is also set.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn request_headers(mut self, headers: Headers) -> Self {
        self.request_headers = Some(headers);
        self
    }

    /// Any serializable body. Values serde cannot represent are kept as
    /// their `Debug` text.
    pub fn request_body<T: Serialize + fmt::Debug + ?Sized>(mut self, body: &T) -> Self {
        self.request_body = Some(to_value_lossy(body));
        self
    }

    /// Response status; a response is only recorded when this is set.
    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn response_headers(mut self, headers: Headers) -> Self {
        self.response_headers = Some(headers);
        self
    }

    pub fn response_body<T: Serialize + fmt::Debug + ?Sized>(mut self, body: &T) -> Self {
        self.response_body = Some(to_value_lossy(body));
        self
    }

    pub fn message_info(mut self, message: impl Into<String>) -> Self {
        self.message_info = Some(message.into());
        self
    }

    pub fn message_raw(mut self, message: impl Into<String>) -> Self {
        self.message_raw = Some(message.into());
        self
    }

    pub fn duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Per-call override of the dispatcher's default service name.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Assemble the final [`TraceLog`].
    ///
    /// Blank `service` overrides fall back to `default_service`; blank
    /// `method`/`path` count as missing.
    pub fn into_trace(self, timestamp: String, default_service: &str) -> TraceLog {
        let request = match (non_blank(self.method), non_blank(self.path)) {
            (Some(method), Some(path)) => Some(RequestInfo {
                method,
                path,
                headers: self.request_headers,
                body: self.request_body,
            }),
            _ => None,
        };

        let response = self.status_code.map(|status_code| ResponseInfo {
            status_code,
            headers: self.response_headers,
            body: self.response_body,
        });

        TraceLog {
            trace_id: self.trace_id,
            timestamp,
            service: non_blank(self.service).unwrap_or_else(|| default_service.to_string()),
            level: self.level,
            action: self.action,
            context: self.context,
            request,
            response,
            message_info: self.message_info,
            message_raw: self.message_raw,
            duration_ms: self.duration_ms,
            tags: self.tags,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
