use crate::driver::TraceDriver;
use crate::error::SinkError;
use crate::record::{render_pretty, TraceMap};
use async_trait::async_trait;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Acknowledgment returned by every [`ConsoleDriver::send`].
pub const CONSOLE_ACK: &str = "console-log";

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Driver that pretty-prints each record as JSON.
///
/// This is also the fallback driver: constructing it cannot fail and
/// `send` never returns an error. Write failures on the underlying stream
/// are swallowed.
#[derive(Clone, Default)]
pub struct ConsoleDriver {
    writer: Option<SharedWriter>,
}

impl ConsoleDriver {
    /// Driver writing to the process' standard output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver writing to an arbitrary stream instead of stdout.
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Some(Arc::new(Mutex::new(Box::new(writer)))),
        }
    }

    fn emit(&self, text: &str) {
        match &self.writer {
            Some(writer) => {
                let mut guard = writer.lock().unwrap_or_else(PoisonError::into_inner);
                let _ = writeln!(guard, "{text}");
                let _ = guard.flush();
            }
            None => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{text}");
            }
        }
    }
}

impl fmt::Debug for ConsoleDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = if self.writer.is_some() { "writer" } else { "stdout" };
        f.debug_struct("ConsoleDriver").field("target", &target).finish()
    }
}

#[async_trait]
impl TraceDriver for ConsoleDriver {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn send(&self, record: &TraceMap) -> Result<String, SinkError> {
        self.emit(&render_pretty(record));
        Ok(CONSOLE_ACK.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[derive(Clone, Default)]
    struct Buf(Arc<Mutex<Vec<u8>>>);

    impl Write for Buf {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[tokio::test]
    async fn prints_pretty_json_and_returns_sentinel() {
        let buf = Buf::default();
        let driver = ConsoleDriver::to_writer(buf.clone());
        let mut record = TraceMap::new();
        record.insert("traceId".into(), json!("abc"));
        record.insert("body".into(), json!({"nested": [1, 2]}));

        let ack = driver.send(&record).await.unwrap();
        assert_eq!(ack, CONSOLE_ACK);

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("\n  \"traceId\": \"abc\""));
        let parsed: Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed, Value::Object(record));
    }

    #[tokio::test]
    async fn write_failures_never_surface() {
        let driver = ConsoleDriver::to_writer(BrokenPipe);
        let ack = driver.send(&TraceMap::new()).await.unwrap();
        assert_eq!(ack, CONSOLE_ACK);
        driver.close().await;
        driver.close().await;
    }
}
