#![allow(dead_code)]

use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trace_log_dispatch::backend::{DriverFactory, DriverKind};
use trace_log_dispatch::clock::Clock;
use trace_log_dispatch::console::ConsoleDriver;
use trace_log_dispatch::diagnostics::Diagnostics;
use trace_log_dispatch::driver::TraceDriver;
use trace_log_dispatch::error::{BuildError, SinkError};
use trace_log_dispatch::record::TraceMap;
use trace_log_dispatch::relational::{AuditConnection, AuditConnector, AuditRow};
use trace_log_dispatch::topic::{topic_path, PublishConnector, TopicPublisher};

/// In-memory stream shared between a driver and the test.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Driver that remembers every record and acknowledges with a counter.
#[derive(Default)]
pub struct RecordingDriver {
    pub records: Mutex<Vec<TraceMap>>,
    pub closes: AtomicUsize,
}

#[async_trait]
impl TraceDriver for RecordingDriver {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, record: &TraceMap) -> Result<String, SinkError> {
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(format!("rec-{}", records.len()))
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory that counts constructions and can be told to fail.
pub struct CountingFactory {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Duration,
    pub driver: Arc<dyn TraceDriver>,
}

impl CountingFactory {
    pub fn succeeding(driver: Arc<dyn TraceDriver>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay: Duration::ZERO,
            driver,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
            delay: Duration::ZERO,
            driver: Arc::new(ConsoleDriver::to_writer(io::sink())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DriverFactory for CountingFactory {
    fn kind(&self) -> DriverKind {
        DriverKind::Postgres
    }

    fn create(&self, diagnostics: Arc<dyn Diagnostics>) -> Result<Arc<dyn TraceDriver>, BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        diagnostics.info("building recording driver");
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail {
            Err(BuildError::MissingDbUrl)
        } else {
            Ok(Arc::clone(&self.driver))
        }
    }
}

/// Clock frozen at 2024-01-01T00:00:00.123Z (UTC).
pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        use chrono::TimeZone;
        chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(123)
    }
}

/// Counters shared by a [`FakeAuditConnector`] and its connections.
#[derive(Default)]
pub struct AuditStats {
    pub connects: AtomicUsize,
    pub schema_runs: AtomicUsize,
    pub inserts: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_schema_once: Mutex<bool>,
    pub fail_connect: Mutex<bool>,
    pub fail_insert_once: Mutex<bool>,
    pub insert_delay: Mutex<Duration>,
    pub rows: Mutex<Vec<AuditRow>>,
}

impl AuditStats {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn schema_runs(&self) -> usize {
        self.schema_runs.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct FakeAuditConnector {
    pub stats: Arc<AuditStats>,
}

pub struct FakeAuditConnection {
    stats: Arc<AuditStats>,
}

#[async_trait]
impl AuditConnector for FakeAuditConnector {
    type Connection = FakeAuditConnection;

    async fn connect(&self, _url: &str) -> Result<FakeAuditConnection, SinkError> {
        if *self.stats.fail_connect.lock().unwrap() {
            return Err(SinkError::connect("connection refused"));
        }
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        Ok(FakeAuditConnection {
            stats: Arc::clone(&self.stats),
        })
    }
}

#[async_trait]
impl AuditConnection for FakeAuditConnection {
    async fn ensure_schema(&mut self, _table: &str) -> Result<(), SinkError> {
        self.stats.schema_runs.fetch_add(1, Ordering::SeqCst);
        let mut fail = self.stats.fail_schema_once.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(SinkError::schema("permission denied for schema public"));
        }
        Ok(())
    }

    async fn insert(&mut self, _table: &str, row: &AuditRow) -> Result<i64, SinkError> {
        let delay = *self.stats.insert_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        {
            let mut fail = self.stats.fail_insert_once.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(SinkError::insert("null value in column \"trace_id\""));
            }
        }
        let id = self.stats.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.rows.lock().unwrap().push(row.clone());
        Ok(id as i64)
    }

    async fn close(self) -> Result<(), SinkError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector whose publishers store payloads in memory.
#[derive(Clone, Default)]
pub struct FakePublishConnector {
    pub connects: Arc<AtomicUsize>,
    pub payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

pub struct FakePublisher {
    topic_path: String,
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl PublishConnector for FakePublishConnector {
    type Publisher = FakePublisher;

    async fn connect(&self, project_id: &str, topic: &str) -> Result<FakePublisher, SinkError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(FakePublisher {
            topic_path: topic_path(project_id, topic),
            payloads: Arc::clone(&self.payloads),
        })
    }
}

#[async_trait]
impl TopicPublisher for FakePublisher {
    fn topic_path(&self) -> &str {
        &self.topic_path
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<String, SinkError> {
        let mut payloads = self.payloads.lock().unwrap();
        payloads.push(payload);
        Ok(format!("msg-{}", payloads.len()))
    }
}
