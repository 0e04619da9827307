use std::sync::Arc;

use async_trait::async_trait;
use trace_log_dispatch::driver::TraceDriver;
use trace_log_dispatch::error::SinkError;
use trace_log_dispatch::record::TraceMap;
use trace_log_dispatch::{Dispatcher, LogEntry};

/// Example of integrating a completely custom backend by implementing
/// the `TraceDriver` trait directly. Imagine this talks to some
/// proprietary store for which this crate does not provide a driver.
struct MyCustomDbDriver;

#[async_trait]
impl TraceDriver for MyCustomDbDriver {
    fn name(&self) -> &'static str {
        "my-custom-db"
    }

    async fn send(&self, record: &TraceMap) -> Result<String, SinkError> {
        // Here you would call your own client library for the target store.
        println!("[my-custom-db] {}", serde_json::Value::Object(record.clone()));
        Ok("my-custom-db".to_string())
    }
}

#[tokio::main]
async fn main() {
    let dispatcher = Dispatcher::from_env();
    dispatcher.set_driver(Arc::new(MyCustomDbDriver));

    if let Err(e) = dispatcher.log(LogEntry::new("custom-1").action("custom backend")).await {
        eprintln!("send failed: {e}");
    }
}
