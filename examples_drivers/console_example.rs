use serde_json::json;
use trace_log_dispatch::config::DispatcherConfig;
use trace_log_dispatch::init::{init_diagnostics, DiagnosticsConfig};
use trace_log_dispatch::{Dispatcher, LogEntry, LogLevel};

#[tokio::main]
async fn main() {
    init_diagnostics(DiagnosticsConfig::from_env());

    // No DB_URL outside the cloud: the Postgres driver cannot be built,
    // a warning is printed on stderr and records go to stdout instead.
    let dispatcher = Dispatcher::new(DispatcherConfig::default());

    let ack = dispatcher
        .log(
            LogEntry::new("abc123")
                .level(LogLevel::Error)
                .action("submit")
                .method("POST")
                .path("/v1/applications")
                .request_body(&json!({"applicant": "A-1"}))
                .status_code(500)
                .duration_ms(87.4)
                .tags(["onboarding", "edd"]),
        )
        .await;

    match ack {
        Ok(ack) => println!("ack: {ack}"),
        Err(e) => eprintln!("send failed: {e}"),
    }
}
