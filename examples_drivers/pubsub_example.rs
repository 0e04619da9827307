use std::sync::Arc;

use trace_log_dispatch::config::PubSubConfig;
use trace_log_dispatch::init::{init_diagnostics, DiagnosticsConfig};
use trace_log_dispatch::pubsub::PubSubDriver;
use trace_log_dispatch::{Dispatcher, LogEntry, LogLevel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_diagnostics(DiagnosticsConfig::from_env());

    // Run against the emulator by default:
    //   gcloud beta emulators pubsub start --host-port=localhost:8085
    let config = PubSubConfig {
        project_id: Some(std::env::var("GOOGLE_CLOUD_PROJECT").unwrap_or_else(|_| "local-project".to_string())),
        emulator_host: Some(std::env::var("PUBSUB_EMULATOR_HOST").unwrap_or_else(|_| "localhost:8085".to_string())),
        ..PubSubConfig::default()
    };

    let dispatcher = Dispatcher::from_env();
    dispatcher.set_driver(Arc::new(PubSubDriver::new(&config)?));

    let message_id = dispatcher
        .log(
            LogEntry::new("abc123")
                .level(LogLevel::Warning)
                .action("publish example")
                .status_code(202),
        )
        .await?;
    println!("published message {message_id}");
    Ok(())
}
