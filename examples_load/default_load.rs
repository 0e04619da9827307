use std::sync::Arc;
use std::time::Instant;

use trace_log_dispatch::console::ConsoleDriver;
use trace_log_dispatch::{Dispatcher, LogEntry, LogLevel};

#[tokio::main]
async fn main() {
    // Console driver writing into the void, to measure dispatch overhead
    // (record assembly, serialization, driver lookup) without real I/O.
    let dispatcher = Dispatcher::from_env();
    dispatcher.set_driver(Arc::new(ConsoleDriver::to_writer(std::io::sink())));

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let entry = LogEntry::new(format!("load-{i}"))
            .level(LogLevel::Error)
            .action("default load test")
            .duration_ms(i as f64);
        if let Err(e) = dispatcher.log(entry).await {
            eprintln!("log failed: {e}");
        }
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
