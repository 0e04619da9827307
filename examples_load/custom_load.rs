use std::sync::Arc;
use std::time::Instant;

use trace_log_dispatch::config::DispatcherConfig;
use trace_log_dispatch::console::ConsoleDriver;
use trace_log_dispatch::{Dispatcher, LogEntry};

#[tokio::main(flavor = "multi_thread", worker_threads = 8)]
async fn main() {
    let config = DispatcherConfig {
        service: "load-test".to_string(),
        ..DispatcherConfig::default()
    };
    let dispatcher = Arc::new(Dispatcher::new(config));
    dispatcher.set_driver(Arc::new(ConsoleDriver::to_writer(std::io::sink())));

    let tasks: u64 = 64;
    let per_task: u64 = 2_000;
    let start = Instant::now();

    let handles: Vec<_> = (0..tasks)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                for i in 0..per_task {
                    let entry = LogEntry::new(format!("task-{t}"))
                        .action("custom load test")
                        .method("GET")
                        .path("/health")
                        .status_code(200)
                        .tags(["load", "concurrent"])
                        .message_info(format!("iteration {i}"));
                    let _ = dispatcher.log(entry).await;
                }
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.await;
    }

    let n = tasks * per_task;
    let elapsed = start.elapsed();
    println!("custom config: sent {} records from {} tasks in {:?} (~{:.0} rec/s)",
        n,
        tasks,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
