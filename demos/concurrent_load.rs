use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use tracing_pretty_handler::config::HandlerConfig;
use tracing_pretty_handler::noop_handler::NoopHandler;
use tracing_pretty_handler::{Attr, Handler, Level, Logger, PrettyHandler, Record};

const THREADS: u64 = 8;
const PER_THREAD: u64 = 25_000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = PrettyHandler::new(HandlerConfig::default().with_writer(Mutex::new(Vec::new())))?;

    let start = Instant::now();
    thread::scope(|s| {
        for t in 0..THREADS {
            let handler = root.with_attrs(vec![Attr::new("thread", t)]).with_group("load");
            s.spawn(move || {
                for i in 0..PER_THREAD {
                    let record = Record::new(Level::Error, "load test error")
                        .with_attrs([Attr::new("iteration", i)]);
                    if let Err(e) = handler.handle(&record) {
                        eprintln!("handle failed: {}", e);
                    }
                }
            });
        }
    });
    let elapsed = start.elapsed();
    let n = THREADS * PER_THREAD;
    let bytes = root.writer().lock().map(|b| b.len()).unwrap_or(0);

    println!("pretty handler: formatted {} records ({} bytes) in {:?} (~{:.0} rec/s)",
        n,
        bytes,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let noop = Logger::new(NoopHandler);
    let start = Instant::now();
    for i in 0..n {
        noop.error("load test error", vec![Attr::new("iteration", i)])?;
    }
    println!("noop handler: {} records in {:?}", n, start.elapsed());

    Ok(())
}
