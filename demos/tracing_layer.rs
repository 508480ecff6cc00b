use tracing::{error, info, info_span, warn};

use tracing_pretty_handler::init::init;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // PRETTY_LOG_LEVEL=debug PRETTY_LOG_KEYWORDS=failed=red cargo run --example tracing_layer
    init()?;

    info!(version = "1.4.2", workers = 4, "starting");

    let span = info_span!("request", method = "POST", path = "/orders");
    let _guard = span.enter();

    info!(app_component = "orders", items = 3, total = 59.90, "order placed");
    warn!(app_component = "orders", took = 812_000_000u64, "payment gateway slow");

    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
    error!(err = &err as &dyn std::error::Error, retries = 2, "order sync failed");

    Ok(())
}
