use std::time::{Duration, Instant};

use tracing_pretty_handler::attrs;
use tracing_pretty_handler::codec::Encoding;
use tracing_pretty_handler::colors::ColorCode;
use tracing_pretty_handler::config::{HandlerConfig, MetadataMode};
use tracing_pretty_handler::{Attr, Handler, Level, Logger, PrettyHandler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = HandlerConfig::default()
        .level(Level::Debug)
        .numbers_color(ColorCode::Yellow)
        .keyword_color("error", ColorCode::Red)
        .keyword_color("ok", ColorCode::Green)
        .apply_env()?;
    let log = Logger::new(PrettyHandler::new(config)?);

    let start = Instant::now();
    log.info("service started", vec![Attr::new("port", 8080), Attr::string("mode", "dev")])?;

    let requests = log
        .with(vec![attrs::app_component("api")])
        .with_group("request");
    requests.info(
        "request accepted",
        vec![
            attrs::operation(attrs::services_operation("users", "get")),
            Attr::string("path", "/users/42"),
            Attr::new("code", 200),
            attrs::took(start),
        ],
    )?;
    requests.warn(
        "slow upstream",
        vec![Attr::new("latency", Duration::from_millis(350)), Attr::string("status", "ok")],
    )?;

    let inline = Logger::new(PrettyHandler::new(
        HandlerConfig::default().metadata(MetadataMode::Inline),
    )?);
    inline.error(
        "lookup failed",
        vec![
            attrs::error(&"connection reset"),
            attrs::user_id("u-17"),
            Attr::group("retry", vec![Attr::new("attempt", 3), Attr::new("backoff_ms", 250)]),
        ],
    )?;

    if cfg!(feature = "yaml") {
        let yaml = PrettyHandler::new(HandlerConfig::default().encoding(Encoding::Yaml))?
            .with_group("db");
        yaml.handle(
            &tracing_pretty_handler::Record::new(Level::Debug, "query done")
                .with_attrs([Attr::string("table", "users"), Attr::new("rows", 12)]),
        )?;
    }

    println!(
        "took {}",
        attrs::format_with_measurement_unit(start.elapsed())
    );
    Ok(())
}
