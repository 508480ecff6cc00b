//! Reserved attribute keys and constructors for them.

use std::fmt::Display;
use std::time::{Duration, Instant};

use crate::record::Attr;

/// Error text.
pub const ATTR_ERROR: &str = "err";
/// Logical operation name.
pub const ATTR_OPERATION: &str = "operation";
/// Elapsed time, already formatted with a unit suffix.
pub const ATTR_TOOK: &str = "took";
pub const ATTR_USER_ID: &str = "user_id";
pub const ATTR_APP_ID: &str = "app_id";
/// Component label, rendered in the header bracket.
pub const ATTR_APP_COMPONENT: &str = "app_component";

/// Reserved keys other than the component, in the order they are rendered
/// when lifted into the header.
pub const METADATA_KEYS: [&str; 5] = [ATTR_OPERATION, ATTR_TOOK, ATTR_USER_ID, ATTR_APP_ID, ATTR_ERROR];

const SERVICES_LAYER: &str = "services";

pub fn error(err: &dyn Display) -> Attr {
    Attr::string(ATTR_ERROR, err.to_string())
}

pub fn operation(op: impl Into<String>) -> Attr {
    Attr::string(ATTR_OPERATION, op)
}

/// Time elapsed since `start`.
pub fn took(start: Instant) -> Attr {
    took_duration(start.elapsed())
}

pub fn took_duration(elapsed: Duration) -> Attr {
    Attr::string(ATTR_TOOK, format_with_measurement_unit(elapsed))
}

pub fn user_id(id: impl Into<String>) -> Attr {
    Attr::string(ATTR_USER_ID, id)
}

pub fn app_id(id: impl Into<String>) -> Attr {
    Attr::string(ATTR_APP_ID, id)
}

pub fn app_component(component: impl Into<String>) -> Attr {
    Attr::string(ATTR_APP_COMPONENT, component)
}

/// Whole milliseconds if there is at least one, else whole microseconds
/// (`mcs`) if there is at least one, else nanoseconds.
pub fn format_with_measurement_unit(elapsed: Duration) -> String {
    if elapsed.as_millis() != 0 {
        format!("{}ms", elapsed.as_millis())
    } else if elapsed.as_micros() != 0 {
        format!("{}mcs", elapsed.as_micros())
    } else {
        format!("{}ns", elapsed.as_nanos())
    }
}

/// `services.<service>.<method>`
pub fn services_operation(service: &str, method: &str) -> String {
    format!("{SERVICES_LAYER}.{service}.{method}")
}
