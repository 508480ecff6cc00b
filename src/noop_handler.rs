use crate::handler::{HandleError, Handler};
use crate::record::{Attr, Level, Record};

/// A handler that drops all records.
///
/// Reports every level as disabled, so front-ends skip building records for
/// it. Useful for measuring the overhead of the front-end itself and for
/// tests that don't care about output.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

impl Handler for NoopHandler {
    fn enabled(&self, _level: Level) -> bool {
        false
    }

    fn handle(&self, _record: &Record) -> Result<(), HandleError> {
        Ok(())
    }

    fn with_attrs(&self, _attrs: Vec<Attr>) -> Self {
        NoopHandler
    }

    fn with_group(&self, _name: &str) -> Self {
        NoopHandler
    }
}
