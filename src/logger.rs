use std::fmt;

use crate::handler::{HandleError, Handler};
use crate::record::{Attr, Level, Record};

/// Front-end that builds [`Record`]s and hands them to a [`Handler`].
///
/// Records below the handler's threshold are never built.
#[derive(Clone, Debug)]
pub struct Logger<H> {
    handler: H,
}

impl<H: Handler> Logger<H> {
    pub fn new(handler: H) -> Self {
        Logger { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Logger whose records all carry `attrs`.
    pub fn with(&self, attrs: Vec<Attr>) -> Self {
        Logger::new(self.handler.with_attrs(attrs))
    }

    /// Logger whose record attributes are nested under `name`.
    pub fn with_group(&self, name: &str) -> Self {
        Logger::new(self.handler.with_group(name))
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    pub fn log(
        &self,
        level: Level,
        message: impl Into<String>,
        attrs: Vec<Attr>,
    ) -> Result<(), HandleError> {
        if !self.handler.enabled(level) {
            return Ok(());
        }
        let record = Record::new(level, message).with_attrs(attrs);
        self.handler.handle(&record)
    }

    pub fn debug(&self, message: impl Into<String>, attrs: Vec<Attr>) -> Result<(), HandleError> {
        self.log(Level::Debug, message, attrs)
    }

    pub fn info(&self, message: impl Into<String>, attrs: Vec<Attr>) -> Result<(), HandleError> {
        self.log(Level::Info, message, attrs)
    }

    pub fn warn(&self, message: impl Into<String>, attrs: Vec<Attr>) -> Result<(), HandleError> {
        self.log(Level::Warn, message, attrs)
    }

    pub fn error(&self, message: impl Into<String>, attrs: Vec<Attr>) -> Result<(), HandleError> {
        self.log(Level::Error, message, attrs)
    }
}

/// Printf-style adapter over a [`Logger`], for code that expects a plain
/// formatted-message logger.
///
/// `fatalf` only logs at error level; terminating is left to the caller.
#[derive(Clone, Debug)]
pub struct StdLogger<H> {
    logger: Logger<H>,
}

impl<H: Handler> StdLogger<H> {
    pub fn new(logger: Logger<H>) -> Self {
        StdLogger { logger }
    }

    pub fn logger(&self) -> &Logger<H> {
        &self.logger
    }

    pub fn printf(&self, args: fmt::Arguments<'_>) -> Result<(), HandleError> {
        self.logger.info(args.to_string(), Vec::new())
    }

    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> Result<(), HandleError> {
        self.logger.error(args.to_string(), Vec::new())
    }
}
