use std::io::{Stdout, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

use crate::codec::{Bindings, JsonEncoder};
use crate::config::{ConfigError, HandlerConfig};
use crate::handler::{HandleError, Handler};
use crate::pretty::SharedEncoderState;
use crate::record::{Attr, Level, Record};

/// [`Handler`] writing one compact JSON object per line, `time`, `level`
/// and `msg` first.
///
/// Uses the same inner encoder as [`PrettyHandler`](crate::pretty::PrettyHandler)
/// without any of the display stages. The write happens while the scratch
/// buffer is locked, so lines from one handler tree never interleave.
pub struct JsonHandler<W = fn() -> Stdout> {
    shared: Arc<SharedEncoderState>,
    writer: Arc<W>,
    bindings: Bindings,
}

impl<W> Clone for JsonHandler<W> {
    fn clone(&self) -> Self {
        JsonHandler {
            shared: Arc::clone(&self.shared),
            writer: Arc::clone(&self.writer),
            bindings: self.bindings.clone(),
        }
    }
}

impl<W> JsonHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    /// Only `writer` and `level` of `config` apply.
    pub fn new(config: HandlerConfig<W>) -> Result<Self, ConfigError> {
        Ok(JsonHandler {
            shared: Arc::new(SharedEncoderState::new(JsonEncoder::new(config.level))),
            writer: Arc::new(config.writer),
            bindings: Bindings::default(),
        })
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W> Handler for JsonHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn enabled(&self, level: Level) -> bool {
        self.shared.encoder().enabled(level)
    }

    fn handle(&self, record: &Record) -> Result<(), HandleError> {
        self.shared.with_scratch(|encoder, buf| {
            encoder.encode(buf, record, &self.bindings)?;
            MakeWriter::make_writer(&*self.writer).write_all(buf)?;
            Ok(())
        })
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        let mut next = self.clone();
        next.bindings = self.bindings.with_attrs(attrs);
        next
    }

    fn with_group(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.bindings = self.bindings.with_group(name);
        next
    }
}
