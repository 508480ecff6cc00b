//! Human-readable, colorized record formatting.
//!
//! Output for one record:
//!
//! ```text
//! [15:04:05.000] [component] LEVEL: message
//! {
//!   "key": "value"
//! }
//! ```
//!
//! The component bracket is left out when no component is bound and the
//! attribute block when there are no attributes to show.

use chrono::Local;
use std::io::{Stdout, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

use crate::attrs::{ATTR_APP_COMPONENT, METADATA_KEYS};
use crate::codec::{self, AttrMap, Bindings, Encoding, JsonEncoder, LEVEL_KEY, MESSAGE_KEY, TIME_KEY};
use crate::colors::{ColorCode, ColorRegistry};
use crate::config::{ConfigError, HandlerConfig, MetadataMode};
use crate::handler::{HandleError, Handler};
use crate::highlight::{Highlighter, HighlighterConfig};
use crate::record::{Attr, Level, Record};

const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Rendered in the header line, so never part of the attribute block.
const HEADER_KEYS: &[&str] = &[TIME_KEY, LEVEL_KEY, MESSAGE_KEY, ATTR_APP_COMPONENT];

/// Scratch buffer and inner encoder shared by every handler derived from
/// one root.
///
/// The buffer is only touched while its mutex is held, and is cleared
/// before the mutex is released on every path, errors and panics included.
#[derive(Debug)]
pub struct SharedEncoderState {
    buffer: Mutex<Vec<u8>>,
    encoder: JsonEncoder,
}

impl SharedEncoderState {
    pub fn new(encoder: JsonEncoder) -> Self {
        SharedEncoderState {
            buffer: Mutex::new(Vec::with_capacity(1024)),
            encoder,
        }
    }

    pub fn encoder(&self) -> &JsonEncoder {
        &self.encoder
    }

    /// Run `f` with exclusive access to the empty scratch buffer.
    pub fn with_scratch<T>(
        &self,
        f: impl FnOnce(&JsonEncoder, &mut Vec<u8>) -> Result<T, HandleError>,
    ) -> Result<T, HandleError> {
        // A panic while the lock was held cannot leave residue behind, the
        // guard below clears the buffer on unwind too.
        let mut scratch = Scratch(self.buffer.lock().unwrap_or_else(PoisonError::into_inner));
        scratch.0.clear();
        f(&self.encoder, &mut scratch.0)
    }

    /// Encode `record` with `bindings` and decode it back into a map.
    pub fn encode_decode(&self, record: &Record, bindings: &Bindings) -> Result<AttrMap, HandleError> {
        self.with_scratch(|encoder, buf| {
            encoder.encode(buf, record, bindings)?;
            codec::decode(buf)
        })
    }
}

struct Scratch<'a>(MutexGuard<'a, Vec<u8>>);

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

/// [`Handler`] writing colorized, multi-line text.
///
/// `with_attrs`/`with_group` copy the handler's own bindings and share the
/// encoder state, writer and highlighter with the parent. Only the
/// encode/decode step is serialized across the tree; the final write is
/// one `write_all` on a fresh writer from `W`, so a sink that needs whole,
/// ordered lines under concurrency must provide that itself (stdout locks
/// per write).
pub struct PrettyHandler<W = fn() -> Stdout> {
    shared: Arc<SharedEncoderState>,
    writer: Arc<W>,
    highlighter: Arc<Highlighter>,
    encoding: Encoding,
    metadata: MetadataMode,
    bindings: Bindings,
    component: Option<String>,
}

impl<W> Clone for PrettyHandler<W> {
    fn clone(&self) -> Self {
        PrettyHandler {
            shared: Arc::clone(&self.shared),
            writer: Arc::clone(&self.writer),
            highlighter: Arc::clone(&self.highlighter),
            encoding: self.encoding,
            metadata: self.metadata,
            bindings: self.bindings.clone(),
            component: self.component.clone(),
        }
    }
}

impl PrettyHandler {
    /// Handler with the default configuration, writing to stdout.
    pub fn stdout() -> Result<Self, ConfigError> {
        PrettyHandler::new(HandlerConfig::default())
    }
}

impl<W> PrettyHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    /// Build a root handler. Configuration problems are reported here and
    /// never from `handle`.
    pub fn new(config: HandlerConfig<W>) -> Result<Self, ConfigError> {
        let highlighter = config.validate()?;
        let encoder = JsonEncoder::new(config.level).suppressing(HEADER_KEYS);
        Ok(PrettyHandler {
            shared: Arc::new(SharedEncoderState::new(encoder)),
            writer: Arc::new(config.writer),
            highlighter: Arc::new(highlighter),
            encoding: config.encoding,
            metadata: config.metadata,
            bindings: Bindings::default(),
            component: None,
        })
    }
}

impl<W> PrettyHandler<W> {
    /// Copy of this handler using a highlighter with `overrides` applied.
    /// The current highlighter, shared with the rest of the tree, is left
    /// as it is.
    pub fn with_highlighter(&self, overrides: &HighlighterConfig) -> Result<Self, ConfigError> {
        let highlighter = Highlighter::modify(Some(&self.highlighter), overrides)?;
        let mut next = self.clone();
        next.highlighter = Arc::new(highlighter);
        Ok(next)
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn group_prefix(&self) -> String {
        self.bindings.group_prefix()
    }

    /// Everything `handle` writes for `record`, without writing it.
    pub fn render(&self, record: &Record) -> Result<String, HandleError> {
        let attrs = self.shared.encode_decode(record, &self.bindings)?;
        let (attrs, metadata) = self.split_metadata(attrs);
        let block = codec::serialize(&attrs, self.encoding)?;
        let block = self.highlighter.highlight(&block);

        let component = component_of(&record.attrs);
        let component = component.as_deref().or(self.component.as_deref());

        Ok(compose(record, component, &metadata, &block))
    }

    fn split_metadata(&self, attrs: AttrMap) -> (AttrMap, Vec<(String, serde_json::Value)>) {
        if self.metadata == MetadataMode::Inline {
            return (attrs, Vec::new());
        }

        let mut block = AttrMap::new();
        let mut metadata = Vec::new();
        for (key, value) in attrs {
            if METADATA_KEYS.contains(&key.as_str()) {
                metadata.push((key, value));
            } else {
                block.insert(key, value);
            }
        }
        if self.metadata == MetadataMode::Hidden {
            metadata.clear();
        }
        metadata.sort_by_key(|(key, _)| METADATA_KEYS.iter().position(|k| k == key));
        (block, metadata)
    }
}

/// Last `app_component` in `attrs`. An empty label counts as none.
fn component_of(attrs: &[Attr]) -> Option<String> {
    attrs
        .iter()
        .rev()
        .find(|a| a.key == ATTR_APP_COMPONENT)
        .map(|a| a.value.to_string())
        .filter(|c| !c.is_empty())
}

fn compose(
    record: &Record,
    component: Option<&str>,
    metadata: &[(String, serde_json::Value)],
    block: &str,
) -> String {
    let colors = ColorRegistry::global();
    let mut out = String::with_capacity(64 + record.message.len() + block.len());

    let time = record.timestamp.with_timezone(&Local).format(TIME_FORMAT);
    out.push_str(&format!("[{time}] "));
    if let Some(component) = component {
        out.push_str(&format!("[{}] ", colors.paint(ColorCode::Green, component)));
    }
    out.push_str(&format!(
        "{}: {}",
        colors.paint(record.level.color(), record.level.as_str()),
        colors.paint(ColorCode::Cyan, &record.message),
    ));
    for (key, value) in metadata {
        match value {
            serde_json::Value::String(s) => out.push_str(&format!(" {key}={s}")),
            other => out.push_str(&format!(" {key}={other}")),
        }
    }
    out.push('\n');

    if !block.is_empty() {
        out.push_str(block);
        out.push('\n');
    }
    out
}

impl<W> Handler for PrettyHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn enabled(&self, level: Level) -> bool {
        self.shared.encoder().enabled(level)
    }

    fn handle(&self, record: &Record) -> Result<(), HandleError> {
        let output = self.render(record)?;
        let mut writer = MakeWriter::make_writer(&*self.writer);
        writer.write_all(output.as_bytes())?;
        Ok(())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        let mut next = self.clone();
        if attrs.iter().any(|a| a.key == ATTR_APP_COMPONENT) {
            next.component = component_of(&attrs);
        }
        next.bindings = self.bindings.with_attrs(attrs);
        next
    }

    fn with_group(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.bindings = self.bindings.with_group(name);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use once_cell::sync::Lazy;
    use regex::Regex;
    use std::io;
    use std::time::Duration;

    static ANSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    static HEADER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\[\d{2}:\d{2}:\d{2}\.\d{3}\] ").unwrap());

    fn handler(config: HandlerConfig) -> PrettyHandler<Mutex<Vec<u8>>> {
        colored::control::set_override(true);
        PrettyHandler::new(config.with_writer(Mutex::new(Vec::new()))).unwrap()
    }

    fn output(h: &PrettyHandler<Mutex<Vec<u8>>>) -> String {
        let bytes = h.writer().lock().unwrap();
        ANSI.replace_all(&String::from_utf8_lossy(&bytes), "").into_owned()
    }

    fn request() -> Record {
        Record::new(Level::Info, "request accepted").with_attrs([
            Attr::new("code", 200),
            attrs::took_duration(Duration::from_millis(2)),
        ])
    }

    #[test]
    fn header_and_json_block() {
        let h = handler(HandlerConfig::default());
        h.handle(&request()).unwrap();
        let out = output(&h);
        assert!(HEADER.is_match(&out), "{out}");
        let (header, block) = out.split_once('\n').unwrap();
        assert!(header.ends_with("] INFO: request accepted took=2ms"));
        assert_eq!(block, "{\n  \"code\": 200\n}\n");
    }

    #[test]
    fn inline_metadata_stays_in_block() {
        let h = handler(HandlerConfig::default().metadata(MetadataMode::Inline));
        h.handle(&request()).unwrap();
        let out = output(&h);
        let (header, block) = out.split_once('\n').unwrap();
        assert!(header.ends_with("] INFO: request accepted"));
        assert_eq!(block, "{\n  \"code\": 200,\n  \"took\": \"2ms\"\n}\n");
    }

    #[test]
    fn empty_component_prints_no_bracket() {
        let h = handler(HandlerConfig::default()).with_attrs(vec![attrs::app_component("")]);
        assert_eq!(h.component(), None);
        h.handle(&Record::new(Level::Info, "m")).unwrap();
        let out = output(&h);
        assert!(!out.contains("[]"), "{out}");
        assert!(out.ends_with("] INFO: m\n"));
    }

    #[test]
    fn header_is_colored() {
        let h = handler(HandlerConfig::default());
        let rendered = h.render(&Record::new(Level::Error, "boom")).unwrap();
        let colors = ColorRegistry::global();
        assert!(rendered.contains(&colors.paint(ColorCode::Red, "ERROR")));
        assert!(rendered.contains(&colors.paint(ColorCode::Cyan, "boom")));
    }

    #[test]
    fn hidden_metadata_leaves_only_plain_attributes() {
        let h = handler(HandlerConfig::default().metadata(MetadataMode::Hidden));
        h.handle(&request()).unwrap();
        let out = output(&h);
        let (header, block) = out.split_once('\n').unwrap();
        assert!(header.ends_with("] INFO: request accepted"));
        assert_eq!(block, "{\n  \"code\": 200\n}\n");
    }

    #[test]
    fn header_metadata_is_appended_in_fixed_order() {
        let h = handler(HandlerConfig::default().metadata(MetadataMode::Header));
        let record = request().with_attrs([attrs::error(&"denied"), attrs::operation("auth.Login")]);
        h.handle(&record).unwrap();
        let out = output(&h);
        let (header, block) = out.split_once('\n').unwrap();
        assert!(header.ends_with("INFO: request accepted operation=auth.Login took=2ms err=denied"));
        assert_eq!(block, "{\n  \"code\": 200\n}\n");
    }

    #[test]
    fn no_attributes_means_single_line() {
        let h = handler(HandlerConfig::default());
        h.handle(&Record::new(Level::Debug, "tick")).unwrap();
        let out = output(&h);
        assert_eq!(out.lines().count(), 1);
        assert!(out.ends_with("] DEBUG: tick\n"));
    }

    #[test]
    fn component_goes_to_header_bracket() {
        let h = handler(HandlerConfig::default())
            .with_attrs(vec![attrs::app_component("billing"), Attr::new("shard", 3)]);
        assert_eq!(h.component(), Some("billing"));
        h.handle(&Record::new(Level::Warn, "slow")).unwrap();
        let out = output(&h);
        assert!(out.contains("] [billing] WARN: slow\n"), "{out}");
        assert!(!out.contains("app_component"));
        assert!(out.contains("\"shard\": 3"));
    }

    #[test]
    fn record_component_overrides_bound_one() {
        let h = handler(HandlerConfig::default()).with_attrs(vec![attrs::app_component("api")]);
        let record = Record::new(Level::Info, "m").with_attrs([attrs::app_component("worker")]);
        h.handle(&record).unwrap();
        assert!(output(&h).contains("[worker] INFO: m"));
    }

    #[test]
    fn derivation_does_not_touch_parent() {
        let parent = handler(HandlerConfig::default());
        let child = parent.with_attrs(vec![Attr::string("req", "r1")]).with_group("db");
        assert!(parent.bindings().is_empty());
        assert_eq!(child.group_prefix(), "db");

        parent.handle(&Record::new(Level::Info, "parent")).unwrap();
        child
            .handle(&Record::new(Level::Info, "child").with_attrs([Attr::new("rows", 1)]))
            .unwrap();
        let out = output(&parent);
        let (parent_out, child_out) = out.split_once("] INFO: child").unwrap();
        assert!(!parent_out.contains("req"));
        assert!(child_out.contains("\"req\": \"r1\""));
        assert!(child_out.contains("\"db\": {\n    \"rows\": 1\n  }"));
    }

    #[test]
    fn enabled_follows_level_threshold() {
        let h = handler(HandlerConfig::default().level(Level::Warn));
        assert!(!h.enabled(Level::Info));
        assert!(h.enabled(Level::Warn));
        assert!(h.with_group("g").enabled(Level::Error));
    }

    #[test]
    fn numbers_and_keywords_are_highlighted() {
        let h = handler(
            HandlerConfig::default()
                .numbers_color(ColorCode::Yellow)
                .keyword_color("failed", ColorCode::Red),
        );
        let record = Record::new(Level::Error, "m")
            .with_attrs([Attr::new("code", 500), Attr::string("status", "failed")]);
        let rendered = h.render(&record).unwrap();
        let colors = ColorRegistry::global();
        assert!(rendered.contains(&colors.paint(ColorCode::Yellow, "500")));
        assert!(rendered.contains(&colors.paint(ColorCode::Red, "failed")));
    }

    #[test]
    fn reconfigured_highlighter_is_a_copy() {
        let base = handler(HandlerConfig::default());
        let loud = base
            .with_highlighter(&HighlighterConfig::default().numbers(ColorCode::Magenta))
            .unwrap();
        let record = Record::new(Level::Info, "m").with_attrs([Attr::new("n", 7)]);
        let magenta = ColorRegistry::global().paint(ColorCode::Magenta, "7");
        assert!(loud.render(&record).unwrap().contains(&magenta));
        assert!(!base.render(&record).unwrap().contains(&magenta));
    }

    #[test]
    fn encode_errors_are_returned_and_buffer_reset() {
        let h = handler(HandlerConfig::default());
        let bad = Record::new(Level::Info, "m").with_attrs([Attr::new("x", f64::INFINITY)]);
        assert!(matches!(h.handle(&bad), Err(HandleError::Encode(_))));
        assert!(h.shared.buffer.lock().unwrap().is_empty());

        h.handle(&Record::new(Level::Info, "next").with_attrs([Attr::new("y", 1)]))
            .unwrap();
        let out = output(&h);
        assert!(out.contains("\"y\": 1"));
        assert!(!out.contains("\"x\""));
    }

    #[test]
    fn decode_errors_are_returned_and_buffer_reset() {
        let state = SharedEncoderState::new(JsonEncoder::new(Level::Debug));
        let err = state
            .with_scratch(|_, buf| {
                buf.extend_from_slice(b"{\"torn\":");
                codec::decode(buf)
            })
            .unwrap_err();
        assert!(matches!(err, HandleError::Decode(_)));
        assert!(state.buffer.lock().unwrap().is_empty());
    }

    #[test]
    fn write_errors_are_returned() {
        struct Broken;
        impl io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let h = PrettyHandler::new(HandlerConfig::default().with_writer(|| Broken)).unwrap();
        assert!(matches!(
            h.handle(&Record::new(Level::Info, "m")),
            Err(HandleError::Write(_))
        ));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml_block() {
        let h = handler(
            HandlerConfig::default()
                .encoding(Encoding::Yaml)
                .metadata(MetadataMode::Inline),
        );
        h.handle(&request()).unwrap();
        let out = output(&h);
        let (_, block) = out.split_once('\n').unwrap();
        assert_eq!(block, "code: 200\ntook: 2ms\n");
    }
}
