use crate::handler::Handler;
use crate::record::{Attr, Level, Record, Value};
use chrono::Utc;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tracing::field::{Field, Visit};
use tracing::{span, Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`Record`]s and passes
/// them to a [`Handler`] on the emitting thread.
///
/// Event fields become record attributes, with the `message` field as the
/// record message. Fields of the enclosing spans come first, each span as
/// a group named after it, outermost first.
pub struct HandlerLayer<H> {
    handler: H,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events the handler returned an error for.
    pub failed_events: Arc<AtomicU64>,
}

impl<H: Handler> HandlerLayer<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            total_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Fields recorded on a span so far.
struct SpanAttrs(Vec<Attr>);

impl<S, H> Layer<S> for HandlerLayer<H>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    H: Handler + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Vec::new();
        let mut message = None;
        attrs.record(&mut FieldVisitor { fields: &mut fields, message: &mut message });
        if let Some(message) = message {
            fields.push(Attr::string("message", message));
        }
        span.extensions_mut().insert(SpanAttrs(fields));
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(SpanAttrs(fields)) = extensions.get_mut::<SpanAttrs>() {
            let mut message = None;
            values.record(&mut FieldVisitor { fields, message: &mut message });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let level = Level::from(*event.metadata().level());
        if !self.handler.enabled(level) {
            return;
        }

        let mut attrs = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(SpanAttrs(fields)) = span.extensions().get::<SpanAttrs>() {
                    if !fields.is_empty() {
                        attrs.push(Attr::group(span.name(), fields.clone()));
                    }
                }
            }
        }

        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor { fields: &mut attrs, message: &mut message });

        let record = Record {
            timestamp: Utc::now(),
            level,
            message: message.unwrap_or_default(),
            attrs,
        };

        if let Err(e) = self.handler.handle(&record) {
            self.failed_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("error handling log record: {}", e);
        }
    }
}

/// Collects `tracing` fields as [`Attr`]s. A field recorded again replaces
/// the earlier value.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Vec<Attr>,
    pub message: &'a mut Option<String>,
}

impl FieldVisitor<'_> {
    fn put(&mut self, field: &Field, value: Value) {
        match self.fields.iter_mut().find(|a| a.key == field.name()) {
            Some(existing) => existing.value = value,
            None => self.fields.push(Attr::new(field.name(), value)),
        }
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.put(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::U64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.put(field, Value::String(format!("{:?}", value)));
        }
    }
}
