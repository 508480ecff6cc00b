//! Attribute codec: records go through a compact JSON transport encoding
//! into a scratch buffer, come back out as an ordered map, and are then
//! re-serialized in the display encoding.

use chrono::SecondsFormat;
use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::handler::HandleError;
use crate::record::{Attr, Level, Record, Value};

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const MESSAGE_KEY: &str = "msg";

/// Ordered key to value mapping the transport encoding decodes into.
pub type AttrMap = serde_json::Map<String, serde_json::Value>;

/// Display encoding of the attribute block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Pretty JSON, two-space indent.
    #[default]
    Json,
    /// Block-style YAML. Needs the `yaml` feature.
    Yaml,
}

impl Encoding {
    pub fn ensure_available(self) -> Result<(), ConfigError> {
        match self {
            Encoding::Json => Ok(()),
            Encoding::Yaml if cfg!(feature = "yaml") => Ok(()),
            Encoding::Yaml => Err(ConfigError::EncodingUnavailable(self)),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Json => "json",
            Encoding::Yaml => "yaml",
        })
    }
}

impl FromStr for Encoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Encoding::Json),
            "yaml" | "yml" => Ok(Encoding::Yaml),
            _ => Err(ConfigError::UnknownEncoding(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct GroupFrame {
    name: String,
    attrs: Vec<Attr>,
}

/// Attributes and groups bound to a handler through derivation.
///
/// Every derivation returns a new value; the receiver is left as it was.
/// Attributes bound after a group is opened, and all record attributes,
/// are nested under that group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    root: Vec<Attr>,
    groups: Vec<GroupFrame>,
}

impl Bindings {
    pub fn with_attrs(&self, attrs: impl IntoIterator<Item = Attr>) -> Bindings {
        let mut next = self.clone();
        match next.groups.last_mut() {
            Some(frame) => frame.attrs.extend(attrs),
            None => next.root.extend(attrs),
        }
        next
    }

    /// An empty name leaves the bindings as they are.
    pub fn with_group(&self, name: &str) -> Bindings {
        let mut next = self.clone();
        if !name.is_empty() {
            next.groups.push(GroupFrame {
                name: name.to_string(),
                attrs: Vec::new(),
            });
        }
        next
    }

    /// Open groups joined with `.`, empty at the root.
    pub fn group_prefix(&self) -> String {
        self.groups
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Every bound attribute, outermost first.
    pub fn attrs(&self) -> impl Iterator<Item = &Attr> {
        self.root
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.attrs.iter()))
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.groups.is_empty()
    }
}

/// Keys the encoder leaves out, at any nesting depth.
#[derive(Debug, Clone, Copy)]
struct KeyFilter(&'static [&'static str]);

impl KeyFilter {
    fn drops(self, key: &str) -> bool {
        self.0.contains(&key)
    }
}

/// Inner transport encoder: one compact JSON object per record, with the
/// level threshold the owning handler reports through `enabled`.
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    level: Level,
    suppressed: &'static [&'static str],
}

impl JsonEncoder {
    pub fn new(level: Level) -> Self {
        JsonEncoder { level, suppressed: &[] }
    }

    /// Leave `keys` out of the output, including the built-in `time`,
    /// `level` and `msg` fields when they are listed.
    pub fn suppressing(mut self, keys: &'static [&'static str]) -> Self {
        self.suppressed = keys;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Append the encoded record, newline-terminated, to `buf`.
    pub fn encode(
        &self,
        buf: &mut Vec<u8>,
        record: &Record,
        bindings: &Bindings,
    ) -> Result<(), HandleError> {
        let document = Document {
            filter: KeyFilter(self.suppressed),
            record,
            bindings,
        };
        serde_json::to_writer(&mut *buf, &document).map_err(HandleError::Encode)?;
        buf.push(b'\n');
        Ok(())
    }
}

/// Decode transport bytes back into an ordered map.
pub fn decode(bytes: &[u8]) -> Result<AttrMap, HandleError> {
    serde_json::from_slice(bytes).map_err(HandleError::Decode)
}

/// Render `attrs` in the display encoding. An empty map renders as an
/// empty string.
pub fn serialize(attrs: &AttrMap, encoding: Encoding) -> Result<String, HandleError> {
    if attrs.is_empty() {
        return Ok(String::new());
    }
    match encoding {
        Encoding::Json => serde_json::to_string_pretty(attrs).map_err(|e| HandleError::Serialize {
            encoding,
            source: Box::new(e),
        }),
        Encoding::Yaml => serialize_yaml(attrs),
    }
}

#[cfg(feature = "yaml")]
fn serialize_yaml(attrs: &AttrMap) -> Result<String, HandleError> {
    serde_yaml_ng::to_string(attrs)
        .map(|text| text.trim_end().to_string())
        .map_err(|e| HandleError::Serialize {
            encoding: Encoding::Yaml,
            source: Box::new(e),
        })
}

#[cfg(not(feature = "yaml"))]
fn serialize_yaml(_attrs: &AttrMap) -> Result<String, HandleError> {
    Err(HandleError::Serialize {
        encoding: Encoding::Yaml,
        source: Box::new(ConfigError::EncodingUnavailable(Encoding::Yaml)),
    })
}

struct Document<'a> {
    filter: KeyFilter,
    record: &'a Record,
    bindings: &'a Bindings,
}

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.filter.drops(TIME_KEY) {
            let time = self.record.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
            map.serialize_entry(TIME_KEY, &time)?;
        }
        if !self.filter.drops(LEVEL_KEY) {
            map.serialize_entry(LEVEL_KEY, self.record.level.as_str())?;
        }
        if !self.filter.drops(MESSAGE_KEY) {
            map.serialize_entry(MESSAGE_KEY, &self.record.message)?;
        }
        write_attrs(&mut map, &self.bindings.root, self.filter)?;
        write_scope(&mut map, &self.bindings.groups, &self.record.attrs, self.filter)?;
        map.end()
    }
}

/// The contents of an open group: its bound attributes, then the next
/// group or, innermost, the record's own attributes.
struct Scope<'a> {
    attrs: &'a [Attr],
    rest: &'a [GroupFrame],
    record: &'a [Attr],
    filter: KeyFilter,
}

impl Scope<'_> {
    fn is_empty(&self) -> bool {
        !any_visible(self.attrs, self.filter)
            && !any_visible(self.record, self.filter)
            && self.rest.iter().all(|g| !any_visible(&g.attrs, self.filter))
    }
}

impl Serialize for Scope<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        write_attrs(&mut map, self.attrs, self.filter)?;
        write_scope(&mut map, self.rest, self.record, self.filter)?;
        map.end()
    }
}

fn write_scope<M: SerializeMap>(
    map: &mut M,
    groups: &[GroupFrame],
    record: &[Attr],
    filter: KeyFilter,
) -> Result<(), M::Error> {
    let Some((frame, rest)) = groups.split_first() else {
        return write_attrs(map, record, filter);
    };
    let scope = Scope {
        attrs: &frame.attrs,
        rest,
        record,
        filter,
    };
    if scope.is_empty() {
        return Ok(());
    }
    map.serialize_entry(&frame.name, &scope)
}

fn write_attrs<M: SerializeMap>(
    map: &mut M,
    attrs: &[Attr],
    filter: KeyFilter,
) -> Result<(), M::Error> {
    for attr in attrs {
        if !is_visible(attr, filter) {
            continue;
        }
        match &attr.value {
            Value::Group(children) if attr.key.is_empty() => write_attrs(map, children, filter)?,
            value => map.serialize_entry(&attr.key, &Encoded { value, filter })?,
        }
    }
    Ok(())
}

fn any_visible(attrs: &[Attr], filter: KeyFilter) -> bool {
    attrs.iter().any(|a| is_visible(a, filter))
}

// Group keys are never filtered; an empty group is dropped.
fn is_visible(attr: &Attr, filter: KeyFilter) -> bool {
    match &attr.value {
        Value::Group(children) => any_visible(children, filter),
        _ => !filter.drops(&attr.key),
    }
}

struct Encoded<'a> {
    value: &'a Value,
    filter: KeyFilter,
}

impl Serialize for Encoded<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::F64(v) if !v.is_finite() => {
                Err(S::Error::custom(format!("unsupported float value: {v}")))
            }
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Duration(v) => {
                serializer.serialize_u64(u64::try_from(v.as_nanos()).unwrap_or(u64::MAX))
            }
            Value::Time(v) => serializer.serialize_str(&v.to_rfc3339_opts(SecondsFormat::Nanos, true)),
            Value::Group(children) => {
                let mut map = serializer.serialize_map(None)?;
                write_attrs(&mut map, children, self.filter)?;
                map.end()
            }
        }
    }
}
