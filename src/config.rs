use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Stdout};
use std::str::FromStr;

use crate::codec::Encoding;
use crate::colors::ColorCode;
use crate::highlight::{Highlighter, HighlighterConfig};
use crate::record::Level;

/// Error returned when a handler cannot be constructed from its configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("keyword to highlight must not be empty")]
    EmptyKeyword,

    #[error("invalid keyword pattern: {0}")]
    KeywordPattern(#[from] regex::Error),

    #[error("unknown color: {0:?}")]
    UnknownColor(String),

    #[error("unknown level: {0:?}")]
    UnknownLevel(String),

    #[error("unknown encoding: {0:?}")]
    UnknownEncoding(String),

    #[error("unknown metadata mode: {0:?}")]
    UnknownMetadataMode(String),

    #[error("{0} encoding is not available, enable the `{0}` feature")]
    EncodingUnavailable(Encoding),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where the reserved metadata attributes (`err`, `operation`, `took`,
/// `user_id`, `app_id`) end up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataMode {
    /// Rendered with every other attribute in the attribute block.
    Inline,
    /// Appended to the header line as `key=value` pairs.
    #[default]
    Header,
    /// Not rendered at all.
    Hidden,
}

impl fmt::Display for MetadataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetadataMode::Inline => "inline",
            MetadataMode::Header => "header",
            MetadataMode::Hidden => "hidden",
        })
    }
}

impl FromStr for MetadataMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(MetadataMode::Inline),
            "header" => Ok(MetadataMode::Header),
            "hidden" => Ok(MetadataMode::Hidden),
            _ => Err(ConfigError::UnknownMetadataMode(s.to_string())),
        }
    }
}

/// Handler configuration.
///
/// **Fields**
/// - `writer`: sink the composed lines go to, as a
///   [`tracing_subscriber::fmt::MakeWriter`]. Defaults to stdout.
/// - `level`: minimum enabled level. Defaults to `Debug`.
/// - `encoding`: display encoding of the attribute block. Defaults to JSON.
/// - `numbers_color`: enables number highlighting in that color.
/// - `keyword_colors`: enables keyword highlighting when non-empty.
/// - `metadata`: placement of the reserved metadata attributes. Defaults
///   to the header line.
#[derive(Clone, Debug)]
pub struct HandlerConfig<W = fn() -> Stdout> {
    pub writer: W,
    pub level: Level,
    pub encoding: Encoding,
    pub numbers_color: Option<ColorCode>,
    pub keyword_colors: BTreeMap<String, ColorCode>,
    pub metadata: MetadataMode,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            writer: io::stdout,
            level: Level::Debug,
            encoding: Encoding::Json,
            numbers_color: None,
            keyword_colors: BTreeMap::new(),
            metadata: MetadataMode::Header,
        }
    }
}

impl<W> HandlerConfig<W> {
    /// Same configuration writing to another sink.
    pub fn with_writer<W2>(self, writer: W2) -> HandlerConfig<W2> {
        HandlerConfig {
            writer,
            level: self.level,
            encoding: self.encoding,
            numbers_color: self.numbers_color,
            keyword_colors: self.keyword_colors,
            metadata: self.metadata,
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn numbers_color(mut self, color: ColorCode) -> Self {
        self.numbers_color = Some(color);
        self
    }

    pub fn keyword_color(mut self, keyword: impl Into<String>, color: ColorCode) -> Self {
        self.keyword_colors.insert(keyword.into(), color);
        self
    }

    pub fn metadata(mut self, metadata: MetadataMode) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn highlighter_config(&self) -> HighlighterConfig {
        HighlighterConfig {
            numbers_color: self.numbers_color,
            keyword_colors: self.keyword_colors.clone(),
        }
    }

    /// Check everything that can be checked before any record is handled and
    /// build the highlighter the handler will share.
    pub fn validate(&self) -> Result<Highlighter, ConfigError> {
        self.encoding.ensure_available()?;
        Highlighter::modify(None, &self.highlighter_config())
    }
}
