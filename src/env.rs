//! Environment variables recognized when configuring a handler from the
//! environment of a service.
//!
//! These are purely helpers; handlers themselves never read the environment.

use std::collections::BTreeMap;

use crate::colors::ColorCode;
use crate::config::{ConfigError, HandlerConfig};

/// Minimum enabled level: `debug`, `info`, `warn` or `error`.
pub const PRETTY_LOG_LEVEL_ENV: &str = "PRETTY_LOG_LEVEL";

/// Attribute block encoding: `json` or `yaml`.
pub const PRETTY_LOG_ENCODING_ENV: &str = "PRETTY_LOG_ENCODING";

/// Color for number highlighting, e.g. `yellow`.
pub const PRETTY_LOG_NUMBERS_COLOR_ENV: &str = "PRETTY_LOG_NUMBERS_COLOR";

/// Keywords to highlight, e.g. `error=red,ok=green`.
pub const PRETTY_LOG_KEYWORDS_ENV: &str = "PRETTY_LOG_KEYWORDS";

/// Placement of the reserved metadata attributes: `inline`, `header` or `hidden`.
pub const PRETTY_LOG_METADATA_ENV: &str = "PRETTY_LOG_METADATA";

/// One configuration field populated from one variable.
pub struct EnvField<W> {
    pub field: &'static str,
    pub key: &'static str,
    pub apply: fn(&mut HandlerConfig<W>, &str) -> Result<(), ConfigError>,
}

/// Every field that can come from the environment, in the order they are
/// applied.
pub fn schema<W>() -> [EnvField<W>; 5] {
    [
        EnvField {
            field: "level",
            key: PRETTY_LOG_LEVEL_ENV,
            apply: |config, raw| {
                config.level = raw.parse()?;
                Ok(())
            },
        },
        EnvField {
            field: "encoding",
            key: PRETTY_LOG_ENCODING_ENV,
            apply: |config, raw| {
                config.encoding = raw.parse()?;
                Ok(())
            },
        },
        EnvField {
            field: "numbers_color",
            key: PRETTY_LOG_NUMBERS_COLOR_ENV,
            apply: |config, raw| {
                config.numbers_color = Some(raw.parse()?);
                Ok(())
            },
        },
        EnvField {
            field: "keyword_colors",
            key: PRETTY_LOG_KEYWORDS_ENV,
            apply: |config, raw| {
                config.keyword_colors = parse_keywords(raw)?;
                Ok(())
            },
        },
        EnvField {
            field: "metadata",
            key: PRETTY_LOG_METADATA_ENV,
            apply: |config, raw| {
                config.metadata = raw.parse()?;
                Ok(())
            },
        },
    ]
}

/// Parse `word=color,word=color`. Blank entries are skipped.
pub fn parse_keywords(raw: &str) -> Result<BTreeMap<String, ColorCode>, ConfigError> {
    let mut keywords = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((word, color)) = entry.split_once('=') else {
            return Err(ConfigError::InvalidEnv {
                key: PRETTY_LOG_KEYWORDS_ENV,
                value: entry.to_string(),
                reason: "expected word=color".to_string(),
            });
        };
        keywords.insert(word.trim().to_string(), color.parse()?);
    }
    Ok(keywords)
}

impl<W> HandlerConfig<W> {
    /// Override fields from variables found through `lookup`. Unset or
    /// blank variables leave the field as it is.
    pub fn apply_env_with(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        for field in schema::<W>() {
            let Some(raw) = lookup(field.key) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }
            (field.apply)(&mut self, &raw)?;
        }
        Ok(self)
    }

    /// [`apply_env_with`](Self::apply_env_with) over the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }
}
