//! Recoloring of numeric and keyword tokens inside rendered attribute text.
//!
//! Numbers are highlighted only when they stand alone: preceded by the start
//! of the text or whitespace, and followed by the end of the text or any
//! character that is neither a word character nor a hyphen. Percentages
//! (`100%`) and a `.` directly followed by a digit (`1.2.3`) also end the
//! match without a highlight. That keeps digits inside identifiers
//! (`abc123`), UUIDs, versions and percentages untouched.
//!
//! Keywords are matched as whole words, case-sensitively, on the visible text
//! only: the keyword pass skips over ANSI escape sequences, so a keyword can
//! never match inside the color codes inserted by the number pass.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::colors::{ColorCode, ColorRegistry};
use crate::config::ConfigError;

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(\d+(?:\.\d+)?)").expect("number pattern is valid"));

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("escape pattern is valid"));

/// Options a [`Highlighter`] is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlighterConfig {
    /// Enables number highlighting in this color.
    pub numbers_color: Option<ColorCode>,
    /// Keyword to color. Keywords are case-sensitive whole words.
    pub keyword_colors: BTreeMap<String, ColorCode>,
}

impl HighlighterConfig {
    pub fn numbers(mut self, color: ColorCode) -> Self {
        self.numbers_color = Some(color);
        self
    }

    pub fn keywords<K: Into<String>>(
        mut self,
        keywords: impl IntoIterator<Item = (K, ColorCode)>,
    ) -> Self {
        self.keyword_colors
            .extend(keywords.into_iter().map(|(k, c)| (k.into(), c)));
        self
    }

    /// `self` with `other` layered on top: a number color in `other` wins,
    /// keyword maps are unioned with `other` taking precedence.
    fn merged(&self, other: &HighlighterConfig) -> HighlighterConfig {
        let mut keyword_colors = self.keyword_colors.clone();
        keyword_colors.extend(other.keyword_colors.iter().map(|(k, c)| (k.clone(), *c)));
        HighlighterConfig {
            numbers_color: other.numbers_color.or(self.numbers_color),
            keyword_colors,
        }
    }
}

/// Immutable once built; reconfiguring goes through [`Highlighter::modify`],
/// which returns a new instance.
#[derive(Debug, Clone)]
pub struct Highlighter {
    registry: &'static ColorRegistry,
    config: HighlighterConfig,
    keywords: Option<Regex>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Highlighter {
            registry: ColorRegistry::global(),
            config: HighlighterConfig::default(),
            keywords: None,
        }
    }
}

impl Highlighter {
    /// Build a highlighter, compiling the keyword alternation once.
    ///
    /// Fails on an empty keyword, or if the combined pattern does not compile.
    pub fn new(config: HighlighterConfig) -> Result<Self, ConfigError> {
        let keywords = compile_keywords(&config.keyword_colors)?;
        Ok(Highlighter {
            registry: ColorRegistry::global(),
            config,
            keywords,
        })
    }

    /// Apply `overrides` on top of `base`, or build from scratch when there
    /// is no base. `base` is never changed.
    pub fn modify(
        base: Option<&Highlighter>,
        overrides: &HighlighterConfig,
    ) -> Result<Highlighter, ConfigError> {
        match base {
            None => Highlighter::new(overrides.clone()),
            Some(base) => Highlighter::new(base.config.merged(overrides)),
        }
    }

    pub fn config(&self) -> &HighlighterConfig {
        &self.config
    }

    pub fn is_noop(&self) -> bool {
        self.config.numbers_color.is_none() && self.keywords.is_none()
    }

    /// Numbers pass followed by the keywords pass.
    pub fn highlight(&self, text: &str) -> String {
        let numbered = self.highlight_numbers(text);
        self.highlight_keywords(&numbered).into_owned()
    }

    pub fn highlight_numbers<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let Some(color) = self.config.numbers_color else {
            return Cow::Borrowed(text);
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut changed = false;
        for caps in NUMBER_PATTERN.captures_iter(text) {
            let Some(number) = caps.get(1) else {
                continue;
            };
            if !ends_number(&text[number.end()..]) {
                continue;
            }
            out.push_str(&text[last..number.start()]);
            out.push_str(&self.registry.paint(color, number.as_str()));
            last = number.end();
            changed = true;
        }

        if !changed {
            return Cow::Borrowed(text);
        }
        out.push_str(&text[last..]);
        Cow::Owned(out)
    }

    pub fn highlight_keywords<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let Some(pattern) = &self.keywords else {
            return Cow::Borrowed(text);
        };
        if !pattern.is_match(text) {
            return Cow::Borrowed(text);
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for escape in ANSI_ESCAPE.find_iter(text) {
            out.push_str(&self.paint_keywords(pattern, &text[last..escape.start()]));
            out.push_str(escape.as_str());
            last = escape.end();
        }
        out.push_str(&self.paint_keywords(pattern, &text[last..]));
        Cow::Owned(out)
    }

    fn paint_keywords<'a>(&self, pattern: &Regex, segment: &'a str) -> Cow<'a, str> {
        pattern.replace_all(segment, |caps: &Captures| {
            let word = &caps[0];
            match self.config.keyword_colors.get(word) {
                Some(color) => self.registry.paint(*color, word),
                None => word.to_string(),
            }
        })
    }
}

fn ends_number(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_whitespace() => true,
        Some(c) if c.is_alphanumeric() || c == '_' || c == '-' || c == '%' => false,
        Some('.') => !chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => true,
    }
}

fn compile_keywords(
    keyword_colors: &BTreeMap<String, ColorCode>,
) -> Result<Option<Regex>, ConfigError> {
    if keyword_colors.is_empty() {
        return Ok(None);
    }

    let mut keywords: Vec<&str> = keyword_colors.keys().map(String::as_str).collect();
    if keywords.iter().any(|k| k.is_empty()) {
        return Err(ConfigError::EmptyKeyword);
    }
    // Longest first so that overlapping keywords prefer the longer match.
    keywords.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let alternation = keywords
        .iter()
        .map(|k| format!(r"\b{}\b", regex::escape(k)))
        .collect::<Vec<_>>()
        .join("|");
    Ok(Some(Regex::new(&alternation)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(text: &str) -> String {
        ANSI_ESCAPE.replace_all(text, "").into_owned()
    }

    fn numbers() -> Highlighter {
        colored::control::set_override(true);
        Highlighter::new(HighlighterConfig::default().numbers(ColorCode::Yellow)).unwrap()
    }

    fn yellow(text: &str) -> String {
        ColorRegistry::global().paint(ColorCode::Yellow, text)
    }

    #[test]
    fn noop_when_nothing_configured() {
        let h = Highlighter::default();
        assert!(h.is_noop());
        let text = "count 42 with error";
        assert!(matches!(h.highlight_numbers(text), Cow::Borrowed(_)));
        assert!(matches!(h.highlight_keywords(text), Cow::Borrowed(_)));
    }

    #[test]
    fn highlights_standalone_numbers() {
        let h = numbers();
        let out = h.highlight_numbers("count 42 of 7.5 items");
        assert_eq!(out, format!("count {} of {} items", yellow("42"), yellow("7.5")));
    }

    #[test]
    fn skips_numbers_inside_identifiers_and_uuids() {
        let h = numbers();
        for text in [
            "abc123",
            "id d72be13c-9a0a-4df9-8475-d0f4b0701248",
            "\"d72be13c-9a0a-4df9-8475-d0f4b0701248\"",
            "load 100%",
            "version 1.2.3",
            "range 10-20",
        ] {
            assert_eq!(h.highlight_numbers(text), text, "{text}");
        }
    }

    #[test]
    fn highlights_json_and_yaml_values() {
        let h = numbers();
        let json = "{\n  \"code\": 200,\n  \"ratio\": 0.5\n}";
        let out = h.highlight_numbers(json);
        assert!(out.contains(&format!("\"code\": {},", yellow("200"))));
        assert!(out.contains(&format!("\"ratio\": {}\n", yellow("0.5"))));

        let yaml = "code: 200\nitems:\n- 1\n- 2\n";
        let out = h.highlight_numbers(yaml);
        assert_eq!(strip(&out), yaml);
        assert_eq!(out.matches("\x1b[33m").count(), 3);
    }

    #[test]
    fn numbers_at_the_end_of_quoted_strings() {
        let h = numbers();
        let json = "{\n  \"status\": \"retry in 5\",\n  \"note\": \"done 3.\"\n}";
        let out = h.highlight_numbers(json);
        assert!(out.contains(&format!("\"retry in {}\",", yellow("5"))), "{out}");
        assert!(out.contains(&format!("\"done {}.\"", yellow("3"))), "{out}");

        let out = h.highlight_numbers("wait 5: 'try 2'");
        assert_eq!(out, format!("wait {}: 'try {}'", yellow("5"), yellow("2")));
    }

    #[test]
    fn adjacent_numbers_are_all_highlighted() {
        let h = numbers();
        let out = h.highlight_numbers("1 2 3");
        assert_eq!(out, format!("{} {} {}", yellow("1"), yellow("2"), yellow("3")));
    }

    #[test]
    fn highlights_whole_keywords_only() {
        colored::control::set_override(true);
        let h = Highlighter::new(
            HighlighterConfig::default().keywords([("error", ColorCode::Red)]),
        )
        .unwrap();
        let out = h.highlight_keywords("an error occurred, errors=2");
        let red = ColorRegistry::global().paint(ColorCode::Red, "error");
        assert_eq!(out, format!("an {red} occurred, errors=2"));
    }

    #[test]
    fn keywords_are_case_sensitive_and_escaped() {
        colored::control::set_override(true);
        let h = Highlighter::new(
            HighlighterConfig::default()
                .keywords([("a.b", ColorCode::Green), ("Warn", ColorCode::Yellow)]),
        )
        .unwrap();
        assert_eq!(h.highlight_keywords("axb warn"), "axb warn");
        let out = h.highlight_keywords("a.b Warn");
        assert_eq!(strip(&out), "a.b Warn");
        assert_eq!(out.matches("\x1b[").count(), 4);
    }

    #[test]
    fn keywords_never_match_inside_escapes() {
        colored::control::set_override(true);
        let h = Highlighter::new(
            HighlighterConfig::default()
                .numbers(ColorCode::Yellow)
                .keywords([("0m", ColorCode::Red), ("33m", ColorCode::Red)]),
        )
        .unwrap();
        let out = h.highlight("took 5 ms");
        assert_eq!(out, format!("took {} ms", yellow("5")));
    }

    #[test]
    fn empty_keyword_is_rejected() {
        let err = Highlighter::new(HighlighterConfig::default().keywords([("", ColorCode::Red)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyKeyword));
    }

    #[test]
    fn modify_returns_new_instance() {
        let base = Highlighter::new(
            HighlighterConfig::default().keywords([("error", ColorCode::Red)]),
        )
        .unwrap();
        let modified = Highlighter::modify(
            Some(&base),
            &HighlighterConfig::default()
                .numbers(ColorCode::Cyan)
                .keywords([("ok", ColorCode::Green)]),
        )
        .unwrap();

        assert_eq!(base.config().numbers_color, None);
        assert_eq!(base.config().keyword_colors.len(), 1);
        assert_eq!(modified.config().numbers_color, Some(ColorCode::Cyan));
        assert_eq!(modified.config().keyword_colors.len(), 2);

        let fresh = Highlighter::modify(None, &HighlighterConfig::default().numbers(ColorCode::Red))
            .unwrap();
        assert_eq!(fresh.config().numbers_color, Some(ColorCode::Red));
    }
}
