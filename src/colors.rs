use colored::{ColoredString, Colorize};
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Closed set of colors available to the header and the highlighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorCode {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl ColorCode {
    pub const ALL: [ColorCode; 7] = [
        ColorCode::Red,
        ColorCode::Green,
        ColorCode::Yellow,
        ColorCode::Blue,
        ColorCode::Magenta,
        ColorCode::Cyan,
        ColorCode::White,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorCode::Red => "red",
            ColorCode::Green => "green",
            ColorCode::Yellow => "yellow",
            ColorCode::Blue => "blue",
            ColorCode::Magenta => "magenta",
            ColorCode::Cyan => "cyan",
            ColorCode::White => "white",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorCode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ColorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownColor(s.to_string()))
    }
}

/// Function that wraps text in a terminal color.
pub type Colorizer = fn(&str) -> ColoredString;

/// Immutable table from [`ColorCode`] to its [`Colorizer`].
///
/// Built once on first use and shared by reference for the rest of the
/// process. Whether escapes are actually emitted follows the `colored`
/// crate's global policy (`NO_COLOR`, `CLICOLOR_FORCE`, tty detection).
pub struct ColorRegistry {
    table: [Colorizer; 7],
}

static REGISTRY: Lazy<ColorRegistry> = Lazy::new(|| ColorRegistry {
    // Indexed by `ColorCode as usize`.
    table: [
        |text: &str| text.red(),
        |text: &str| text.green(),
        |text: &str| text.yellow(),
        |text: &str| text.blue(),
        |text: &str| text.magenta(),
        |text: &str| text.cyan(),
        |text: &str| text.white(),
    ],
});

impl ColorRegistry {
    pub fn global() -> &'static ColorRegistry {
        &REGISTRY
    }

    pub fn resolve(&self, code: ColorCode) -> Colorizer {
        self.table[code.index()]
    }

    pub fn paint(&self, code: ColorCode, text: &str) -> String {
        self.resolve(code)(text).to_string()
    }
}

impl fmt::Debug for ColorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorRegistry").finish_non_exhaustive()
    }
}
