//! Delimiter sniffing.
//!
//! Candidates are tried in a fixed order (pipe, tab, comma, semicolon). A
//! candidate wins when the sample starts with one or more non-newline
//! characters followed by it, i.e. it occurs somewhere on the first line.
//! This assumes the header line contains no other candidate character ahead
//! of the real delimiter; nothing guards against that case.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

/// One of the supported field separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Delimiter {
    Pipe,
    Tab,
    #[default]
    Comma,
    Semicolon,
}

impl Delimiter {
    /// All supported delimiters, in detection priority order.
    pub const SUPPORTED: [Delimiter; 4] = [
        Delimiter::Pipe,
        Delimiter::Tab,
        Delimiter::Comma,
        Delimiter::Semicolon,
    ];

    pub fn as_char(self) -> char {
        match self {
            Delimiter::Pipe => '|',
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
        }
    }

    /// The delimiter as a single byte, for the tokenizer.
    pub fn as_byte(self) -> u8 {
        self.as_char() as u8
    }

    /// Looks up a supported delimiter by character.
    pub fn from_char(c: char) -> Option<Self> {
        Self::SUPPORTED.into_iter().find(|d| d.as_char() == c)
    }

    fn first_line_pattern(self) -> &'static Regex {
        static PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
            Delimiter::SUPPORTED.map(|d| {
                let pattern = format!(r"^[^\n\r]+{}", regex::escape(&d.as_char().to_string()));
                Regex::new(&pattern).expect("delimiter pattern is valid")
            })
        });
        let idx = Self::SUPPORTED
            .iter()
            .position(|d| *d == self)
            .unwrap_or_default();
        &PATTERNS[idx]
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Tab => f.write_str("\\t"),
            other => write!(f, "{}", other.as_char()),
        }
    }
}

impl Serialize for Delimiter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

/// Picks the delimiter for a content sample. Never fails; defaults to comma.
pub fn guess_delimiter(content: &str) -> Delimiter {
    Delimiter::SUPPORTED
        .into_iter()
        .find(|d| d.first_line_pattern().is_match(content))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert_eq!(guess_delimiter("a|b,c"), Delimiter::Pipe);
        assert_eq!(guess_delimiter("a,b;c"), Delimiter::Comma);
        assert_eq!(guess_delimiter("a;b\tc"), Delimiter::Tab);
    }

    #[test]
    fn test_single_delimiters() {
        assert_eq!(guess_delimiter("name\tvalue\nx\t1"), Delimiter::Tab);
        assert_eq!(guess_delimiter("name;value\nx;1"), Delimiter::Semicolon);
        assert_eq!(guess_delimiter("name|value\nx|1"), Delimiter::Pipe);
    }

    #[test]
    fn test_defaults_to_comma() {
        assert_eq!(guess_delimiter(""), Delimiter::Comma);
        assert_eq!(guess_delimiter("name"), Delimiter::Comma);
        assert_eq!(guess_delimiter("name\nfoo;bar"), Delimiter::Comma);
    }

    #[test]
    fn test_delimiter_must_follow_a_character() {
        // a leading delimiter has nothing in front of it on the line
        assert_eq!(guess_delimiter(";a"), Delimiter::Comma);
        assert_eq!(guess_delimiter("\r\na;b"), Delimiter::Comma);
    }

    #[test]
    fn test_from_char_and_display() {
        assert_eq!(Delimiter::from_char('\t'), Some(Delimiter::Tab));
        assert_eq!(Delimiter::from_char(':'), None);
        assert_eq!(Delimiter::Tab.to_string(), "\\t");
        assert_eq!(Delimiter::Pipe.to_string(), "|");
        assert_eq!(serde_json::to_string(&Delimiter::Semicolon).unwrap(), "\";\"");
    }
}
