use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grammar name editors report for buffers without a grammar.
pub const NULL_GRAMMAR_NAME: &str = "Null Grammar";
pub const PLAIN_TEXT_LANGUAGE: &str = "Plain text";

/// Deserialized through [`FromStr`], so hosts may use any of its spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum KeyEventKind {
    KeyDown,
    KeyUp,
}

impl KeyEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
        }
    }
}

impl fmt::Display for KeyEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KeyEventKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keydown" | "key-down" | "key_down" | "press" => Ok(Self::KeyDown),
            "keyup" | "key-up" | "key_up" | "release" => Ok(Self::KeyUp),
            _ => Err(format!("unsupported key event kind: {value}")),
        }
    }
}

impl TryFrom<String> for KeyEventKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A raw key event as reported by the host editor.
///
/// `keystrokes` is the host's textual description of the keys involved, such
/// as `a`, `shift-A`, `space` or `ctrl-s`. Release events may carry a leading
/// `^` marker, which the filter strips before matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub keystrokes: String,
}

impl KeyEvent {
    pub fn new(kind: KeyEventKind, keystrokes: impl Into<String>) -> Self {
        Self {
            kind,
            keystrokes: keystrokes.into(),
        }
    }

    pub fn key_up(keystrokes: impl Into<String>) -> Self {
        Self::new(KeyEventKind::KeyUp, keystrokes)
    }

    pub fn key_down(keystrokes: impl Into<String>) -> Self {
        Self::new(KeyEventKind::KeyDown, keystrokes)
    }
}

/// Category label that experience is accumulated under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Maps an editor grammar name to a language label. Buffers without a
    /// grammar are counted as plain text.
    pub fn from_grammar_name(name: &str) -> Self {
        if name == NULL_GRAMMAR_NAME {
            return Self::plain_text();
        }
        Self(name.to_string())
    }

    pub fn plain_text() -> Self {
        Self(PLAIN_TEXT_LANGUAGE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Self(value)
    }
}
