//! Keystroke activity intake.
//!
//! Decides which raw key events count as one unit of experience and carries
//! the language label an admitted event is attributed to.

mod event;
mod filter;

pub use event::{KeyEvent, KeyEventKind, Language, NULL_GRAMMAR_NAME, PLAIN_TEXT_LANGUAGE};
pub use filter::{admits, normalize_keystrokes};
