//! Which key events count as typing.
//!
//! Only release events are considered so a press/release pair is counted
//! once. Modifier chords and navigation keys never count.

use super::event::{KeyEvent, KeyEventKind};

const RELEASE_MARKER: char = '^';
const SHIFT_PREFIX: &str = "shift-";
const NAMED_KEYS: &[&str] = &["space", "backspace", "enter", "tab", "delete"];

/// Strips the release marker hosts prepend to key-up keystrokes.
pub fn normalize_keystrokes(keystrokes: &str) -> &str {
    keystrokes.strip_prefix(RELEASE_MARKER).unwrap_or(keystrokes)
}

/// Returns true if `event` is worth one unit of experience.
///
/// The `^` marker is optional: an unmarked `a` counts the same as `^a`.
pub fn admits(event: &KeyEvent) -> bool {
    if event.kind != KeyEventKind::KeyUp {
        return false;
    }

    let keystrokes = normalize_keystrokes(&event.keystrokes);
    if is_single_char(keystrokes) {
        return true;
    }
    if let Some(shifted) = keystrokes.strip_prefix(SHIFT_PREFIX) {
        if is_single_char(shifted) {
            return true;
        }
    }
    NAMED_KEYS.contains(&keystrokes)
}

fn is_single_char(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some() && chars.next().is_none()
}
