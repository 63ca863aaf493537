//! Crossterm key events → canonical chords.

use axnote_core::{Key, KeyChord};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Encode a key press as a chord.
///
/// Presses that carry no key token produce no chord: bare modifiers,
/// navigation keys, and function keys all fall through to default input
/// handling, so pressing or releasing a modifier can never fire an action.
/// For shifted punctuation the character already carries the shift (`?`,
/// `{`), so the flag is kept only on alphabetic keys and the space bar;
/// chords read `shift v`, never `shift ?`.
pub fn chord_for(key: &KeyEvent) -> Option<KeyChord> {
    let token = match key.code {
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c.to_ascii_lowercase()),
        _ => return None,
    };
    let mut shift = key.modifiers.contains(KeyModifiers::SHIFT);
    if let KeyCode::Char(c) = key.code {
        if c != ' ' && !c.is_ascii_alphabetic() {
            shift = false;
        }
    }
    Some(KeyChord {
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
        shift,
        key: token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState, ModifierKeyCode};

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn encodes_modifiers_in_canonical_order() {
        let chord = chord_for(&press(
            KeyCode::Char('v'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT,
        ))
        .unwrap();
        assert_eq!(chord.to_string(), "control shift v");
    }

    #[test]
    fn uppercase_characters_lowercase_and_keep_shift() {
        let chord = chord_for(&press(KeyCode::Char('V'), KeyModifiers::SHIFT)).unwrap();
        assert_eq!(chord.to_string(), "shift v");
    }

    #[test]
    fn shifted_punctuation_drops_the_flag() {
        let chord = chord_for(&press(KeyCode::Char('?'), KeyModifiers::SHIFT)).unwrap();
        assert_eq!(chord.to_string(), "?");
    }

    #[test]
    fn named_keys_encode_as_words() {
        assert_eq!(
            chord_for(&press(KeyCode::Enter, KeyModifiers::CONTROL))
                .unwrap()
                .to_string(),
            "control enter"
        );
        assert_eq!(
            chord_for(&press(KeyCode::Char(' '), KeyModifiers::CONTROL))
                .unwrap()
                .to_string(),
            "control space"
        );
        assert_eq!(
            chord_for(&press(KeyCode::Esc, KeyModifiers::NONE))
                .unwrap()
                .to_string(),
            "escape"
        );
    }

    #[test]
    fn bare_modifiers_and_navigation_keys_produce_no_chord() {
        assert!(
            chord_for(&press(
                KeyCode::Modifier(ModifierKeyCode::LeftControl),
                KeyModifiers::CONTROL
            ))
            .is_none()
        );
        assert!(chord_for(&press(KeyCode::Up, KeyModifiers::NONE)).is_none());
        assert!(chord_for(&press(KeyCode::Tab, KeyModifiers::NONE)).is_none());
    }
}
