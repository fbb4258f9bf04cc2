// SPDX-License-Identifier: MIT
//
// Vim-style key notation.
//
// Parses strings such as `"d2w"`, `"ihello<Esc>"` or `"<C-r><S-Left>"`
// into key events, and formats key events back into the same notation.
//
// Grammar:
//
// - any character outside `<...>` is a plain key press;
// - `<Name>` is a named key (`Esc`, `CR`, `Enter`, `Tab`, `BS`, `Del`,
//   `Up`, `Down`, `Left`, `Right`, `Home`, `End`, `PageUp`, `PageDown`,
//   `Insert`, `Space`, `lt`, `F1`..`F12`);
// - modifier prefixes `C-`, `S-`, `A-`/`M-`, `D-` may be stacked inside
//   the brackets: `<C-S-Left>`;
// - a lone `<` with no closing `>` is a literal `<`.

use std::fmt;

use thiserror::Error;

use crate::event::{KeyCode, KeyEvent, Modifiers};

/// Failure to parse a key notation string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("unknown key name <{0}>")]
    UnknownKey(String),
    #[error("empty key name <>")]
    Empty,
}

/// Parse a key notation string into a sequence of key events.
///
/// # Errors
///
/// Returns an error for unknown `<Name>` tokens.
pub fn parse_keys(input: &str) -> Result<Vec<KeyEvent>, NotationError> {
    let mut out = Vec::new();
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(close) = rest[1..].find('>') {
                let name = &rest[1..=close];
                // `<>` with nothing inside, or whitespace inside, is literal
                // text rather than a key name.
                if name.is_empty() {
                    return Err(NotationError::Empty);
                }
                if !name.contains(char::is_whitespace) {
                    out.push(parse_bracketed(name)?);
                    rest = &rest[close + 2..];
                    continue;
                }
            }
        }
        out.push(KeyEvent::char(ch));
        rest = &rest[ch.len_utf8()..];
    }

    Ok(out)
}

/// Parse the inside of a `<...>` token.
fn parse_bracketed(token: &str) -> Result<KeyEvent, NotationError> {
    let mut modifiers = Modifiers::empty();
    let mut name = token;

    // Modifier prefixes are single letters followed by '-'. The final
    // segment is the key itself, which may itself be '-' (as in `<C-->`).
    while name.len() > 2 && name.as_bytes()[1] == b'-' {
        let flag = match name.as_bytes()[0].to_ascii_uppercase() {
            b'C' => Modifiers::CTRL,
            b'S' => Modifiers::SHIFT,
            b'A' | b'M' => Modifiers::ALT,
            b'D' => Modifiers::SUPER,
            _ => break,
        };
        modifiers |= flag;
        name = &name[2..];
    }

    let code = match name.to_ascii_lowercase().as_str() {
        "esc" | "escape" => KeyCode::Escape,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "bs" | "backspace" => KeyCode::Backspace,
        "del" | "delete" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "space" => KeyCode::Char(' '),
        "lt" => KeyCode::Char('<'),
        "bar" => KeyCode::Char('|'),
        lower => {
            if let Some(n) = lower.strip_prefix('f').and_then(|d| d.parse::<u8>().ok()) {
                if (1..=12).contains(&n) {
                    KeyCode::F(n)
                } else {
                    return Err(NotationError::UnknownKey(token.to_string()));
                }
            } else {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    // Single char with modifiers: `<C-r>`. Ctrl chords are
                    // normalized to lowercase so `<C-R>` == `<C-r>`.
                    (Some(ch), None) if modifiers.contains(Modifiers::CTRL) => {
                        KeyCode::Char(ch.to_ascii_lowercase())
                    }
                    (Some(ch), None) => KeyCode::Char(ch),
                    _ => return Err(NotationError::UnknownKey(token.to_string())),
                }
            }
        }
    };

    Ok(KeyEvent::with(code, modifiers))
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named = match self.code {
            KeyCode::Char('<') => Some("lt".to_string()),
            KeyCode::Char(' ') if !self.modifiers.is_empty() => Some("Space".to_string()),
            KeyCode::Char(ch) if self.modifiers.is_empty() => {
                return write!(f, "{ch}");
            }
            KeyCode::Char(ch) => Some(ch.to_string()),
            KeyCode::Enter => Some("CR".to_string()),
            KeyCode::Tab => Some("Tab".to_string()),
            KeyCode::Backspace => Some("BS".to_string()),
            KeyCode::Escape => Some("Esc".to_string()),
            KeyCode::Delete => Some("Del".to_string()),
            KeyCode::Insert => Some("Insert".to_string()),
            KeyCode::Up => Some("Up".to_string()),
            KeyCode::Down => Some("Down".to_string()),
            KeyCode::Left => Some("Left".to_string()),
            KeyCode::Right => Some("Right".to_string()),
            KeyCode::Home => Some("Home".to_string()),
            KeyCode::End => Some("End".to_string()),
            KeyCode::PageUp => Some("PageUp".to_string()),
            KeyCode::PageDown => Some("PageDown".to_string()),
            KeyCode::F(n) => Some(format!("F{n}")),
        };
        let name = named.unwrap_or_default();

        f.write_str("<")?;
        if self.modifiers.contains(Modifiers::CTRL) {
            f.write_str("C-")?;
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            f.write_str("S-")?;
        }
        if self.modifiers.contains(Modifiers::ALT) {
            f.write_str("A-")?;
        }
        if self.modifiers.contains(Modifiers::SUPER) {
            f.write_str("D-")?;
        }
        write!(f, "{name}>")
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(s: &str) -> Vec<KeyEvent> {
        parse_keys(s).unwrap()
    }

    // ── Plain characters ──────────────────────────────────────────────────

    #[test]
    fn plain_chars() {
        assert_eq!(
            keys("dw"),
            vec![KeyEvent::char('d'), KeyEvent::char('w')]
        );
    }

    #[test]
    fn unicode_chars() {
        assert_eq!(keys("é中"), vec![KeyEvent::char('é'), KeyEvent::char('中')]);
    }

    #[test]
    fn empty_input() {
        assert!(keys("").is_empty());
    }

    // ── Named keys ────────────────────────────────────────────────────────

    #[test]
    fn escape_and_enter() {
        assert_eq!(
            keys("ihi<Esc><CR>"),
            vec![
                KeyEvent::char('i'),
                KeyEvent::char('h'),
                KeyEvent::char('i'),
                KeyEvent::new(KeyCode::Escape),
                KeyEvent::new(KeyCode::Enter),
            ]
        );
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(keys("<ESC>"), vec![KeyEvent::new(KeyCode::Escape)]);
        assert_eq!(keys("<bs>"), vec![KeyEvent::new(KeyCode::Backspace)]);
    }

    #[test]
    fn function_keys() {
        assert_eq!(keys("<F5>"), vec![KeyEvent::new(KeyCode::F(5))]);
        assert!(parse_keys("<F13>").is_err());
    }

    #[test]
    fn lt_is_literal_less_than() {
        assert_eq!(keys("<lt>"), vec![KeyEvent::char('<')]);
    }

    #[test]
    fn unclosed_bracket_is_literal() {
        assert_eq!(keys("<<"), vec![KeyEvent::char('<'), KeyEvent::char('<')]);
    }

    #[test]
    fn bracket_with_space_is_literal() {
        assert_eq!(keys("<a b>").len(), 5);
    }

    #[test]
    fn unknown_name_errors() {
        assert_eq!(
            parse_keys("<Nope>"),
            Err(NotationError::UnknownKey("Nope".to_string()))
        );
    }

    // ── Modifiers ─────────────────────────────────────────────────────────

    #[test]
    fn ctrl_char() {
        assert_eq!(keys("<C-r>"), vec![KeyEvent::ctrl('r')]);
        assert_eq!(keys("<C-R>"), vec![KeyEvent::ctrl('r')]);
    }

    #[test]
    fn stacked_modifiers() {
        assert_eq!(
            keys("<C-S-Left>"),
            vec![KeyEvent::with(
                KeyCode::Left,
                Modifiers::CTRL | Modifiers::SHIFT
            )]
        );
    }

    #[test]
    fn shift_arrow() {
        assert_eq!(
            keys("<S-Right>"),
            vec![KeyEvent::with(KeyCode::Right, Modifiers::SHIFT)]
        );
    }

    // ── Display ───────────────────────────────────────────────────────────

    #[test]
    fn display_round_trips_common_keys() {
        for s in ["x", "<Esc>", "<C-r>", "<S-Left>", "<CR>", "<lt>", "<F3>"] {
            let parsed = keys(s);
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].to_string(), s);
        }
    }
}
