//! Ex commands: the `:` line.
//!
//! [`CommandLine`] is the text being typed (with its own cursor);
//! [`parse_command`] turns a finished line into a [`Command`] for the
//! editor to carry out.
//!
//! | Command          | Action                                     |
//! |------------------|--------------------------------------------|
//! | `:w [path]`      | Save (optionally to a new path)            |
//! | `:q` / `:q!`     | Quit (refused if dirty) / force quit       |
//! | `:wq` / `:x`     | Save and quit / save if modified and quit  |
//! | `:e path`        | Open a file in the active window           |
//! | `:sp` / `:vsp`   | Split the active window                    |
//! | `:close`         | Close the active window                    |
//! | `:tabnew [path]` | Open a new tab                             |
//! | `:tabn` / `:tabp`| Next / previous tab                        |
//! | `:bn` / `:bp`    | Next / previous buffer in the window       |
//! | `:bd`            | Remove the window's buffer                 |
//! | `:N`             | Go to line N                               |
//! | `:mode name`     | Switch the global mode                     |
//! | `:reg`           | List registers                             |
//! | `:set ...`       | Change options, see [`options`](crate::options) |

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Write(Option<PathBuf>),
    Quit,
    ForceQuit,
    WriteQuit,
    ExitSave,
    Edit(PathBuf),
    Split,
    VSplit,
    Close,
    TabNew(Option<PathBuf>),
    TabNext,
    TabPrev,
    BufferNext,
    BufferPrev,
    BufferDelete,
    /// 0-indexed target line.
    Goto(usize),
    Mode(String),
    Registers,
    Set(String),
    /// Full input, for the error message.
    Unknown(String),
}

/// Parse a command line (without the leading `:`).
#[must_use]
pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<usize>() {
        return Command::Goto(n.saturating_sub(1));
    }

    let (cmd, arg) = trimmed
        .find(char::is_whitespace)
        .map_or((trimmed, ""), |pos| (&trimmed[..pos], trimmed[pos..].trim_start()));
    let path = || (!arg.is_empty()).then(|| PathBuf::from(arg));

    match cmd {
        "w" | "write" => Command::Write(path()),
        "q" | "quit" => Command::Quit,
        "q!" | "quit!" => Command::ForceQuit,
        "wq" => Command::WriteQuit,
        "x" | "xit" => Command::ExitSave,
        "e" | "edit" if !arg.is_empty() => Command::Edit(PathBuf::from(arg)),
        "sp" | "split" => Command::Split,
        "vs" | "vsp" | "vsplit" => Command::VSplit,
        "clo" | "close" => Command::Close,
        "tabnew" | "tabe" | "tabedit" => Command::TabNew(path()),
        "tabn" | "tabnext" => Command::TabNext,
        "tabp" | "tabprevious" | "tabN" => Command::TabPrev,
        "bn" | "bnext" => Command::BufferNext,
        "bp" | "bprevious" | "bN" => Command::BufferPrev,
        "bd" | "bdelete" => Command::BufferDelete,
        "mode" if !arg.is_empty() => Command::Mode(arg.to_string()),
        "reg" | "registers" | "di" | "display" => Command::Registers,
        "se" | "set" => Command::Set(arg.to_string()),
        _ => Command::Unknown(trimmed.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CommandLine
// ---------------------------------------------------------------------------

/// The `:` input being typed.
#[derive(Debug, Clone, Default)]
pub struct CommandLine {
    input: String,
    /// Char offset within `input`.
    cursor: usize,
}

impl CommandLine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            input: String::new(),
            cursor: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.input.insert(at, ch);
        self.cursor += 1;
    }

    /// Delete before the cursor. Returns false at the start.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.input.chars().count() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
        true
    }

    pub const fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Take the text, leaving the line empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.input)
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map_or(self.input.len(), |(i, _)| i)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Parsing ------------------------------------------------------------

    #[test]
    fn write_forms() {
        assert_eq!(parse_command("w"), Command::Write(None));
        assert_eq!(
            parse_command("w  out.txt "),
            Command::Write(Some(PathBuf::from("out.txt")))
        );
        assert_eq!(parse_command("wq"), Command::WriteQuit);
        assert_eq!(parse_command("x"), Command::ExitSave);
    }

    #[test]
    fn quit_forms() {
        assert_eq!(parse_command("q"), Command::Quit);
        assert_eq!(parse_command("q!"), Command::ForceQuit);
    }

    #[test]
    fn windows_and_tabs() {
        assert_eq!(parse_command("sp"), Command::Split);
        assert_eq!(parse_command("vsp"), Command::VSplit);
        assert_eq!(parse_command("close"), Command::Close);
        assert_eq!(parse_command("tabnew"), Command::TabNew(None));
        assert_eq!(
            parse_command("tabnew a.rs"),
            Command::TabNew(Some(PathBuf::from("a.rs")))
        );
        assert_eq!(parse_command("tabn"), Command::TabNext);
        assert_eq!(parse_command("tabp"), Command::TabPrev);
    }

    #[test]
    fn buffers() {
        assert_eq!(parse_command("e src/lib.rs"), Command::Edit(PathBuf::from("src/lib.rs")));
        assert_eq!(parse_command("bn"), Command::BufferNext);
        assert_eq!(parse_command("bp"), Command::BufferPrev);
        assert_eq!(parse_command("bd"), Command::BufferDelete);
    }

    #[test]
    fn line_numbers_are_one_indexed() {
        assert_eq!(parse_command("12"), Command::Goto(11));
        assert_eq!(parse_command("0"), Command::Goto(0));
    }

    #[test]
    fn mode_set_reg() {
        assert_eq!(parse_command("mode standard"), Command::Mode("standard".into()));
        assert_eq!(parse_command("reg"), Command::Registers);
        assert_eq!(parse_command("set ts=8 nonu"), Command::Set("ts=8 nonu".into()));
        assert_eq!(parse_command("set"), Command::Set(String::new()));
    }

    #[test]
    fn unknown_and_missing_args() {
        assert_eq!(parse_command("frobnicate"), Command::Unknown("frobnicate".into()));
        assert_eq!(parse_command("e"), Command::Unknown("e".into()));
        assert_eq!(parse_command("mode"), Command::Unknown("mode".into()));
        assert_eq!(parse_command(""), Command::Unknown(String::new()));
    }

    // -- CommandLine --------------------------------------------------------

    #[test]
    fn edit_line() {
        let mut cl = CommandLine::new();
        for ch in "wq".chars() {
            cl.insert_char(ch);
        }
        cl.move_left();
        cl.insert_char('!');
        assert_eq!(cl.input(), "w!q");
        assert!(cl.backspace());
        cl.move_home();
        assert!(!cl.backspace());
        assert!(cl.delete());
        assert_eq!(cl.input(), "q");
        cl.move_end();
        assert_eq!(cl.cursor(), 1);
        assert_eq!(cl.take(), "q");
        assert!(cl.is_empty());
    }

    #[test]
    fn multibyte_input() {
        let mut cl = CommandLine::new();
        cl.insert_char('é');
        cl.insert_char('x');
        cl.move_left();
        assert!(cl.backspace());
        assert_eq!(cl.input(), "x");
    }
}
