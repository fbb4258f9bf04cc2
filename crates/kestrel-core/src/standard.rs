//! Standard grammar: a plain, always-inserting editor.
//!
//! | Key                         | Action                                  |
//! |-----------------------------|-----------------------------------------|
//! | printable, `Tab`            | insert, replacing the selection         |
//! | `Enter`                     | line break                              |
//! | `Backspace` / `Delete`      | selection, or one char either side      |
//! | arrows, `Home`, `End`       | move; with `Shift` extend the selection |
//! | `Ctrl-a`                    | select all                              |
//! | `Ctrl-z` / `Ctrl-y`         | undo / redo                             |
//! | `Ctrl-c` / `Ctrl-x`         | copy / cut into the unnamed register    |
//! | `Ctrl-v`                    | paste the unnamed register              |
//! | `Esc`                       | drop the selection                      |
//!
//! Contiguous typing is one undo group; it ends at the first key that is
//! not typing. Every other editing key is a group of its own.
//!
//! Selections run from the anchor to the cursor, end exclusive.

use kestrel_input::{KeyCode, KeyEvent};

use crate::error::Result;
use crate::mode::{InputOutcome, Mode, ModeContext, ModeRequest, ModeState};
use crate::position::Position;
use crate::register::{Register, UNNAMED};

#[derive(Debug, Default)]
pub struct StandardMode {
    /// A typing group is open.
    typing: bool,
}

impl StandardMode {
    #[must_use]
    pub const fn new() -> Self {
        Self { typing: false }
    }

    fn end_typing(&mut self, ctx: &mut ModeContext<'_>) {
        if self.typing {
            let at = ctx.offset();
            ctx.buffer.end_group(at);
            self.typing = false;
        }
    }

    fn type_text(&mut self, ctx: &mut ModeContext<'_>, text: &str) -> Result<InputOutcome> {
        if !self.typing {
            let at = ctx.offset();
            ctx.buffer.begin_group(at);
            self.typing = true;
        }
        replace_selection(ctx, text)?;
        Ok(InputOutcome::Completed)
    }

    fn dispatch(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> Result<InputOutcome> {
        if let Some(ch) = key.printable() {
            return self.type_text(ctx, ch.encode_utf8(&mut [0; 4]));
        }
        if key.code == KeyCode::Tab && !key.is_ctrl() {
            return self.type_text(ctx, "\t");
        }
        self.end_typing(ctx);

        if key.is_ctrl() {
            return match key.code {
                KeyCode::Char('a') => {
                    ctx.cursor.set_anchor_at(Position::ZERO);
                    let end = ctx.buffer.len_chars();
                    ctx.cursor.set_offset(end, ctx.buffer, true);
                    Ok(InputOutcome::Completed)
                }
                KeyCode::Char('z') => {
                    ctx.cursor.clear_anchor();
                    if let Some(at) = ctx.buffer.undo() {
                        ctx.cursor.set_offset(at, ctx.buffer, true);
                    }
                    Ok(InputOutcome::Completed)
                }
                KeyCode::Char('y') => {
                    ctx.cursor.clear_anchor();
                    if let Some(at) = ctx.buffer.redo() {
                        ctx.cursor.set_offset(at, ctx.buffer, true);
                    }
                    Ok(InputOutcome::Completed)
                }
                KeyCode::Char('c') => {
                    let Some((start, end)) = selected_range(ctx) else {
                        return Ok(InputOutcome::Rejected);
                    };
                    let text = ctx.buffer.slice(start, end)?.to_string();
                    ctx.registers.yank(None, Register::char_wise(text));
                    Ok(InputOutcome::Completed)
                }
                KeyCode::Char('x') => {
                    let Some((start, end)) = selected_range(ctx) else {
                        return Ok(InputOutcome::Rejected);
                    };
                    let text = ctx.buffer.slice(start, end)?.to_string();
                    grouped(ctx, |ctx| replace_selection(ctx, ""))?;
                    ctx.registers.delete(None, Register::char_wise(text));
                    Ok(InputOutcome::Completed)
                }
                KeyCode::Char('v') => {
                    let reg = ctx.registers.get(UNNAMED);
                    if reg.is_empty() {
                        return Ok(InputOutcome::Rejected);
                    }
                    grouped(ctx, |ctx| replace_selection(ctx, &reg.text))?;
                    Ok(InputOutcome::Completed)
                }
                _ => Ok(InputOutcome::Rejected),
            };
        }

        match key.code {
            KeyCode::Escape => {
                ctx.cursor.clear_anchor();
                Ok(InputOutcome::Completed)
            }
            KeyCode::Enter => {
                grouped(ctx, |ctx| replace_selection(ctx, "\n"))?;
                Ok(InputOutcome::Completed)
            }
            KeyCode::Backspace | KeyCode::Delete => {
                let forward = key.code == KeyCode::Delete;
                grouped(ctx, |ctx| erase(ctx, forward))?;
                Ok(InputOutcome::Completed)
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Home | KeyCode::End => {
                if key.is_shift() {
                    if ctx.cursor.anchor().is_none() {
                        ctx.cursor.set_anchor();
                    }
                } else {
                    ctx.cursor.clear_anchor();
                }
                let buf = &*ctx.buffer;
                let cursor = &mut *ctx.cursor;
                match key.code {
                    KeyCode::Left => cursor.move_left(1, buf, true),
                    KeyCode::Right => cursor.move_right(1, buf, true),
                    KeyCode::Up => cursor.move_up(1, buf, true),
                    KeyCode::Down => cursor.move_down(1, buf, true),
                    KeyCode::Home => cursor.move_to_line_start(),
                    _ => cursor.move_to_line_end(buf, true),
                }
                Ok(InputOutcome::Completed)
            }
            _ => Ok(InputOutcome::Rejected),
        }
    }
}

impl Mode for StandardMode {
    fn name(&self) -> &str {
        "standard"
    }

    fn handle_input(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> InputOutcome {
        match self.dispatch(ctx, key) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.typing = false;
                let at = ctx.offset();
                ctx.buffer.end_group(at);
                ctx.request(ModeRequest::Message(err.to_string()));
                InputOutcome::Rejected
            }
        }
    }

    fn pre_display(&mut self, ctx: &mut ModeContext<'_>) {
        ctx.cursor.clamp(ctx.buffer, true);
    }

    fn state(&self) -> ModeState {
        ModeState::Insert
    }

    fn reset(&mut self) {
        self.typing = false;
    }
}

/// Run `f` as one undo group.
fn grouped(ctx: &mut ModeContext<'_>, f: impl FnOnce(&mut ModeContext<'_>) -> Result<()>) -> Result<()> {
    let at = ctx.offset();
    ctx.buffer.begin_group(at);
    let result = f(ctx);
    let after = ctx.offset();
    ctx.buffer.end_group(after);
    result
}

/// Anchor-to-cursor char range, or `None` when nothing is selected.
fn selected_range(ctx: &ModeContext<'_>) -> Option<(usize, usize)> {
    let anchor = ctx.cursor.anchor()?;
    let a = ctx.buffer.position_to_offset(ctx.buffer.clamp_position(anchor)).ok()?;
    let b = ctx.offset();
    (a != b).then_some((a.min(b), a.max(b)))
}

/// Insert `text` over the selection (if any) and leave the cursor after it.
fn replace_selection(ctx: &mut ModeContext<'_>, text: &str) -> Result<()> {
    let (start, end) = selected_range(ctx).unwrap_or_else(|| {
        let at = ctx.offset();
        (at, at)
    });
    ctx.buffer.replace(start, end, text)?;
    ctx.cursor.clear_anchor();
    ctx.cursor.set_offset(start + text.chars().count(), ctx.buffer, true);
    Ok(())
}

/// Backspace / Delete: the selection, or the neighbouring char. A `\r\n`
/// pair goes as one.
fn erase(ctx: &mut ModeContext<'_>, forward: bool) -> Result<()> {
    if selected_range(ctx).is_some() {
        return replace_selection(ctx, "");
    }
    ctx.cursor.clear_anchor();
    let at = ctx.offset();
    let buf = &*ctx.buffer;
    let (start, end) = if forward {
        if at >= buf.len_chars() {
            return Ok(());
        }
        let pair = buf.char_at(at) == Some('\r') && buf.char_at(at + 1) == Some('\n');
        (at, at + if pair { 2 } else { 1 })
    } else {
        if at == 0 {
            return Ok(());
        }
        let pair = at >= 2 && buf.char_at(at - 1) == Some('\n') && buf.char_at(at - 2) == Some('\r');
        (at - if pair { 2 } else { 1 }, at)
    };
    ctx.buffer.delete(start, end)?;
    ctx.cursor.set_offset(start, ctx.buffer, true);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Buffer, BufferId};
    use crate::config::EditorConfig;
    use crate::cursor::Cursor;
    use crate::register::RegisterStore;
    use kestrel_input::{Modifiers, parse_keys};
    use pretty_assertions::assert_eq;

    struct Rig {
        buf: Buffer,
        cursor: Cursor,
        regs: RegisterStore,
        config: EditorConfig,
        requests: Vec<ModeRequest>,
        mode: StandardMode,
    }

    impl Rig {
        fn new(text: &str) -> Self {
            Self {
                buf: Buffer::from_text(BufferId(1), "test", text),
                cursor: Cursor::new(),
                regs: RegisterStore::new(),
                config: EditorConfig::default(),
                requests: Vec::new(),
                mode: StandardMode::new(),
            }
        }

        fn key(&mut self, key: KeyEvent) -> InputOutcome {
            let mut ctx = ModeContext {
                buffer: &mut self.buf,
                cursor: &mut self.cursor,
                registers: &mut self.regs,
                config: &self.config,
                requests: &mut self.requests,
            };
            self.mode.handle_input(&mut ctx, key)
        }

        fn feed(&mut self, keys: &str) -> InputOutcome {
            let mut last = InputOutcome::Completed;
            for key in parse_keys(keys).unwrap() {
                last = self.key(key);
            }
            last
        }

        fn shift(&mut self, code: KeyCode) {
            self.key(KeyEvent::with(code, Modifiers::SHIFT));
        }

        fn text(&self) -> String {
            self.buf.contents()
        }
    }

    // -- Typing -------------------------------------------------------------

    #[test]
    fn typing_inserts_at_cursor() {
        let mut rig = Rig::new("world");
        rig.feed("hello ");
        assert_eq!(rig.text(), "hello world");
        assert_eq!(rig.cursor.position(), Position::new(0, 6));
        assert_eq!(rig.mode.state(), ModeState::Insert);
    }

    #[test]
    fn contiguous_typing_is_one_group() {
        let mut rig = Rig::new("");
        rig.feed("abc<Left>de");
        assert_eq!(rig.text(), "abdec");
        rig.feed("<C-z>");
        assert_eq!(rig.text(), "abc");
        rig.feed("<C-z>");
        assert_eq!(rig.text(), "");
        rig.feed("<C-y><C-y>");
        assert_eq!(rig.text(), "abdec");
    }

    #[test]
    fn enter_and_erase_are_own_groups() {
        let mut rig = Rig::new("");
        rig.feed("ab<CR><BS><BS>");
        assert_eq!(rig.text(), "a");
        rig.feed("<C-z>");
        assert_eq!(rig.text(), "ab");
        rig.feed("<C-z>");
        assert_eq!(rig.text(), "ab\n");
        rig.feed("<C-z>");
        assert_eq!(rig.text(), "ab");
    }

    #[test]
    fn delete_joins_lines() {
        let mut rig = Rig::new("ab\r\ncd");
        rig.feed("<End><Del>");
        assert_eq!(rig.text(), "abcd");
        rig.feed("<Home><BS>");
        assert_eq!(rig.text(), "abcd");
    }

    // -- Selection ----------------------------------------------------------

    #[test]
    fn shift_arrows_select_and_typing_replaces() {
        let mut rig = Rig::new("hello world");
        rig.shift(KeyCode::Right);
        rig.shift(KeyCode::Right);
        assert_eq!(rig.cursor.anchor(), Some(Position::ZERO));
        rig.feed("J");
        assert_eq!(rig.text(), "Jllo world");
        assert_eq!(rig.cursor.anchor(), None);
    }

    #[test]
    fn plain_arrow_drops_selection() {
        let mut rig = Rig::new("abc");
        rig.shift(KeyCode::End);
        rig.feed("<Left>");
        assert_eq!(rig.cursor.anchor(), None);
        assert_eq!(rig.cursor.position(), Position::new(0, 2));
    }

    #[test]
    fn select_all_then_delete() {
        let mut rig = Rig::new("one\ntwo");
        rig.feed("<C-a><BS>");
        assert_eq!(rig.text(), "");
        rig.feed("<C-z>");
        assert_eq!(rig.text(), "one\ntwo");
    }

    // -- Clipboard keys -----------------------------------------------------

    #[test]
    fn copy_cut_paste() {
        let mut rig = Rig::new("abc def");
        rig.shift(KeyCode::Right);
        rig.shift(KeyCode::Right);
        rig.shift(KeyCode::Right);
        rig.feed("<C-c>");
        assert_eq!(rig.regs.get(UNNAMED), Register::char_wise("abc"));
        rig.feed("<C-x>");
        assert_eq!(rig.text(), " def");
        rig.feed("<End><C-v>");
        assert_eq!(rig.text(), " defabc");
    }

    #[test]
    fn copy_without_selection_is_rejected() {
        let mut rig = Rig::new("abc");
        assert_eq!(rig.feed("<C-c>"), InputOutcome::Rejected);
        assert_eq!(rig.feed("<C-v>"), InputOutcome::Rejected);
        assert_eq!(rig.feed("<F5>"), InputOutcome::Rejected);
    }

    #[test]
    fn read_only_reports_message() {
        let mut rig = Rig::new("abc");
        rig.buf.set_read_only(true);
        assert_eq!(rig.feed("x"), InputOutcome::Rejected);
        assert_eq!(rig.text(), "abc");
        assert!(matches!(rig.requests.as_slice(), [ModeRequest::Message(_)]));
    }
}
