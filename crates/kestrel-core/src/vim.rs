//! Vim grammar.
//!
//! [`VimMode`] drives normal, insert, visual, replace and command-line
//! states through a [`ModeContext`].
//!
//! | Pattern                              | Example        |
//! |--------------------------------------|----------------|
//! | `["x][count]operator[count]motion`   | `"a2d3w`       |
//! | `[count]operator operator`           | `3dd`, `>>`    |
//! | `[count]operator f/t{char}`          | `d2f.`         |
//! | `[count]motion`                      | `5j`, `2fx`    |
//! | `[count]command`                     | `3x`, `2p`     |
//! | `<C-w> s/v/w/c/h/j/k/l`              | window control |
//!
//! Operators are `d`, `c`, `y`, `>` and `<`. Counts multiply, so `2d3w`
//! deletes six words. Every completed command is one undo group. An
//! insert session is one group from the key that opened it (`i`, `o`,
//! `cw`, ...) to `<Esc>`, including whatever `c` deleted.

use kestrel_input::{KeyCode, KeyEvent};
use tracing::{trace, warn};

use crate::buffer::Buffer;
use crate::command::CommandLine;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::mode::{InputOutcome, Mode, ModeContext, ModeRequest, ModeState, VisualKind};
use crate::position::Position;
use crate::register::{Register, UNNAMED};
use crate::split::{Direction, SplitAxis};
use crate::word::{self, CharClass};

type Step = Result<InputOutcome>;

/// Largest text `[count]p` will build before the put is rejected.
const MAX_PUT_BYTES: usize = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Pending state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharFindKind {
    Forward,
    Backward,
    TillForward,
    TillBackward,
}

impl CharFindKind {
    const fn from_key(ch: char) -> Option<Self> {
        match ch {
            'f' => Some(Self::Forward),
            'F' => Some(Self::Backward),
            't' => Some(Self::TillForward),
            'T' => Some(Self::TillBackward),
            _ => None,
        }
    }

    /// `,` repeats the last find in the other direction.
    const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
            Self::TillForward => Self::TillBackward,
            Self::TillBackward => Self::TillForward,
        }
    }

    const fn is_forward(self) -> bool {
        matches!(self, Self::Forward | Self::TillForward)
    }

    fn apply(self, cursor: &mut Cursor, buf: &Buffer, ch: char, count: usize) -> bool {
        match self {
            Self::Forward => cursor.find_forward(buf, ch, count),
            Self::Backward => cursor.find_backward(buf, ch, count),
            Self::TillForward => cursor.till_forward(buf, ch, count),
            Self::TillBackward => cursor.till_backward(buf, ch, count),
        }
    }
}

/// A command that needs more keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// After `"`.
    Register,
    /// After `<C-w>`.
    Window,
    /// After `g`.
    G,
    CharFind { kind: CharFindKind, count: usize },
    /// After `r`.
    Replace { count: usize },
    /// Operator typed, waiting for a motion. `count` is the operator's own.
    Operator { op: char, count: Option<usize> },
    /// `dg`, waiting for the second `g`.
    OperatorG { op: char },
    OperatorCharFind { op: char, count: usize, kind: CharFindKind },
}

/// Text an operator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Char offsets, `[start, end)`.
    Chars { start: usize, end: usize },
    /// Whole lines, inclusive.
    Lines { first: usize, last: usize },
}

// ---------------------------------------------------------------------------
// VimMode
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct VimMode {
    state: ModeState,
    count: Option<usize>,
    pending: Option<Pending>,
    register: Option<char>,
    last_find: Option<(char, CharFindKind)>,
    cmdline: CommandLine,
    /// Keys of the command being typed, in key notation.
    keys: String,
    /// Chars overwritten in replace mode, for `<BS>`. `None` marks an
    /// appended char.
    replaced: Vec<Option<char>>,
}

impl VimMode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn finish(&mut self) {
        self.pending = None;
        self.count = None;
        self.register = None;
        self.keys.clear();
    }

    fn wait(&mut self, pending: Pending) -> Step {
        self.pending = Some(pending);
        Ok(InputOutcome::Pending)
    }

    /// Feed a digit into the count. `0` only extends a count in progress.
    fn push_count(&mut self, key: KeyEvent) -> bool {
        let KeyCode::Char(ch) = key.code else {
            return false;
        };
        if key.is_ctrl() {
            return false;
        }
        let Some(digit) = ch.to_digit(10) else {
            return false;
        };
        if digit == 0 && self.count.is_none() {
            return false;
        }
        let n = self.count.unwrap_or(0);
        self.count = Some(n.saturating_mul(10).saturating_add(digit as usize));
        true
    }

    // -- Normal -------------------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn normal(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> Step {
        if let Some(pending) = self.pending.take() {
            return self.normal_pending(ctx, key, pending);
        }
        if key.code == KeyCode::Escape {
            return Ok(InputOutcome::Completed);
        }
        if key.is_ctrl() {
            return self.normal_ctrl(ctx, key);
        }
        if self.push_count(key) {
            return Ok(InputOutcome::Pending);
        }

        let raw = self.count;
        let count = raw.unwrap_or(1);
        if self.motion(ctx, key.code, raw, false) {
            return Ok(InputOutcome::Completed);
        }
        let KeyCode::Char(ch) = key.code else {
            return Ok(InputOutcome::Rejected);
        };

        match ch {
            '"' => self.wait(Pending::Register),
            'g' => self.wait(Pending::G),
            'f' | 'F' | 't' | 'T' => match CharFindKind::from_key(ch) {
                Some(kind) => self.wait(Pending::CharFind { kind, count }),
                None => Ok(InputOutcome::Rejected),
            },
            'r' => self.wait(Pending::Replace { count }),
            'd' | 'c' | 'y' | '>' | '<' => {
                self.count = None;
                self.wait(Pending::Operator { op: ch, count: raw })
            }

            // -- Shortcuts for operator forms --
            'x' | 'X' | 's' => {
                let Some((start, end)) = char_run(ctx, count, ch != 'X')? else {
                    if ch == 's' {
                        return Ok(self.enter_insert(ctx));
                    }
                    return Ok(InputOutcome::Rejected);
                };
                self.delete(ctx, Target::Chars { start, end }, ch == 's')
            }
            'D' | 'C' => {
                let line = ctx.cursor.line();
                let last = line_after(ctx.buffer, line, count - 1);
                let start = ctx.offset();
                let end = ctx.buffer.line_content_end(last)?;
                if start >= end {
                    if ch == 'C' {
                        return Ok(self.enter_insert(ctx));
                    }
                    return Ok(InputOutcome::Completed);
                }
                self.delete(ctx, Target::Chars { start, end }, ch == 'C')
            }
            'S' | 'Y' => {
                let first = ctx.cursor.line();
                let last = line_after(ctx.buffer, first, count - 1);
                let op = if ch == 'S' { 'c' } else { 'y' };
                self.operate(ctx, op, Target::Lines { first, last })
            }

            // -- Edits --
            'J' => self.join_lines(ctx, count),
            '~' => self.toggle_case_run(ctx, count),
            'p' => self.put(ctx, count, true),
            'P' => self.put(ctx, count, false),
            'u' => {
                for _ in 0..count {
                    let Some(at) = ctx.buffer.undo() else { break };
                    ctx.cursor.set_offset(at, ctx.buffer, false);
                }
                Ok(InputOutcome::Completed)
            }

            // -- Mode switches --
            'i' => Ok(self.enter_insert(ctx)),
            'a' => {
                ctx.cursor.move_right(1, ctx.buffer, true);
                Ok(self.enter_insert(ctx))
            }
            'I' => {
                ctx.cursor.move_to_first_non_blank(ctx.buffer, true);
                Ok(self.enter_insert(ctx))
            }
            'A' => {
                ctx.cursor.move_to_line_end(ctx.buffer, true);
                Ok(self.enter_insert(ctx))
            }
            'o' | 'O' => self.open_line(ctx, ch == 'o'),
            'R' => {
                let at = ctx.offset();
                ctx.buffer.begin_group(at);
                self.replaced.clear();
                self.state = ModeState::Replace;
                Ok(InputOutcome::Completed)
            }
            'v' => Ok(self.enter_visual(ctx, VisualKind::Char)),
            'V' => Ok(self.enter_visual(ctx, VisualKind::Line)),
            ':' => {
                self.cmdline.clear();
                self.state = ModeState::CommandLine;
                Ok(InputOutcome::Completed)
            }
            _ => Ok(InputOutcome::Rejected),
        }
    }

    fn normal_ctrl(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> Step {
        match key.code {
            KeyCode::Char('r') => {
                for _ in 0..self.count.unwrap_or(1) {
                    let Some(at) = ctx.buffer.redo() else { break };
                    ctx.cursor.set_offset(at, ctx.buffer, false);
                }
                Ok(InputOutcome::Completed)
            }
            KeyCode::Char('v') => Ok(self.enter_visual(ctx, VisualKind::Block)),
            KeyCode::Char('w') => self.wait(Pending::Window),
            _ => Ok(InputOutcome::Rejected),
        }
    }

    fn normal_pending(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent, pending: Pending) -> Step {
        if key.code == KeyCode::Escape {
            return Ok(InputOutcome::Completed);
        }
        match pending {
            Pending::Register => Ok(self.register_name(key)),
            Pending::Window => Ok(window_command(ctx, key)),
            Pending::G => Ok(self.g_command(ctx, key, false)),
            Pending::CharFind { kind, count } => Ok(self.char_find(ctx, key, kind, count)),
            Pending::Replace { count } => match key.printable() {
                Some(ch) => self.replace_chars(ctx, ch, count),
                None => Ok(InputOutcome::Rejected),
            },
            Pending::Operator { op, count } => self.operator_key(ctx, key, op, count),
            Pending::OperatorG { op } => {
                if key.code != KeyCode::Char('g') {
                    return Ok(InputOutcome::Rejected);
                }
                let line = ctx.cursor.line();
                let target = self.count.map_or(0, |n| n - 1).min(ctx.buffer.line_count() - 1);
                self.operate(ctx, op, Target::Lines { first: target.min(line), last: target.max(line) })
            }
            Pending::OperatorCharFind { op, count, kind } => {
                let Some(ch) = key.printable() else {
                    return Ok(InputOutcome::Rejected);
                };
                self.last_find = Some((ch, kind));
                match char_find_target(ctx, ch, kind, count) {
                    Some(target) => self.operate(ctx, op, target),
                    None => Ok(InputOutcome::Rejected),
                }
            }
        }
    }

    fn register_name(&mut self, key: KeyEvent) -> InputOutcome {
        match key.printable() {
            Some(name) if name.is_ascii_alphanumeric() || matches!(name, '"' | '-' | '_' | '+' | '*') => {
                self.register = Some(name);
                InputOutcome::Pending
            }
            _ => InputOutcome::Rejected,
        }
    }

    fn g_command(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent, visual: bool) -> InputOutcome {
        match key.code {
            KeyCode::Char('g') => {
                let line = self.count.map_or(0, |n| n - 1);
                ctx.cursor.goto_line(line, ctx.buffer, false);
            }
            KeyCode::Char('t') if !visual => ctx.request(ModeRequest::NextTab),
            KeyCode::Char('T') if !visual => ctx.request(ModeRequest::PreviousTab),
            _ => return InputOutcome::Rejected,
        }
        InputOutcome::Completed
    }

    fn char_find(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent, kind: CharFindKind, count: usize) -> InputOutcome {
        let Some(ch) = key.printable() else {
            return InputOutcome::Rejected;
        };
        self.last_find = Some((ch, kind));
        if kind.apply(ctx.cursor, ctx.buffer, ch, count) {
            InputOutcome::Completed
        } else {
            InputOutcome::Rejected
        }
    }

    /// Shared by normal and visual: move the cursor for a motion key.
    /// Returns false if `code` is not a motion.
    fn motion(&self, ctx: &mut ModeContext<'_>, code: KeyCode, raw: Option<usize>, past_end: bool) -> bool {
        let n = raw.unwrap_or(1);
        let buf = &*ctx.buffer;
        let cursor = &mut *ctx.cursor;
        match code {
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => cursor.move_left(n, buf, past_end),
            KeyCode::Char('l' | ' ') | KeyCode::Right => cursor.move_right(n, buf, past_end),
            KeyCode::Char('j') | KeyCode::Down => cursor.move_down(n, buf, past_end),
            KeyCode::Char('k') | KeyCode::Up => cursor.move_up(n, buf, past_end),
            KeyCode::Char('0') | KeyCode::Home => cursor.move_to_line_start(),
            KeyCode::Char('^') => cursor.move_to_first_non_blank(buf, past_end),
            KeyCode::Char('$') | KeyCode::End => {
                if n > 1 {
                    cursor.move_down(n - 1, buf, past_end);
                }
                cursor.move_to_line_end(buf, past_end);
            }
            KeyCode::Char('w') => cursor.word_forward(n, buf, past_end),
            KeyCode::Char('b') => cursor.word_backward(n, buf, past_end),
            KeyCode::Char('e') => cursor.word_end_forward(n, buf, past_end),
            KeyCode::Char('W') => cursor.big_word_forward(n, buf, past_end),
            KeyCode::Char('B') => cursor.big_word_backward(n, buf, past_end),
            KeyCode::Char('E') => cursor.big_word_end_forward(n, buf, past_end),
            KeyCode::Char('G') => cursor.goto_line(raw.map_or(usize::MAX, |n| n - 1), buf, past_end),
            KeyCode::Char(key @ (';' | ',')) => {
                if let Some((ch, kind)) = self.last_find {
                    let kind = if key == ',' { kind.opposite() } else { kind };
                    kind.apply(cursor, buf, ch, n);
                }
            }
            _ => return false,
        }
        true
    }

    // -- Operators ----------------------------------------------------------

    fn operator_key(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent, op: char, op_count: Option<usize>) -> Step {
        if self.push_count(key) {
            return self.wait(Pending::Operator { op, count: op_count });
        }
        let total = match (op_count, self.count.take()) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(1).saturating_mul(b.unwrap_or(1))),
        };
        let n = total.unwrap_or(1);

        if let KeyCode::Char(ch) = key.code {
            if ch == op {
                let first = ctx.cursor.line();
                let last = line_after(ctx.buffer, first, n - 1);
                return self.operate(ctx, op, Target::Lines { first, last });
            }
            if ch == 'g' {
                self.count = total;
                return self.wait(Pending::OperatorG { op });
            }
            if let Some(kind) = CharFindKind::from_key(ch) {
                return self.wait(Pending::OperatorCharFind { op, count: n, kind });
            }
        }

        match self.motion_target(ctx, key.code, op, total)? {
            Some(target) => self.operate(ctx, op, target),
            None => Ok(InputOutcome::Rejected),
        }
    }

    /// The text a motion covers when it follows an operator.
    fn motion_target(&self, ctx: &ModeContext<'_>, code: KeyCode, op: char, total: Option<usize>) -> Result<Option<Target>> {
        let buf = &*ctx.buffer;
        let n = total.unwrap_or(1);
        let line = ctx.cursor.line();
        let last_line = buf.line_count() - 1;
        let start = ctx.cursor.offset(buf);
        let mut probe = ctx.cursor.clone();

        let end = match code {
            // Linewise.
            KeyCode::Char('j') | KeyCode::Down => {
                let last = line_after(buf, line, n);
                return Ok((last != line).then_some(Target::Lines { first: line, last }));
            }
            KeyCode::Char('k') | KeyCode::Up => {
                return Ok((line > 0).then(|| Target::Lines {
                    first: line.saturating_sub(n),
                    last: line,
                }));
            }
            KeyCode::Char('G') => {
                let target = total.map_or(last_line, |n| (n - 1).min(last_line));
                return Ok(Some(Target::Lines {
                    first: target.min(line),
                    last: target.max(line),
                }));
            }

            // Words.
            KeyCode::Char(key @ ('w' | 'W')) => {
                let big = key == 'W';
                let on_blank = buf.char_at(start).is_none_or(char::is_whitespace);
                if op == 'c' && !on_blank {
                    change_word_end(buf, start, n, big)
                } else {
                    word_motion_end(buf, start, line, n, big)?
                }
            }
            KeyCode::Char(key @ ('e' | 'E')) => {
                let motion = if key == 'E' { word::big_word_end_forward } else { word::word_end_forward };
                (repeat_motion(buf, start, n, motion) + 1).min(buf.len_chars())
            }
            KeyCode::Char(key @ ('b' | 'B')) => {
                let motion = if key == 'B' { word::big_word_backward } else { word::word_backward };
                repeat_motion(buf, start, n, motion)
            }

            // Within the line. The probe may sit past the last char so that
            // `dl` on the final char still covers it.
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => {
                probe.move_left(n, buf, true);
                probe.offset(buf)
            }
            KeyCode::Char('l' | ' ') | KeyCode::Right => {
                probe.move_right(n, buf, true);
                probe.offset(buf)
            }
            KeyCode::Char('0') | KeyCode::Home => buf.line_start(line)?,
            KeyCode::Char('^') => {
                probe.move_to_first_non_blank(buf, true);
                probe.offset(buf)
            }
            KeyCode::Char('$') | KeyCode::End => buf.line_content_end(line_after(buf, line, n - 1))?,
            KeyCode::Char(key @ (';' | ',')) => {
                let Some((ch, kind)) = self.last_find else {
                    return Ok(None);
                };
                let kind = if key == ',' { kind.opposite() } else { kind };
                return Ok(char_find_target(ctx, ch, kind, n));
            }
            _ => return Ok(None),
        };

        let (start, end) = (start.min(end), start.max(end));
        Ok((start < end).then_some(Target::Chars { start, end }))
    }

    fn operate(&mut self, ctx: &mut ModeContext<'_>, op: char, target: Target) -> Step {
        match op {
            'y' => self.yank(ctx, target),
            'd' => self.delete(ctx, target, false),
            'c' => self.delete(ctx, target, true),
            '>' | '<' => {
                let (first, last) = target_lines(ctx.buffer, target)?;
                indent(ctx, first, last, op == '>')
            }
            '~' => {
                let (start, end) = match target {
                    Target::Chars { start, end } => (start, end),
                    Target::Lines { first, last } => {
                        (ctx.buffer.line_start(first)?, ctx.buffer.line_content_end(last)?)
                    }
                };
                let at = ctx.offset();
                ctx.buffer.begin_group(at);
                toggle_case_range(ctx.buffer, start, end)?;
                ctx.buffer.end_group(at);
                Ok(InputOutcome::Completed)
            }
            _ => Ok(InputOutcome::Rejected),
        }
    }

    fn yank(&self, ctx: &mut ModeContext<'_>, target: Target) -> Step {
        let reg = register_text(ctx.buffer, target)?;
        ctx.registers.yank(self.register, reg);
        match target {
            Target::Chars { start, .. } => ctx.cursor.set_offset(start, ctx.buffer, false),
            Target::Lines { first, .. } => {
                if first < ctx.cursor.line() {
                    let col = ctx.cursor.col();
                    ctx.cursor.set_position(Position::new(first, col), ctx.buffer, false);
                }
            }
        }
        Ok(InputOutcome::Completed)
    }

    /// `d` and `c`. For `c` the undo group stays open into insert mode.
    fn delete(&mut self, ctx: &mut ModeContext<'_>, target: Target, change: bool) -> Step {
        let reg = register_text(ctx.buffer, target)?;
        let before = ctx.offset();
        ctx.buffer.begin_group(before);

        match target {
            Target::Chars { start, end } => {
                ctx.buffer.delete(start, end)?;
                ctx.cursor.set_offset(start, ctx.buffer, change);
            }
            Target::Lines { first, last } if change => {
                let start = ctx.buffer.line_start(first)?;
                let end = ctx.buffer.line_content_end(last)?;
                ctx.buffer.delete(start, end)?;
                ctx.cursor.set_offset(start, ctx.buffer, true);
            }
            Target::Lines { first, last } => {
                let (start, end) = line_delete_span(ctx.buffer, first, last)?;
                ctx.buffer.delete(start, end)?;
                let line = first.min(ctx.buffer.line_count() - 1);
                ctx.cursor.goto_line(line, ctx.buffer, false);
            }
        }
        ctx.registers.delete(self.register, reg);

        if change {
            self.replaced.clear();
            self.state = ModeState::Insert;
        } else {
            let after = ctx.offset();
            ctx.buffer.end_group(after);
        }
        Ok(InputOutcome::Completed)
    }

    // -- Single commands ----------------------------------------------------

    fn join_lines(&self, ctx: &mut ModeContext<'_>, count: usize) -> Step {
        let line = ctx.cursor.line();
        if line + 1 >= ctx.buffer.line_count() {
            return Ok(InputOutcome::Rejected);
        }
        let at = ctx.offset();
        ctx.buffer.begin_group(at);

        let mut col = ctx.cursor.col();
        for _ in 0..count.saturating_sub(1).max(1) {
            if line + 1 >= ctx.buffer.line_count() {
                break;
            }
            let buf = &*ctx.buffer;
            let cur_len = buf.line_content_len(line)?;
            let end = buf.line_content_end(line)?;
            let next_start = buf.line_start(line + 1)?;
            let next_len = buf.line_content_len(line + 1)?;
            let indent = buf
                .line(line + 1)?
                .chars()
                .take(next_len)
                .take_while(|c| matches!(c, ' ' | '\t'))
                .count();
            let ends_blank = cur_len > 0 && matches!(buf.char_at(end - 1), Some(' ' | '\t'));
            let sep = if cur_len == 0 || ends_blank || indent == next_len { "" } else { " " };

            ctx.buffer.replace(end, next_start + indent, sep)?;
            col = cur_len;
        }

        ctx.cursor.set_position(Position::new(line, col), ctx.buffer, false);
        let after = ctx.offset();
        ctx.buffer.end_group(after);
        Ok(InputOutcome::Completed)
    }

    fn toggle_case_run(&self, ctx: &mut ModeContext<'_>, count: usize) -> Step {
        let Some((start, end)) = char_run(ctx, count, true)? else {
            return Ok(InputOutcome::Rejected);
        };
        ctx.buffer.begin_group(start);
        toggle_case_range(ctx.buffer, start, end)?;
        ctx.cursor.set_offset(end, ctx.buffer, false);
        ctx.buffer.end_group(end);
        Ok(InputOutcome::Completed)
    }

    fn replace_chars(&self, ctx: &mut ModeContext<'_>, ch: char, count: usize) -> Step {
        let at = ctx.offset();
        let line_end = ctx.buffer.line_content_end(ctx.cursor.line())?;
        let Some(end) = at.checked_add(count).filter(|&end| end <= line_end) else {
            return Ok(InputOutcome::Rejected);
        };
        let text: String = std::iter::repeat_n(ch, count).collect();
        ctx.buffer.begin_group(at);
        ctx.buffer.replace(at, end, &text)?;
        ctx.cursor.set_offset(end - 1, ctx.buffer, false);
        ctx.buffer.end_group(end - 1);
        Ok(InputOutcome::Completed)
    }

    /// `p` (after) and `P` (before).
    fn put(&self, ctx: &mut ModeContext<'_>, count: usize, after: bool) -> Step {
        let reg = ctx.registers.get(self.register.unwrap_or(UNNAMED));
        if reg.is_empty() {
            return Ok(InputOutcome::Rejected);
        }
        let fits = reg.text.len().checked_mul(count).is_some_and(|len| len <= MAX_PUT_BYTES);
        if !fits {
            warn!(count, "put count too large");
            return Ok(InputOutcome::Rejected);
        }
        let text = reg.text.repeat(count);
        let at = ctx.offset();
        let line = ctx.cursor.line();
        ctx.buffer.begin_group(at);

        if reg.line_wise {
            let body = text.strip_suffix('\n').unwrap_or(&text);
            let target = if after && line + 1 == ctx.buffer.line_count() {
                let end = ctx.buffer.len_chars();
                ctx.buffer.insert(end, &format!("\n{body}"))?;
                line + 1
            } else {
                let target = if after { line + 1 } else { line };
                let start = ctx.buffer.line_start(target)?;
                ctx.buffer.insert(start, &format!("{body}\n"))?;
                target
            };
            ctx.cursor.goto_line(target, ctx.buffer, false);
        } else {
            let on_char = ctx.buffer.line_content_len(line)? > 0;
            let insert_at = if after && on_char { at + 1 } else { at };
            ctx.buffer.insert(insert_at, &text)?;
            let last = insert_at + text.chars().count() - 1;
            ctx.cursor.set_offset(last, ctx.buffer, false);
        }

        let after_offset = ctx.offset();
        ctx.buffer.end_group(after_offset);
        Ok(InputOutcome::Completed)
    }

    fn open_line(&mut self, ctx: &mut ModeContext<'_>, below: bool) -> Step {
        let line = ctx.cursor.line();
        let at = ctx.offset();
        ctx.buffer.begin_group(at);
        let target = if below {
            let end = ctx.buffer.line_content_end(line)?;
            ctx.buffer.insert(end, "\n")?;
            line + 1
        } else {
            let start = ctx.buffer.line_start(line)?;
            ctx.buffer.insert(start, "\n")?;
            line
        };
        ctx.cursor.set_position(Position::new(target, 0), ctx.buffer, true);
        self.replaced.clear();
        self.state = ModeState::Insert;
        Ok(InputOutcome::Completed)
    }

    // -- Insert & replace ---------------------------------------------------

    fn enter_insert(&mut self, ctx: &mut ModeContext<'_>) -> InputOutcome {
        let at = ctx.offset();
        ctx.buffer.begin_group(at);
        self.replaced.clear();
        self.state = ModeState::Insert;
        InputOutcome::Completed
    }

    fn leave_insert(&mut self, ctx: &mut ModeContext<'_>) -> InputOutcome {
        let at = ctx.offset();
        ctx.buffer.end_group(at);
        self.replaced.clear();
        self.state = ModeState::Normal;
        ctx.cursor.move_left(1, ctx.buffer, true);
        InputOutcome::Completed
    }

    fn insert(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> Step {
        if key.code == KeyCode::Escape || key == KeyEvent::ctrl('c') {
            return Ok(self.leave_insert(ctx));
        }
        if let Some(ch) = key.printable() {
            return type_text(ctx, ch.encode_utf8(&mut [0; 4]));
        }

        let at = ctx.offset();
        match key.code {
            KeyCode::Enter => type_text(ctx, "\n"),
            KeyCode::Tab => type_text(ctx, "\t"),
            KeyCode::Backspace => {
                if at > 0 {
                    let start = break_start_before(ctx.buffer, at);
                    ctx.buffer.delete(start, at)?;
                    ctx.cursor.set_offset(start, ctx.buffer, true);
                }
                Ok(InputOutcome::Completed)
            }
            KeyCode::Delete => {
                if at < ctx.buffer.len_chars() {
                    let end = break_end_after(ctx.buffer, at);
                    ctx.buffer.delete(at, end)?;
                }
                Ok(InputOutcome::Completed)
            }
            _ if insert_motion(ctx, key.code) => Ok(InputOutcome::Completed),
            _ => Ok(InputOutcome::Rejected),
        }
    }

    fn replace(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> Step {
        if key.code == KeyCode::Escape || key == KeyEvent::ctrl('c') {
            return Ok(self.leave_insert(ctx));
        }
        let at = ctx.offset();

        if let Some(ch) = key.printable() {
            let line_end = ctx.buffer.line_content_end(ctx.cursor.line())?;
            let mut utf8 = [0; 4];
            let text = ch.encode_utf8(&mut utf8);
            if at < line_end {
                let old = ctx.buffer.char_at(at);
                ctx.buffer.replace(at, at + 1, text)?;
                self.replaced.push(old);
            } else {
                ctx.buffer.insert(at, text)?;
                self.replaced.push(None);
            }
            ctx.cursor.set_offset(at + 1, ctx.buffer, true);
            return Ok(InputOutcome::Completed);
        }

        match key.code {
            KeyCode::Enter => {
                ctx.buffer.insert(at, "\n")?;
                self.replaced.push(None);
                ctx.cursor.set_offset(at + 1, ctx.buffer, true);
                Ok(InputOutcome::Completed)
            }
            KeyCode::Backspace => {
                match self.replaced.pop() {
                    Some(entry) if at > 0 => {
                        let prev = at - 1;
                        match entry {
                            Some(old) => {
                                ctx.buffer.replace(prev, at, old.encode_utf8(&mut [0; 4]))?;
                            }
                            None => {
                                ctx.buffer.delete(prev, at)?;
                            }
                        }
                        ctx.cursor.set_offset(prev, ctx.buffer, true);
                    }
                    _ => ctx.cursor.move_left(1, ctx.buffer, true),
                }
                Ok(InputOutcome::Completed)
            }
            _ if insert_motion(ctx, key.code) => {
                self.replaced.clear();
                Ok(InputOutcome::Completed)
            }
            _ => Ok(InputOutcome::Rejected),
        }
    }

    // -- Visual -------------------------------------------------------------

    fn enter_visual(&mut self, ctx: &mut ModeContext<'_>, kind: VisualKind) -> InputOutcome {
        ctx.cursor.set_anchor();
        self.state = ModeState::Visual(kind);
        InputOutcome::Completed
    }

    fn leave_visual(&mut self, ctx: &mut ModeContext<'_>) {
        ctx.cursor.clear_anchor();
        self.state = ModeState::Normal;
    }

    fn visual(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent, kind: VisualKind) -> Step {
        if let Some(pending) = self.pending.take() {
            if key.code == KeyCode::Escape {
                return Ok(InputOutcome::Completed);
            }
            return Ok(match pending {
                Pending::Register => self.register_name(key),
                Pending::G => self.g_command(ctx, key, true),
                Pending::CharFind { kind, count } => self.char_find(ctx, key, kind, count),
                _ => InputOutcome::Rejected,
            });
        }
        if key.code == KeyCode::Escape || key == KeyEvent::ctrl('c') {
            self.leave_visual(ctx);
            return Ok(InputOutcome::Completed);
        }
        if key.is_ctrl() {
            return Ok(match key.code {
                KeyCode::Char('v') => self.switch_visual(ctx, kind, VisualKind::Block),
                _ => InputOutcome::Rejected,
            });
        }
        if self.push_count(key) {
            return Ok(InputOutcome::Pending);
        }
        let raw = self.count;
        if self.motion(ctx, key.code, raw, false) {
            return Ok(InputOutcome::Completed);
        }
        let KeyCode::Char(ch) = key.code else {
            return Ok(InputOutcome::Rejected);
        };

        match ch {
            '"' => self.wait(Pending::Register),
            'g' => self.wait(Pending::G),
            'f' | 'F' | 't' | 'T' => match CharFindKind::from_key(ch) {
                Some(find) => self.wait(Pending::CharFind {
                    kind: find,
                    count: raw.unwrap_or(1),
                }),
                None => Ok(InputOutcome::Rejected),
            },
            'v' => Ok(self.switch_visual(ctx, kind, VisualKind::Char)),
            'V' => Ok(self.switch_visual(ctx, kind, VisualKind::Line)),
            'o' => {
                ctx.cursor.swap_anchor();
                Ok(InputOutcome::Completed)
            }
            'd' | 'x' => self.visual_operate(ctx, kind, 'd'),
            'y' | 'c' | '>' | '<' | '~' => self.visual_operate(ctx, kind, ch),
            _ => Ok(InputOutcome::Rejected),
        }
    }

    /// `v` in charwise visual leaves; `v` in linewise visual switches.
    fn switch_visual(&mut self, ctx: &mut ModeContext<'_>, current: VisualKind, wanted: VisualKind) -> InputOutcome {
        if current == wanted {
            self.leave_visual(ctx);
        } else {
            self.state = ModeState::Visual(wanted);
        }
        InputOutcome::Completed
    }

    fn visual_operate(&mut self, ctx: &mut ModeContext<'_>, kind: VisualKind, op: char) -> Step {
        let Some((start, end)) = ctx.cursor.selection() else {
            self.leave_visual(ctx);
            return Ok(InputOutcome::Rejected);
        };
        self.leave_visual(ctx);
        ctx.cursor.set_position(start, ctx.buffer, false);

        match kind {
            VisualKind::Char => {
                let from = ctx.buffer.position_to_offset(ctx.buffer.clamp_position(start))?;
                let to = ctx.buffer.position_to_offset(ctx.buffer.clamp_position(end))?;
                let to = (to + 1).min(ctx.buffer.len_chars());
                self.operate(ctx, op, Target::Chars { start: from, end: to })
            }
            VisualKind::Line => self.operate(
                ctx,
                op,
                Target::Lines {
                    first: start.line,
                    last: end.line,
                },
            ),
            VisualKind::Block => {
                let left = start.col.min(end.col);
                let right = start.col.max(end.col);
                self.block_operate(ctx, op, (start.line, end.line), (left, right))
            }
        }
    }

    /// Visual block: the same column range on every selected line.
    fn block_operate(&mut self, ctx: &mut ModeContext<'_>, op: char, lines: (usize, usize), cols: (usize, usize)) -> Step {
        let (top, bottom) = lines;
        let (left, right) = cols;
        if matches!(op, '>' | '<') {
            return indent(ctx, top, bottom, op == '>');
        }

        let mut spans = Vec::with_capacity(bottom - top + 1);
        for line in top..=bottom {
            let start = ctx.buffer.line_start(line)?;
            let len = ctx.buffer.line_content_len(line)?;
            spans.push((start + left.min(len), start + (right + 1).min(len)));
        }
        let mut pieces = Vec::with_capacity(spans.len());
        for &(start, end) in &spans {
            pieces.push(ctx.buffer.slice(start, end)?.to_string());
        }
        let reg = Register::char_wise(pieces.join("\n"));
        let origin = Position::new(top, left);
        let at = ctx.offset();

        match op {
            'y' => {
                ctx.registers.yank(self.register, reg);
                ctx.cursor.set_position(origin, ctx.buffer, false);
            }
            'd' | 'c' => {
                ctx.buffer.begin_group(at);
                for &(start, end) in spans.iter().rev() {
                    ctx.buffer.delete(start, end)?;
                }
                ctx.registers.delete(self.register, reg);
                let change = op == 'c';
                ctx.cursor.set_position(origin, ctx.buffer, change);
                if change {
                    self.replaced.clear();
                    self.state = ModeState::Insert;
                } else {
                    let after = ctx.offset();
                    ctx.buffer.end_group(after);
                }
            }
            '~' => {
                ctx.buffer.begin_group(at);
                for &(start, end) in &spans {
                    toggle_case_range(ctx.buffer, start, end)?;
                }
                ctx.buffer.end_group(at);
            }
            _ => return Ok(InputOutcome::Rejected),
        }
        Ok(InputOutcome::Completed)
    }

    // -- Command line -------------------------------------------------------

    fn command_line(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> InputOutcome {
        match key.code {
            KeyCode::Escape => self.cancel_command_line(),
            KeyCode::Char('c') if key.is_ctrl() => self.cancel_command_line(),
            KeyCode::Enter => {
                let line = self.cmdline.take();
                self.state = ModeState::Normal;
                if !line.trim().is_empty() {
                    ctx.request(ModeRequest::Ex(line));
                }
                InputOutcome::Completed
            }
            KeyCode::Backspace => {
                if self.cmdline.is_empty() {
                    return self.cancel_command_line();
                }
                self.cmdline.backspace();
                InputOutcome::Completed
            }
            KeyCode::Delete => {
                self.cmdline.delete();
                InputOutcome::Completed
            }
            KeyCode::Left => {
                self.cmdline.move_left();
                InputOutcome::Completed
            }
            KeyCode::Right => {
                self.cmdline.move_right();
                InputOutcome::Completed
            }
            KeyCode::Home => {
                self.cmdline.move_home();
                InputOutcome::Completed
            }
            KeyCode::End => {
                self.cmdline.move_end();
                InputOutcome::Completed
            }
            _ => match key.printable() {
                Some(ch) => {
                    self.cmdline.insert_char(ch);
                    InputOutcome::Completed
                }
                None => InputOutcome::Rejected,
            },
        }
    }

    fn cancel_command_line(&mut self) -> InputOutcome {
        self.cmdline.clear();
        self.state = ModeState::Normal;
        InputOutcome::Completed
    }
}

impl Mode for VimMode {
    fn name(&self) -> &str {
        "vim"
    }

    fn handle_input(&mut self, ctx: &mut ModeContext<'_>, key: KeyEvent) -> InputOutcome {
        self.keys.push_str(&key.to_string());
        let step = match self.state {
            ModeState::Normal => self.normal(ctx, key),
            ModeState::Visual(kind) => self.visual(ctx, key, kind),
            ModeState::Insert => self.insert(ctx, key),
            ModeState::Replace => self.replace(ctx, key),
            ModeState::CommandLine => Ok(self.command_line(ctx, key)),
        };

        let outcome = match step {
            Ok(outcome) => outcome,
            Err(err) => {
                ctx.request(ModeRequest::Message(err.to_string()));
                let at = ctx.offset();
                ctx.buffer.end_group(at);
                ctx.cursor.clear_anchor();
                self.state = ModeState::Normal;
                InputOutcome::Rejected
            }
        };
        match outcome {
            InputOutcome::Pending => {}
            InputOutcome::Completed => self.finish(),
            InputOutcome::Rejected => {
                trace!(keys = %self.keys, state = %self.state, "vim: sequence rejected");
                self.finish();
            }
        }

        let past_end = self.state.cursor_past_end();
        ctx.cursor.clamp(ctx.buffer, past_end);
        outcome
    }

    fn pre_display(&mut self, ctx: &mut ModeContext<'_>) {
        let past_end = self.state.cursor_past_end();
        ctx.cursor.clamp(ctx.buffer, past_end);
    }

    fn state(&self) -> ModeState {
        self.state
    }

    fn reset(&mut self) {
        self.finish();
        self.state = ModeState::Normal;
        self.cmdline.clear();
        self.replaced.clear();
    }

    fn command_text(&self) -> Option<&str> {
        (self.state == ModeState::CommandLine).then(|| self.cmdline.input())
    }

    fn pending_keys(&self) -> String {
        if self.pending.is_some() || self.count.is_some() || self.register.is_some() {
            self.keys.clone()
        } else {
            String::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `line + n`, clamped to the last line.
fn line_after(buf: &Buffer, line: usize, n: usize) -> usize {
    line.saturating_add(n).min(buf.line_count() - 1)
}

/// Up to `count` chars after (or before) the cursor without leaving the
/// line. `None` when there are none.
fn char_run(ctx: &ModeContext<'_>, count: usize, forward: bool) -> Result<Option<(usize, usize)>> {
    let line = ctx.cursor.line();
    let at = ctx.offset();
    let (start, end) = if forward {
        (at, at.saturating_add(count).min(ctx.buffer.line_content_end(line)?))
    } else {
        (at.saturating_sub(count).max(ctx.buffer.line_start(line)?), at)
    };
    Ok((start < end).then_some((start, end)))
}

fn window_command(ctx: &mut ModeContext<'_>, key: KeyEvent) -> InputOutcome {
    let KeyCode::Char(ch) = key.code else {
        return InputOutcome::Rejected;
    };
    let request = match ch {
        's' | 'S' => ModeRequest::Split(SplitAxis::Horizontal),
        'v' => ModeRequest::Split(SplitAxis::Vertical),
        'w' => ModeRequest::CycleWindow,
        'c' | 'q' => ModeRequest::CloseWindow,
        'h' => ModeRequest::Focus(Direction::Left),
        'j' => ModeRequest::Focus(Direction::Down),
        'k' => ModeRequest::Focus(Direction::Up),
        'l' => ModeRequest::Focus(Direction::Right),
        _ => return InputOutcome::Rejected,
    };
    ctx.request(request);
    InputOutcome::Completed
}

/// `f`/`t` after an operator: forward finds include the found char,
/// backward finds stop short of the cursor char.
fn char_find_target(ctx: &ModeContext<'_>, ch: char, kind: CharFindKind, count: usize) -> Option<Target> {
    let mut probe = ctx.cursor.clone();
    if !kind.apply(&mut probe, ctx.buffer, ch, count) {
        return None;
    }
    let from = ctx.offset();
    let to = probe.offset(ctx.buffer);
    Some(if kind.is_forward() {
        Target::Chars { start: from, end: to + 1 }
    } else {
        Target::Chars { start: to, end: from }
    })
}

/// End of `dw`: the start of the `n`th next word, pulled back to the end
/// of the last line moved over when the motion crosses a line break.
fn word_motion_end(buf: &Buffer, start: usize, line: usize, n: usize, big: bool) -> Result<usize> {
    let motion = if big { word::big_word_forward } else { word::word_forward };
    let mut end = repeat_motion(buf, start, n, motion);
    let end_line = buf.offset_to_line_col(end)?.line;
    if end_line > line {
        let prev_end = buf.line_content_end(end_line - 1)?;
        if prev_end > start {
            end = prev_end;
        }
    }
    Ok(end)
}

/// End of `cw` on a non-blank: like `ce`, except a cursor already on the
/// last char of a word changes only that word.
fn change_word_end(buf: &Buffer, start: usize, n: usize, big: bool) -> usize {
    let class = |offset: usize| -> Option<CharClass> {
        let ch = buf.char_at(offset)?;
        Some(if big { word::classify_big(ch) } else { word::classify(ch) })
    };
    let motion = if big { word::big_word_end_forward } else { word::word_end_forward };

    let mut end = start;
    if class(end + 1) == class(end) {
        end = motion(buf, end);
    }
    end = repeat_motion(buf, end, n - 1, motion);
    (end + 1).min(buf.len_chars())
}

/// Apply `motion` up to `n` times, stopping once it no longer moves.
fn repeat_motion(buf: &Buffer, start: usize, n: usize, motion: fn(&Buffer, usize) -> usize) -> usize {
    let mut at = start;
    for _ in 0..n {
        let next = motion(buf, at);
        if next == at {
            break;
        }
        at = next;
    }
    at
}

fn register_text(buf: &Buffer, target: Target) -> Result<Register> {
    match target {
        Target::Chars { start, end } => Ok(Register::char_wise(buf.slice(start, end)?.to_string())),
        Target::Lines { first, last } => {
            let start = buf.line_start(first)?;
            let end = if last + 1 < buf.line_count() {
                buf.line_start(last + 1)?
            } else {
                buf.len_chars()
            };
            let mut text = buf.slice(start, end)?.to_string();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            Ok(Register::line(text))
        }
    }
}

/// Offsets removed by a linewise delete. On the last line the preceding
/// line break goes instead of a following one.
fn line_delete_span(buf: &Buffer, first: usize, last: usize) -> Result<(usize, usize)> {
    if last + 1 < buf.line_count() {
        Ok((buf.line_start(first)?, buf.line_start(last + 1)?))
    } else if first > 0 {
        Ok((buf.line_content_end(first - 1)?, buf.len_chars()))
    } else {
        Ok((0, buf.len_chars()))
    }
}

/// Lines a target touches. A charwise end at column 0 does not count.
fn target_lines(buf: &Buffer, target: Target) -> Result<(usize, usize)> {
    match target {
        Target::Lines { first, last } => Ok((first, last)),
        Target::Chars { start, end } => {
            let first = buf.offset_to_line_col(start)?.line;
            let end = buf.offset_to_line_col(end)?;
            let last = if end.col == 0 && end.line > first {
                end.line - 1
            } else {
                end.line
            };
            Ok((first, last))
        }
    }
}

/// `>` adds one shift width to non-empty lines; `<` removes up to one
/// shift width of spaces, or a single tab.
fn indent(ctx: &mut ModeContext<'_>, first: usize, last: usize, right: bool) -> Step {
    let width = ctx.config.tab_width.max(1);
    let shift = " ".repeat(width);
    let at = ctx.offset();
    ctx.buffer.begin_group(at);

    for line in first..=last {
        let start = ctx.buffer.line_start(line)?;
        let len = ctx.buffer.line_content_len(line)?;
        if right {
            if len > 0 {
                ctx.buffer.insert(start, &shift)?;
            }
            continue;
        }
        let mut remove = 0;
        for ch in ctx.buffer.line(line)?.chars().take(width.min(len)) {
            match ch {
                '\t' if remove == 0 => {
                    remove = 1;
                    break;
                }
                ' ' => remove += 1,
                _ => break,
            }
        }
        ctx.buffer.delete(start, start + remove)?;
    }

    ctx.cursor.goto_line(first, ctx.buffer, false);
    let after = ctx.offset();
    ctx.buffer.end_group(after);
    Ok(InputOutcome::Completed)
}

/// Swap the case of `[start, end)`. Chars whose other case is not a single
/// char are left alone so offsets stay put.
fn toggle_case_range(buf: &mut Buffer, start: usize, end: usize) -> Result<()> {
    let text = buf.slice(start, end)?.to_string();
    let toggled: String = text.chars().map(toggle_char).collect();
    if toggled != text {
        buf.replace(start, end, &toggled)?;
    }
    Ok(())
}

fn toggle_char(ch: char) -> char {
    if ch.is_lowercase() {
        single_char(ch.to_uppercase()).unwrap_or(ch)
    } else if ch.is_uppercase() {
        single_char(ch.to_lowercase()).unwrap_or(ch)
    } else {
        ch
    }
}

/// The mapped char, unless the case mapping expands to several (`ß` → `SS`).
fn single_char(mut mapped: impl Iterator<Item = char>) -> Option<char> {
    match (mapped.next(), mapped.next()) {
        (Some(one), None) => Some(one),
        _ => None,
    }
}

fn type_text(ctx: &mut ModeContext<'_>, text: &str) -> Step {
    let at = ctx.offset();
    ctx.buffer.insert(at, text)?;
    ctx.cursor.set_offset(at + text.chars().count(), ctx.buffer, true);
    Ok(InputOutcome::Completed)
}

/// Arrow keys, Home and End inside insert and replace modes.
fn insert_motion(ctx: &mut ModeContext<'_>, code: KeyCode) -> bool {
    let buf = &*ctx.buffer;
    let cursor = &mut *ctx.cursor;
    match code {
        KeyCode::Left => cursor.move_left(1, buf, true),
        KeyCode::Right => cursor.move_right(1, buf, true),
        KeyCode::Up => cursor.move_up(1, buf, true),
        KeyCode::Down => cursor.move_down(1, buf, true),
        KeyCode::Home => cursor.move_to_line_start(),
        KeyCode::End => cursor.move_to_line_end(buf, true),
        _ => return false,
    }
    true
}

/// Start of the char (or `\r\n` pair) ending at `offset`.
fn break_start_before(buf: &Buffer, offset: usize) -> usize {
    if offset >= 2 && buf.char_at(offset - 1) == Some('\n') && buf.char_at(offset - 2) == Some('\r') {
        offset - 2
    } else {
        offset - 1
    }
}

/// End of the char (or `\r\n` pair) starting at `offset`.
fn break_end_after(buf: &Buffer, offset: usize) -> usize {
    if buf.char_at(offset) == Some('\r') && buf.char_at(offset + 1) == Some('\n') {
        offset + 2
    } else {
        offset + 1
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferId;
    use crate::config::EditorConfig;
    use crate::register::RegisterStore;
    use kestrel_input::parse_keys;
    use pretty_assertions::assert_eq;

    struct Rig {
        buf: Buffer,
        cursor: Cursor,
        regs: RegisterStore,
        config: EditorConfig,
        requests: Vec<ModeRequest>,
        vim: VimMode,
    }

    impl Rig {
        fn new(text: &str) -> Self {
            Self {
                buf: Buffer::from_text(BufferId(1), "test", text),
                cursor: Cursor::new(),
                regs: RegisterStore::new(),
                config: EditorConfig::default(),
                requests: Vec::new(),
                vim: VimMode::new(),
            }
        }

        fn at(mut self, line: usize, col: usize) -> Self {
            self.cursor = Cursor::at(Position::new(line, col));
            self
        }

        /// Feed keys in vim notation and return the last outcome.
        fn feed(&mut self, keys: &str) -> InputOutcome {
            let mut last = InputOutcome::Completed;
            for key in parse_keys(keys).unwrap() {
                let mut ctx = ModeContext {
                    buffer: &mut self.buf,
                    cursor: &mut self.cursor,
                    registers: &mut self.regs,
                    config: &self.config,
                    requests: &mut self.requests,
                };
                last = self.vim.handle_input(&mut ctx, key);
            }
            last
        }

        fn text(&self) -> String {
            self.buf.contents()
        }

        fn pos(&self) -> (usize, usize) {
            (self.cursor.line(), self.cursor.col())
        }

        fn unnamed(&self) -> Register {
            self.regs.get(UNNAMED)
        }
    }

    // -- Operators ----------------------------------------------------------

    #[test]
    fn dw_deletes_word_into_unnamed() {
        let mut rig = Rig::new("hello world");
        assert_eq!(rig.feed("dw"), InputOutcome::Completed);
        assert_eq!(rig.text(), "world");
        assert_eq!(rig.unnamed(), Register::char_wise("hello "));
        assert_eq!(rig.pos(), (0, 0));
    }

    #[test]
    fn dw_at_line_end_keeps_line_break() {
        let mut rig = Rig::new("foo\n  bar");
        rig.feed("dw");
        assert_eq!(rig.text(), "\n  bar");
    }

    #[test]
    fn counts_multiply() {
        let mut rig = Rig::new("a b c d e f g h");
        rig.feed("2d3w");
        assert_eq!(rig.text(), "g h");
    }

    #[test]
    fn pending_then_completed() {
        let mut rig = Rig::new("abc");
        assert_eq!(rig.feed("2"), InputOutcome::Pending);
        assert_eq!(rig.feed("d"), InputOutcome::Pending);
        assert_eq!(rig.vim.pending_keys(), "2d");
        assert_eq!(rig.feed("l"), InputOutcome::Completed);
        assert_eq!(rig.text(), "c");
        assert_eq!(rig.vim.pending_keys(), "");
    }

    #[test]
    fn rejected_sequence_changes_nothing() {
        let mut rig = Rig::new("abc");
        assert_eq!(rig.feed("dq"), InputOutcome::Rejected);
        assert_eq!(rig.text(), "abc");
        assert_eq!(rig.vim.pending_keys(), "");
        // The grammar is back at rest.
        rig.feed("x");
        assert_eq!(rig.text(), "bc");
    }

    #[test]
    fn dd_with_count() {
        let mut rig = Rig::new("one\ntwo\nthree");
        rig.feed("2dd");
        assert_eq!(rig.text(), "three");
        assert_eq!(rig.unnamed(), Register::line("one\ntwo\n"));
    }

    #[test]
    fn dd_on_last_line_takes_previous_break() {
        let mut rig = Rig::new("one\ntwo").at(1, 0);
        rig.feed("dd");
        assert_eq!(rig.text(), "one");
        assert_eq!(rig.unnamed(), Register::line("two\n"));
        assert_eq!(rig.pos(), (0, 0));
    }

    #[test]
    fn dollar_and_capital_d() {
        let mut rig = Rig::new("hello world").at(0, 6);
        rig.feed("D");
        assert_eq!(rig.text(), "hello ");
        assert_eq!(rig.pos(), (0, 5));

        let mut rig = Rig::new("abc def");
        rig.feed("d$");
        assert_eq!(rig.text(), "");
    }

    #[test]
    fn dl_on_last_char() {
        let mut rig = Rig::new("ab").at(0, 1);
        rig.feed("dl");
        assert_eq!(rig.text(), "a");
    }

    #[test]
    fn de_is_inclusive_db_is_exclusive() {
        let mut rig = Rig::new("foo bar");
        rig.feed("de");
        assert_eq!(rig.text(), " bar");

        let mut rig = Rig::new("foo bar").at(0, 4);
        rig.feed("db");
        assert_eq!(rig.text(), "bar");
    }

    #[test]
    fn char_find_operators() {
        let mut rig = Rig::new("a.b.c");
        rig.feed("d2f.");
        assert_eq!(rig.text(), "c");

        let mut rig = Rig::new("abc,d");
        rig.feed("dt,");
        assert_eq!(rig.text(), ",d");

        let mut rig = Rig::new("abc,d");
        assert_eq!(rig.feed("dfz"), InputOutcome::Rejected);
        assert_eq!(rig.text(), "abc,d");
    }

    #[test]
    fn dgg_and_dg() {
        let mut rig = Rig::new("a\nb\nc").at(1, 0);
        rig.feed("dG");
        assert_eq!(rig.text(), "a");

        let mut rig = Rig::new("a\nb\nc").at(1, 0);
        rig.feed("dgg");
        assert_eq!(rig.text(), "c");
    }

    #[test]
    fn yank_and_put_lines() {
        let mut rig = Rig::new("one\ntwo");
        rig.feed("yyp");
        assert_eq!(rig.text(), "one\none\ntwo");
        assert_eq!(rig.pos(), (1, 0));

        let mut rig = Rig::new("one");
        rig.feed("yyp");
        assert_eq!(rig.text(), "one\none");

        let mut rig = Rig::new("one\ntwo").at(1, 0);
        rig.feed("yyP");
        assert_eq!(rig.text(), "one\ntwo\ntwo");
        assert_eq!(rig.pos(), (1, 0));
    }

    #[test]
    fn put_chars_after_and_before() {
        let mut rig = Rig::new("abc");
        rig.feed("xp");
        assert_eq!(rig.text(), "bac");
        assert_eq!(rig.pos(), (0, 1));

        let mut rig = Rig::new("ab");
        rig.feed("yl2P");
        assert_eq!(rig.text(), "aaab");
        assert_eq!(rig.pos(), (0, 1));
    }

    #[test]
    fn put_from_empty_register_is_rejected() {
        let mut rig = Rig::new("abc");
        assert_eq!(rig.feed("p"), InputOutcome::Rejected);
    }

    #[test]
    fn named_register() {
        let mut rig = Rig::new("one\ntwo");
        rig.feed("\"ayyj\"ap");
        assert_eq!(rig.text(), "one\ntwo\none");
        assert_eq!(rig.regs.get('a'), Register::line("one\n"));
    }

    #[test]
    fn indent_and_outdent() {
        let mut rig = Rig::new("a\nb");
        rig.feed("2>>");
        assert_eq!(rig.text(), "    a\n    b");
        assert_eq!(rig.pos(), (0, 4));
        rig.feed("<<");
        assert_eq!(rig.text(), "a\n    b");

        let mut rig = Rig::new("a\nb");
        rig.feed(">j");
        assert_eq!(rig.text(), "    a\n    b");

        let mut rig = Rig::new("\tx");
        rig.feed("<<");
        assert_eq!(rig.text(), "x");
    }

    // -- Single commands ----------------------------------------------------

    #[test]
    fn x_and_capital_x() {
        let mut rig = Rig::new("abcd").at(0, 2);
        rig.feed("5x");
        assert_eq!(rig.text(), "ab");
        assert_eq!(rig.pos(), (0, 1));

        let mut rig = Rig::new("abcd").at(0, 2);
        rig.feed("X");
        assert_eq!(rig.text(), "acd");
        assert_eq!(rig.pos(), (0, 1));

        let mut rig = Rig::new("");
        assert_eq!(rig.feed("x"), InputOutcome::Rejected);
    }

    #[test]
    fn join_lines() {
        let mut rig = Rig::new("one\n   two");
        rig.feed("J");
        assert_eq!(rig.text(), "one two");
        assert_eq!(rig.pos(), (0, 3));

        let mut rig = Rig::new("a\nb\nc");
        rig.feed("3J");
        assert_eq!(rig.text(), "a b c");

        let mut rig = Rig::new("a\n");
        rig.feed("J");
        assert_eq!(rig.text(), "a");

        let mut rig = Rig::new("only");
        assert_eq!(rig.feed("J"), InputOutcome::Rejected);
    }

    #[test]
    fn toggle_case_and_replace_char() {
        let mut rig = Rig::new("abC");
        rig.feed("3~");
        assert_eq!(rig.text(), "ABc");

        let mut rig = Rig::new("ßaÉ");
        rig.feed("3~");
        assert_eq!(rig.text(), "ßAé");

        let mut rig = Rig::new("abc");
        rig.feed("2rx");
        assert_eq!(rig.text(), "xxc");
        assert_eq!(rig.pos(), (0, 1));
        assert_eq!(rig.feed("5ry"), InputOutcome::Rejected);
        assert_eq!(rig.text(), "xxc");
    }

    #[test]
    fn motions() {
        let mut rig = Rig::new("a\nb\nc");
        rig.feed("G");
        assert_eq!(rig.pos(), (2, 0));
        rig.feed("gg");
        assert_eq!(rig.pos(), (0, 0));
        rig.feed("2G");
        assert_eq!(rig.pos(), (1, 0));

        let mut rig = Rig::new("a,b,c,d");
        rig.feed("f,");
        assert_eq!(rig.pos(), (0, 1));
        rig.feed(";");
        assert_eq!(rig.pos(), (0, 3));
        rig.feed(",");
        assert_eq!(rig.pos(), (0, 1));
        rig.feed("$");
        assert_eq!(rig.pos(), (0, 6));
        rig.feed("0");
        assert_eq!(rig.pos(), (0, 0));
    }

    #[test]
    fn motions_leave_text_alone() {
        let mut rig = Rig::new("fn main() {\n    let x = 1;\n}\n").at(1, 4);
        let generation = rig.buf.generation();
        rig.feed("wbeWBE3l2hjkG0$gg^jf;F t;Tl;,");
        assert_eq!(rig.text(), "fn main() {\n    let x = 1;\n}\n");
        assert_eq!(rig.buf.generation(), generation);
        assert!(!rig.buf.is_dirty());
    }

    // -- Huge counts --------------------------------------------------------

    const HUGE: &str = "99999999999999999999";

    #[test]
    fn huge_counts_clamp_cursor_motions() {
        let mut rig = Rig::new("abc\nd\nef");
        rig.feed(&format!("j{HUGE}j"));
        assert_eq!(rig.pos(), (2, 0));
        rig.feed(&format!("{HUGE}l"));
        assert_eq!(rig.pos(), (2, 1));
        rig.feed(&format!("{HUGE}k{HUGE}w"));
        assert_eq!(rig.pos(), (2, 1));
        rig.feed(&format!("{HUGE}b"));
        assert_eq!(rig.pos(), (0, 0));
        rig.feed(&format!("{HUGE}e"));
        assert_eq!(rig.pos(), (2, 1));
        assert_eq!(rig.text(), "abc\nd\nef");
    }

    #[test]
    fn huge_counts_after_operators_stop_at_buffer_edges() {
        let mut rig = Rig::new("one two three");
        rig.feed(&format!("d{HUGE}w"));
        assert_eq!(rig.text(), "");

        let mut rig = Rig::new("one two three").at(0, 4);
        rig.feed(&format!("d{HUGE}b"));
        assert_eq!(rig.text(), "two three");

        let mut rig = Rig::new("one two three");
        rig.feed(&format!("d{HUGE}e"));
        assert_eq!(rig.text(), "");

        let mut rig = Rig::new("one two three");
        rig.feed(&format!("c{HUGE}wx<Esc>"));
        assert_eq!(rig.text(), "x");
    }

    #[test]
    fn huge_counts_reject_replace_and_put() {
        let mut rig = Rig::new("abc");
        assert_eq!(rig.feed(&format!("l{HUGE}rx")), InputOutcome::Rejected);
        assert_eq!(rig.text(), "abc");

        assert_eq!(rig.feed(&format!("yl{HUGE}p")), InputOutcome::Rejected);
        assert_eq!(rig.text(), "abc");
        assert_eq!(rig.feed("2p"), InputOutcome::Completed);
        assert_eq!(rig.text(), "abbbc");

        rig.feed(&format!("{HUGE}u"));
        assert_eq!(rig.text(), "abc");
        rig.feed(&format!("0{HUGE}~"));
        assert_eq!(rig.text(), "ABC");
        rig.feed(&format!("0{HUGE}x"));
        assert_eq!(rig.text(), "");
    }

    // -- Undo grouping ------------------------------------------------------

    #[test]
    fn one_group_per_command() {
        let mut rig = Rig::new("abcd");
        rig.feed("xx");
        assert_eq!(rig.text(), "cd");
        rig.feed("u");
        assert_eq!(rig.text(), "bcd");
        rig.feed("u");
        assert_eq!(rig.text(), "abcd");
        assert_eq!(rig.feed("u"), InputOutcome::Completed);
        assert_eq!(rig.text(), "abcd");
        rig.feed("2<C-r>");
        assert_eq!(rig.text(), "cd");
    }

    #[test]
    fn insert_session_is_one_group() {
        let mut rig = Rig::new("x");
        rig.feed("iab<CR>c<Esc>");
        assert_eq!(rig.text(), "ab\ncx");
        assert_eq!(rig.pos(), (1, 0));
        rig.feed("u");
        assert_eq!(rig.text(), "x");
    }

    #[test]
    fn change_word_is_one_group() {
        let mut rig = Rig::new("foo bar");
        rig.feed("cwbaz<Esc>");
        assert_eq!(rig.text(), "baz bar");
        assert_eq!(rig.pos(), (0, 2));
        assert_eq!(rig.unnamed(), Register::char_wise("foo"));
        rig.feed("u");
        assert_eq!(rig.text(), "foo bar");
        rig.feed("<C-r>");
        assert_eq!(rig.text(), "baz bar");
    }

    #[test]
    fn change_line_and_to_end() {
        let mut rig = Rig::new("one\ntwo");
        rig.feed("ccnew<Esc>");
        assert_eq!(rig.text(), "new\ntwo");

        let mut rig = Rig::new("abc def").at(0, 4);
        rig.feed("Cxyz<Esc>");
        assert_eq!(rig.text(), "abc xyz");
    }

    // -- Insert & replace ---------------------------------------------------

    #[test]
    fn insert_entries() {
        let mut rig = Rig::new("bc");
        rig.feed("ia<Esc>");
        assert_eq!(rig.text(), "abc");
        rig.feed("Ad<Esc>");
        assert_eq!(rig.text(), "abcd");
        assert_eq!(rig.pos(), (0, 3));

        let mut rig = Rig::new("a");
        rig.feed("ob<Esc>");
        assert_eq!(rig.text(), "a\nb");
        rig.feed("Oz<Esc>");
        assert_eq!(rig.text(), "a\nz\nb");
    }

    #[test]
    fn insert_backspace_joins_lines() {
        let mut rig = Rig::new("ab\ncd").at(1, 0);
        rig.feed("i<BS><Esc>");
        assert_eq!(rig.text(), "abcd");
        assert_eq!(rig.pos(), (0, 1));
    }

    #[test]
    fn replace_mode_restores_on_backspace() {
        let mut rig = Rig::new("abc");
        rig.feed("Rxy<BS><Esc>");
        assert_eq!(rig.text(), "xbc");
        assert_eq!(rig.pos(), (0, 0));

        let mut rig = Rig::new("ab");
        rig.feed("Rxyz<Esc>");
        assert_eq!(rig.text(), "xyz");
        rig.feed("u");
        assert_eq!(rig.text(), "ab");
    }

    // -- Visual -------------------------------------------------------------

    #[test]
    fn visual_char() {
        let mut rig = Rig::new("hello world");
        rig.feed("vey");
        assert_eq!(rig.unnamed(), Register::char_wise("hello"));
        assert_eq!(rig.vim.state(), ModeState::Normal);
        assert_eq!(rig.cursor.anchor(), None);

        let mut rig = Rig::new("hello world");
        rig.feed("vlld");
        assert_eq!(rig.text(), "lo world");
    }

    #[test]
    fn visual_line_and_swap() {
        let mut rig = Rig::new("a\nb\nc");
        rig.feed("Vjd");
        assert_eq!(rig.text(), "c");
        assert_eq!(rig.unnamed(), Register::line("a\nb\n"));

        let mut rig = Rig::new("abc");
        rig.feed("vllo");
        assert_eq!(rig.pos(), (0, 0));
        assert_eq!(rig.cursor.anchor(), Some(Position::new(0, 2)));
    }

    #[test]
    fn visual_block_delete() {
        let mut rig = Rig::new("abc\ndef\nghi");
        rig.feed("<C-v>jld");
        assert_eq!(rig.text(), "c\nf\nghi");
        assert_eq!(rig.unnamed(), Register::char_wise("ab\nde"));
        assert_eq!(rig.pos(), (0, 0));
    }

    #[test]
    fn visual_toggle_kinds() {
        let mut rig = Rig::new("abc");
        rig.feed("v");
        assert_eq!(rig.vim.state(), ModeState::Visual(VisualKind::Char));
        rig.feed("V");
        assert_eq!(rig.vim.state(), ModeState::Visual(VisualKind::Line));
        rig.feed("V");
        assert_eq!(rig.vim.state(), ModeState::Normal);
    }

    // -- Command line & requests --------------------------------------------

    #[test]
    fn command_line_emits_ex() {
        let mut rig = Rig::new("");
        rig.feed(":w");
        assert_eq!(rig.vim.state(), ModeState::CommandLine);
        assert_eq!(rig.vim.command_text(), Some("w"));
        rig.feed("<CR>");
        assert_eq!(rig.requests, vec![ModeRequest::Ex("w".into())]);
        assert_eq!(rig.vim.state(), ModeState::Normal);

        rig.feed(":<BS>");
        assert_eq!(rig.vim.state(), ModeState::Normal);
        assert_eq!(rig.requests.len(), 1);
    }

    #[test]
    fn window_and_tab_requests() {
        let mut rig = Rig::new("");
        rig.feed("<C-w>v<C-w>jgtgT");
        assert_eq!(
            rig.requests,
            vec![
                ModeRequest::Split(SplitAxis::Vertical),
                ModeRequest::Focus(Direction::Down),
                ModeRequest::NextTab,
                ModeRequest::PreviousTab,
            ]
        );
    }

    #[test]
    fn read_only_buffer_rejects_edits() {
        let mut rig = Rig::new("abc");
        rig.buf.set_read_only(true);
        assert_eq!(rig.feed("x"), InputOutcome::Rejected);
        assert_eq!(rig.text(), "abc");
        assert!(matches!(rig.requests.as_slice(), [ModeRequest::Message(_)]));
        assert_eq!(rig.unnamed(), Register::default());
    }
}
