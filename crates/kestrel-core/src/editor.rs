//! The editor: owner of every buffer, tab, mode and register.
//!
//! The host drives it with four calls:
//!
//! | Call                        | Effect                                          |
//! |-----------------------------|-------------------------------------------------|
//! | [`handle_event`](Editor::handle_event) | route a key, mouse event or paste    |
//! | [`tick`](Editor::tick)      | advance timers and collect syntax results       |
//! | [`display`](Editor::display)| paint the active tab's windows                  |
//! | [`update_size`](Editor::update_size) | re-lay tabs for a new viewport         |
//!
//! Keys reach the current [`Mode`] together with the active window's cursor
//! and buffer. Anything a mode cannot do by itself (ex commands, window
//! splits, mode switches) comes back as a [`ModeRequest`] and is carried out
//! here, after the key.
//!
//! Ex commands answer the way vim does: an `Ok` result may carry a message,
//! an `Err` result always does, and the message lands in
//! [`messages`](Editor::messages).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Weak;
use std::sync::Arc;
use std::time::Duration;

use kestrel_input::{Event, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use tracing::{debug, info, warn};

use crate::buffer::{Buffer, BufferId, is_line_break};
use crate::command::{Command, parse_command};
use crate::config::{EditorConfig, EditorFlags};
use crate::error::{HostError, HostResult};
use crate::highlight::RustSyntax;
use crate::host::{Clipboard, Display, FileSystem, NoClipboard, StdFileSystem, WindowFrame};
use crate::mode::{InputOutcome, Mode, ModeContext, ModeRegistry, ModeRequest, ModeState};
use crate::notify::{Bus, Message, Subscriber, SubscriberToken};
use crate::options::apply_set;
use crate::register::{Register, RegisterStore, UNNAMED};
use crate::split::{Rect, SplitAxis};
use crate::standard::StandardMode;
use crate::syntax::{SyntaxProvider, SyntaxRegistry};
use crate::tab::{TabId, TabWindow};
use crate::timer::Timer;
use crate::vim::VimMode;
use crate::window::{Window, WindowId, gutter_width};
use crate::worker::{SyntaxJob, SyntaxResult, SyntaxWorker};

/// Name given to buffers that have no file.
pub const SCRATCH_NAME: &str = "[No Name]";

/// Seconds the pointer must rest before a `ToolTip` is broadcast.
const TOOLTIP_DELAY: f32 = 0.5;

/// Upper bound on syntax worker threads.
const MAX_SYNTAX_THREADS: usize = 4;

/// Oldest entries are dropped past this many messages or history lines.
const MAX_MESSAGES: usize = 100;
const MAX_COMMAND_HISTORY: usize = 100;

// ---------------------------------------------------------------------------
// CommandResult
// ---------------------------------------------------------------------------

/// Outcome of one ex command.
enum CommandResult {
    Ok(Option<String>),
    Err(String),
    Quit,
}

/// What a mode call operates on.
enum ModeCall {
    Key(KeyEvent),
    PreDisplay,
}

/// What came back from a mode call.
struct Dispatch {
    outcome: InputOutcome,
    buffer: BufferId,
    changed: bool,
    requests: Vec<ModeRequest>,
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

pub struct Editor {
    buffers: VecDeque<Buffer>,
    /// Most recently shown first.
    mru: Vec<BufferId>,
    tabs: Vec<TabWindow>,
    active_tab: usize,
    modes: ModeRegistry,
    registers: RegisterStore,
    bus: Bus,
    config: EditorConfig,
    flags: EditorFlags,
    fs: Box<dyn FileSystem>,
    clipboard: Box<dyn Clipboard>,
    syntax: SyntaxRegistry,
    worker: Option<SyntaxWorker>,
    viewport: Rect,

    // -- Timers --
    blink: Timer,
    last_edit: Timer,
    mouse_rest: Timer,
    tooltip_sent: bool,

    // -- Pointer --
    mouse: Option<(u16, u16)>,
    drag: Option<WindowId>,

    // -- User-facing state --
    messages: Vec<String>,
    command_history: Vec<String>,
    refresh: bool,
    quit: bool,

    next_buffer: u64,
    next_window: u64,
    next_tab: u64,
}

impl Editor {
    // -- Construction -------------------------------------------------------

    /// An editor with no buffers or tabs, the vim grammar as the global
    /// mode and the standard grammar as secondary.
    #[must_use]
    pub fn new(config: EditorConfig, flags: EditorFlags) -> Self {
        let mut modes = ModeRegistry::new();
        modes.register(Box::new(VimMode::new()));
        modes.register(Box::new(StandardMode::new()));
        if let Err(e) = modes.set_secondary("standard") {
            warn!(error = %e, "standard mode missing");
        }

        let mut syntax = SyntaxRegistry::new();
        match RustSyntax::new() {
            Some(rust) => {
                let provider: Arc<dyn SyntaxProvider> = Arc::new(rust);
                syntax.register(["rs"], &provider);
            }
            None => warn!("rust highlight query failed to compile"),
        }

        Self {
            buffers: VecDeque::new(),
            mru: Vec::new(),
            tabs: Vec::new(),
            active_tab: 0,
            modes,
            registers: RegisterStore::new(),
            bus: Bus::new(),
            config,
            flags,
            fs: Box::new(StdFileSystem),
            clipboard: Box::new(NoClipboard),
            syntax,
            worker: None,
            viewport: Rect::new(0, 0, 80, 24),
            blink: Timer::new(),
            last_edit: Timer::new(),
            mouse_rest: Timer::new(),
            tooltip_sent: false,
            mouse: None,
            drag: None,
            messages: Vec::new(),
            command_history: Vec::new(),
            refresh: true,
            quit: false,
            next_buffer: 1,
            next_window: 1,
            next_tab: 1,
        }
    }

    #[must_use]
    pub fn with_file_system(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    #[must_use]
    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> EditorFlags {
        self.flags
    }

    /// Replace the whole configuration.
    pub fn set_config(&mut self, config: EditorConfig) {
        self.config = config;
        self.config_changed();
    }

    fn config_changed(&mut self) {
        let tab_width = self.config.tab_width;
        for buf in &mut self.buffers {
            buf.set_tab_width(tab_width);
        }
        self.scroll_active();
        self.bus.broadcast(&Message::ConfigChanged);
        self.refresh = true;
    }

    // -- Buffers ------------------------------------------------------------

    const fn alloc_buffer_id(&mut self) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        id
    }

    const fn alloc_window_id(&mut self) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window += 1;
        id
    }

    fn add_buffer(&mut self, mut buf: Buffer) -> BufferId {
        let id = buf.id();
        buf.set_tab_width(self.config.tab_width);
        debug!(buffer = %id, name = buf.name(), "buffer added");
        self.buffers.push_back(buf);
        self.mru.push(id);
        self.bus.broadcast(&Message::BufferAdded(id));
        self.queue_syntax(id);
        id
    }

    fn touch(&mut self, id: BufferId) {
        self.mru.retain(|b| *b != id);
        self.mru.insert(0, id);
    }

    /// Create a buffer holding `text` and show it in the active window,
    /// opening a tab if there is none.
    pub fn init_with_text(&mut self, name: &str, text: &str) -> BufferId {
        let id = self.alloc_buffer_id();
        self.add_buffer(Buffer::from_text(id, name, text));
        self.show_buffer(id);
        id
    }

    /// Open `path` (empty if missing) and show it in the active window.
    ///
    /// # Errors
    ///
    /// `Io` if the file exists but cannot be read.
    pub fn init_with_file(&mut self, path: &Path) -> HostResult<BufferId> {
        let id = self.get_file_buffer(path, true)?;
        self.show_buffer(id);
        Ok(id)
    }

    /// The buffer for `path`, loading it if no buffer has it yet. A missing
    /// file gives an empty buffer with that path when `create` is set.
    ///
    /// # Errors
    ///
    /// `Io` if reading fails, or the file is missing and `create` is unset.
    pub fn get_file_buffer(&mut self, path: &Path, create: bool) -> HostResult<BufferId> {
        let path = normalize(path);
        if let Some(buf) = self.buffers.iter().find(|b| b.path() == Some(path.as_path())) {
            return Ok(buf.id());
        }

        let buf = if self.fs.exists(&path) {
            let text = self.fs.read(&path)?;
            let id = self.alloc_buffer_id();
            info!(path = %path.display(), chars = text.len(), "loaded file");
            Buffer::from_disk(id, &path, &text)
        } else if create {
            let id = self.alloc_buffer_id();
            let mut buf = Buffer::new(id, file_label(&path));
            buf.set_path(path);
            buf
        } else {
            return Err(HostError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: no such file", path.display()),
            )));
        };
        Ok(self.add_buffer(buf))
    }

    /// A fresh empty buffer. Each call creates a new one.
    pub fn get_empty_buffer(&mut self, name: &str) -> BufferId {
        let id = self.alloc_buffer_id();
        self.add_buffer(Buffer::new(id, name))
    }

    /// Drop a buffer. Windows showing it switch to the most recently used
    /// survivor, or to a new empty buffer when none is left.
    ///
    /// # Errors
    ///
    /// `UnknownBuffer` if `id` is not open.
    pub fn remove_buffer(&mut self, id: BufferId) -> HostResult<()> {
        let index = self
            .buffers
            .iter()
            .position(|b| b.id() == id)
            .ok_or(HostError::UnknownBuffer)?;
        self.buffers.remove(index);
        self.mru.retain(|b| *b != id);

        let shown = self
            .tabs
            .iter()
            .any(|t| !t.find_windows(id).is_empty());
        if shown {
            let replacement = match self.mru.first().copied() {
                Some(survivor) => survivor,
                None => self.get_empty_buffer(SCRATCH_NAME),
            };
            for tab in &mut self.tabs {
                for window in tab.windows_mut() {
                    if window.buffer_id() == id {
                        window.set_buffer(replacement);
                    }
                }
            }
            self.touch(replacement);
        }

        debug!(buffer = %id, "buffer removed");
        self.bus.broadcast(&Message::BufferRemoved(id));
        self.refresh = true;
        Ok(())
    }

    pub fn buffers(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    #[must_use]
    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.id() == id)
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.iter_mut().find(|b| b.id() == id)
    }

    /// The most recently shown buffer.
    #[must_use]
    pub fn mru_buffer(&self) -> Option<BufferId> {
        self.mru.first().copied()
    }

    /// Every window, in any tab, showing `id`.
    #[must_use]
    pub fn find_buffer_windows(&self, id: BufferId) -> Vec<(TabId, WindowId)> {
        self.tabs
            .iter()
            .flat_map(|t| t.find_windows(id).into_iter().map(move |w| (t.id(), w)))
            .collect()
    }

    /// Write a buffer to its path. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// `UnknownBuffer`, `NoPath` for a buffer without a file, or `Io`.
    pub fn save_buffer(&mut self, id: BufferId) -> HostResult<usize> {
        let buf = self
            .buffers
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or(HostError::UnknownBuffer)?;
        let path = buf.path().ok_or(HostError::NoPath)?.to_path_buf();
        let text = buf.to_disk_string();
        self.fs.write(&path, &text)?;
        buf.mark_saved();
        info!(buffer = %id, path = %path.display(), bytes = text.len(), "saved");
        Ok(text.len())
    }

    /// The host saw `path` change on disk. Matching buffers are flagged;
    /// nothing is reloaded. Returns whether any buffer matched.
    pub fn on_file_changed(&mut self, path: &Path) -> bool {
        let path = normalize(path);
        let mut hits = Vec::new();
        for buf in &mut self.buffers {
            if buf.path() == Some(path.as_path()) {
                buf.set_externally_modified(true);
                hits.push(buf.id());
            }
        }
        for id in &hits {
            debug!(buffer = %id, path = %path.display(), "externally modified");
            self.bus.broadcast(&Message::BufferExternallyModified(*id));
        }
        !hits.is_empty()
    }

    /// Show `id` in the active window, opening a tab if there is none.
    fn show_buffer(&mut self, id: BufferId) {
        if self.tabs.is_empty() {
            self.touch(id);
            self.add_tab_window();
        } else if let Some(window) = self.active_window_mut() {
            if window.buffer_id() != id {
                window.set_buffer(id);
            }
        }
        self.touch(id);
        self.scroll_active();
        self.refresh = true;
    }

    fn active_buffer_id(&self) -> Option<BufferId> {
        self.active_window().map(Window::buffer_id)
    }

    /// The buffer shown in the active window.
    #[must_use]
    pub fn active_buffer(&self) -> Option<&Buffer> {
        self.buffer(self.active_buffer_id()?)
    }

    // -- Modes --------------------------------------------------------------

    /// Add a mode. A mode with the same name is replaced.
    pub fn register_mode(&mut self, mode: Box<dyn Mode>) {
        debug!(mode = mode.name(), "mode registered");
        self.modes.register(mode);
    }

    /// Make `name` the global mode. The old mode drops anything pending.
    ///
    /// # Errors
    ///
    /// `UnknownMode` if no mode has that name.
    pub fn set_global_mode(&mut self, name: &str) -> HostResult<()> {
        self.modes.set_current(name)?;
        let past_end = self.past_end();
        let tab = self.active_tab;
        if let Some(window) = self.tabs.get_mut(tab).and_then(TabWindow::active_window_mut) {
            let id = window.buffer_id();
            if let Some(buf) = self.buffers.iter().find(|b| b.id() == id) {
                window.revalidate(buf, past_end);
            }
        }
        debug!(mode = name, "global mode changed");
        self.bus.broadcast(&Message::ModeChanged(name.to_string()));
        self.refresh = true;
        Ok(())
    }

    /// # Errors
    ///
    /// `UnknownMode` if no mode has that name.
    pub fn set_secondary_mode(&mut self, name: &str) -> HostResult<()> {
        self.modes.set_secondary(name)
    }

    #[must_use]
    pub fn global_mode(&self) -> Option<&dyn Mode> {
        self.modes.current()
    }

    #[must_use]
    pub fn secondary_mode(&self) -> Option<&dyn Mode> {
        self.modes.secondary()
    }

    /// State of the global mode (Normal when there is none).
    #[must_use]
    pub fn mode_state(&self) -> ModeState {
        self.modes.current().map(Mode::state).unwrap_or_default()
    }

    fn past_end(&self) -> bool {
        self.mode_state().cursor_past_end()
    }

    /// The `:` line being typed, if any.
    #[must_use]
    pub fn command_text(&self) -> Option<&str> {
        self.modes.current()?.command_text()
    }

    /// Keys of an unfinished command, for a status display.
    #[must_use]
    pub fn pending_keys(&self) -> String {
        self.modes.current().map(Mode::pending_keys).unwrap_or_default()
    }

    // -- Tabs ---------------------------------------------------------------

    /// Open a tab with one window on the most recent buffer (or a new empty
    /// one) and make it current.
    pub fn add_tab_window(&mut self) -> TabId {
        let buffer = match self.mru_buffer() {
            Some(id) => id,
            None => self.get_empty_buffer(SCRATCH_NAME),
        };
        let id = TabId(self.next_tab);
        self.next_tab += 1;
        let window = Window::new(self.alloc_window_id(), buffer);
        let mut tab = TabWindow::new(id, window);
        tab.layout(self.viewport);
        self.tabs.push(tab);
        self.active_tab = self.tabs.len() - 1;
        debug!(tab = id.0, "tab added");
        self.refresh = true;
        id
    }

    /// Close a tab and its windows. Returns false for an unknown tab.
    pub fn remove_tab_window(&mut self, id: TabId) -> bool {
        let Some(index) = self.tabs.iter().position(|t| t.id() == id) else {
            return false;
        };
        self.tabs.remove(index);
        if index < self.active_tab || self.active_tab >= self.tabs.len() {
            self.active_tab = self.active_tab.saturating_sub(1);
        }
        debug!(tab = id.0, "tab removed");
        self.refresh = true;
        true
    }

    pub fn next_tab_window(&mut self) {
        if !self.tabs.is_empty() {
            self.active_tab = (self.active_tab + 1) % self.tabs.len();
            self.refresh = true;
        }
    }

    pub fn previous_tab_window(&mut self) {
        if !self.tabs.is_empty() {
            self.active_tab = (self.active_tab + self.tabs.len() - 1) % self.tabs.len();
            self.refresh = true;
        }
    }

    /// Returns false for an unknown tab.
    pub fn set_current_tab_window(&mut self, id: TabId) -> bool {
        match self.tabs.iter().position(|t| t.id() == id) {
            Some(index) => {
                self.active_tab = index;
                self.refresh = true;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn active_tab_window(&self) -> Option<&TabWindow> {
        self.tabs.get(self.active_tab)
    }

    pub fn active_tab_window_mut(&mut self) -> Option<&mut TabWindow> {
        self.tabs.get_mut(self.active_tab)
    }

    #[must_use]
    pub fn tab_windows(&self) -> &[TabWindow] {
        &self.tabs
    }

    /// Label for a tab: its explicit name, else the active window's buffer
    /// name (only the file name part with `short_tab_names`).
    #[must_use]
    pub fn tab_name(&self, id: TabId) -> Option<String> {
        let tab = self.tabs.iter().find(|t| t.id() == id)?;
        if let Some(name) = tab.name() {
            return Some(name.to_string());
        }
        let buf = self.buffer(tab.active_window()?.buffer_id())?;
        let name = if self.config.short_tab_names {
            Path::new(buf.name())
                .file_name()
                .map_or_else(|| buf.name().to_string(), |n| n.to_string_lossy().into_owned())
        } else {
            buf.path()
                .map_or_else(|| buf.name().to_string(), |p| p.display().to_string())
        };
        Some(name)
    }

    // -- Windows ------------------------------------------------------------

    #[must_use]
    pub fn active_window(&self) -> Option<&Window> {
        self.active_tab_window()?.active_window()
    }

    pub fn active_window_mut(&mut self) -> Option<&mut Window> {
        self.active_tab_window_mut()?.active_window_mut()
    }

    fn window_count(&self) -> usize {
        self.tabs.iter().map(|t| t.windows().len()).sum()
    }

    /// Split the active window; the new one becomes active.
    pub fn split_window(&mut self, axis: SplitAxis) -> Option<WindowId> {
        let new_id = self.alloc_window_id();
        let id = self.active_tab_window_mut()?.split(axis, new_id)?;
        debug!(window = %id, ?axis, "split");
        self.refresh = true;
        Some(id)
    }

    /// Close the active window, and its tab once empty. The last window of
    /// the last tab stays open.
    pub fn close_window(&mut self) -> bool {
        if self.window_count() <= 1 {
            self.set_message("E444: Cannot close last window");
            return false;
        }
        self.close_active_window();
        true
    }

    fn close_active_window(&mut self) {
        let Some(tab) = self.tabs.get_mut(self.active_tab) else {
            return;
        };
        let id = tab.active_id();
        if tab.close_window(id) {
            let tab_id = tab.id();
            self.remove_tab_window(tab_id);
        }
        debug!(window = %id, "window closed");
        self.scroll_active();
        self.refresh = true;
    }

    // -- Input --------------------------------------------------------------

    /// Route one host event. Returns whether it was acted on.
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) => self.handle_key(key) != InputOutcome::Rejected,
            Event::Mouse(MouseEvent { kind, x, y, .. }) => match kind {
                MouseEventKind::Down(button) => self.on_mouse_down(x, y, button),
                MouseEventKind::Up(button) => self.on_mouse_up(x, y, button),
                MouseEventKind::Move => self.on_mouse_move(x, y),
            },
            Event::Paste(text) => self.paste_text(&text),
        }
    }

    /// Feed one key to the global mode on the active window.
    pub fn handle_key(&mut self, key: KeyEvent) -> InputOutcome {
        let Some(dispatch) = self.dispatch(ModeCall::Key(key)) else {
            return InputOutcome::Rejected;
        };
        self.blink.reset();
        if dispatch.changed {
            self.buffer_changed(dispatch.buffer);
        }
        self.scroll_active();
        self.refresh = true;
        for request in dispatch.requests {
            self.run_request(request);
        }
        dispatch.outcome
    }

    fn dispatch(&mut self, call: ModeCall) -> Option<Dispatch> {
        let window = self.tabs.get_mut(self.active_tab)?.active_window_mut()?;
        let buffer_id = window.buffer_id();
        let buffer = self.buffers.iter_mut().find(|b| b.id() == buffer_id)?;
        let mode = self.modes.current_mut()?;
        let before = buffer.generation();
        let mut requests = Vec::new();
        let mut ctx = ModeContext {
            buffer,
            cursor: window.cursor_mut(),
            registers: &mut self.registers,
            config: &self.config,
            requests: &mut requests,
        };
        let outcome = match call {
            ModeCall::Key(key) => mode.handle_input(&mut ctx, key),
            ModeCall::PreDisplay => {
                mode.pre_display(&mut ctx);
                InputOutcome::Completed
            }
        };
        let changed = ctx.buffer.generation() != before;
        Some(Dispatch {
            outcome,
            buffer: buffer_id,
            changed,
            requests,
        })
    }

    /// Follow-up for any mutation of `id`: keep other windows' cursors
    /// valid, rederive syntax, reset timers and tell subscribers.
    fn buffer_changed(&mut self, id: BufferId) {
        let active = self.active_window().map(Window::id);
        if let Some(buf) = self.buffers.iter().find(|b| b.id() == id) {
            for (index, tab) in self.tabs.iter_mut().enumerate() {
                for window in tab.windows_mut() {
                    let is_active = index == self.active_tab && Some(window.id()) == active;
                    if window.buffer_id() == id && !is_active {
                        window.revalidate(buf, false);
                    }
                }
            }
        }
        self.queue_syntax(id);
        self.last_edit.reset();
        self.bus.broadcast(&Message::BufferChanged(id));
        self.refresh = true;
    }

    /// Insert pasted text at the cursor as one undo step, whatever the mode.
    pub fn paste_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let past_end = self.past_end();
        let Some(window) = self.tabs.get_mut(self.active_tab).and_then(TabWindow::active_window_mut) else {
            return false;
        };
        let id = window.buffer_id();
        let Some(buf) = self.buffers.iter_mut().find(|b| b.id() == id) else {
            return false;
        };
        let at = window.cursor().offset(buf);
        buf.begin_group(at);
        let result = buf.insert(at, text);
        let end = at + text.chars().count();
        buf.end_group(if result.is_ok() { end } else { at });
        match result {
            Ok(()) => {
                window.cursor_mut().set_offset(end, buf, past_end);
                self.buffer_changed(id);
                self.scroll_active();
                true
            }
            Err(e) => {
                self.set_message(e.to_string());
                false
            }
        }
    }

    fn run_request(&mut self, request: ModeRequest) {
        match request {
            ModeRequest::Ex(line) => self.execute_command(&line),
            ModeRequest::SwitchMode(name) => {
                if let Err(e) = self.set_global_mode(&name) {
                    self.set_message(e.to_string());
                }
            }
            ModeRequest::Split(axis) => {
                self.split_window(axis);
            }
            ModeRequest::CloseWindow => {
                self.close_window();
            }
            ModeRequest::CycleWindow => {
                if let Some(tab) = self.active_tab_window_mut() {
                    tab.cycle_next();
                }
            }
            ModeRequest::Focus(dir) => {
                if let Some(tab) = self.active_tab_window_mut() {
                    tab.focus(dir);
                }
            }
            ModeRequest::NextTab => self.next_tab_window(),
            ModeRequest::PreviousTab => self.previous_tab_window(),
            ModeRequest::Message(msg) => self.set_message(msg),
        }
        self.refresh = true;
    }

    // -- Ex commands --------------------------------------------------------

    /// Run one `:` line (without the colon). Subscribers see it first as
    /// `HandleCommand` and may claim it.
    pub fn execute_command(&mut self, input: &str) {
        let input = input.trim();
        if input.is_empty() {
            return;
        }
        push_capped(&mut self.command_history, input.to_string(), MAX_COMMAND_HISTORY);
        if self.bus.broadcast(&Message::HandleCommand(input.to_string())) {
            debug!(command = input, "command handled by subscriber");
            return;
        }
        match self.run_command(parse_command(input)) {
            CommandResult::Ok(Some(msg)) | CommandResult::Err(msg) => self.set_message(msg),
            CommandResult::Ok(None) => {}
            CommandResult::Quit => self.request_quit(),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn run_command(&mut self, cmd: Command) -> CommandResult {
        match cmd {
            Command::Write(path) => self.cmd_write(path),
            Command::Quit => self.cmd_quit(false),
            Command::ForceQuit => self.cmd_quit(true),
            Command::WriteQuit => match self.cmd_write(None) {
                CommandResult::Err(e) => CommandResult::Err(e),
                _ => self.cmd_quit(false),
            },
            Command::ExitSave => {
                let dirty = self.active_buffer().is_some_and(Buffer::is_dirty);
                if dirty {
                    if let CommandResult::Err(e) = self.cmd_write(None) {
                        return CommandResult::Err(e);
                    }
                }
                self.cmd_quit(false)
            }
            Command::Edit(path) => self.cmd_edit(&path),
            Command::Split => {
                self.split_window(SplitAxis::Horizontal);
                CommandResult::Ok(None)
            }
            Command::VSplit => {
                self.split_window(SplitAxis::Vertical);
                CommandResult::Ok(None)
            }
            Command::Close => {
                self.close_window();
                CommandResult::Ok(None)
            }
            Command::TabNew(path) => {
                self.add_tab_window();
                match path {
                    Some(path) => self.cmd_edit(&path),
                    None => {
                        let id = self.get_empty_buffer(SCRATCH_NAME);
                        self.show_buffer(id);
                        CommandResult::Ok(None)
                    }
                }
            }
            Command::TabNext => {
                self.next_tab_window();
                CommandResult::Ok(None)
            }
            Command::TabPrev => {
                self.previous_tab_window();
                CommandResult::Ok(None)
            }
            Command::BufferNext => self.cmd_cycle_buffer(true),
            Command::BufferPrev => self.cmd_cycle_buffer(false),
            Command::BufferDelete => {
                let Some(buf) = self.active_buffer() else {
                    return CommandResult::Ok(None);
                };
                let id = buf.id();
                if buf.is_dirty() {
                    return CommandResult::Err(format!(
                        "E89: No write since last change for buffer {} (add ! to override)",
                        id.0
                    ));
                }
                match self.remove_buffer(id) {
                    Ok(()) => CommandResult::Ok(None),
                    Err(e) => CommandResult::Err(e.to_string()),
                }
            }
            Command::Goto(line) => {
                let past_end = self.past_end();
                let tab = self.active_tab;
                if let Some(window) = self.tabs.get_mut(tab).and_then(TabWindow::active_window_mut) {
                    let id = window.buffer_id();
                    if let Some(buf) = self.buffers.iter().find(|b| b.id() == id) {
                        window.cursor_mut().goto_line(line, buf, past_end);
                    }
                }
                self.scroll_active();
                CommandResult::Ok(None)
            }
            Command::Mode(name) => match self.set_global_mode(&name) {
                Ok(()) => CommandResult::Ok(None),
                Err(e) => CommandResult::Err(e.to_string()),
            },
            Command::Registers => CommandResult::Ok(Some(self.describe_registers())),
            Command::Set(args) => match apply_set(&mut self.config, &args) {
                Ok(report) => {
                    if report.changed {
                        self.config_changed();
                    }
                    let text = report.messages.join("\n");
                    CommandResult::Ok((!text.is_empty()).then_some(text))
                }
                Err(e) => CommandResult::Err(e.to_string()),
            },
            Command::Unknown(input) => CommandResult::Err(format!("E492: Not an editor command: {input}")),
        }
    }

    fn cmd_write(&mut self, path: Option<PathBuf>) -> CommandResult {
        let Some(id) = self.active_buffer_id() else {
            return CommandResult::Err("E32: No file name".into());
        };
        if let Some(path) = path {
            let path = normalize(&path);
            if let Some(buf) = self.buffer_mut(id) {
                buf.set_name(file_label(&path));
                buf.set_path(path);
            }
        }
        match self.save_buffer(id) {
            Ok(bytes) => {
                let name = self.buffer(id).map_or("", Buffer::name);
                CommandResult::Ok(Some(format!("\"{name}\" written, {bytes}B")))
            }
            Err(HostError::NoPath) => CommandResult::Err("E32: No file name".into()),
            Err(e) => {
                warn!(buffer = %id, error = %e, "save failed");
                CommandResult::Err(format!("E212: Can't save file: {e}"))
            }
        }
    }

    /// `:q` closes the active window; on the last window it quits.
    fn cmd_quit(&mut self, force: bool) -> CommandResult {
        if !force {
            if let Some(buf) = self.active_buffer() {
                let last_view = self.find_buffer_windows(buf.id()).len() <= 1;
                if buf.is_dirty() && last_view {
                    return CommandResult::Err("E37: No write since last change (add ! to override)".into());
                }
            }
        }
        if self.window_count() <= 1 {
            return CommandResult::Quit;
        }
        self.close_active_window();
        CommandResult::Ok(None)
    }

    fn cmd_edit(&mut self, path: &Path) -> CommandResult {
        match self.get_file_buffer(path, true) {
            Ok(id) => {
                self.show_buffer(id);
                let Some(buf) = self.buffer(id) else {
                    return CommandResult::Ok(None);
                };
                let msg = if buf.loaded_from_disk() {
                    format!("\"{}\" {}L", buf.name(), buf.line_count())
                } else {
                    format!("\"{}\" [New]", buf.name())
                };
                CommandResult::Ok(Some(msg))
            }
            Err(e) => CommandResult::Err(format!("E484: Can't open file {}: {e}", path.display())),
        }
    }

    fn cmd_cycle_buffer(&mut self, forward: bool) -> CommandResult {
        let Some(current) = self.active_buffer_id() else {
            return CommandResult::Ok(None);
        };
        let len = self.buffers.len();
        let Some(index) = self.buffers.iter().position(|b| b.id() == current) else {
            return CommandResult::Ok(None);
        };
        let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
        if let Some(id) = self.buffers.get(next).map(Buffer::id) {
            self.show_buffer(id);
        }
        CommandResult::Ok(None)
    }

    fn describe_registers(&self) -> String {
        let mut out = String::from("--- Registers ---");
        for (name, reg) in self.registers.iter() {
            let text = reg.text.replace('\n', "^J");
            out.push_str(&format!("\n\"{name}   {text}"));
        }
        out
    }

    fn request_quit(&mut self) {
        info!("quit requested");
        self.quit = true;
        self.bus.broadcast(&Message::RequestQuit);
    }

    #[inline]
    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.quit
    }

    // -- Mouse --------------------------------------------------------------

    /// Press: focus the window under the pointer and put the cursor on the
    /// clicked character.
    pub fn on_mouse_down(&mut self, x: u16, y: u16, button: MouseButton) -> bool {
        self.note_pointer(x, y);
        if self.bus.broadcast(&Message::MouseDown { x, y, button }) {
            return true;
        }
        let past_end = self.past_end();
        let Some(tab) = self.tabs.get_mut(self.active_tab) else {
            return false;
        };
        let Some(id) = tab.window_at(x, y) else {
            return false;
        };
        tab.set_active(id);
        let Some(window) = tab.window_mut(id) else {
            return false;
        };
        let buffer_id = window.buffer_id();
        let Some(buf) = self.buffers.iter().find(|b| b.id() == buffer_id) else {
            return false;
        };
        let show_numbers = self.config.show_line_numbers;
        let Some(offset) = window.screen_to_offset(buf, x, y, show_numbers, self.config.tab_width) else {
            return false;
        };
        window.cursor_mut().clear_anchor();
        window.cursor_mut().set_offset(offset, buf, past_end);
        if button == MouseButton::Left {
            self.drag = Some(id);
        }
        self.refresh = true;
        true
    }

    /// Motion: with the left button held, extend a selection from the
    /// press point.
    pub fn on_mouse_move(&mut self, x: u16, y: u16) -> bool {
        self.note_pointer(x, y);
        if self.bus.broadcast(&Message::MouseMove { x, y }) {
            return true;
        }
        let Some(id) = self.drag else {
            return false;
        };
        let past_end = self.past_end();
        let Some(window) = self.tabs.get_mut(self.active_tab).and_then(|t| t.window_mut(id)) else {
            return false;
        };
        let buffer_id = window.buffer_id();
        let Some(buf) = self.buffers.iter().find(|b| b.id() == buffer_id) else {
            return false;
        };
        let show_numbers = self.config.show_line_numbers;
        let Some(offset) = window.screen_to_offset(buf, x, y, show_numbers, self.config.tab_width) else {
            return true;
        };
        let cursor = window.cursor_mut();
        if cursor.anchor().is_none() {
            cursor.set_anchor();
        }
        cursor.set_offset(offset, buf, past_end);
        self.refresh = true;
        true
    }

    /// Release: a press without motion leaves no selection.
    pub fn on_mouse_up(&mut self, x: u16, y: u16, button: MouseButton) -> bool {
        self.note_pointer(x, y);
        let handled = self.bus.broadcast(&Message::MouseUp { x, y, button });
        let Some(id) = self.drag.take() else {
            return handled;
        };
        if let Some(window) = self.tabs.get_mut(self.active_tab).and_then(|t| t.window_mut(id)) {
            let cursor = window.cursor_mut();
            if cursor.anchor() == Some(cursor.position()) {
                cursor.clear_anchor();
            }
        }
        true
    }

    fn note_pointer(&mut self, x: u16, y: u16) {
        if self.mouse != Some((x, y)) {
            self.mouse = Some((x, y));
            self.mouse_rest.reset();
            self.tooltip_sent = false;
        }
    }

    // -- Registers & clipboard ----------------------------------------------

    pub fn set_register(&mut self, name: char, reg: Register) {
        self.registers.set(name, reg);
    }

    #[must_use]
    pub fn get_register(&self, name: char) -> Register {
        self.registers.get(name)
    }

    #[must_use]
    pub const fn registers(&self) -> &RegisterStore {
        &self.registers
    }

    /// Copy the host clipboard into `+` and the unnamed register. A failure
    /// becomes a message.
    pub fn read_clipboard(&mut self) -> bool {
        self.bus.broadcast(&Message::GetClipboard);
        match self.clipboard.get_contents() {
            Ok(text) => {
                let reg = Register::char_wise(text);
                self.registers.set('+', reg.clone());
                self.registers.set(UNNAMED, reg);
                true
            }
            Err(e) => {
                warn!(clipboard = %self.clipboard.name(), error = %e, "clipboard read failed");
                self.set_message(e.to_string());
                false
            }
        }
    }

    /// Copy the unnamed register to the host clipboard. A failure becomes a
    /// message.
    pub fn write_clipboard(&mut self) -> bool {
        let text = self.registers.get(UNNAMED).text;
        match self.clipboard.set_contents(&text) {
            Ok(()) => {
                self.registers.set('+', self.registers.get(UNNAMED));
                self.bus.broadcast(&Message::SetClipboard(text));
                true
            }
            Err(e) => {
                warn!(clipboard = %self.clipboard.name(), error = %e, "clipboard write failed");
                self.set_message(e.to_string());
                false
            }
        }
    }

    // -- Notification bus ---------------------------------------------------

    pub fn subscribe(&mut self, subscriber: Weak<RefCell<dyn Subscriber>>) -> SubscriberToken {
        self.bus.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, token: SubscriberToken) -> bool {
        self.bus.unsubscribe(token)
    }

    /// Deliver `msg` to every subscriber. Returns whether any handled it.
    pub fn broadcast(&mut self, msg: &Message) -> bool {
        self.bus.broadcast(msg)
    }

    // -- Messages -----------------------------------------------------------

    pub fn set_message(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!(message = %msg, "message");
        push_capped(&mut self.messages, msg, MAX_MESSAGES);
        self.refresh = true;
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    #[must_use]
    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    #[must_use]
    pub fn command_history(&self) -> &[String] {
        &self.command_history
    }

    // -- Timers -------------------------------------------------------------

    /// Advance time by `dt` seconds: timers move, finished syntax results
    /// are applied and subscribers get `Tick`.
    pub fn tick(&mut self, dt: f32) {
        let was_visible = self.cursor_blink_state();
        self.blink.tick(dt);
        self.last_edit.tick(dt);
        self.mouse_rest.tick(dt);
        if was_visible != self.cursor_blink_state() {
            self.refresh = true;
        }

        self.poll_syntax();

        if let Some((x, y)) = self.mouse {
            if !self.tooltip_sent && self.mouse_rest.elapsed() >= TOOLTIP_DELAY {
                self.tooltip_sent = true;
                self.bus.broadcast(&Message::ToolTip { x, y });
            }
        }
        self.bus.broadcast(&Message::Tick(dt));
    }

    /// Whether the cursor is in the visible half of its blink cycle. Always
    /// visible when blinking is off.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cursor_blink_state(&self) -> bool {
        let half_period = self.config.cursor_blink_ms;
        if half_period == 0 {
            return true;
        }
        let elapsed_ms = (f64::from(self.blink.elapsed()) * 1000.0) as u64;
        (elapsed_ms / half_period) % 2 == 0
    }

    /// Seconds since the last buffer mutation.
    #[must_use]
    pub const fn last_edit_elapsed(&self) -> f32 {
        self.last_edit.elapsed()
    }

    /// Background fade in `0.0..=1.0`: zero until `background_fade_wait`
    /// seconds pass without an edit, then rising over
    /// `background_fade_time`.
    #[must_use]
    pub fn background_fade(&self) -> f32 {
        let idle = self.last_edit.elapsed() - self.config.background_fade_wait;
        if idle <= 0.0 {
            return 0.0;
        }
        if self.config.background_fade_time <= 0.0 {
            return 1.0;
        }
        (idle / self.config.background_fade_time).min(1.0)
    }

    // -- Syntax -------------------------------------------------------------

    /// Use `provider` for buffers whose name ends in one of `extensions`.
    /// Open buffers are rederived.
    pub fn register_syntax<I, S>(&mut self, extensions: I, provider: &Arc<dyn SyntaxProvider>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.syntax.register(extensions, provider);
        let ids: Vec<BufferId> = self.buffers.iter().map(Buffer::id).collect();
        for id in ids {
            self.queue_syntax(id);
        }
    }

    fn queue_syntax(&mut self, id: BufferId) {
        let Some(buf) = self.buffers.iter().find(|b| b.id() == id) else {
            return;
        };
        let key = buf
            .path()
            .map_or_else(|| buf.name().to_string(), |p| p.to_string_lossy().into_owned());
        let Some(provider) = self.syntax.for_name(&key) else {
            return;
        };
        let job = SyntaxJob {
            buffer: id,
            generation: buf.generation(),
            text: buf.contents(),
            provider,
        };

        if self.flags.contains(EditorFlags::DISABLE_THREADS) {
            let result = job.run();
            self.apply_syntax(result);
            return;
        }
        if self.worker.is_none() {
            let threads = std::thread::available_parallelism()
                .map_or(1, |n| n.get().min(MAX_SYNTAX_THREADS));
            match SyntaxWorker::spawn(threads) {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => {
                    warn!(error = %e, "syntax worker unavailable, deriving inline");
                    self.flags.insert(EditorFlags::DISABLE_THREADS);
                    let result = job.run();
                    self.apply_syntax(result);
                    return;
                }
            }
        }
        if let Some(worker) = &self.worker {
            if !worker.submit(job) {
                warn!(buffer = %id, "syntax worker stopped, job dropped");
            }
        }
    }

    fn apply_syntax(&mut self, result: SyntaxResult) -> bool {
        let Some(buf) = self.buffers.iter_mut().find(|b| b.id() == result.buffer) else {
            debug!(buffer = %result.buffer, "syntax result for removed buffer");
            return false;
        };
        let applied = buf.apply_syntax(result.generation, result.spans);
        if applied {
            self.refresh = true;
        }
        applied
    }

    /// Apply every finished syntax result. Returns how many were current.
    pub fn poll_syntax(&mut self) -> usize {
        let results = self.worker.as_ref().map(SyntaxWorker::drain).unwrap_or_default();
        let mut applied = 0;
        for result in results {
            if self.apply_syntax(result) {
                applied += 1;
            }
        }
        applied
    }

    /// Block up to `timeout` for one syntax result and apply it. Returns
    /// false on timeout or when no worker is running.
    pub fn wait_for_syntax(&mut self, timeout: Duration) -> bool {
        let Some(result) = self.worker.as_ref().and_then(|w| w.wait(timeout)) else {
            return false;
        };
        self.apply_syntax(result);
        true
    }

    // -- Display ------------------------------------------------------------

    /// Take the viewport size from `display` and re-lay every tab.
    pub fn update_size(&mut self, display: &dyn Display) {
        let (w, h) = display.size();
        self.viewport = Rect::new(0, 0, w, h);
        for tab in &mut self.tabs {
            tab.layout(self.viewport);
        }
        self.scroll_active();
        self.refresh = true;
    }

    /// Paint each window of the active tab.
    pub fn display(&mut self, display: &mut dyn Display) {
        if let Some(dispatch) = self.dispatch(ModeCall::PreDisplay) {
            for request in dispatch.requests {
                self.run_request(request);
            }
        }
        self.scroll_active();

        let Some(tab) = self.tabs.get(self.active_tab) else {
            return;
        };
        let active = tab.active_id();
        for window in tab.windows() {
            let Some(buf) = self.buffers.iter().find(|b| b.id() == window.buffer_id()) else {
                continue;
            };
            display.paint(&frame(window, buf, &self.config, window.id() == active));
        }
        self.refresh = false;
    }

    /// Whether anything changed since the last [`display`](Self::display).
    #[inline]
    #[must_use]
    pub const fn needs_refresh(&self) -> bool {
        self.refresh
    }

    fn scroll_active(&mut self) {
        let tab = self.active_tab;
        let Some(window) = self.tabs.get_mut(tab).and_then(TabWindow::active_window_mut) else {
            return;
        };
        let id = window.buffer_id();
        if let Some(buf) = self.buffers.iter().find(|b| b.id() == id) {
            window.ensure_cursor_visible(
                buf,
                self.config.show_line_numbers,
                self.config.tab_width,
                self.config.scroll_off,
            );
        }
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("buffers", &self.buffers.len())
            .field("tabs", &self.tabs.len())
            .field("active_tab", &self.active_tab)
            .field("modes", &self.modes)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn push_capped(list: &mut Vec<String>, item: String, cap: usize) {
    if list.len() >= cap {
        let excess = list.len() + 1 - cap;
        list.drain(..excess);
    }
    list.push(item);
}

fn normalize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn frame(window: &Window, buf: &Buffer, config: &EditorConfig, active: bool) -> WindowFrame {
    let visible = window.visible_lines(buf);
    let lines = visible
        .clone()
        .filter_map(|i| buf.line(i).ok())
        .map(|line| line.chars().filter(|&c| !is_line_break(c)).collect())
        .collect();
    let start = buf.line_start(visible.start).unwrap_or(0);
    let end = if visible.end < buf.line_count() {
        buf.line_start(visible.end).unwrap_or_else(|_| buf.len_chars())
    } else {
        buf.len_chars()
    };
    WindowFrame {
        window: window.id(),
        buffer: buf.id(),
        area: window.area(),
        first_line: visible.start,
        lines,
        left_col: window.left_col(),
        gutter: gutter_width(buf.line_count(), config.show_line_numbers),
        cursor: window.cursor().position(),
        selection: window.cursor().selection(),
        spans: buf.overlay().spans_in(start, end).copied().collect(),
        active,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
