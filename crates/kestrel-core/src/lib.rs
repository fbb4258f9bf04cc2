//! # kestrel-core: an embeddable modal editing engine
//!
//! The host owns the event loop, the screen and the file system; this crate
//! owns the text and everything that edits it.
//!
//! - **[`buffer`]**: `Buffer`, a rope with a line index, undo [`history`]
//!   and a syntax overlay
//! - **[`cursor`]**, **[`position`]**, **[`word`]**: cursor motion
//! - **[`register`]**: named yank/delete slots
//! - **[`mode`]**: the `Mode` trait; **[`vim`]** and **[`standard`]**
//!   implement it
//! - **[`window`]**, **[`split`]**, **[`tab`]**: views onto buffers
//! - **[`syntax`]**, **[`highlight`]**, **[`worker`]**: span derivation,
//!   off-thread when allowed
//! - **[`editor`]**: the façade tying it together, with the [`notify`] bus,
//!   [`command`] line, [`options`] and [`host`] collaborator traits

pub mod buffer;
pub mod command;
pub mod config;
pub mod cursor;
pub mod editor;
pub mod error;
pub mod highlight;
pub mod history;
pub mod host;
pub mod mode;
pub mod notify;
pub mod options;
pub mod position;
pub mod register;
pub mod split;
pub mod standard;
pub mod syntax;
pub mod tab;
pub mod timer;
pub mod vim;
pub mod window;
pub mod word;
pub mod worker;

pub use buffer::{Buffer, BufferId};
pub use config::{EditorConfig, EditorFlags};
pub use editor::Editor;
pub use error::{EditError, HostError, HostResult};
pub use host::{Clipboard, Display, FileSystem, MemoryClipboard, StdFileSystem, WindowFrame};
pub use mode::{InputOutcome, Mode, ModeState};
pub use notify::{Message, Subscriber, SubscriberToken};
pub use position::Position;
