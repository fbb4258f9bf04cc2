// SPDX-License-Identifier: MIT
//
// kestrel-input: input events for the kestrel editing engine.
//
// The engine never talks to a terminal or a window system directly. Hosts
// translate whatever their platform delivers into the small set of types
// defined here: key presses with modifiers, mouse actions in cell
// coordinates, and pasted text. The notation module parses Vim-style key
// strings (`d2w`, `<C-r>`, `<Esc>`) so scripts and tests can describe input
// compactly.

pub mod event;
pub mod notation;

pub use event::{Event, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind};
pub use notation::{NotationError, parse_keys};
