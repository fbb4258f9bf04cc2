//! Notification bus: typed messages broadcast to registered components.
//!
//! The bus holds subscribers weakly. A component that has been dropped is
//! pruned the next time a message goes out and is never notified. Delivery
//! follows registration order. A subscriber registered while a broadcast
//! is running does not see that broadcast.
//!
//! | Message                    | Sent when                                |
//! |----------------------------|------------------------------------------|
//! | `HandleCommand`            | an ex command is about to run            |
//! | `RequestQuit`              | `:q` / `:wq` succeeded                   |
//! | `GetClipboard`             | the clipboard is read into `"`           |
//! | `SetClipboard`             | `"` is written to the clipboard          |
//! | `MouseMove/Down/Up`        | a mouse event reached the editor         |
//! | `BufferAdded/Removed`      | buffer lifecycle                         |
//! | `BufferChanged`            | a command mutated a buffer               |
//! | `BufferExternallyModified` | the file under a buffer changed on disk  |
//! | `ModeChanged`              | the global mode switched                 |
//! | `ComponentChanged`         | windows or tabs were rearranged          |
//! | `Tick`                     | once per `Editor::tick`                  |
//! | `ConfigChanged`            | `:set` or `set_config` changed options   |
//! | `ToolTip`                  | the host asked for a tooltip at a cell   |

use std::cell::RefCell;
use std::rc::Weak;

use kestrel_input::MouseButton;
use tracing::trace;

use crate::buffer::BufferId;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    HandleCommand(String),
    RequestQuit,
    GetClipboard,
    SetClipboard(String),
    MouseMove { x: u16, y: u16 },
    MouseDown { x: u16, y: u16, button: MouseButton },
    MouseUp { x: u16, y: u16, button: MouseButton },
    BufferAdded(BufferId),
    BufferRemoved(BufferId),
    BufferChanged(BufferId),
    BufferExternallyModified(BufferId),
    ModeChanged(String),
    ComponentChanged,
    /// Seconds since the previous tick.
    Tick(f32),
    ConfigChanged,
    ToolTip { x: u16, y: u16 },
}

impl Message {
    /// Short name, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::HandleCommand(_) => "HandleCommand",
            Self::RequestQuit => "RequestQuit",
            Self::GetClipboard => "GetClipboard",
            Self::SetClipboard(_) => "SetClipboard",
            Self::MouseMove { .. } => "MouseMove",
            Self::MouseDown { .. } => "MouseDown",
            Self::MouseUp { .. } => "MouseUp",
            Self::BufferAdded(_) => "BufferAdded",
            Self::BufferRemoved(_) => "BufferRemoved",
            Self::BufferChanged(_) => "BufferChanged",
            Self::BufferExternallyModified(_) => "BufferExternallyModified",
            Self::ModeChanged(_) => "ModeChanged",
            Self::ComponentChanged => "ComponentChanged",
            Self::Tick(_) => "Tick",
            Self::ConfigChanged => "ConfigChanged",
            Self::ToolTip { .. } => "ToolTip",
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

/// A component that listens on the bus.
pub trait Subscriber {
    /// React to `msg`. Return true if the message was handled.
    fn notify(&mut self, msg: &Message) -> bool;
}

/// Handle returned by [`Bus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberToken(u64);

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Bus {
    subscribers: Vec<(SubscriberToken, Weak<RefCell<dyn Subscriber>>)>,
    next_token: u64,
}

impl Bus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Weak<RefCell<dyn Subscriber>>) -> SubscriberToken {
        let token = SubscriberToken(self.next_token);
        self.next_token += 1;
        self.subscribers.push((token, subscriber));
        token
    }

    /// Returns whether the token was registered.
    pub fn unsubscribe(&mut self, token: SubscriberToken) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(t, _)| *t != token);
        self.subscribers.len() != before
    }

    /// Live subscriber count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|(_, s)| s.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `msg` to every live subscriber. Returns true if any of them
    /// handled it.
    ///
    /// A subscriber that is already borrowed (it triggered this broadcast
    /// from inside its own `notify`) is skipped.
    pub fn broadcast(&mut self, msg: &Message) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(_, s)| s.strong_count() > 0);
        if self.subscribers.len() != before {
            trace!(pruned = before - self.subscribers.len(), "dropped dead subscribers");
        }

        let snapshot: Vec<_> = self.subscribers.iter().map(|(_, s)| s.clone()).collect();
        let mut handled = false;
        for weak in snapshot {
            let Some(strong) = weak.upgrade() else {
                continue;
            };
            let Ok(mut sub) = strong.try_borrow_mut() else {
                continue;
            };
            handled |= sub.notify(msg);
        }
        handled
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
