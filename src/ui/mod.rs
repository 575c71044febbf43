//! UI integration layer
//!
//! The core never draws. Everything it needs from the windowing layer goes
//! through [`UiSink`]: enabling/disabling commands by symbolic ID, inserting
//! selectable menu entries, requesting a redraw, and presenting errors.

use std::fmt;

/// Symbolic identifiers for UI commands controlled by the session core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    /// The "open a new connection" affordance.
    Connect,
    /// The "close the current connection" affordance.
    Disconnect,
    /// A connection target entry, by position in the enumerated port list.
    Port(usize),
    /// An emulation selection entry, by registry index.
    Emulation(usize),
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Disconnect => write!(f, "disconnect"),
            Self::Port(i) => write!(f, "port[{i}]"),
            Self::Emulation(i) => write!(f, "emulation[{i}]"),
        }
    }
}

/// Sink for everything the session core wants from the UI layer.
///
/// Implementations are free to render however they like; `show_error` is
/// expected to be a modal, user-visible notification. Called from both the
/// control context and the reader thread, so implementations must be
/// thread-safe.
pub trait UiSink: Send + Sync {
    /// Enable or disable a command by its symbolic ID.
    fn set_command_enabled(&self, id: CommandId, enabled: bool);

    /// Insert a new selectable menu entry with the given ID and label.
    fn insert_menu_entry(&self, id: CommandId, label: &str);

    /// Request a full redraw of the terminal surface.
    fn request_redraw(&self);

    /// Present an error message to the user.
    fn show_error(&self, message: &str);
}

/// Headless sink for CLI and embedded use: menu state collapses to log
/// events, errors go to stderr via `tracing`.
#[derive(Debug, Default)]
pub struct HeadlessUi;

impl UiSink for HeadlessUi {
    fn set_command_enabled(&self, id: CommandId, enabled: bool) {
        tracing::debug!(%id, enabled, "command state changed");
    }

    fn insert_menu_entry(&self, id: CommandId, label: &str) {
        tracing::debug!(%id, label, "menu entry added");
    }

    fn request_redraw(&self) {}

    fn show_error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_id_display() {
        assert_eq!(CommandId::Port(3).to_string(), "port[3]");
        assert_eq!(CommandId::Disconnect.to_string(), "disconnect");
    }
}
