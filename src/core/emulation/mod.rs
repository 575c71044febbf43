//! Emulation layer
//!
//! An emulation interprets the byte stream flowing over the open port. The
//! session core only cares about a small capability set: a display name and
//! two optional lifecycle hooks. What an emulation does with the bytes
//! (VT100 parsing, plain passthrough, ...) is its own business.

mod none;

pub use none::NoEmulation;

/// The optional hooks an emulation implements.
///
/// Dispatch always checks this set before invoking a hook; an
/// unimplemented hook is skipped, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Implements [`Emulation::on_connect`]
    pub on_connect: bool,
    /// Implements [`Emulation::on_disconnect`]
    pub on_disconnect: bool,
}

impl Capabilities {
    /// No optional hooks
    pub const NONE: Self = Self {
        on_connect: false,
        on_disconnect: false,
    };

    /// Both lifecycle hooks
    pub const ALL: Self = Self {
        on_connect: true,
        on_disconnect: true,
    };
}

/// A pluggable interpreter of the port byte stream.
///
/// Implementations own whatever private state they need. Hooks are invoked
/// on the control context, never on the reader thread, and are expected to
/// return quickly.
pub trait Emulation: Send {
    /// Display name, used verbatim as the UI label.
    fn display_name(&self) -> &str;

    /// Which optional hooks this emulation implements.
    fn capabilities(&self) -> Capabilities;

    /// Called after a port has been opened and the session entered Connect
    /// mode. Only invoked when `capabilities().on_connect` is set.
    fn on_connect(&mut self) {}

    /// Called when the session leaves Connect mode, before the port closes.
    /// Only invoked when `capabilities().on_disconnect` is set.
    fn on_disconnect(&mut self) {}
}

/// The two dispatchable lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Port opened, session entered Connect mode
    Connect,
    /// Session leaving Connect mode
    Disconnect,
}

/// Invoke a hook on `emulation` if it is implemented.
///
/// The hook call is a plugin-boundary crossing: a panic inside the
/// emulation is caught and logged here rather than unwinding into the
/// session core.
pub fn dispatch_hook(emulation: &mut dyn Emulation, hook: Hook) {
    let caps = emulation.capabilities();
    let implemented = match hook {
        Hook::Connect => caps.on_connect,
        Hook::Disconnect => caps.on_disconnect,
    };
    if !implemented {
        return;
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| match hook {
        Hook::Connect => emulation.on_connect(),
        Hook::Disconnect => emulation.on_disconnect(),
    }));

    if result.is_err() {
        tracing::error!(
            emulation = emulation.display_name(),
            ?hook,
            "emulation hook panicked"
        );
    }
}
