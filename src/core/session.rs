//! Session management: the Command/Connect mode state machine
//!
//! A [`Session`] owns the active port handle, the emulation registry, and
//! the background reader thread, and mediates every transition between the
//! two modes. There is one Session per terminal window, constructed at
//! startup and torn down at shutdown; it is an explicit owned object, not
//! ambient global state.

use crate::core::emulation::{dispatch_hook, Emulation, Hook};
use crate::core::plugin::EmulationRegistry;
use crate::core::port::{PortDriver, PortError, PortHandle};
use crate::ui::{CommandId, UiSink};
use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// The session's high-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Idle: no port open, selecting a connection target.
    Command,
    /// Actively streaming over an open port.
    Connect,
}

/// Data handoff from the session contexts to the UI context.
///
/// These are the two reserved message identifiers of the wire between the
/// reader thread and the display layer; anything richer must be built on
/// the same channel, never on a shared unsynchronized buffer.
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Bytes received from the port
    RxData(Bytes),
    /// Bytes transmitted to the port
    TxData(Bytes),
}

/// A terminal session: mode state machine, port lifecycle, reader thread,
/// and emulation selection.
pub struct Session {
    mode: Arc<RwLock<Mode>>,
    port: Arc<Mutex<Option<Box<dyn PortHandle>>>>,
    reader: Option<thread::JoinHandle<()>>,
    registry: EmulationRegistry,
    driver: Box<dyn PortDriver>,
    ui: Arc<dyn UiSink>,
    msg_tx: Sender<SessionMessage>,
    msg_rx: Receiver<SessionMessage>,
    port_menu_len: usize,
}

impl Session {
    /// Create a session in Command mode with the built-in emulation active.
    pub fn new(driver: Box<dyn PortDriver>, ui: Arc<dyn UiSink>) -> Self {
        let (msg_tx, msg_rx) = crossbeam_channel::unbounded();
        Self {
            mode: Arc::new(RwLock::new(Mode::Command)),
            port: Arc::new(Mutex::new(None)),
            reader: None,
            registry: EmulationRegistry::new(),
            driver,
            ui,
            msg_tx,
            msg_rx,
            port_menu_len: 0,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        *self.mode.read()
    }

    /// Whether a port handle is currently open. True iff `mode() == Connect`.
    pub fn is_port_open(&self) -> bool {
        self.port.lock().is_some()
    }

    /// Whether the background reader thread is still running.
    pub fn reader_active(&self) -> bool {
        self.reader.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Subscribe to the session's message stream (received/transmitted data).
    pub fn messages(&self) -> Receiver<SessionMessage> {
        self.msg_rx.clone()
    }

    /// Register a compiled-in emulation and expose it as a menu entry.
    pub fn register_emulation(&mut self, emulation: Box<dyn Emulation>) -> usize {
        let index = self.registry.register(emulation);
        if let Some(name) = self.registry.name(index) {
            self.ui.insert_menu_entry(CommandId::Emulation(index), name);
            self.ui.set_command_enabled(CommandId::Emulation(index), true);
        }
        index
    }

    /// Discover native emulation plugins in `dir` and expose each as a menu
    /// entry. Returns the number of emulations added.
    pub fn discover_plugins(&mut self, dir: &Path) -> usize {
        let before = self.registry.len();
        let added = self.registry.discover(dir);
        for index in before..self.registry.len() {
            if let Some(name) = self.registry.name(index) {
                self.ui.insert_menu_entry(CommandId::Emulation(index), name);
                self.ui.set_command_enabled(CommandId::Emulation(index), true);
            }
        }
        added
    }

    /// Change the active emulation selection.
    ///
    /// Legal in either mode. Switching does not invoke `on_disconnect` on
    /// the old emulation or `on_connect` on the new one; hook invocation is
    /// tied solely to the Command/Connect transitions.
    pub fn select_emulation(&mut self, index: usize) {
        self.registry.select(index);
    }

    /// Index of the active emulation.
    pub fn active_emulation(&self) -> usize {
        self.registry.active_index()
    }

    /// The emulation registry.
    pub fn emulations(&self) -> &EmulationRegistry {
        &self.registry
    }

    /// Enter Command mode, closing any open connection.
    ///
    /// From Connect mode: invokes the active emulation's `on_disconnect`
    /// (if implemented), stores the mode so the reader can observe it,
    /// joins the reader, then closes the port. A close failure is shown to
    /// the user but never blocks the transition. From Command mode this is
    /// idempotent apart from rebuilding the connection menus.
    pub fn enter_command(&mut self) {
        if *self.mode.read() == Mode::Connect {
            dispatch_hook(self.registry.active_mut(), Hook::Disconnect);

            *self.mode.write() = Mode::Command;

            // The reader observes the mode within one read timeout; joining
            // here guarantees no read is outstanding when the port closes.
            if let Some(handle) = self.reader.take() {
                let _ = handle.join();
            }

            if let Some(mut port) = self.port.lock().take() {
                if let Err(e) = port.close() {
                    self.ui.show_error(&e.to_string());
                }
            }

            tracing::info!("session disconnected");
        }

        self.rebuild_menus();
    }

    /// Enter Connect mode on the named port.
    ///
    /// Must be called from Command mode; calling while connected is a
    /// programming error. On open failure the error is shown to the user
    /// and the session stays in Command mode with no reader spawned. On
    /// success the reader is spawned and the active emulation's
    /// `on_connect` hook (if implemented) runs on the caller's thread.
    pub fn enter_connect(&mut self, port_id: &str) {
        assert_eq!(
            *self.mode.read(),
            Mode::Command,
            "enter_connect requires Command mode"
        );

        let handle = match self.driver.open(port_id) {
            Ok(h) => h,
            Err(e) => {
                self.ui.show_error(&e.to_string());
                *self.mode.write() = Mode::Command;
                return;
            }
        };

        *self.port.lock() = Some(handle);

        self.ui.set_command_enabled(CommandId::Connect, false);
        for i in 0..self.port_menu_len {
            self.ui.set_command_enabled(CommandId::Port(i), false);
        }
        self.ui.set_command_enabled(CommandId::Disconnect, true);

        *self.mode.write() = Mode::Connect;
        self.ui.request_redraw();

        self.spawn_reader();

        dispatch_hook(self.registry.active_mut(), Hook::Connect);

        tracing::info!(port = port_id, "session connected");
    }

    /// Write bytes to the open port and post them as a `TxData` message.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut guard = self.port.lock();
        let port = guard.as_mut().ok_or(PortError::NotOpen)?;
        let n = port.write(data)?;
        drop(guard);

        let _ = self
            .msg_tx
            .send(SessionMessage::TxData(Bytes::copy_from_slice(&data[..n])));
        Ok(n)
    }

    /// Spawn the background reader for the current connection.
    ///
    /// The loop re-checks the mode before every read; the driver's read
    /// timeout bounds how long a mode change can go unobserved. Read errors
    /// are reported and the loop continues; only a mode change ends it.
    fn spawn_reader(&mut self) {
        let mode = self.mode.clone();
        let port = self.port.clone();
        let ui = self.ui.clone();
        let tx = self.msg_tx.clone();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            while *mode.read() == Mode::Connect {
                let result = {
                    let mut guard = port.lock();
                    match guard.as_mut() {
                        Some(p) => p.read(&mut buf),
                        None => break,
                    }
                };

                match result {
                    Ok(0) => {}
                    Ok(n) => {
                        let _ = tx.send(SessionMessage::RxData(Bytes::copy_from_slice(&buf[..n])));
                    }
                    Err(e) => {
                        ui.show_error(&e.to_string());
                        thread::sleep(Duration::from_millis(10));
                    }
                }
            }
            tracing::debug!("reader thread exiting");
        });

        self.reader = Some(handle);
    }

    /// Rebuild the connection-target and emulation menus for Command mode.
    fn rebuild_menus(&mut self) {
        self.ui.set_command_enabled(CommandId::Disconnect, false);

        let ports = match self.driver.list_ports() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "port enumeration failed");
                Vec::new()
            }
        };

        for (i, name) in ports.iter().enumerate() {
            self.ui.insert_menu_entry(CommandId::Port(i), name);
            self.ui.set_command_enabled(CommandId::Port(i), true);
        }
        self.port_menu_len = ports.len();

        for i in 0..self.registry.len() {
            self.ui.set_command_enabled(CommandId::Emulation(i), true);
        }

        self.ui.set_command_enabled(CommandId::Connect, true);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if *self.mode.read() == Mode::Connect {
            self.enter_command();
        }
    }
}
