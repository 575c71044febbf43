//! # Emuterm Core Library
//!
//! A serial-terminal client library built around three pieces:
//! - A session controller with a two-mode (Command/Connect) state machine
//!   that owns the port lifecycle and a background reader thread
//! - A port driver abstraction over the underlying communication endpoint
//! - A registry of pluggable emulations: a built-in passthrough plus
//!   native plugins discovered from dynamic libraries at startup
//!
//! ## Example
//!
//! ```rust,no_run
//! use emuterm_core::{HeadlessUi, SerialDriver, SerialSettings, Session, SessionMessage};
//! use std::sync::Arc;
//!
//! fn main() {
//!     let driver = SerialDriver::new(SerialSettings::new(115_200));
//!     let mut session = Session::new(Box::new(driver), Arc::new(HeadlessUi));
//!
//!     let rx = session.messages();
//!     session.enter_command();
//!     session.enter_connect("/dev/ttyUSB0");
//!
//!     while let Ok(SessionMessage::RxData(data)) = rx.recv() {
//!         println!("Received: {data:?}");
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod core;
pub mod ui;

// Re-exports for convenience
pub use crate::config::AppConfig;
pub use crate::core::emulation::{Capabilities, Emulation, NoEmulation};
pub use crate::core::plugin::{EmulationRegistry, NativeEmulation, PluginError};
pub use crate::core::port::{
    PortDriver, PortError, PortHandle, SerialDriver, SerialFlowControl, SerialParity,
    SerialSettings,
};
pub use crate::core::session::{Mode, Session, SessionMessage};
pub use crate::ui::{CommandId, HeadlessUi, UiSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
