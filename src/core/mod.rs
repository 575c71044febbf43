//! Core module containing the main functionality of Emuterm
//!
//! This module provides:
//! - Port driver layer (serial today, anything with the same contract tomorrow)
//! - Session management with the Command/Connect mode state machine
//! - Emulation capability contract and built-in passthrough emulation
//! - Plugin registry with native dynamic-library discovery

pub mod emulation;
pub mod plugin;
pub mod port;
pub mod session;
