//! Native plugin ABI
//!
//! A native emulation plugin is a dynamic library exporting one symbol,
//! [`INIT_SYMBOL`]. The host calls it with an opaque context handle and an
//! out-pointer to a zeroed [`RawEmulator`]; on a `true` return the plugin
//! must have fully populated the descriptor: a name function whose returned
//! string stays valid for the process lifetime, hook pointers that are
//! either valid or null ("not implemented"), and an opaque state pointer
//! handed back to every hook call.

use super::PluginError;
use crate::core::emulation::{Capabilities, Emulation};
use libloading::Library;
use std::ffi::{c_char, c_void, CStr};

/// Exported initialization symbol every native plugin must provide.
pub const INIT_SYMBOL: &[u8] = b"emulator_init_plugin";

/// Returns the emulation's display name. The pointed-to string must remain
/// valid for the process lifetime.
pub type EmulationNameFn = unsafe extern "C" fn() -> *const c_char;

/// Optional lifecycle hook. Receives the plugin's own `emulator_data`.
pub type HookFn = unsafe extern "C" fn(data: *mut c_void);

/// The plugin entry point: populate `out` and return `true` on success.
pub type InitPluginFn = unsafe extern "C" fn(ctx: *mut c_void, out: *mut RawEmulator) -> bool;

/// Emulator descriptor as laid out across the plugin boundary.
#[repr(C)]
pub struct RawEmulator {
    /// Mandatory name accessor
    pub emulation_name: Option<EmulationNameFn>,
    /// Called after the port opens; null if not implemented
    pub on_connect: Option<HookFn>,
    /// Called before the port closes; null if not implemented
    pub on_disconnect: Option<HookFn>,
    /// Opaque plugin state, passed to every hook
    pub emulator_data: *mut c_void,
}

impl RawEmulator {
    /// A descriptor with every slot empty, as handed to the entry point.
    pub const fn empty() -> Self {
        Self {
            emulation_name: None,
            on_connect: None,
            on_disconnect: None,
            emulator_data: std::ptr::null_mut(),
        }
    }
}

/// A discovered native emulation, adapted to the [`Emulation`] trait.
///
/// Holds the backing [`Library`] so the descriptor's function pointers stay
/// mapped for the process lifetime; there is no hot-unload.
pub struct NativeEmulation {
    name: String,
    raw: RawEmulator,
    _lib: Option<Library>,
}

// The descriptor's pointers are only dereferenced from the thread that owns
// the session; the plugin contract requires hooks to be callable from
// whichever thread that is.
unsafe impl Send for NativeEmulation {}

impl NativeEmulation {
    /// Validate a descriptor returned by a plugin's entry point and wrap it.
    ///
    /// # Safety
    ///
    /// `raw` must have been populated by a successful [`InitPluginFn`] call
    /// from `lib` (or, in tests, by code upholding the same contract), and
    /// its name pointer must stay valid for the process lifetime.
    pub unsafe fn from_raw(raw: RawEmulator, lib: Option<Library>) -> Result<Self, PluginError> {
        let name_fn = raw
            .emulation_name
            .ok_or_else(|| PluginError::BadDescriptor("missing name function".to_string()))?;

        let name_ptr = name_fn();
        if name_ptr.is_null() {
            return Err(PluginError::BadDescriptor("null name".to_string()));
        }

        let name = CStr::from_ptr(name_ptr).to_string_lossy().into_owned();
        if name.is_empty() {
            return Err(PluginError::BadDescriptor("empty name".to_string()));
        }

        Ok(Self {
            name,
            raw,
            _lib: lib,
        })
    }
}

impl Emulation for NativeEmulation {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            on_connect: self.raw.on_connect.is_some(),
            on_disconnect: self.raw.on_disconnect.is_some(),
        }
    }

    fn on_connect(&mut self) {
        if let Some(hook) = self.raw.on_connect {
            unsafe { hook(self.raw.emulator_data) };
        }
    }

    fn on_disconnect(&mut self) {
        if let Some(hook) = self.raw.on_disconnect {
            unsafe { hook(self.raw.emulator_data) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn fake_name() -> *const c_char {
        c"Fake VT100".as_ptr()
    }

    unsafe extern "C" fn null_name() -> *const c_char {
        std::ptr::null()
    }

    unsafe extern "C" fn fake_hook(_data: *mut c_void) {
        HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_descriptor_without_name_is_rejected() {
        let raw = RawEmulator::empty();
        let result = unsafe { NativeEmulation::from_raw(raw, None) };
        assert!(matches!(result, Err(PluginError::BadDescriptor(_))));
    }

    #[test]
    fn test_descriptor_with_null_name_is_rejected() {
        let raw = RawEmulator {
            emulation_name: Some(null_name),
            ..RawEmulator::empty()
        };
        let result = unsafe { NativeEmulation::from_raw(raw, None) };
        assert!(matches!(result, Err(PluginError::BadDescriptor(_))));
    }

    #[test]
    fn test_null_hooks_map_to_missing_capabilities() {
        let raw = RawEmulator {
            emulation_name: Some(fake_name),
            ..RawEmulator::empty()
        };
        let emu = unsafe { NativeEmulation::from_raw(raw, None) }.unwrap();
        assert_eq!(emu.display_name(), "Fake VT100");
        assert_eq!(emu.capabilities(), Capabilities::NONE);
    }

    #[test]
    fn test_present_hooks_are_invoked_with_data() {
        let raw = RawEmulator {
            emulation_name: Some(fake_name),
            on_connect: Some(fake_hook),
            on_disconnect: None,
            emulator_data: std::ptr::null_mut(),
        };
        let mut emu = unsafe { NativeEmulation::from_raw(raw, None) }.unwrap();
        assert!(emu.capabilities().on_connect);
        assert!(!emu.capabilities().on_disconnect);

        let before = HOOK_CALLS.load(Ordering::SeqCst);
        emu.on_connect();
        assert_eq!(HOOK_CALLS.load(Ordering::SeqCst), before + 1);
    }
}
