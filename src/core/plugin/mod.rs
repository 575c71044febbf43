//! Emulation plugin registry
//!
//! Owns every registered emulation: the built-in no-op at index 0, plus any
//! native plugins discovered at startup. Discovery order is filesystem
//! enumeration order and is not deterministic across platforms.

pub mod abi;

pub use abi::NativeEmulation;

use crate::core::emulation::{Emulation, NoEmulation};
use abi::{InitPluginFn, RawEmulator, INIT_SYMBOL};
use libloading::Library;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Plugin error types
#[derive(Debug, Error)]
pub enum PluginError {
    /// Loading the dynamic library or resolving its entry symbol failed
    #[error("failed to load plugin: {0}")]
    LoadError(String),
    /// The entry point reported failure
    #[error("plugin initialization failed: {0}")]
    InitError(String),
    /// The entry point succeeded but left an unusable descriptor
    #[error("bad plugin descriptor: {0}")]
    BadDescriptor(String),
}

/// Ordered collection of registered emulations with one active selection.
pub struct EmulationRegistry {
    entries: Vec<Box<dyn Emulation>>,
    active: usize,
}

impl Default for EmulationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulationRegistry {
    /// Create a registry with the built-in no-op emulation at index 0.
    pub fn new() -> Self {
        Self {
            entries: vec![Box::new(NoEmulation)],
            active: 0,
        }
    }

    /// Append an emulation and return its index.
    ///
    /// This is the compiled-in registration path; native discovery funnels
    /// through it as well.
    pub fn register(&mut self, emulation: Box<dyn Emulation>) -> usize {
        tracing::info!(name = emulation.display_name(), "emulation registered");
        self.entries.push(emulation);
        self.entries.len() - 1
    }

    /// Scan `dir` for native plugins and register every one that loads.
    ///
    /// A candidate that fails to load, resolve its entry symbol, or
    /// initialize is skipped; a failure never aborts the rest of the scan
    /// and is never surfaced to the user. Returns the number of emulations
    /// added. A missing or unreadable directory adds nothing.
    pub fn discover(&mut self, dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            tracing::debug!(dir = %dir.display(), "plugin directory not readable");
            return 0;
        };

        let mut added = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(std::env::consts::DLL_EXTENSION)
            {
                continue;
            }

            match self.load_native(&path) {
                Ok(index) => {
                    tracing::info!(
                        path = %path.display(),
                        index,
                        "native emulation loaded"
                    );
                    added += 1;
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "plugin skipped");
                }
            }
        }

        added
    }

    /// Load one native plugin and register it.
    fn load_native(&mut self, path: &Path) -> Result<usize, PluginError> {
        unsafe {
            let lib =
                Library::new(path).map_err(|e| PluginError::LoadError(e.to_string()))?;

            let mut raw = RawEmulator::empty();
            {
                let init: libloading::Symbol<'_, InitPluginFn> = lib
                    .get(INIT_SYMBOL)
                    .map_err(|e| PluginError::LoadError(e.to_string()))?;

                // Context handle is reserved; native plugins get no window
                // handle in this host.
                if !init(std::ptr::null_mut(), &mut raw) {
                    return Err(PluginError::InitError(path.display().to_string()));
                }
            }

            let native = NativeEmulation::from_raw(raw, Some(lib))?;
            Ok(self.register(Box::new(native)))
        }
    }

    /// The `emulation/` directory next to the running executable, the
    /// default location scanned at startup.
    pub fn default_plugin_dir() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        Some(exe.parent()?.join("emulation"))
    }

    /// Number of registered emulations. Always at least 1.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true; the built-in emulation is always present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display name of the emulation at `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.display_name())
    }

    /// Display names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.display_name()).collect()
    }

    /// Index of the active emulation.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Change the active selection.
    ///
    /// Legal in either session mode; switching does not itself invoke any
    /// lifecycle hooks. Out-of-range indices are a programming error.
    pub fn select(&mut self, index: usize) {
        assert!(
            index < self.entries.len(),
            "emulation index {index} out of range ({} registered)",
            self.entries.len()
        );
        self.active = index;
    }

    /// Mutable access to the active emulation, for hook dispatch.
    pub fn active_mut(&mut self) -> &mut dyn Emulation {
        self.entries[self.active].as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::emulation::Capabilities;
    use std::io::Write;

    struct Echo;

    impl Emulation for Echo {
        fn display_name(&self) -> &str {
            "Echo"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::ALL
        }
    }

    #[test]
    fn test_bootstrap_registers_builtin_at_zero() {
        let registry = EmulationRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.name(0), Some("No Emulation"));
        assert_eq!(registry.active_index(), 0);
    }

    #[test]
    fn test_registration_appends_in_order() {
        let mut registry = EmulationRegistry::new();
        let index = registry.register(Box::new(Echo));
        assert_eq!(index, 1);
        assert_eq!(registry.names(), vec!["No Emulation", "Echo"]);
    }

    #[test]
    fn test_select_changes_active() {
        let mut registry = EmulationRegistry::new();
        registry.register(Box::new(Echo));
        registry.select(1);
        assert_eq!(registry.active_index(), 1);
        assert_eq!(registry.active_mut().display_name(), "Echo");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_select_out_of_range_fails_fast() {
        let mut registry = EmulationRegistry::new();
        registry.select(7);
    }

    #[test]
    fn test_discover_missing_directory_adds_nothing() {
        let mut registry = EmulationRegistry::new();
        let added = registry.discover(Path::new("/definitely/not/a/dir"));
        assert_eq!(added, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_discover_skips_corrupt_candidates() {
        let dir = tempfile::tempdir().unwrap();

        // Two corrupt candidates and one file that is not a candidate at all.
        for name in ["corrupt_a", "corrupt_b"] {
            let path = dir
                .path()
                .join(format!("{name}.{}", std::env::consts::DLL_EXTENSION));
            let mut f = std::fs::File::create(path).unwrap();
            f.write_all(b"not a shared object").unwrap();
        }
        std::fs::write(dir.path().join("readme.txt"), b"ignore me").unwrap();

        let mut registry = EmulationRegistry::new();
        let added = registry.discover(dir.path());

        assert_eq!(added, 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.name(0), Some("No Emulation"));
    }
}
