//! Native library loading and symbol lookup.

use std::ffi::CString;
use std::path::Path;

use libloading::{Library, Symbol};

use crate::error::{HarnessError, Result};

/// A loaded shared library.
pub struct NativeLibrary {
    library: Library,
    /// Path to the library (for messages)
    path: String,
}

impl NativeLibrary {
    /// Load a shared library from a path.
    ///
    /// A path without extension that does not exist is retried with the
    /// platform file name, so `build/QuEST` finds `build/libQuEST.so`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() && path.extension().is_none() {
            if let Some(stem) = path.file_name().and_then(|s| s.to_str()) {
                let candidate = path.with_file_name(Self::platform_lib_name(stem));
                if candidate.exists() {
                    return Self::load_exact(&candidate);
                }
            }
        }

        Self::load_exact(path)
    }

    fn load_exact(path: &Path) -> Result<Self> {
        // SAFETY: loading runs the library's initialisers; QuEST's only set up
        // its own globals.
        let library = unsafe { Library::new(path) }.map_err(|e| HarnessError::Library {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            library,
            path: path.display().to_string(),
        })
    }

    /// Platform file name for a library called `name`.
    pub fn platform_lib_name(name: &str) -> String {
        #[cfg(target_os = "windows")]
        {
            format!("{}.dll", name)
        }
        #[cfg(target_os = "macos")]
        {
            format!("lib{}.dylib", name)
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            format!("lib{}.so", name)
        }
    }

    /// Look up `name` and copy out the function pointer.
    ///
    /// # Safety
    ///
    /// `F` must be an `extern "C" fn` type matching the exported symbol, and
    /// the pointer must not be called after this library is dropped.
    pub unsafe fn function<F: Copy>(&self, name: &str) -> Result<F> {
        let c_name = CString::new(name).map_err(|_| HarnessError::MissingSymbol(name.to_string()))?;

        let symbol: Symbol<'_, F> = unsafe { self.library.get(c_name.as_bytes_with_nul()) }
            .map_err(|_| HarnessError::MissingSymbol(name.to_string()))?;
        Ok(*symbol)
    }

    /// Whether the library exports `name`.
    pub fn has_symbol(&self, name: &str) -> bool {
        let Ok(c_name) = CString::new(name) else {
            return false;
        };
        // SAFETY: the symbol is looked up as an opaque pointer and never called.
        unsafe { self.library.get::<*const ()>(c_name.as_bytes_with_nul()) }.is_ok()
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
