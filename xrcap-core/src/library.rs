//! Discovery of optional shared libraries (capture tool, decision provider).
//!
//! Lookup order for a library:
//!
//! 1. a module with that name already mapped into the process (the capture
//!    tool is often injected before the application starts),
//! 2. the configured full path,
//! 3. the bare name through the platform search path.

use std::ffi::OsStr;
use std::path::Path;

use libloading::Library;
use tracing::debug;

use crate::error::LayerError;

/// Open a library by already-loaded name, then full path, then name.
pub fn open_library(name: &str, path: &Path) -> Result<Library, LayerError> {
    if let Some(library) = already_loaded(name) {
        debug!("{name} already loaded in process");
        return Ok(library);
    }

    let candidates: [&OsStr; 2] = [path.as_os_str(), OsStr::new(name)];
    for candidate in candidates.into_iter().filter(|c| !c.is_empty()) {
        // SAFETY: loading runs the library's initialisers; the candidates
        // come from the layer configuration, not from the application.
        match unsafe { Library::new(candidate) } {
            Ok(library) => {
                debug!("loaded {}", Path::new(candidate).display());
                return Ok(library);
            }
            Err(e) => debug!("could not load {}: {e}", Path::new(candidate).display()),
        }
    }

    Err(LayerError::LibraryNotFound {
        name: name.to_string(),
        path: path.to_path_buf(),
    })
}

/// Look up an exported function and copy the pointer out of the symbol.
///
/// # Safety
///
/// `T` must be the exact function-pointer type of the export, and the
/// returned pointer must not be called after `library` is dropped.
pub unsafe fn resolve<T: Copy>(
    library: &Library,
    label: &str,
    symbol: &'static str,
) -> Result<T, LayerError> {
    match unsafe { library.get::<T>(symbol.as_bytes()) } {
        Ok(sym) => Ok(*sym),
        Err(e) => {
            debug!("{label}: {symbol} lookup failed: {e}");
            Err(LayerError::SymbolMissing {
                library: label.to_string(),
                symbol,
            })
        }
    }
}

#[cfg(windows)]
fn already_loaded(name: &str) -> Option<Library> {
    libloading::os::windows::Library::open_already_loaded(name)
        .ok()
        .map(Library::from)
}

#[cfg(unix)]
fn already_loaded(name: &str) -> Option<Library> {
    // SAFETY: RTLD_NOLOAD never maps a new object, so no initialisers run.
    unsafe { libloading::os::unix::Library::open(Some(name), libc::RTLD_NOW | libc::RTLD_NOLOAD) }
        .ok()
        .map(Library::from)
}

#[cfg(not(any(windows, unix)))]
fn already_loaded(_name: &str) -> Option<Library> {
    None
}

/// Handle on the running executable, for feeding in-process tables in tests.
#[cfg(all(test, unix))]
pub(crate) fn this_process() -> Library {
    libloading::os::unix::Library::this().into()
}

#[cfg(all(test, windows))]
pub(crate) fn this_process() -> Library {
    libloading::os::windows::Library::this()
        .expect("module handle of the test binary")
        .into()
}
