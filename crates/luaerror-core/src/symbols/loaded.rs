//! Resolution inside images mapped into the current process (Linux).
//!
//! `dl_iterate_phdr` reports every loaded object with its path and load
//! bias. The image is then scanned on disk and the link-time address is
//! shifted by the bias to get the live address.

use std::ffi::{CStr, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use libc::{c_int, c_void, dl_phdr_info, size_t};
use tracing::debug;

use super::{ImageScanner, Signature, SymbolResolver};
use crate::error::{HookError, Result};
use crate::types::Address;

/// An object mapped into the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage
{
    /// Path the loader opened.
    pub path: PathBuf,
    /// Difference between runtime and link-time addresses.
    pub bias: u64,
}

/// [`SymbolResolver`] for the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadedImageResolver
{
    scanner: ImageScanner,
}

impl LoadedImageResolver
{
    /// Create a resolver.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Find the loaded object whose path ends with `image`.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::ImageNotLoaded`] when no mapped object matches.
    pub fn find_image(&self, image: &Path) -> Result<LoadedImage>
    {
        loaded_images()
            .into_iter()
            .find(|loaded| loaded.path.ends_with(image))
            .ok_or_else(|| HookError::ImageNotLoaded(image.display().to_string()))
    }

    /// Live address of `signature` inside the loaded `image`.
    ///
    /// # Errors
    ///
    /// Returns an error when the image is not loaded or cannot be scanned.
    pub fn locate(&self, image: &Path, signature: &Signature) -> Result<Option<Address>>
    {
        let loaded = self.find_image(image)?;
        let found = self.scanner.scan_file(&loaded.path, signature)?;
        Ok(found.and_then(|hit| hit.address.checked_add(loaded.bias)))
    }
}

impl SymbolResolver for LoadedImageResolver
{
    fn resolve(&self, image: &Path, signature: &Signature) -> Option<Address>
    {
        match self.locate(image, signature) {
            Ok(found) => found,
            Err(err) => {
                debug!(image = %image.display(), "resolution failed: {err}");
                None
            }
        }
    }
}

/// Every object currently mapped into the process, main executable first.
pub fn loaded_images() -> Vec<LoadedImage>
{
    let mut images: Vec<LoadedImage> = Vec::new();
    // SAFETY: the callback only reads the loader-provided record for the
    // duration of the call and writes into the Vec passed through `data`.
    unsafe {
        libc::dl_iterate_phdr(Some(collect_image), (&mut images as *mut Vec<LoadedImage>).cast::<c_void>());
    }
    // The loader reports the main executable without a name
    if let Some(main) = images.first_mut().filter(|image| image.path.as_os_str().is_empty()) {
        match std::env::current_exe() {
            Ok(exe) => main.path = exe,
            Err(err) => debug!("cannot name the main executable: {err}"),
        }
    }
    images
}

unsafe extern "C" fn collect_image(info: *mut dl_phdr_info, _size: size_t, data: *mut c_void) -> c_int
{
    let images = &mut *data.cast::<Vec<LoadedImage>>();
    let info = &*info;
    let path = if info.dlpi_name.is_null() {
        PathBuf::new()
    } else {
        PathBuf::from(OsStr::from_bytes(CStr::from_ptr(info.dlpi_name).to_bytes()))
    };
    images.push(LoadedImage {
        path,
        bias: info.dlpi_addr as u64,
    });
    0
}
