//! On-disk binary image scanning.

use std::fs;
use std::path::Path;

use object::{Object, ObjectSection, ObjectSymbol, SectionKind};
use tracing::{debug, trace};

use super::{find_pattern, Signature, SymbolResolver};
use crate::error::{HookError, Result};
use crate::types::Address;

/// Where a signature matched inside an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMatch
{
    /// Link-time virtual address of the match.
    pub address: Address,
    /// Section the match lies in, when known.
    pub section: Option<String>,
    /// Raw symbol name for symbol signatures.
    pub symbol: Option<String>,
}

/// Resolves signatures against an image file, returning link-time
/// addresses (no relocation).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageScanner;

impl ImageScanner
{
    /// Create a scanner.
    pub fn new() -> Self
    {
        Self
    }

    /// Read `path` and scan it for `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Io`] when the file cannot be read and
    /// [`HookError::ImageParse`] when it is not a supported object format.
    pub fn scan_file(&self, path: &Path, signature: &Signature) -> Result<Option<ScanMatch>>
    {
        let data = fs::read(path)?;
        self.scan_bytes(&data, signature).map_err(|err| match err {
            HookError::ImageParse { details, .. } => HookError::ImageParse {
                path: path.display().to_string(),
                details,
            },
            other => other,
        })
    }

    /// Scan an in-memory image for `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::ImageParse`] when `data` is not a supported object
    /// format or a section cannot be read.
    pub fn scan_bytes(&self, data: &[u8], signature: &Signature) -> Result<Option<ScanMatch>>
    {
        let file = object::File::parse(data).map_err(|err| parse_error(&err))?;
        let found = match signature {
            Signature::Symbol(name) => find_symbol(&file, name)?,
            Signature::Pattern(pattern) => find_in_text(&file, pattern)?,
        };
        match &found {
            Some(hit) => debug!(%signature, address = %hit.address, "signature matched"),
            None => debug!(%signature, "signature not found"),
        }
        Ok(found)
    }
}

impl SymbolResolver for ImageScanner
{
    fn resolve(&self, image: &Path, signature: &Signature) -> Option<Address>
    {
        match self.scan_file(image, signature) {
            Ok(found) => found.map(|hit| hit.address),
            Err(err) => {
                debug!(image = %image.display(), "scan failed: {err}");
                None
            }
        }
    }
}

fn parse_error(err: &object::Error) -> HookError
{
    HookError::ImageParse {
        path: String::from("<memory>"),
        details: err.to_string(),
    }
}

fn find_symbol(file: &object::File<'_>, name: &str) -> Result<Option<ScanMatch>>
{
    let exports = file.exports().map_err(|err| parse_error(&err))?;
    if let Some(export) = exports.iter().find(|export| export.name() == name.as_bytes()) {
        return Ok(Some(ScanMatch {
            address: Address::new(export.address()),
            section: None,
            symbol: Some(name.to_string()),
        }));
    }

    // Stripped exports still leave most builds with a full symbol table.
    let symbol = file
        .symbols()
        .chain(file.dynamic_symbols())
        .find(|symbol| symbol.is_definition() && symbol.name().is_ok_and(|raw| raw == name));
    Ok(symbol.map(|symbol| ScanMatch {
        address: Address::new(symbol.address()),
        section: symbol
            .section_index()
            .and_then(|index| file.section_by_index(index).ok())
            .and_then(|section| section.name().ok().map(str::to_string)),
        symbol: Some(name.to_string()),
    }))
}

fn find_in_text(file: &object::File<'_>, pattern: &[u8]) -> Result<Option<ScanMatch>>
{
    for section in file.sections().filter(|section| section.kind() == SectionKind::Text) {
        let data = section.data().map_err(|err| parse_error(&err))?;
        trace!(section = section.name().unwrap_or("?"), size = data.len(), "scanning section");
        if let Some(offset) = find_pattern(data, pattern) {
            return Ok(Some(ScanMatch {
                address: Address::new(section.address()) + offset as u64,
                section: section.name().ok().map(str::to_string),
                symbol: None,
            }));
        }
    }
    Ok(None)
}
