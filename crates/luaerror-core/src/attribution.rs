//! Maps source files to the content package that shipped them.

use std::sync::Arc;

use crate::types::AttributionRecord;

/// Chunk name the runtime uses for native functions.
pub const NATIVE_SOURCE: &str = "[C]";

/// The host's content-package registry.
pub trait ContentRegistry
{
    /// Owner of `path`, or `None` when the path belongs to no package or the
    /// registry is not available yet.
    fn find_file_owner(&self, path: &str) -> Option<AttributionRecord>;
}

/// Thin front for [`ContentRegistry`] that filters out paths which can never
/// belong to a package.
#[derive(Clone)]
pub struct AttributionResolver
{
    registry: Arc<dyn ContentRegistry>,
    native_source: String,
}

impl AttributionResolver
{
    /// Resolver over `registry` using the standard native-source sentinel.
    pub fn new(registry: Arc<dyn ContentRegistry>) -> Self
    {
        Self::with_sentinel(registry, NATIVE_SOURCE)
    }

    /// Resolver over `registry` with a custom native-source sentinel.
    pub fn with_sentinel(registry: Arc<dyn ContentRegistry>, native_source: impl Into<String>) -> Self
    {
        Self {
            registry,
            native_source: native_source.into(),
        }
    }

    /// Owning package of `path`.
    ///
    /// Empty paths and the native sentinel short-circuit to `None` without
    /// touching the registry. Anything else is passed through uncached.
    pub fn attribute(&self, path: &str) -> Option<AttributionRecord>
    {
        if path.is_empty() || path == self.native_source {
            return None;
        }
        self.registry.find_file_owner(path)
    }

    /// Owning package as `(title, id)` with the id rendered in decimal.
    ///
    /// Package ids are 64-bit and do not survive a round trip through the
    /// script layer's double-precision numbers, so they cross as strings.
    pub fn owner_pair(&self, path: &str) -> Option<(String, String)>
    {
        self.attribute(path).map(|record| (record.title, record.id.to_string()))
    }
}

impl std::fmt::Debug for AttributionResolver
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("AttributionResolver")
            .field("native_source", &self.native_source)
            .finish_non_exhaustive()
    }
}
