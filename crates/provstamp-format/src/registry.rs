//! Format strategy registry
//!
//! Provides [`FormatRegistry`] for looking up the strategy of a [`FormatKind`].

use crate::error::FormatError;
use crate::kind::FormatKind;
use crate::png::PngTextTool;
use crate::strategy::FormatStrategy;
use crate::tool::TagTool;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::Arc;

static GLOBAL: Lazy<Arc<FormatRegistry>> = Lazy::new(|| Arc::new(FormatRegistry::with_defaults()));

/// Registry of format strategies keyed by kind
#[derive(Debug, Default, Clone)]
pub struct FormatRegistry {
    strategies: BTreeMap<FormatKind, FormatStrategy>,
}

impl FormatRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registry with PNG implemented in-process and every other kind
    /// registered as unimplemented
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::with_png_tool(Arc::new(PngTextTool::new()))
    }

    /// Default registry with a custom PNG tool (e.g. exiftool)
    #[must_use]
    pub fn with_png_tool(tool: Arc<dyn TagTool>) -> Self {
        let mut registry = Self::new();
        for kind in FormatKind::ALL {
            registry.mark_unimplemented(kind);
        }
        registry.register(FormatStrategy::new(FormatKind::Png, tool));
        registry
    }

    /// Shared default registry
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Register (or replace) a strategy
    pub fn register(&mut self, strategy: FormatStrategy) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    /// Register `kind` without a tool
    pub fn mark_unimplemented(&mut self, kind: FormatKind) {
        self.register(FormatStrategy::unimplemented(kind));
    }

    /// Strategy for `kind`
    ///
    /// # Errors
    /// `UnsupportedFormat` if the kind is not registered at all
    pub fn get(&self, kind: FormatKind) -> Result<&FormatStrategy, FormatError> {
        self.strategies
            .get(&kind)
            .ok_or_else(|| FormatError::unsupported(kind.as_str()))
    }

    /// Check if kind is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: FormatKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    /// Registered kinds, in declaration order
    #[inline]
    #[must_use]
    pub fn kinds(&self) -> Vec<FormatKind> {
        self.strategies.keys().copied().collect()
    }

    /// Get number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
