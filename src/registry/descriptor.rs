//! Module descriptors
//!
//! Declarative registry entries describing how to obtain a module and which
//! fallback views it prefers.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::traits::{LoadableError, LoadableUnit, RawDefinition, ViewDescriptor};

/// Stored async loader function.
pub type LoaderFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<LoaderOutput, LoadableError>> + Send + Sync>;

/// What a loader function yields.
#[derive(Debug, Clone)]
pub enum LoaderOutput {
    /// A directly usable unit; returned to the caller as-is.
    Ready(LoadableUnit),
    /// A raw definition that must go through the `Compiler` capability.
    Raw(RawDefinition),
}

/// How a module is obtained: a stored loader function or a string path
/// delegated to the `Resolver` capability.
#[derive(Clone)]
pub enum LoadSpec {
    /// Async loader invoked on resolution.
    Loader(LoaderFn),
    /// Path specifier handed to the external resolver.
    Path(String),
}

impl fmt::Debug for LoadSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadSpec::Loader(_) => f.write_str("LoadSpec::Loader"),
            LoadSpec::Path(p) => f.debug_tuple("LoadSpec::Path").field(p).finish(),
        }
    }
}

/// Registry entry for one named module.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Unique name within a registry instance.
    pub name: String,
    /// Load specifier. `None` only in the empty sentinel returned for
    /// absent lookups.
    pub load: Option<LoadSpec>,
    /// Resolve eagerly at registration time (best-effort).
    pub preload: bool,
    /// Per-module override of the global element-mode flag.
    pub is_element: Option<bool>,
    /// View shown while this module loads.
    pub loading_fallback: Option<ViewDescriptor>,
    /// View shown when resolution fails.
    pub error_fallback: Option<ViewDescriptor>,
    /// View shown when the timeout fires first.
    pub timeout_fallback: Option<ViewDescriptor>,
}

impl ModuleDescriptor {
    /// Create a descriptor with an explicit load specifier.
    pub fn new(name: impl Into<String>, load: LoadSpec) -> Self {
        Self {
            name: name.into(),
            load: Some(load),
            preload: false,
            is_element: None,
            loading_fallback: None,
            error_fallback: None,
            timeout_fallback: None,
        }
    }

    /// Create a descriptor from an async loader function.
    pub fn from_loader<F, Fut>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<LoaderOutput, LoadableError>> + Send + 'static,
    {
        let loader: LoaderFn = Arc::new(move || {
            let fut: BoxFuture<'static, Result<LoaderOutput, LoadableError>> =
                Box::pin(loader());
            fut
        });
        Self::new(name, LoadSpec::Loader(loader))
    }

    /// Create a descriptor from a path specifier for the resolver
    /// capability.
    pub fn from_path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, LoadSpec::Path(path.into()))
    }

    /// The empty sentinel returned by `lookup` for absent names. Absence is
    /// signaled by empty fields, never by an error.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            load: None,
            preload: false,
            is_element: None,
            loading_fallback: None,
            error_fallback: None,
            timeout_fallback: None,
        }
    }

    /// True for the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.load.is_none()
    }

    /// Resolve eagerly at registration.
    pub fn with_preload(mut self) -> Self {
        self.preload = true;
        self
    }

    /// Override the global element-mode flag for this module.
    pub fn with_is_element(mut self, is_element: bool) -> Self {
        self.is_element = Some(is_element);
        self
    }

    /// Set the per-module loading fallback.
    pub fn with_loading_fallback(mut self, view: ViewDescriptor) -> Self {
        self.loading_fallback = Some(view);
        self
    }

    /// Set the per-module error fallback.
    pub fn with_error_fallback(mut self, view: ViewDescriptor) -> Self {
        self.error_fallback = Some(view);
        self
    }

    /// Set the per-module timeout fallback.
    pub fn with_timeout_fallback(mut self, view: ViewDescriptor) -> Self {
        self.timeout_fallback = Some(view);
        self
    }
}
