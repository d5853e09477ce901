//! Module registry
//!
//! Holds the catalog of named module configurations and resolves them into
//! loadable units, delegating path specifiers to the resolver capability and
//! raw definitions to the compiler capability.

pub mod descriptor;

pub use descriptor::{LoadSpec, LoaderFn, LoaderOutput, ModuleDescriptor};

use futures::future::try_join_all;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::traits::{Compiler, LoadableError, LoadableUnit, Resolver};

/// Registry of named loadable modules.
///
/// Cheap to clone; clones share the same catalog. The module list is mutated
/// only by `register` and read by `lookup`/`resolve`, so concurrent
/// resolution is safe.
#[derive(Clone)]
pub struct ModuleRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    /// Registered descriptors in registration order.
    modules: RwLock<Vec<ModuleDescriptor>>,
    /// Path-resolution capability.
    resolver: Option<Arc<dyn Resolver>>,
    /// Raw-definition compilation capability.
    compiler: Option<Arc<dyn Compiler>>,
}

impl ModuleRegistry {
    /// Create a registry without resolver or compiler capabilities. Modules
    /// registered with path specifiers or raw-yielding loaders will fail to
    /// resolve until capabilities are provided.
    pub fn new() -> Self {
        Self::with_capabilities(None, None)
    }

    /// Create a registry with the given capabilities.
    pub fn with_capabilities(
        resolver: Option<Arc<dyn Resolver>>,
        compiler: Option<Arc<dyn Compiler>>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                modules: RwLock::new(Vec::new()),
                resolver,
                compiler,
            }),
        }
    }

    /// Register module descriptors.
    ///
    /// A descriptor whose name was previously registered is skipped with a
    /// warning; the first registration wins. Descriptors flagged `preload`
    /// trigger an immediate best-effort resolution in a background task
    /// (requires a tokio runtime context); preload failures are logged and
    /// swallowed, never failing registration.
    pub fn register(&self, descriptors: Vec<ModuleDescriptor>) {
        for descriptor in descriptors {
            let existing = self.lookup(&descriptor.name);
            if !existing.is_empty() {
                warn!(
                    "module '{}' was previously registered, keeping the first registration",
                    descriptor.name
                );
                continue;
            }

            let name = descriptor.name.clone();
            let preload = descriptor.preload;

            {
                let mut modules = self
                    .inner
                    .modules
                    .write()
                    .expect("module registry lock poisoned");
                modules.push(descriptor);
            }
            info!("registered module '{}'", name);

            if preload {
                let registry = self.clone();
                tokio::spawn(async move {
                    match registry.resolve(&name).await {
                        Ok(unit) => debug!("preloaded module '{}' ({})", name, unit.kind()),
                        Err(e) => debug!("preload of module '{}' failed: {}", name, e),
                    }
                });
            }
        }
    }

    /// Look up a descriptor by name.
    ///
    /// Returns a clone of the registered descriptor, or the empty sentinel
    /// if the name is absent. Never fails.
    pub fn lookup(&self, name: &str) -> ModuleDescriptor {
        let modules = self
            .inner
            .modules
            .read()
            .expect("module registry lock poisoned");
        modules
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .unwrap_or_else(ModuleDescriptor::empty)
    }

    /// Names of all registered modules, in registration order.
    pub fn module_names(&self) -> Vec<String> {
        let modules = self
            .inner
            .modules
            .read()
            .expect("module registry lock poisoned");
        modules.iter().map(|m| m.name.clone()).collect()
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.inner
            .modules
            .read()
            .expect("module registry lock poisoned")
            .len()
    }

    /// True if no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a registered module into a loadable unit.
    ///
    /// Path specifiers delegate to the resolver capability and its result is
    /// returned directly. Loader functions are invoked; a ready unit is
    /// returned as-is, a raw definition is handed to the compiler
    /// capability. Loader, resolver, and compiler errors propagate
    /// unchanged.
    pub async fn resolve(&self, name: &str) -> Result<LoadableUnit, LoadableError> {
        let descriptor = self.lookup(name);
        let spec = match descriptor.load {
            Some(spec) => spec,
            None => return Err(LoadableError::ModuleNotFound(name.to_string())),
        };

        match spec {
            LoadSpec::Path(path) => match &self.inner.resolver {
                Some(resolver) => resolver.resolve_by_path(&path).await,
                None => Err(LoadableError::ResolverUnavailable(path)),
            },
            LoadSpec::Loader(loader) => match loader().await? {
                LoaderOutput::Ready(unit) => Ok(unit),
                LoaderOutput::Raw(raw) => match &self.inner.compiler {
                    Some(compiler) => compiler.compile(raw).await,
                    None => Err(LoadableError::CompilerUnavailable),
                },
            },
        }
    }

    /// Resolve a list of modules (or every registered module if `names` is
    /// `None`) concurrently. Fails as a whole if any resolution fails.
    pub async fn resolve_all(
        &self,
        names: Option<&[String]>,
    ) -> Result<Vec<LoadableUnit>, LoadableError> {
        let names: Vec<String> = match names {
            Some(names) => names.to_vec(),
            None => self.module_names(),
        };
        try_join_all(names.iter().map(|name| self.resolve(name))).await
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
