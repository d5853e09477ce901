//! Capability traits and core types for the loadable system
//!
//! Defines the interfaces the core consumes but does not implement: path
//! resolution, raw-definition compilation, view rendering, and host element
//! access. Also holds the resolved-unit tagged union and the error taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Opaque payload carried by resolved units, view descriptors, and render
/// handles. The core never interprets it; the consuming `ViewSink` or
/// `HostElement` downcasts to its own concrete types.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A resolved, renderable unit of deferred code or content.
///
/// Discriminated so the rendering branch is exhaustive: templates are
/// re-embedded into the content slot, components and module references go
/// through the sink's instantiation path.
#[derive(Clone)]
pub enum LoadableUnit {
    /// A directly instantiable component.
    Component(Payload),
    /// A template to embed by clearing and re-filling the content slot.
    Template(Payload),
    /// A reference to a full module whose root content the sink instantiates.
    ModuleRef(Payload),
}

impl LoadableUnit {
    /// Variant name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadableUnit::Component(_) => "component",
            LoadableUnit::Template(_) => "template",
            LoadableUnit::ModuleRef(_) => "module-ref",
        }
    }

    /// The opaque payload, regardless of variant.
    pub fn payload(&self) -> &Payload {
        match self {
            LoadableUnit::Component(p) | LoadableUnit::Template(p) | LoadableUnit::ModuleRef(p) => {
                p
            }
        }
    }
}

impl fmt::Debug for LoadableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadableUnit").field(&self.kind()).finish()
    }
}

/// A raw module definition produced by a loader that is not yet
/// instantiable and must go through the `Compiler` capability.
#[derive(Clone)]
pub struct RawDefinition {
    payload: Payload,
}

impl RawDefinition {
    /// Wrap an opaque raw definition.
    pub fn new(payload: Payload) -> Self {
        Self { payload }
    }

    /// The opaque definition payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

impl fmt::Debug for RawDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawDefinition")
    }
}

/// Description of a fallback view (loading / error / timed-out visual).
///
/// The tag identifies the view for logging and tests; the optional payload
/// carries whatever the sink needs to actually paint it.
#[derive(Clone)]
pub struct ViewDescriptor {
    tag: String,
    payload: Option<Payload>,
}

impl ViewDescriptor {
    /// Create a descriptor identified by a tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            payload: None,
        }
    }

    /// Attach an opaque payload for the sink.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// The identifying tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The opaque payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

impl fmt::Debug for ViewDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDescriptor")
            .field("tag", &self.tag)
            .finish()
    }
}

/// Render target slot within the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// Primary slot for resolved content.
    Content,
    /// Slot for fallback views while content is unavailable.
    Placeholder,
}

/// Appearance transition phase applied to a rendered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionPhase {
    /// View is entering.
    Appearing,
    /// View is being replaced and will be removed after the grace period.
    Disappearing,
    /// View has finished entering.
    Visible,
}

/// Handle to something the sink (or host) has rendered.
///
/// Identity is the sink-assigned id; the instance payload is whatever the
/// consumer wants delivered through `init` notifications.
#[derive(Clone)]
pub struct RenderHandle {
    id: u64,
    instance: Payload,
}

impl RenderHandle {
    /// Create a handle with a sink-assigned id and instance payload.
    pub fn new(id: u64, instance: Payload) -> Self {
        Self { id, instance }
    }

    /// Sink-assigned identity.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The rendered instance payload.
    pub fn instance(&self) -> &Payload {
        &self.instance
    }
}

impl fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderHandle").field("id", &self.id).finish()
    }
}

impl PartialEq for RenderHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RenderHandle {}

/// Content handed to the sink for rendering.
#[derive(Debug, Clone)]
pub enum RenderContent {
    /// A resolved unit for the content slot.
    Unit(LoadableUnit),
    /// A fallback view for the placeholder slot.
    View(ViewDescriptor),
}

/// Turns a string module specifier into a loadable unit
/// (e.g. a dynamic import / bundle split behind a path).
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a path specifier into a loadable unit.
    async fn resolve_by_path(&self, path: &str) -> Result<LoadableUnit, LoadableError>;
}

/// Compiles a raw module definition into an instantiable unit.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile a raw definition produced by a loader.
    async fn compile(&self, raw: RawDefinition) -> Result<LoadableUnit, LoadableError>;
}

/// The concrete rendering surface.
///
/// Implemented by the consumer; all calls are synchronous. The core drives
/// it through the loading/loaded/error/timed-out transitions and owns the
/// timing of `remove` after a transition grace period.
pub trait ViewSink: Send + Sync {
    /// Render content into a slot, returning a handle to the rendered view.
    fn render(&self, slot: Slot, content: RenderContent) -> RenderHandle;

    /// Clear everything rendered into a slot.
    fn clear(&self, slot: Slot);

    /// Remove one rendered view by handle.
    fn remove(&self, handle: &RenderHandle);

    /// Apply an appearance transition phase to a rendered view.
    fn set_transition(&self, handle: &RenderHandle, phase: TransitionPhase);
}

/// Host element access for element-mode rendering.
pub trait HostElement: Send + Sync {
    /// Synthesize a tag-named node (not yet attached).
    fn create_element(&self, tag: &str) -> RenderHandle;

    /// Append a synthesized node to the host.
    fn append_child(&self, node: &RenderHandle);
}

/// Loadable system errors
#[derive(Debug, Error)]
pub enum LoadableError {
    /// No descriptor registered under the requested name.
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    /// Loader, resolver, or compiler failure. The message is the raw error
    /// value, propagated unchanged so callers can key on it.
    #[error("{0}")]
    Resolution(String),

    /// A path specifier was used but no resolver capability is configured.
    #[error("no resolver configured for path specifier: {0}")]
    ResolverUnavailable(String),

    /// A loader yielded a raw definition but no compiler capability is
    /// configured.
    #[error("no compiler configured for raw module definition")]
    CompilerUnavailable,

    /// A timeout value failed numeric coercion. Non-fatal: the caller warns
    /// and arms no timer.
    #[error("invalid timeout value: {0}")]
    InvalidTimeout(String),
}

impl From<anyhow::Error> for LoadableError {
    fn from(e: anyhow::Error) -> Self {
        LoadableError::Resolution(e.to_string())
    }
}
