//! Loadable - lazy module loading with timeout-raced fallback rendering
//!
//! This crate lazily resolves a named "module" (a unit of deferred code or
//! content) on demand, races the resolution against an optional timeout, and
//! drives a render sink through mutually-exclusive visual states: loading,
//! loaded, error, timed-out.
//!
//! ## Architecture
//!
//! - **Registry**: catalog of named module configurations with
//!   duplicate-name guarding, optional eager preloading, and asynchronous
//!   resolution (single or batch)
//! - **Controller**: per-instance state machine owning one show lifecycle,
//!   racing resolution against a timer and rendering the winning outcome
//! - **Capability traits**: the render surface, path resolver, raw-definition
//!   compiler, and host element are consumed through traits and implemented
//!   by the embedding application
//! - **Race policy**: resolution and timeout are independent; whichever
//!   transitions state first wins the visible outcome, the loser never
//!   crashes, leaks a timer, or loses a resolved value
//!
//! State is in-memory only and scoped to registry/controller instances;
//! there is no persistence or cross-instance sharing.

pub mod config;
pub mod controller;
pub mod registry;
pub mod traits;

pub use config::{GlobalOptions, ShowOptions, TimeoutValue, DEFAULT_TRANSITION_DELAY_MS};
pub use controller::{DisplayState, InitEvent, LoadableController};
pub use registry::{LoadSpec, LoaderFn, LoaderOutput, ModuleDescriptor, ModuleRegistry};
pub use traits::{
    Compiler, HostElement, LoadableError, LoadableUnit, Payload, RawDefinition, RenderContent,
    RenderHandle, Resolver, Slot, TransitionPhase, ViewDescriptor, ViewSink,
};
