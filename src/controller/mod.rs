//! Loadable controller
//!
//! Per-instance state machine owning one show lifecycle: triggers registry
//! resolution, races it against an optional timeout, and drives the view
//! sink through loading / loaded / error / timed-out transitions.

pub mod state;

pub use state::DisplayState;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{GlobalOptions, ShowOptions};
use crate::registry::{ModuleDescriptor, ModuleRegistry};
use crate::traits::{
    HostElement, LoadableError, LoadableUnit, RenderContent, RenderHandle, Slot, TransitionPhase,
    ViewDescriptor, ViewSink,
};

/// Notification fired exactly once per successful resolved render, carrying
/// the handle of the rendered instance (or the synthesized element node in
/// element mode).
#[derive(Debug, Clone)]
pub struct InitEvent {
    /// Handle to what was rendered.
    pub handle: RenderHandle,
}

/// Per-controller mutable state. Never held across an await; timer,
/// resolution, and cleanup tasks re-lock and re-check generation and state
/// before touching the display.
struct Inner {
    state: DisplayState,
    /// Name passed to the most recent show/load.
    requested_module: Option<String>,
    /// Cached resolved unit; replaced, never mutated, on reload.
    resolved: Option<LoadableUnit>,
    /// Module the cached unit belongs to.
    resolved_module: Option<String>,
    last_error: Option<Arc<LoadableError>>,
    /// Bumped on every load cycle; stale async completions are detected by
    /// comparing their stamped generation against this.
    generation: u64,
    /// One-shot timeout task; live only while Loading with a positive
    /// timeout armed.
    timer: Option<JoinHandle<()>>,
    /// In-flight resolution and transition-cleanup tasks, aborted on
    /// teardown. In-flight resolutions are never aborted by a new cycle.
    tasks: Vec<JoinHandle<()>>,
    /// Most recent fallback rendered into the placeholder slot.
    placeholder_handle: Option<RenderHandle>,
    /// Display toggled off without clearing the Loaded cache.
    hidden: bool,
    /// Options of the most recent show, reused by reload.
    last_options: ShowOptions,
    /// Call-site fallback overrides (highest precedence).
    loading_override: Option<ViewDescriptor>,
    error_override: Option<ViewDescriptor>,
    timeout_override: Option<ViewDescriptor>,
}

/// Shared context captured by spawned timer/resolution/cleanup tasks.
struct Ctx {
    registry: ModuleRegistry,
    sink: Arc<dyn ViewSink>,
    host: Arc<dyn HostElement>,
    options: GlobalOptions,
    init_tx: mpsc::UnboundedSender<InitEvent>,
    inner: Mutex<Inner>,
}

/// State machine coordinating one lazy-load lifecycle.
///
/// Resolution and timeout are independent; whichever transitions state
/// first wins the visible outcome, the loser is suppressed for display but
/// never leaks a timer or loses a resolved value within the same cycle.
pub struct LoadableController {
    ctx: Arc<Ctx>,
    init_rx: Option<mpsc::UnboundedReceiver<InitEvent>>,
}

impl LoadableController {
    /// Create a controller over a registry, a render sink, and a host
    /// element, with explicit global options.
    pub fn new(
        registry: ModuleRegistry,
        sink: Arc<dyn ViewSink>,
        host: Arc<dyn HostElement>,
        options: GlobalOptions,
    ) -> Self {
        let (init_tx, init_rx) = mpsc::unbounded_channel();
        Self {
            ctx: Arc::new(Ctx {
                registry,
                sink,
                host,
                options,
                init_tx,
                inner: Mutex::new(Inner {
                    state: DisplayState::Idle,
                    requested_module: None,
                    resolved: None,
                    resolved_module: None,
                    last_error: None,
                    generation: 0,
                    timer: None,
                    tasks: Vec::new(),
                    placeholder_handle: None,
                    hidden: false,
                    last_options: ShowOptions::default(),
                    loading_override: None,
                    error_override: None,
                    timeout_override: None,
                }),
            }),
            init_rx: Some(init_rx),
        }
    }

    /// Set the call-site loading fallback (highest precedence).
    pub fn with_loading_fallback(self, view: ViewDescriptor) -> Self {
        self.ctx.lock_inner().loading_override = Some(view);
        self
    }

    /// Set the call-site error fallback (highest precedence).
    pub fn with_error_fallback(self, view: ViewDescriptor) -> Self {
        self.ctx.lock_inner().error_override = Some(view);
        self
    }

    /// Set the call-site timeout fallback (highest precedence).
    pub fn with_timeout_fallback(self, view: ViewDescriptor) -> Self {
        self.ctx.lock_inner().timeout_override = Some(view);
        self
    }

    /// Take the init event receiver. Yields `Some` exactly once.
    pub fn take_init_events(&mut self) -> Option<mpsc::UnboundedReceiver<InitEvent>> {
        self.init_rx.take()
    }

    /// Request that a module be shown.
    ///
    /// If the same module is already Loaded and display was merely toggled
    /// off, the cached unit is re-rendered without resolving again.
    /// Otherwise a fresh load cycle starts. Requires a tokio runtime
    /// context.
    pub fn show(&self, module: &str, options: ShowOptions) {
        {
            let mut inner = self.ctx.lock_inner();
            let cached_for_same =
                inner.state.is_loaded() && inner.resolved_module.as_deref() == Some(module);
            if cached_for_same {
                if let Some(unit) = inner.resolved.clone() {
                    debug!("re-rendering cached module '{}'", module);
                    inner.hidden = false;
                    inner.last_options = options.clone();
                    let descriptor = self.ctx.registry.lookup(module);
                    let element_mode = self.ctx.element_mode(&options, &descriptor);
                    self.ctx.render_resolved(&mut inner, unit, module, element_mode);
                    return;
                }
            }
        }
        self.load(module, options);
    }

    /// Toggle the display off: clears both slots but keeps state and the
    /// resolved cache, so a subsequent `show` of the same module is a
    /// render-only fast path.
    pub fn hide(&self) {
        let mut inner = self.ctx.lock_inner();
        inner.hidden = true;
        inner.placeholder_handle = None;
        self.ctx.sink.clear(Slot::Content);
        self.ctx.sink.clear(Slot::Placeholder);
        debug!("display hidden");
    }

    /// Clear prior error/timed-out flags and start a fresh load cycle for
    /// the most recently shown module, with the same options.
    ///
    /// Reload always re-resolves through the registry; only the
    /// `hide`/`show` toggle reuses the cached unit.
    pub fn reload(&self) {
        let (module, options) = {
            let mut inner = self.ctx.lock_inner();
            inner.last_error = None;
            match inner.requested_module.clone() {
                Some(module) => (module, inner.last_options.clone()),
                None => {
                    warn!("reload requested before any show");
                    return;
                }
            }
        };
        info!("reloading module '{}'", module);
        self.load(&module, options);
    }

    /// Current display state.
    pub fn state(&self) -> DisplayState {
        self.ctx.lock_inner().state
    }

    /// True while a resolution is in flight.
    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// True once resolved content has been rendered.
    pub fn is_loaded(&self) -> bool {
        self.state().is_loaded()
    }

    /// True when the last cycle failed.
    pub fn is_error(&self) -> bool {
        self.state().is_error()
    }

    /// True when the timeout won the last race.
    pub fn is_timed_out(&self) -> bool {
        self.state().is_timed_out()
    }

    /// The retained error of the last failed cycle, if any. Not rendered as
    /// text; fallback views decide what to display.
    pub fn last_error(&self) -> Option<Arc<LoadableError>> {
        self.ctx.lock_inner().last_error.clone()
    }

    /// Start a fresh load cycle: render the loading fallback, arm the
    /// timeout race, and spawn the resolution.
    fn load(&self, module: &str, options: ShowOptions) {
        let ctx = &self.ctx;
        let descriptor = ctx.registry.lookup(module);
        let element_mode = ctx.element_mode(&options, &descriptor);

        // Coerce the timeout once; a failed coercion warns and arms no
        // timer.
        let timeout_ms = match options.timeout.as_ref().map(|t| t.normalize()) {
            None => None,
            Some(Ok(ms)) => Some(ms),
            Some(Err(e)) => {
                warn!("{}, arming no timer", e);
                None
            }
        };

        let mut inner = ctx.lock_inner();
        inner.generation += 1;
        let generation = inner.generation;
        inner.state = DisplayState::Loading;
        inner.hidden = false;
        inner.requested_module = Some(module.to_string());
        inner.last_options = options;
        inner.tasks.retain(|task| !task.is_finished());
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        info!("loading module '{}'", module);

        let loading_view = inner
            .loading_override
            .clone()
            .or_else(|| descriptor.loading_fallback.clone())
            .or_else(|| ctx.options.loading_fallback.clone());
        ctx.render_fallback(&mut inner, loading_view);

        match timeout_ms {
            // Deliberate "always time out immediately" mode: no async wait
            // is ever started.
            Some(0) => ctx.transition_timed_out(&mut inner, module),
            Some(ms) if ms > 0 => {
                let ctx = Arc::clone(&self.ctx);
                let module = module.to_string();
                inner.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(ms as u64)).await;
                    let mut inner = ctx.lock_inner();
                    if inner.generation != generation || !inner.state.is_loading() {
                        return;
                    }
                    // The timer slot must only hold a live handle while
                    // Loading; drop our own before transitioning.
                    inner.timer = None;
                    ctx.transition_timed_out(&mut inner, &module);
                }));
            }
            // Negative or absent: resolution alone determines the outcome.
            _ => {}
        }

        // Resolution runs even when the display already timed out; its
        // result is cached for the show fast path.
        let ctx = Arc::clone(&self.ctx);
        let module = module.to_string();
        let resolve_task = tokio::spawn(async move {
            let result = ctx.registry.resolve(&module).await;
            let mut inner = ctx.lock_inner();
            if inner.generation == generation {
                if let Some(timer) = inner.timer.take() {
                    timer.abort();
                }
            }
            match result {
                Ok(unit) => ctx.settle_ok(&mut inner, generation, unit, &module, element_mode),
                Err(e) => ctx.settle_err(&mut inner, generation, e, &module),
            }
        });
        inner.tasks.push(resolve_task);
    }
}

impl Ctx {
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("controller state lock poisoned")
    }

    /// Element-mode precedence: forced → call site → descriptor → global.
    fn element_mode(&self, options: &ShowOptions, descriptor: &ModuleDescriptor) -> bool {
        options.force_element
            || options
                .is_element
                .or(descriptor.is_element)
                .unwrap_or(self.options.is_element)
    }

    /// Transition to TimedOut and render the timeout fallback.
    fn transition_timed_out(&self, inner: &mut Inner, module: &str) {
        warn!("module '{}' timed out", module);
        inner.state = DisplayState::TimedOut;
        let descriptor = self.registry.lookup(module);
        let view = inner
            .timeout_override
            .clone()
            .or_else(|| descriptor.timeout_fallback.clone())
            .or_else(|| self.options.timeout_fallback.clone());
        self.render_fallback(inner, view);
    }

    /// Apply a settled successful resolution, respecting the race policy.
    fn settle_ok(
        &self,
        inner: &mut Inner,
        generation: u64,
        unit: LoadableUnit,
        module: &str,
        element_mode: bool,
    ) {
        if inner.generation != generation {
            debug!("discarding stale resolution of module '{}'", module);
            return;
        }
        match inner.state {
            // Timeout won the race: keep the display, cache the unit.
            DisplayState::TimedOut => {
                debug!("module '{}' resolved after timeout, caching only", module);
                inner.resolved = Some(unit);
                inner.resolved_module = Some(module.to_string());
            }
            DisplayState::Loading => {
                info!("module '{}' loaded", module);
                inner.state = DisplayState::Loaded;
                inner.last_error = None;
                inner.resolved = Some(unit.clone());
                inner.resolved_module = Some(module.to_string());
                self.render_resolved(inner, unit, module, element_mode);
            }
            _ => {}
        }
    }

    /// Apply a settled failed resolution, respecting the race policy.
    fn settle_err(&self, inner: &mut Inner, generation: u64, error: LoadableError, module: &str) {
        if inner.generation != generation {
            debug!("discarding stale failure of module '{}': {}", module, error);
            return;
        }
        match inner.state {
            // Timeout won the race: retain the error, keep the display.
            DisplayState::TimedOut => {
                inner.last_error = Some(Arc::new(error));
            }
            DisplayState::Loading => {
                warn!("module '{}' failed to load: {}", module, error);
                inner.state = DisplayState::Error;
                let descriptor = self.registry.lookup(module);
                let view = inner
                    .error_override
                    .clone()
                    .or_else(|| descriptor.error_fallback.clone())
                    .or_else(|| self.options.error_fallback.clone());
                inner.last_error = Some(Arc::new(error));
                self.render_fallback(inner, view);
            }
            _ => {}
        }
    }

    /// Render a fallback view into the placeholder slot with the
    /// appearing/disappearing transition. A previously visible fallback is
    /// removed after the grace period.
    fn render_fallback(&self, inner: &mut Inner, view: Option<ViewDescriptor>) {
        if inner.hidden {
            return;
        }
        let view = match view {
            Some(view) => view,
            None => return,
        };
        let handle = self.sink.render(Slot::Placeholder, RenderContent::View(view));
        self.sink.set_transition(&handle, TransitionPhase::Appearing);
        if let Some(previous) = inner.placeholder_handle.replace(handle.clone()) {
            self.sink.set_transition(&previous, TransitionPhase::Disappearing);
            inner.tasks.push(self.spawn_transition_cleanup(previous, handle));
        }
    }

    /// Render a resolved unit: element mode appends a tag-named node to the
    /// host, templates clear and re-embed the content slot, components and
    /// module refs go through the sink's instantiation path with the
    /// placeholder transition. Fires `init` with the rendered handle.
    fn render_resolved(
        &self,
        inner: &mut Inner,
        unit: LoadableUnit,
        module: &str,
        element_mode: bool,
    ) {
        if inner.hidden {
            return;
        }

        if element_mode {
            let node = self.host.create_element(module);
            self.host.append_child(&node);
            self.retire_placeholder(inner, None);
            let _ = self.init_tx.send(InitEvent { handle: node });
            return;
        }

        let handle = match unit {
            LoadableUnit::Template(_) => {
                // Templates re-embed without the transition dance.
                self.sink.clear(Slot::Content);
                let handle = self.sink.render(Slot::Content, RenderContent::Unit(unit));
                self.retire_placeholder(inner, None);
                handle
            }
            LoadableUnit::Component(_) | LoadableUnit::ModuleRef(_) => {
                self.sink.clear(Slot::Content);
                let handle = self.sink.render(Slot::Content, RenderContent::Unit(unit));
                self.sink.set_transition(&handle, TransitionPhase::Appearing);
                self.retire_placeholder(inner, Some(handle.clone()));
                handle
            }
        };
        let _ = self.init_tx.send(InitEvent { handle });
    }

    /// Mark the visible fallback as disappearing and remove it after the
    /// grace period, optionally marking a newly appearing handle Visible
    /// afterwards.
    fn retire_placeholder(&self, inner: &mut Inner, appearing: Option<RenderHandle>) {
        if let Some(previous) = inner.placeholder_handle.take() {
            self.sink.set_transition(&previous, TransitionPhase::Disappearing);
            if let Some(appearing) = appearing {
                inner.tasks.push(self.spawn_transition_cleanup(previous, appearing));
            } else {
                let sink = Arc::clone(&self.sink);
                let delay = self.options.transition_delay;
                inner.tasks.push(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    sink.remove(&previous);
                }));
            }
        }
    }

    /// After the grace period, remove the disappearing view and mark the
    /// appearing one visible.
    fn spawn_transition_cleanup(
        &self,
        disappearing: RenderHandle,
        appearing: RenderHandle,
    ) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let delay = self.options.transition_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.remove(&disappearing);
            sink.set_transition(&appearing, TransitionPhase::Visible);
        })
    }
}

impl Drop for LoadableController {
    /// Teardown cancels any live timer and aborts in-flight tasks so a late
    /// completion can never render against a disposed sink.
    fn drop(&mut self) {
        let mut inner = self.ctx.lock_inner();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        for task in inner.tasks.drain(..) {
            task.abort();
        }
    }
}
