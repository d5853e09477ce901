//! Shared test support for the loadable system
//!
//! Recording mocks for the sink/host capabilities, stub resolver and
//! compiler, and loader helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use loadable::{
    Compiler, HostElement, LoadableError, LoadableUnit, LoaderOutput, Payload, RawDefinition,
    RenderContent, RenderHandle, Resolver, Slot, TransitionPhase, ViewSink,
};

/// One recorded sink operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOp {
    Render { slot: Slot, label: String },
    Clear(Slot),
    Remove(u64),
    Transition { id: u64, phase: TransitionPhase },
}

/// View sink that records every call and hands out sequential handles.
pub struct RecordingSink {
    next_id: AtomicU64,
    ops: Mutex<Vec<SinkOp>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            ops: Mutex::new(Vec::new()),
        })
    }

    pub fn ops(&self) -> Vec<SinkOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn op_count(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    /// Labels rendered into a slot, in order.
    pub fn rendered(&self, slot: Slot) -> Vec<String> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                SinkOp::Render { slot: s, label } if *s == slot => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn removed_count(&self) -> usize {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| matches!(op, SinkOp::Remove(_)))
            .count()
    }
}

fn unit_label(unit: &LoadableUnit) -> String {
    match unit.payload().downcast_ref::<String>() {
        Some(label) => label.clone(),
        None => format!("unit:{}", unit.kind()),
    }
}

impl ViewSink for RecordingSink {
    fn render(&self, slot: Slot, content: RenderContent) -> RenderHandle {
        let label = match &content {
            RenderContent::View(view) => view.tag().to_string(),
            RenderContent::Unit(unit) => unit_label(unit),
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.ops.lock().unwrap().push(SinkOp::Render { slot, label });
        RenderHandle::new(id, Arc::new(()))
    }

    fn clear(&self, slot: Slot) {
        self.ops.lock().unwrap().push(SinkOp::Clear(slot));
    }

    fn remove(&self, handle: &RenderHandle) {
        self.ops.lock().unwrap().push(SinkOp::Remove(handle.id()));
    }

    fn set_transition(&self, handle: &RenderHandle, phase: TransitionPhase) {
        self.ops.lock().unwrap().push(SinkOp::Transition {
            id: handle.id(),
            phase,
        });
    }
}

/// Host element recording synthesized and appended nodes.
pub struct RecordingHost {
    next_id: AtomicU64,
    appended: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1000),
            appended: Mutex::new(Vec::new()),
        })
    }

    /// Tags of nodes appended to the host, in order.
    pub fn appended(&self) -> Vec<String> {
        self.appended.lock().unwrap().clone()
    }
}

impl HostElement for RecordingHost {
    fn create_element(&self, tag: &str) -> RenderHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        RenderHandle::new(id, Arc::new(tag.to_string()))
    }

    fn append_child(&self, node: &RenderHandle) {
        let tag = node
            .instance()
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        self.appended.lock().unwrap().push(tag);
    }
}

/// Resolver stub that yields a labeled component for any path.
pub struct StubResolver {
    pub calls: AtomicUsize,
}

impl StubResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Resolver for StubResolver {
    async fn resolve_by_path(&self, path: &str) -> Result<LoadableUnit, LoadableError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(component(&format!("resolved:{}", path)))
    }
}

/// Compiler stub that turns any raw definition into a labeled component.
pub struct StubCompiler {
    pub calls: AtomicUsize,
}

impl StubCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Compiler for StubCompiler {
    async fn compile(&self, raw: RawDefinition) -> Result<LoadableUnit, LoadableError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let label = raw
            .payload()
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_else(|| "raw".to_string());
        Ok(component(&format!("compiled:{}", label)))
    }
}

/// A component unit labeled for sink assertions.
pub fn component(label: &str) -> LoadableUnit {
    LoadableUnit::Component(Arc::new(label.to_string()))
}

/// A template unit labeled for sink assertions.
pub fn template(label: &str) -> LoadableUnit {
    LoadableUnit::Template(Arc::new(label.to_string()))
}

/// A raw definition carrying a label.
pub fn raw(label: &str) -> RawDefinition {
    let payload: Payload = Arc::new(label.to_string());
    RawDefinition::new(payload)
}

/// Loader yielding a ready labeled component after a delay, counting its
/// invocations.
pub fn delayed_loader(
    label: &str,
    delay: Duration,
    calls: Arc<AtomicUsize>,
) -> impl Fn() -> futures::future::BoxFuture<'static, Result<LoaderOutput, LoadableError>>
       + Send
       + Sync
       + 'static {
    let label = label.to_string();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        let label = label.clone();
        let fut: futures::future::BoxFuture<'static, Result<LoaderOutput, LoadableError>> =
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(LoaderOutput::Ready(component(&label)))
            });
        fut
    }
}

/// Initialize test logging once; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
