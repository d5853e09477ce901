//! Module registry tests
//!
//! Catalog registration, duplicate guarding, preloading, and resolution
//! through the resolver/compiler capabilities.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use loadable::{LoadableError, LoaderOutput, ModuleDescriptor, ModuleRegistry};

#[test]
fn duplicate_name_keeps_first_registration() {
    init_tracing();
    let registry = ModuleRegistry::new();
    registry.register(vec![ModuleDescriptor::from_loader("d", || async {
        Ok(LoaderOutput::Ready(component("first")))
    })
    .with_is_element(true)]);
    registry.register(vec![ModuleDescriptor::from_loader("d", || async {
        Ok(LoaderOutput::Ready(component("second")))
    })]);

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup("d").is_element, Some(true));
}

#[test]
fn lookup_of_absent_name_is_empty_sentinel() {
    let registry = ModuleRegistry::new();
    let descriptor = registry.lookup("missing");
    assert!(descriptor.is_empty());
    assert!(descriptor.name.is_empty());
    assert!(descriptor.loading_fallback.is_none());
}

#[tokio::test]
async fn resolve_invokes_loader_and_returns_ready_unit() {
    let registry = ModuleRegistry::new();
    registry.register(vec![ModuleDescriptor::from_loader("widget", || async {
        Ok(LoaderOutput::Ready(component("widget-component")))
    })]);

    let unit = registry.resolve("widget").await.unwrap();
    assert_eq!(unit.kind(), "component");
    assert_eq!(
        unit.payload().downcast_ref::<String>().unwrap(),
        "widget-component"
    );
}

#[tokio::test]
async fn resolve_delegates_path_spec_to_resolver() {
    let resolver = StubResolver::new();
    let registry = ModuleRegistry::with_capabilities(Some(resolver.clone()), None);
    registry.register(vec![ModuleDescriptor::from_path("remote", "bundles/remote")]);

    let unit = registry.resolve("remote").await.unwrap();
    assert_eq!(
        unit.payload().downcast_ref::<String>().unwrap(),
        "resolved:bundles/remote"
    );
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resolve_compiles_raw_loader_output() {
    let compiler = StubCompiler::new();
    let registry = ModuleRegistry::with_capabilities(None, Some(compiler.clone()));
    registry.register(vec![ModuleDescriptor::from_loader("source", || async {
        Ok(LoaderOutput::Raw(raw("source-def")))
    })]);

    let unit = registry.resolve("source").await.unwrap();
    assert_eq!(
        unit.payload().downcast_ref::<String>().unwrap(),
        "compiled:source-def"
    );
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn loader_error_propagates_unchanged() {
    let registry = ModuleRegistry::new();
    registry.register(vec![ModuleDescriptor::from_loader("broken", || async {
        Err(LoadableError::Resolution("boom".to_string()))
    })]);

    let err = registry.resolve("broken").await.unwrap_err();
    assert_eq!(err.to_string(), "boom");
}

#[tokio::test]
async fn resolve_all_without_names_resolves_every_module() {
    let registry = ModuleRegistry::new();
    registry.register(vec![
        ModuleDescriptor::from_loader("a", || async { Ok(LoaderOutput::Ready(component("a"))) }),
        ModuleDescriptor::from_loader("b", || async { Ok(LoaderOutput::Ready(component("b"))) }),
    ]);

    let units = registry.resolve_all(None).await.unwrap();
    assert_eq!(units.len(), 2);
}

#[tokio::test]
async fn resolve_all_is_all_or_nothing() {
    let registry = ModuleRegistry::new();
    registry.register(vec![
        ModuleDescriptor::from_loader("good", || async { Ok(LoaderOutput::Ready(component("g"))) }),
        ModuleDescriptor::from_loader("bad", || async {
            Err(LoadableError::Resolution("bad loader".to_string()))
        }),
    ]);

    let err = registry.resolve_all(None).await.unwrap_err();
    assert_eq!(err.to_string(), "bad loader");

    let subset = ["good".to_string()];
    let units = registry.resolve_all(Some(&subset)).await.unwrap();
    assert_eq!(units.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn preload_resolves_at_registration() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = ModuleRegistry::new();
    registry.register(vec![ModuleDescriptor::new(
        "eager",
        loadable::LoadSpec::Loader(Arc::new({
            let calls = calls.clone();
            delayed_loader("eager", Duration::from_millis(10), calls)
        })),
    )
    .with_preload()]);

    // No display request, resolution was still triggered.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn preload_failure_is_swallowed() {
    init_tracing();
    let registry = ModuleRegistry::new();
    registry.register(vec![ModuleDescriptor::from_loader("flaky", || async {
        Err(LoadableError::Resolution("preload boom".to_string()))
    })
    .with_preload()]);

    tokio::task::yield_now().await;
    // Registration survived; the module resolves (or fails) normally later.
    assert_eq!(registry.len(), 1);
    let err = registry.resolve("flaky").await.unwrap_err();
    assert_eq!(err.to_string(), "preload boom");
}
