mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use keystone::module::{DependenciesScanner, ModuleContainer, ModuleKey};
use keystone::prelude::*;

fn distance(container: &ModuleContainer, key: &str) -> usize {
    container.require(&ModuleKey::from(key)).unwrap().distance()
}

#[test]
fn test_distance_follows_import_depth() {
    let d = ModuleDef::new("D").build();
    let c = ModuleDef::new("C").import(d).build();
    let a = ModuleDef::new("A").import(c).build();
    let b = ModuleDef::new("B").build();
    let root = ModuleDef::new("Root").import(a).import(b).build();

    let mut container = ModuleContainer::new();
    DependenciesScanner::new(&mut container).scan(&root).unwrap();

    assert_eq!(distance(&container, "Root"), 0);
    assert_eq!(distance(&container, "A"), 1);
    assert_eq!(distance(&container, "B"), 1);
    assert_eq!(distance(&container, "C"), 2);
    assert_eq!(distance(&container, "D"), 3);
}

static P_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct SharedProvider;

impl Injectable for SharedProvider {
    fn construct(_: &Dependencies) -> keystone::Result<Self> {
        P_BUILDS.fetch_add(1, Ordering::SeqCst);
        Ok(SharedProvider)
    }
}

#[derive(Injectable)]
struct ConsumerController {
    provider: Arc<SharedProvider>,
}

impl Controller for ConsumerController {
    fn controller() -> ControllerDef {
        ControllerDef::new::<Self>("consumer")
    }
}

#[derive(Injectable)]
struct SecondConsumer {
    provider: Arc<SharedProvider>,
}

#[module(providers = [SharedProvider], exports = [SharedProvider])]
struct ProviderModule;

#[module(imports = [ProviderModule], controllers = [ConsumerController], providers = [SecondConsumer])]
struct RootModule;

#[tokio::test]
async fn test_exported_singleton_is_built_once() {
    let app = KeystoneFactory::create(RootModule::module(), AxumAdapter::new())
        .await
        .unwrap();

    assert_eq!(
        distance(app.container(), std::any::type_name::<ProviderModule>()),
        1
    );
    assert_eq!(P_BUILDS.load(Ordering::SeqCst), 1);

    let controller = app.get::<ConsumerController>().unwrap();
    let second = app.get::<SecondConsumer>().unwrap();
    let provider = app.get::<SharedProvider>().unwrap();
    assert!(Arc::ptr_eq(&controller.provider, &provider));
    assert!(Arc::ptr_eq(&second.provider, &provider));
}

struct Picked(&'static str);

struct Exported(&'static str);

fn exporter(name: &str, value: &'static str) -> ModuleRef {
    ModuleDef::new(name)
        .provider(ProviderDef::value("X", Exported(value)))
        .export("X")
        .build()
}

fn consumer() -> ProviderDef {
    ProviderDef::factory("Consumer", vec![Dependency::token("X")], |deps| {
        Ok(Picked(deps.get::<Exported>(0)?.0))
    })
}

async fn picked(root: ModuleRef) -> &'static str {
    let app = KeystoneFactory::create(root, AxumAdapter::new()).await.unwrap();
    app.get_by_token(&Token::from("Consumer"))
        .unwrap()
        .downcast::<Picked>()
        .unwrap()
        .0
}

#[tokio::test]
async fn test_first_import_wins_tie_deterministically() {
    for _ in 0..5 {
        let root = ModuleDef::new("M0")
            .import(exporter("M1", "one"))
            .import(exporter("M2", "two"))
            .provider(consumer())
            .build();
        assert_eq!(picked(root).await, "one");
    }

    let root = ModuleDef::new("M0")
        .import(exporter("M2", "two"))
        .import(exporter("M1", "one"))
        .provider(consumer())
        .build();
    assert_eq!(picked(root).await, "two");
}

#[tokio::test]
async fn test_nearest_export_beats_re_export() {
    let deep = exporter("Deep", "deep");
    let wrapper = ModuleDef::new("Wrapper")
        .import(deep.clone())
        .export_module(&deep)
        .build();
    let root = ModuleDef::new("M0")
        .import(wrapper)
        .import(exporter("Near", "near"))
        .provider(consumer())
        .build();
    assert_eq!(picked(root).await, "near");

    let deep = exporter("Deep", "deep");
    let wrapper = ModuleDef::new("Wrapper")
        .import(deep.clone())
        .export_module(&deep)
        .build();
    let root = ModuleDef::new("M0").import(wrapper).provider(consumer()).build();
    assert_eq!(picked(root).await, "deep");
}

#[tokio::test]
async fn test_global_module_exports_are_visible_everywhere() {
    let shared = ModuleDef::new("Shared")
        .provider(ProviderDef::value("X", Exported("global")))
        .export("X")
        .global()
        .build();
    let feature = ModuleDef::new("Feature").provider(consumer()).build();
    let root = ModuleDef::new("Root").import(shared).import(feature).build();
    assert_eq!(picked(root).await, "global");
}

#[tokio::test]
async fn test_modules_sharing_a_name_stay_distinct() {
    let first = ModuleDef::new("Shared")
        .provider(ProviderDef::value("A", Exported("a")))
        .export("A")
        .build();
    let root = ModuleDef::new("Root")
        .import(first)
        .import(exporter("Shared", "second"))
        .provider(consumer())
        .build();
    assert_eq!(picked(root.clone()).await, "second");

    let app = KeystoneFactory::create(root, AxumAdapter::new()).await.unwrap();
    assert_eq!(app.container().len(), 3);
}

async fn bootstrap_error(root: ModuleRef) -> KeystoneError {
    match KeystoneFactory::create(root, AxumAdapter::new()).await {
        Ok(_) => panic!("bootstrap unexpectedly succeeded"),
        Err(err) => err,
    }
}

#[tokio::test]
async fn test_unknown_export_fails_at_scan() {
    let root = ModuleDef::new("Root").export("Missing").build();
    match bootstrap_error(root).await {
        KeystoneError::UnknownExport { token, module } => {
            assert_eq!(token, "Missing");
            assert_eq!(module, "Root");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_bad_imports() {
    let root = ModuleDef::new("Root")
        .import(ModuleDef::new("Feature").import(ModuleImport::Undefined).build())
        .build();
    match bootstrap_error(root).await {
        KeystoneError::UndefinedModule { parent, index, scope } => {
            assert_eq!(parent, "Feature");
            assert_eq!(index, 0);
            assert_eq!(scope, vec!["Root".to_string(), "Feature".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let root = ModuleDef::new("Root").import(ModuleImport::Invalid).build();
    assert!(matches!(
        bootstrap_error(root).await,
        KeystoneError::InvalidModule { .. }
    ));

    let root = ModuleDef::new("Root")
        .import(ModuleImport::forward(|| None))
        .build();
    assert!(matches!(
        bootstrap_error(root).await,
        KeystoneError::CircularDependency { .. }
    ));
}

#[tokio::test]
async fn test_provider_cycle_is_reported() {
    let root = ModuleDef::new("Root")
        .provider(ProviderDef::factory("A", vec![Dependency::token("B")], |_| Ok(())))
        .provider(ProviderDef::factory("B", vec![Dependency::token("A")], |_| Ok(())))
        .build();
    match bootstrap_error(root).await {
        KeystoneError::CircularDependency { context, .. } => {
            assert_eq!(context.as_deref(), Some("A -> B -> A"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_request_scoped_provider_cycle_fails_bootstrap() {
    let root = ModuleDef::new("Root")
        .provider(ProviderDef::factory("Session", vec![], |_| Ok(())))
        .provider(
            ProviderDef::factory("A", vec![Dependency::token("B")], |_| Ok(())).with_scope(Scope::Request),
        )
        .provider(
            ProviderDef::factory("B", vec![Dependency::token("Session"), Dependency::token("A")], |_| Ok(()))
                .with_scope(Scope::Request),
        )
        .build();
    match bootstrap_error(root).await {
        KeystoneError::CircularDependency { context, .. } => {
            assert_eq!(context.as_deref(), Some("A -> B -> A"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unknown_dependency_names_module_and_index() {
    let root = ModuleDef::new("CatsModule")
        .provider(ProviderDef::value("Config", ()))
        .provider(ProviderDef::factory(
            "CatsService",
            vec![Dependency::token("Config"), Dependency::token("Database")],
            |_| Ok(()),
        ))
        .build();
    let err = bootstrap_error(root).await;
    assert!(matches!(
        &err,
        KeystoneError::UnknownDependency { index: 1, module, .. } if module == "CatsModule"
    ));
    assert!(err.to_string().contains("CatsService (Config, ?)"));
}

#[tokio::test]
async fn test_optional_dependency_injects_none() {
    let root = ModuleDef::new("Root")
        .provider(ProviderDef::factory(
            "Consumer",
            vec![Dependency::token("X").optional()],
            |deps| Ok(deps.optional::<Exported>(0)?.is_none()),
        ))
        .build();
    let app = KeystoneFactory::create(root, AxumAdapter::new()).await.unwrap();
    let missing = app
        .get_by_token(&Token::from("Consumer"))
        .unwrap()
        .downcast::<bool>()
        .unwrap();
    assert!(*missing);
}
