mod common;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use keystone::prelude::*;

use common::{Log, send};

#[derive(Injectable)]
struct CatsController {
    log: Arc<Log>,
}

impl Controller for CatsController {
    fn controller() -> ControllerDef {
        let handler = |this: Arc<CatsController>, _: Arguments| async move {
            this.log.push("handler");
            Ok::<_, Exception>("ok")
        };
        ControllerDef::new::<Self>("cats")
            .route(RouteDef::get("/").handle(handler))
            .route(RouteDef::get("health").handle(handler))
    }
}

#[derive(Injectable)]
struct AuditMiddleware {
    log: Arc<Log>,
}

#[async_trait]
impl Middleware for AuditMiddleware {
    async fn handle(&self, request: Request, next: Next) -> std::result::Result<Response, Exception> {
        self.log.push(format!("audit:{}", request.uri().path()));
        Ok(next.run(request).await)
    }
}

struct PerRequestMiddleware {
    log: Arc<Log>,
}

impl Injectable for PerRequestMiddleware {
    fn scope() -> Scope {
        Scope::Request
    }

    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::of::<Log>()]
    }

    fn construct(dependencies: &Dependencies) -> keystone::Result<Self> {
        let log = dependencies.get::<Log>(0)?;
        log.push("built");
        Ok(Self { log })
    }
}

#[async_trait]
impl Middleware for PerRequestMiddleware {
    async fn handle(&self, request: Request, next: Next) -> std::result::Result<Response, Exception> {
        self.log.push("per-request");
        Ok(next.run(request).await)
    }
}

fn log_module(log: &Log) -> ModuleRef {
    ModuleDef::new("LogModule")
        .provider(ProviderDef::value(Token::of::<Log>(), log.clone()))
        .export_type::<Log>()
        .global()
        .build()
}

fn feature_module() -> ModuleRef {
    ModuleDef::new("CatsModule")
        .controller(CatsController::controller())
        .configure(|consumer| {
            consumer
                .apply([MiddlewareRef::class::<AuditMiddleware>()])
                .exclude([RouteInfo::new("/cats/health", RequestMethod::Get)])
                .for_routes([RouteTarget::controller::<CatsController>()]);
        })
        .build()
}

fn root_module(log: &Log, configure: impl Fn(&mut MiddlewareConsumer) + Send + Sync + 'static) -> ModuleRef {
    ModuleDef::new("AppModule")
        .import(log_module(log))
        .import(feature_module())
        .configure(configure)
        .build()
}

async fn router(root: ModuleRef, options: ApplicationOptions) -> Router {
    common::init_tracing();
    KeystoneFactory::create_with_options(root, AxumAdapter::new(), options)
        .await
        .unwrap()
        .into_router()
        .await
        .unwrap()
}

fn tagging(log: &Log, tag: &'static str) -> MiddlewareRef {
    let log = log.clone();
    MiddlewareRef::from_fn(move |request: Request, next: Next| {
        let log = log.clone();
        async move {
            log.push(format!("{tag}:{}", request.uri().path()));
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert("x-middleware", HeaderValue::from_static(tag));
            Ok::<_, Exception>(response)
        }
    })
}

#[tokio::test]
async fn test_root_middleware_runs_before_feature_middleware() {
    let log = Log::default();
    let tag_log = log.clone();
    let root = root_module(&log, move |consumer| {
        consumer.apply([tagging(&tag_log, "root")]).for_routes(["*"]);
    });
    let router = router(root, ApplicationOptions::default()).await;

    let response = send(&router, "GET", "/cats").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["x-middleware"], "root");
    assert_eq!(log.entries(), vec!["root:/cats", "audit:/cats", "handler"]);
}

#[tokio::test]
async fn test_excluded_route_skips_middleware() {
    let log = Log::default();
    let root = root_module(&log, |_| {});
    let router = router(root, ApplicationOptions::default()).await;

    send(&router, "GET", "/cats/health").await;
    assert_eq!(log.entries(), vec!["handler"]);

    send(&router, "GET", "/cats").await;
    assert_eq!(log.entries(), vec!["handler", "audit:/cats", "handler"]);
}

#[tokio::test]
async fn test_global_prefix_applies_to_middleware_and_exclusions() {
    let log = Log::default();
    let tag_log = log.clone();
    let root = root_module(&log, move |consumer| {
        consumer.apply([tagging(&tag_log, "root")]).for_routes(["/*"]);
    });
    let router = router(root, ApplicationOptions::default().with_global_prefix("api")).await;

    send(&router, "GET", "/api/cats/health").await;
    send(&router, "GET", "/api/cats").await;
    assert_eq!(
        log.entries(),
        vec![
            "root:/api/cats/health",
            "handler",
            "root:/api/cats",
            "audit:/api/cats",
            "handler"
        ]
    );
}

#[tokio::test]
async fn test_middleware_errors_reach_global_filters() {
    let log = Log::default();
    let root = root_module(&log, |consumer| {
        consumer
            .apply([MiddlewareRef::from_fn(|_: Request, _: Next| async {
                Err::<Response, Exception>(HttpException::unauthorized("missing token").into())
            })])
            .for_routes([RouteInfo::new("/cats", RequestMethod::Get)]);
    });
    let router = router(root, ApplicationOptions::default()).await;

    let response = send(&router, "GET", "/cats").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["message"], "missing token");
    assert!(log.entries().is_empty());

    let response = send(&router, "GET", "/cats/health").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_scoped_middleware_is_built_per_request() {
    let log = Log::default();
    let root = root_module(&log, |consumer| {
        consumer
            .apply([MiddlewareRef::class::<PerRequestMiddleware>()])
            .for_routes(["/cats/health"]);
    });
    let router = router(root, ApplicationOptions::default()).await;
    assert_eq!(log.count("built"), 0);

    send(&router, "GET", "/cats/health").await;
    send(&router, "GET", "/cats/health").await;
    assert_eq!(log.count("built"), 2);
    assert_eq!(log.count("per-request"), 2);
}

#[tokio::test]
async fn test_empty_apply_fails_bootstrap() {
    let log = Log::default();
    let root = root_module(&log, |consumer| {
        consumer.apply(Vec::new()).for_routes(["/cats"]);
    });
    let mut app = KeystoneFactory::create(root, AxumAdapter::new()).await.unwrap();
    assert!(matches!(
        app.init().await,
        Err(KeystoneError::InvalidMiddlewareConfiguration)
    ));
}
