mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use keystone::interceptor::logging::LoggingInterceptor;
use keystone::prelude::*;
use serde_json::{Value, json};

use common::{Log, send, send_with_headers};

#[derive(Injectable)]
struct CatsService;

impl CatsService {
    fn names(&self) -> Vec<&'static str> {
        vec!["Tom", "Felix"]
    }
}

#[derive(Injectable)]
struct CatsController {
    cats: Arc<CatsService>,
}

impl Controller for CatsController {
    fn controller() -> ControllerDef {
        ControllerDef::new::<Self>("cats")
            .route(RouteDef::get("/").handle(|this: Arc<Self>, _: Arguments| async move {
                Ok::<_, Exception>(this.cats.names())
            }))
            .route(
                RouteDef::get(":id")
                    .param(ParamDef::path("id").pipe(PipeRef::new(ParseIntPipe)))
                    .param(
                        ParamDef::query("verbose")
                            .pipe(PipeRef::new(DefaultValuePipe::new(false)))
                            .pipe(PipeRef::new(ParseBoolPipe)),
                    )
                    .handle(|_: Arc<Self>, args: Arguments| async move {
                        let id: i64 = args.get(0)?;
                        let verbose: bool = args.get(1)?;
                        Ok::<_, Exception>(json!({ "id": id, "verbose": verbose }))
                    }),
            )
            .route(RouteDef::post("/").handle(|_: Arc<Self>, _: Arguments| async move {
                Ok::<_, Exception>("created")
            }))
            .route(
                RouteDef::delete(":id")
                    .http_code(StatusCode::NO_CONTENT)
                    .header("x-deleted", "yes")
                    .handle(|_: Arc<Self>, _: Arguments| async move { Ok::<_, Exception>(()) }),
            )
            .route(RouteDef::get("fail/bad").handle(|_: Arc<Self>, _: Arguments| async move {
                Err::<(), Exception>(HttpException::bad_request("bad cat").into())
            }))
            .route(RouteDef::get("fail/panic").handle(|_: Arc<Self>, _: Arguments| async move {
                if true {
                    panic!("kaboom");
                }
                Ok::<_, Exception>(())
            }))
    }
}

#[module(controllers = [CatsController], providers = [CatsService])]
struct CatsModule;

async fn cats_router(options: ApplicationOptions) -> Router {
    common::init_tracing();
    KeystoneFactory::create_with_options(CatsModule::module(), AxumAdapter::new(), options)
        .await
        .unwrap()
        .into_router()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_routes_and_responses() {
    let router = cats_router(ApplicationOptions::default()).await;

    let response = send(&router, "GET", "/cats").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!(["Tom", "Felix"]));

    let response = send(&router, "GET", "/cats/7?verbose=true").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "id": 7, "verbose": true }));

    let response = send(&router, "GET", "/cats/7").await;
    assert_eq!(response.json(), json!({ "id": 7, "verbose": false }));

    let response = send(&router, "POST", "/cats").await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body, "created");

    let response = send(&router, "DELETE", "/cats/7").await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(response.headers["x-deleted"], "yes");
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_errors_become_responses() {
    let router = cats_router(ApplicationOptions::default()).await;

    let response = send(&router, "GET", "/cats/abc").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["statusCode"], 400);

    let response = send(&router, "GET", "/cats/fail/bad").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "bad cat");

    let response = send(&router, "GET", "/cats/fail/panic").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "Internal server error");

    let response = send(&router, "GET", "/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["message"], "Cannot GET /nope");
    assert!(response.json()["timestamp"].is_string());
}

#[tokio::test]
async fn test_global_prefix() {
    let router = cats_router(ApplicationOptions::default().with_global_prefix("api")).await;
    assert_eq!(send(&router, "GET", "/api/cats").await.status, StatusCode::OK);
    assert_eq!(send(&router, "GET", "/cats").await.status, StatusCode::NOT_FOUND);
}

struct DenyAll(Log);

#[async_trait]
impl Guard for DenyAll {
    async fn can_activate(&self, _: &ExecutionContext) -> GuardResult {
        self.0.push("guard");
        Ok(false)
    }
}

struct Tagged(&'static str, Log);

#[async_trait]
impl Interceptor for Tagged {
    async fn intercept(&self, _: &ExecutionContext, next: CallHandler) -> HandlerResult {
        self.1.push(format!("{}:before", self.0));
        let value = next.handle().await;
        self.1.push(format!("{}:after", self.0));
        value
    }
}

struct Cached(Log);

#[async_trait]
impl Interceptor for Cached {
    async fn intercept(&self, _: &ExecutionContext, _next: CallHandler) -> HandlerResult {
        self.0.push("cache-hit");
        Ok(json!({ "cached": true }))
    }
}

struct RecordingPipe(Log);

#[async_trait]
impl Pipe for RecordingPipe {
    async fn transform(&self, value: Value, _: &ArgumentMetadata) -> PipeResult<Value> {
        self.0.push("pipe");
        Ok(value)
    }
}

struct TeapotFilter(Log);

impl ExceptionFilter for TeapotFilter {
    fn catches(&self) -> Vec<ExceptionMatcher> {
        vec![ExceptionMatcher::of::<HttpException>()]
    }

    fn catch(&self, exception: Exception, _: &ArgumentsHost) -> Response {
        self.0.push(format!("filter:{exception}"));
        (StatusCode::IM_A_TEAPOT, "filtered").into_response()
    }
}

#[derive(Injectable)]
struct PipelineController;

fn recorded(log: &Log, route: RouteDef) -> RouteDef {
    let log = log.clone();
    route.handle(move |_: Arc<PipelineController>, _: Arguments| {
        let log = log.clone();
        async move {
            log.push("handler");
            Ok::<_, Exception>("handled")
        }
    })
}

fn pipeline_controller(log: &Log) -> ControllerDef {
    ControllerDef::new::<PipelineController>("pipeline")
        .filter(FilterRef::new(TeapotFilter(log.clone())))
        .route(recorded(
            log,
            RouteDef::get("guarded")
                .guard(GuardRef::new(DenyAll(log.clone())))
                .param(ParamDef::query("q").pipe(PipeRef::new(RecordingPipe(log.clone()))))
                .interceptor(InterceptorRef::new(Tagged("a", log.clone()))),
        ))
        .route(recorded(
            log,
            RouteDef::get("ordered")
                .param(ParamDef::query("q").pipe(PipeRef::new(RecordingPipe(log.clone()))))
                .interceptor(InterceptorRef::new(Tagged("a", log.clone())))
                .interceptor(InterceptorRef::new(Tagged("b", log.clone()))),
        ))
        .route(recorded(
            log,
            RouteDef::get("cached").interceptor(InterceptorRef::new(Cached(log.clone()))),
        ))
}

async fn pipeline_router(log: &Log) -> Router {
    let root = ModuleDef::new("PipelineModule")
        .controller(pipeline_controller(log))
        .build();
    KeystoneFactory::create(root, AxumAdapter::new())
        .await
        .unwrap()
        .into_router()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_guard_rejection_skips_pipeline_and_reaches_filter() {
    let log = Log::default();
    let router = pipeline_router(&log).await;

    let response = send(&router, "GET", "/pipeline/guarded?q=1").await;
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(response.body, "filtered");
    assert_eq!(log.entries(), vec!["guard", "filter:Forbidden resource"]);
}

#[tokio::test]
async fn test_pipeline_order() {
    let log = Log::default();
    let router = pipeline_router(&log).await;

    let response = send(&router, "GET", "/pipeline/ordered?q=1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        log.entries(),
        vec!["pipe", "a:before", "b:before", "handler", "b:after", "a:after"]
    );
}

#[tokio::test]
async fn test_interceptor_can_short_circuit() {
    let log = Log::default();
    let router = pipeline_router(&log).await;

    let response = send(&router, "GET", "/pipeline/cached").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "cached": true }));
    assert_eq!(log.count("handler"), 0);
}

struct TokenGuard;

#[async_trait]
impl Guard for TokenGuard {
    async fn can_activate(&self, context: &ExecutionContext) -> GuardResult {
        Ok(context.header("x-token") == Some("secret"))
    }
}

#[tokio::test]
async fn test_global_guard_provider() {
    let log = Log::default();
    let root = ModuleDef::new("AppModule")
        .provider(GuardRef::new(TokenGuard).into_provider(APP_GUARD))
        .provider(InterceptorRef::new(LoggingInterceptor).into_provider(APP_INTERCEPTOR))
        .controller(ControllerDef::new::<PipelineController>("open").route(recorded(&log, RouteDef::get("/"))))
        .build();
    let router = KeystoneFactory::create(root, AxumAdapter::new())
        .await
        .unwrap()
        .into_router()
        .await
        .unwrap();

    let response = send(&router, "GET", "/open").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["message"], "Forbidden resource");
    assert_eq!(log.count("handler"), 0);

    let response = send_with_headers(&router, "GET", "/open", &[("x-token", "secret")]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(log.count("handler"), 1);
}

static SHARED_BUILDS: AtomicUsize = AtomicUsize::new(0);
static SCOPED_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct SharedState {
    serial: usize,
}

impl Injectable for SharedState {
    fn construct(_: &Dependencies) -> keystone::Result<Self> {
        Ok(Self {
            serial: SHARED_BUILDS.fetch_add(1, Ordering::SeqCst),
        })
    }
}

struct ScopedController {
    serial: usize,
    shared: Arc<SharedState>,
}

impl Injectable for ScopedController {
    fn scope() -> Scope {
        Scope::Request
    }

    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::of::<SharedState>()]
    }

    fn construct(dependencies: &Dependencies) -> keystone::Result<Self> {
        Ok(Self {
            serial: SCOPED_BUILDS.fetch_add(1, Ordering::SeqCst),
            shared: dependencies.get::<SharedState>(0)?,
        })
    }
}

impl Controller for ScopedController {
    fn controller() -> ControllerDef {
        ControllerDef::new::<Self>("scoped").route(RouteDef::get("/").handle(
            |this: Arc<Self>, _: Arguments| async move {
                Ok::<_, Exception>(json!({ "controller": this.serial, "shared": this.shared.serial }))
            },
        ))
    }
}

#[module(controllers = [ScopedController], providers = [SharedState])]
struct ScopedModule;

#[tokio::test]
async fn test_request_scoped_controller_shares_singletons() {
    let app = KeystoneFactory::create(ScopedModule::module(), AxumAdapter::new())
        .await
        .unwrap();
    let registry = app.injector().registry().clone();
    assert_eq!(SCOPED_BUILDS.load(Ordering::SeqCst), 0);

    let router = app.into_router().await.unwrap();
    let first = send(&router, "GET", "/scoped").await.json();
    let second = send(&router, "GET", "/scoped").await.json();

    assert_ne!(first["controller"], second["controller"]);
    assert_eq!(first["shared"], second["shared"]);
    assert_eq!(SHARED_BUILDS.load(Ordering::SeqCst), 1);
    assert_eq!(SCOPED_BUILDS.load(Ordering::SeqCst), 2);
    assert_eq!(registry.active_contexts(), 0);
}

#[tokio::test]
async fn test_router_accepts_tower_layers() -> anyhow::Result<()> {
    common::init_tracing();
    let router = KeystoneFactory::create(CatsModule::module(), AxumAdapter::new())
        .await?
        .into_router()
        .await?
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let response = send(&router, "GET", "/cats").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!(["Tom", "Felix"]));
    Ok(())
}
