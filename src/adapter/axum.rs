use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use tokio::net::TcpListener;
use tokio::signal;

use crate::adapter::{HttpAdapter, MiddlewareHandler, RequestHandler};
use crate::error::{KeystoneError, Result};
use crate::exception::HttpException;
use crate::middleware::Next;
use crate::router::{PathPattern, RequestMethod};

struct MiddlewareEntry {
    method: RequestMethod,
    pattern: PathPattern,
    handler: MiddlewareHandler,
}

struct RouteEntry {
    method: RequestMethod,
    pattern: PathPattern,
    handler: RequestHandler,
}

#[derive(Default)]
struct RouteTable {
    middleware: Vec<MiddlewareEntry>,
    routes: Vec<RouteEntry>,
    not_found: Option<RequestHandler>,
}

impl RouteTable {
    fn dispatch(self: Arc<Self>, request: Request) -> BoxFuture<'static, Response> {
        let path = request.uri().path().to_string();
        let matched: Vec<MiddlewareHandler> = self
            .middleware
            .iter()
            .filter(|entry| entry.method.matches(request.method()) && entry.pattern.is_match(&path))
            .map(|entry| entry.handler.clone())
            .collect();

        let table = self.clone();
        let mut next = Next::new(move |request| Box::pin(async move { table.handle_route(request).await }));
        for handler in matched.into_iter().rev() {
            let inner = next;
            next = Next::new(move |request| handler(request, inner));
        }
        Box::pin(next.run(request))
    }

    async fn handle_route(&self, mut request: Request) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        for route in &self.routes {
            if !route.method.matches(&method) {
                continue;
            }
            if let Some(params) = route.pattern.captures(&path) {
                request.extensions_mut().insert(params);
                return (route.handler)(request).await;
            }
        }

        match &self.not_found {
            Some(handler) => handler(request).await,
            None => HttpException::not_found(format!("Cannot {method} {path}")).into_response(),
        }
    }
}

async fn dispatch(State(table): State<Arc<RouteTable>>, request: Request) -> Response {
    table.dispatch(request).await
}

/// [`HttpAdapter`] backed by an axum [`Router`].
///
/// All requests go through a single fallback that runs registered middleware
/// and routes in registration order.
#[derive(Default)]
pub struct AxumAdapter {
    table: RouteTable,
}

impl AxumAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_router(self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(Arc::new(self.table))
    }

    pub async fn listen(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(target: "keystone::application", "Listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

impl HttpAdapter for AxumAdapter {
    fn register_route(&mut self, method: RequestMethod, path: &str, handler: RequestHandler) -> Result<()> {
        self.table.routes.push(RouteEntry {
            method,
            pattern: compile(path, true)?,
            handler,
        });
        Ok(())
    }

    fn register_middleware(
        &mut self,
        method: RequestMethod,
        path: &str,
        handler: MiddlewareHandler,
    ) -> Result<()> {
        self.table.middleware.push(MiddlewareEntry {
            method,
            pattern: compile(path, method != RequestMethod::All)?,
            handler,
        });
        Ok(())
    }

    fn set_not_found_handler(&mut self, handler: RequestHandler) {
        self.table.not_found = Some(handler);
    }
}

fn compile(path: &str, end: bool) -> Result<PathPattern> {
    PathPattern::new(path, end)
        .map_err(|e| KeystoneError::Internal(format!("invalid route pattern {path}: {e}")))
}

/// Completes on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
