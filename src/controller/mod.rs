use std::collections::HashSet;
use std::sync::Arc;

use crate::di::{Injectable, ProviderDef, Token};
use crate::exception::FilterRef;
use crate::guard::GuardRef;
use crate::interceptor::InterceptorRef;
use crate::pipe::PipeRef;
use crate::router::RouteDef;

/// A controller class: its provider, base path, routes and class-level enhancers.
///
/// # Example
/// ```ignore
/// impl Controller for CatsController {
///     fn controller() -> ControllerDef {
///         ControllerDef::new::<Self>("cats")
///             .guard(GuardRef::class::<AuthGuard>())
///             .route(RouteDef::get(":id").param(ParamDef::path("id").pipe(PipeRef::new(ParseIntPipe))).handle(
///                 |ctrl: Arc<CatsController>, args: Arguments| async move { ctrl.find_one(args.get(0)?).await },
///             ))
///     }
/// }
/// ```
pub struct ControllerDef {
    provider: ProviderDef,
    path: String,
    routes: Vec<Arc<RouteDef>>,
    guards: Vec<GuardRef>,
    pipes: Vec<PipeRef>,
    interceptors: Vec<InterceptorRef>,
    filters: Vec<FilterRef>,
}

impl ControllerDef {
    pub fn new<C: Injectable>(path: impl Into<String>) -> Self {
        Self::from_provider(ProviderDef::class::<C>(), path)
    }

    pub fn from_provider(provider: ProviderDef, path: impl Into<String>) -> Self {
        Self {
            provider,
            path: path.into(),
            routes: Vec::new(),
            guards: Vec::new(),
            pipes: Vec::new(),
            interceptors: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn route(mut self, route: RouteDef) -> Self {
        self.routes.push(Arc::new(route));
        self
    }

    pub fn guard(mut self, guard: GuardRef) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn pipe(mut self, pipe: PipeRef) -> Self {
        self.pipes.push(pipe);
        self
    }

    pub fn interceptor(mut self, interceptor: InterceptorRef) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn filter(mut self, filter: FilterRef) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn provider(&self) -> &ProviderDef {
        &self.provider
    }

    pub fn token(&self) -> &Token {
        self.provider.token()
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn routes(&self) -> &[Arc<RouteDef>] {
        &self.routes
    }

    pub fn guards(&self) -> &[GuardRef] {
        &self.guards
    }

    pub fn pipes(&self) -> &[PipeRef] {
        &self.pipes
    }

    pub fn interceptors(&self) -> &[InterceptorRef] {
        &self.interceptors
    }

    pub fn filters(&self) -> &[FilterRef] {
        &self.filters
    }

    /// Every class-based enhancer used by this controller, its routes and
    /// their parameters, deduplicated by token.
    pub fn injectables(&self) -> Vec<ProviderDef> {
        let mut providers: Vec<&ProviderDef> = Vec::new();
        collect(&mut providers, &self.guards, &self.pipes, &self.interceptors, &self.filters);
        for route in &self.routes {
            collect(&mut providers, route.guards(), route.pipes(), route.interceptors(), route.filters());
            for param in route.params() {
                providers.extend(param.pipes().iter().filter_map(|p| p.provider()));
            }
        }

        let mut seen = HashSet::new();
        providers
            .into_iter()
            .filter(|provider| seen.insert(provider.token().clone()))
            .cloned()
            .collect()
    }
}

fn collect<'a>(
    into: &mut Vec<&'a ProviderDef>,
    guards: &'a [GuardRef],
    pipes: &'a [PipeRef],
    interceptors: &'a [InterceptorRef],
    filters: &'a [FilterRef],
) {
    into.extend(guards.iter().filter_map(|e| e.provider()));
    into.extend(pipes.iter().filter_map(|e| e.provider()));
    into.extend(interceptors.iter().filter_map(|e| e.provider()));
    into.extend(filters.iter().filter_map(|e| e.provider()));
}

/// Types that describe themselves as controllers.
pub trait Controller {
    fn controller() -> ControllerDef;
}
