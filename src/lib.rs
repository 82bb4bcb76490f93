//! # Keystone
//!
//! Module graph, dependency injection and request pipeline runtime for
//! modular servers on top of axum.
//!
//! ## Features
//!
//! - **Modules**: providers, controllers, imports and exports grouped into a graph
//! - **Scoped DI**: singleton, request and transient providers resolved per context
//! - **Request pipeline**: guards, pipes, interceptors and exception filters
//! - **Middleware**: class or functional middleware bound to routes, in module order
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keystone::prelude::*;
//!
//! #[derive(Injectable)]
//! pub struct CatsService;
//!
//! impl CatsService {
//!     pub fn find_all(&self) -> Vec<String> {
//!         vec!["Tom".to_string()]
//!     }
//! }
//!
//! #[derive(Injectable)]
//! pub struct CatsController {
//!     cats: Arc<CatsService>,
//! }
//!
//! impl Controller for CatsController {
//!     fn controller() -> ControllerDef {
//!         ControllerDef::new::<Self>("cats").route(
//!             RouteDef::get("/").handle(|this: Arc<Self>, _: Arguments| async move {
//!                 Ok(this.cats.find_all())
//!             }),
//!         )
//!     }
//! }
//!
//! #[module(controllers = [CatsController], providers = [CatsService])]
//! pub struct AppModule;
//!
//! #[tokio::main]
//! async fn main() -> keystone::Result<()> {
//!     let app = KeystoneFactory::create(AppModule::module(), AxumAdapter::new()).await?;
//!     app.listen().await
//! }
//! ```

extern crate self as keystone;

pub mod adapter;
pub mod application;
pub mod config;
pub mod context;
pub mod controller;
pub mod di;
pub mod error;
pub mod exception;
pub mod guard;
pub mod interceptor;
pub mod middleware;
pub mod module;
pub mod pipe;
pub mod router;

// Re-export core types
pub use adapter::{AxumAdapter, HttpAdapter};
pub use application::{Application, KeystoneFactory};
pub use controller::{Controller, ControllerDef};
pub use di::{
    ContextId, ContextIdFactory, Dependencies, Dependency, Injectable, Instance, ProviderDef, Scope, Token,
};
pub use error::{KeystoneError, Result};
pub use module::{Module, ModuleDef, ModuleImport, ModuleRef};

// Re-export macros
pub use keystone_macro::{Injectable, module};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use keystone::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::{AxumAdapter, HttpAdapter};
    pub use crate::application::{Application, KeystoneFactory};
    pub use crate::config::{ApplicationOptions, ConfigService};
    pub use crate::context::ExecutionContext;
    pub use crate::controller::{Controller, ControllerDef};
    pub use crate::di::{ContextId, ContextIdFactory, Dependencies, Dependency, ProviderDef, Scope, Token};
    pub use crate::error::{KeystoneError, Result};
    pub use crate::exception::{
        APP_FILTER, ArgumentsHost, Exception, ExceptionFilter, ExceptionMatcher, FilterRef, HttpException,
    };
    pub use crate::guard::{APP_GUARD, Guard, GuardError, GuardRef, GuardResult};
    pub use crate::interceptor::{APP_INTERCEPTOR, CallHandler, HandlerResult, Interceptor, InterceptorRef};
    pub use crate::middleware::{Middleware, MiddlewareConsumer, MiddlewareRef, Next, RouteInfo, RouteTarget};
    pub use crate::module::{Module, ModuleDef, ModuleImport, ModuleRef};
    pub use crate::pipe::builtins::*;
    pub use crate::pipe::{APP_PIPE, ArgumentMetadata, Pipe, PipeError, PipeRef, PipeResult};
    pub use crate::router::{Arguments, ParamDef, RequestMethod, RouteDef};
    pub use crate::{Injectable, module};
    pub use async_trait::async_trait;
    pub use axum::{
        extract::Request,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
