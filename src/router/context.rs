use std::sync::Arc;

use axum::Json;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::config::ApplicationConfig;
use crate::context::ExecutionContext;
use crate::controller::ControllerDef;
use crate::di::{ContextId, Instance, WrapperId};
use crate::error::{KeystoneError, Result};
use crate::exception::{Exception, HttpException};
use crate::guard::{Guard, GuardsConsumer, GuardsContextCreator};
use crate::interceptor::{CallHandler, Interceptor, InterceptorsConsumer, InterceptorsContextCreator};
use crate::module::ModuleNode;
use crate::pipe::{ArgumentMetadata, Pipe, PipesConsumer, PipesContextCreator};
use crate::router::{Arguments, ParamDef, RouteDef, RouteHandler};

struct ResolvedParam {
    param: ParamDef,
    metadata: ArgumentMetadata,
    pipes: Vec<Arc<dyn Pipe>>,
}

/// A handler bound to a controller instance and its resolved enhancers.
pub struct RouteExecution {
    instance: Instance,
    handler: RouteHandler,
    class_name: String,
    handler_name: String,
    guards: Vec<Arc<dyn Guard>>,
    pipes: Vec<Arc<dyn Pipe>>,
    params: Vec<ResolvedParam>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl RouteExecution {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// Guards, then pipes per argument, then interceptors around the handler.
    pub async fn execute(&self, context: Arc<ExecutionContext>) -> std::result::Result<Response, Exception> {
        if !GuardsConsumer::try_activate(&self.guards, &context).await? {
            return Err(HttpException::forbidden("Forbidden resource").into());
        }

        let mut values = Vec::with_capacity(self.params.len());
        for resolved in &self.params {
            let value = resolved.param.extract(&context);
            let value = PipesConsumer::apply(value, &resolved.metadata, &self.pipes).await?;
            let value = PipesConsumer::apply(value, &resolved.metadata, &resolved.pipes).await?;
            values.push(value);
        }

        let handler = self.handler.clone();
        let instance = self.instance.clone();
        let arguments = Arguments::new(values, context.clone());
        let call = CallHandler::new(move || handler(instance, arguments));
        let value = InterceptorsConsumer::intercept(&self.interceptors, context, call).await?;

        Ok(self.respond(value))
    }

    fn respond(&self, value: Value) -> Response {
        let mut response = match value {
            Value::Null => self.status.into_response(),
            Value::String(text) => (self.status, text).into_response(),
            other => (self.status, Json(other)).into_response(),
        };
        for (name, value) in &self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().insert(name, value);
                }
                _ => tracing::warn!(target: "keystone::router", header = %name, "invalid response header skipped"),
            }
        }
        response
    }
}

/// Assembles [`RouteExecution`]s from route descriptors.
pub struct RouterExecutionContext {
    guards: GuardsContextCreator,
    pipes: PipesContextCreator,
    interceptors: InterceptorsContextCreator,
}

impl RouterExecutionContext {
    pub fn new(config: Arc<ApplicationConfig>) -> Self {
        Self {
            guards: GuardsContextCreator::new(config.clone()),
            pipes: PipesContextCreator::new(config.clone()),
            interceptors: InterceptorsContextCreator::new(config),
        }
    }

    pub fn create(
        &self,
        instance: Instance,
        controller: &ControllerDef,
        route: &RouteDef,
        module: &ModuleNode,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> Result<RouteExecution> {
        let handler = route.handler().cloned().ok_or_else(|| {
            KeystoneError::Internal(format!(
                "route {} of {} has no handler",
                route.handler_name(),
                controller.name()
            ))
        })?;

        let params = route
            .params()
            .iter()
            .enumerate()
            .map(|(index, param)| -> Result<ResolvedParam> {
                Ok(ResolvedParam {
                    param: param.clone(),
                    metadata: param.metadata(index),
                    pipes: self.pipes.create_for_param(param.pipes(), module, context, inquirer)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RouteExecution {
            instance,
            handler,
            class_name: controller.name().to_string(),
            handler_name: route.handler_name().to_string(),
            guards: self.guards.create(controller, route, module, context, inquirer)?,
            pipes: self.pipes.create(controller, route, module, context, inquirer)?,
            params,
            interceptors: self.interceptors.create(controller, route, module, context, inquirer)?,
            status: route.status(),
            headers: route.headers().to_vec(),
        })
    }
}
