use std::future::Future;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use strum_macros::{Display, EnumString};

use crate::context::ExecutionContext;
use crate::di::Instance;
use crate::error::KeystoneError;
use crate::exception::{Exception, FilterRef, HttpException};
use crate::guard::GuardRef;
use crate::interceptor::{HandlerResult, InterceptorRef};
use crate::pipe::{ArgumentMetadata, ParamKind, PipeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    All,
}

impl RequestMethod {
    pub fn from_method(method: &Method) -> Option<Self> {
        method.as_str().parse().ok().filter(|m| *m != RequestMethod::All)
    }

    pub fn matches(&self, method: &Method) -> bool {
        *self == RequestMethod::All || Self::from_method(method) == Some(*self)
    }
}

pub type RouteHandler = Arc<dyn Fn(Instance, Arguments) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Handler arguments after pipes have run.
pub struct Arguments {
    values: Vec<Value>,
    context: Arc<ExecutionContext>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Value>, context: Arc<ExecutionContext>) -> Self {
        Self { values, context }
    }

    /// Deserializes argument `index`; a missing argument reads as `null`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, Exception> {
        let value = self.values.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            HttpException::bad_request(format!("invalid argument at index [{index}]: {e}")).into()
        })
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }
}

type CustomSource = Arc<dyn Fn(&ExecutionContext) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum ParamSource {
    /// One path parameter, or all of them as an object.
    Path(Option<String>),
    /// One query value, or the whole query string as an object.
    Query(Option<String>),
    Header(String),
    Custom(CustomSource),
}

/// One handler argument: where it comes from and the pipes it goes through.
#[derive(Clone)]
pub struct ParamDef {
    source: ParamSource,
    pipes: Vec<PipeRef>,
}

impl ParamDef {
    pub fn new(source: ParamSource) -> Self {
        Self {
            source,
            pipes: Vec::new(),
        }
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::new(ParamSource::Path(Some(name.into())))
    }

    pub fn params() -> Self {
        Self::new(ParamSource::Path(None))
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(ParamSource::Query(Some(name.into())))
    }

    pub fn queries() -> Self {
        Self::new(ParamSource::Query(None))
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(ParamSource::Header(name.into()))
    }

    pub fn custom(extract: impl Fn(&ExecutionContext) -> Value + Send + Sync + 'static) -> Self {
        Self::new(ParamSource::Custom(Arc::new(extract)))
    }

    pub fn pipe(mut self, pipe: PipeRef) -> Self {
        self.pipes.push(pipe);
        self
    }

    pub fn pipes(&self) -> &[PipeRef] {
        &self.pipes
    }

    pub fn metadata(&self, index: usize) -> ArgumentMetadata {
        let (kind, data) = match &self.source {
            ParamSource::Path(name) => (ParamKind::Param, name.clone()),
            ParamSource::Query(name) => (ParamKind::Query, name.clone()),
            ParamSource::Header(name) => (ParamKind::Header, Some(name.clone())),
            ParamSource::Custom(_) => (ParamKind::Custom, None),
        };
        ArgumentMetadata { kind, data, index }
    }

    pub fn extract(&self, context: &ExecutionContext) -> Value {
        match &self.source {
            ParamSource::Path(Some(name)) => context.param(name).map(Value::from).unwrap_or(Value::Null),
            ParamSource::Path(None) => Value::Object(
                context
                    .params()
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::from(v)))
                    .collect(),
            ),
            ParamSource::Query(Some(name)) => {
                context.query().remove(name).map(Value::from).unwrap_or(Value::Null)
            }
            ParamSource::Query(None) => Value::Object(
                context
                    .query()
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
            ParamSource::Header(name) => context.header(name).map(Value::from).unwrap_or(Value::Null),
            ParamSource::Custom(extract) => extract(context),
        }
    }
}

/// One handler: method, paths, arguments, enhancers and response options.
pub struct RouteDef {
    method: RequestMethod,
    paths: Vec<String>,
    name: String,
    params: Vec<ParamDef>,
    guards: Vec<GuardRef>,
    pipes: Vec<PipeRef>,
    interceptors: Vec<InterceptorRef>,
    filters: Vec<FilterRef>,
    http_code: Option<StatusCode>,
    headers: Vec<(String, String)>,
    handler: Option<RouteHandler>,
}

macro_rules! method_constructors {
    ($($fn_name:ident => $method:ident),* $(,)?) => {
        $(
            pub fn $fn_name(path: impl Into<String>) -> Self {
                Self::new(RequestMethod::$method, path)
            }
        )*
    };
}

impl RouteDef {
    pub fn new(method: RequestMethod, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: format!("{method} {path}"),
            method,
            paths: vec![path],
            params: Vec::new(),
            guards: Vec::new(),
            pipes: Vec::new(),
            interceptors: Vec::new(),
            filters: Vec::new(),
            http_code: None,
            headers: Vec::new(),
            handler: None,
        }
    }

    method_constructors! {
        get => Get,
        post => Post,
        put => Put,
        delete => Delete,
        patch => Patch,
        options => Options,
        head => Head,
        all => All,
    }

    /// Serve the same handler under another path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
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

    pub fn http_code(mut self, status: StatusCode) -> Self {
        self.http_code = Some(status);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the handler. It receives the controller instance and the piped arguments.
    pub fn handle<C, F, Fut, R>(mut self, handler: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(Arc<C>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Exception>> + Send + 'static,
        R: Serialize,
    {
        self.handler = Some(Arc::new(move |instance: Instance, arguments: Arguments| -> BoxFuture<'static, HandlerResult> {
            let call = instance.downcast::<C>().map(|controller| handler(controller, arguments));
            Box::pin(async move {
                let call = call.ok_or_else(|| KeystoneError::DowncastFailed {
                    type_name: std::any::type_name::<C>().to_string(),
                })?;
                let output = call.await?;
                Ok::<_, Exception>(serde_json::to_value(output)?)
            })
        }));
        self
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn handler_name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamDef] {
        &self.params
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

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn handler(&self) -> Option<&RouteHandler> {
        self.handler.as_ref()
    }

    /// Custom status, else 201 for POST and 200 for everything else.
    pub fn status(&self) -> StatusCode {
        self.http_code.unwrap_or(match self.method {
            RequestMethod::Post => StatusCode::CREATED,
            _ => StatusCode::OK,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_method_parsing() {
        assert_eq!(RequestMethod::from_method(&Method::GET), Some(RequestMethod::Get));
        assert_eq!(RequestMethod::Delete.to_string(), "DELETE");
        assert!(RequestMethod::All.matches(&Method::PATCH));
        assert!(!RequestMethod::Get.matches(&Method::POST));
    }

    #[test]
    fn test_default_status() {
        assert_eq!(RouteDef::post("/").status(), StatusCode::CREATED);
        assert_eq!(RouteDef::get("/").status(), StatusCode::OK);
        assert_eq!(
            RouteDef::post("/").http_code(StatusCode::ACCEPTED).status(),
            StatusCode::ACCEPTED
        );
    }

    #[test]
    fn test_param_metadata() {
        let metadata = ParamDef::query("limit").metadata(2);
        assert_eq!(metadata.kind, ParamKind::Query);
        assert_eq!(metadata.data.as_deref(), Some("limit"));
        assert_eq!(metadata.index, 2);
    }
}
