mod context;
mod explorer;
mod path;
mod proxy;
mod resolver;
mod route;

pub use context::{RouteExecution, RouterExecutionContext};
pub use explorer::RouterExplorer;
pub use path::{PathParams, PathPattern, add_leading_slash, join_paths, strip_end_slash};
pub use proxy::RouterProxy;
pub use resolver::RoutesResolver;
pub use route::{Arguments, ParamDef, ParamSource, RequestMethod, RouteDef, RouteHandler};
