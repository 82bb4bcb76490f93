use crate::middleware::{RouteInfo, RouteTarget};
use crate::module::ModuleContainer;
use crate::router::{RequestMethod, add_leading_slash, join_paths};

/// Expands `for_routes` targets into concrete paths.
pub struct RoutesMapper<'a> {
    container: &'a ModuleContainer,
}

impl<'a> RoutesMapper<'a> {
    pub fn new(container: &'a ModuleContainer) -> Self {
        Self { container }
    }

    pub fn map_route_to_route_info(&self, target: &RouteTarget) -> Vec<RouteInfo> {
        match target {
            RouteTarget::Route(info) => vec![RouteInfo::new(add_leading_slash(&info.path), info.method)],
            RouteTarget::Controller(token) => {
                let Some(controller) = self
                    .container
                    .modules()
                    .find_map(|module| module.controller_def(token))
                else {
                    tracing::warn!(
                        target: "keystone::middleware_module",
                        controller = %token,
                        "middleware bound to an unregistered controller"
                    );
                    return Vec::new();
                };

                let mut routes = Vec::new();
                for route in controller.routes() {
                    for path in route.paths() {
                        let info = RouteInfo::new(join_paths(&[controller.path(), path]), route.method());
                        if !routes.contains(&info) {
                            routes.push(info);
                        }
                    }
                }
                if routes.is_empty() {
                    routes.push(RouteInfo::new(add_leading_slash(controller.path()), RequestMethod::All));
                }
                routes
            }
        }
    }
}
