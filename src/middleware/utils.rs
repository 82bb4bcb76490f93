use axum::http::Method;

use crate::error::{KeystoneError, Result};
use crate::middleware::RouteInfo;
use crate::router::{PathPattern, RequestMethod, add_leading_slash, strip_end_slash};

/// An exclusion compiled against the global prefix.
#[derive(Debug, Clone)]
pub struct ExcludedRoute {
    method: RequestMethod,
    pattern: PathPattern,
}

impl ExcludedRoute {
    pub fn new(info: &RouteInfo, prefix: &str) -> Result<Self> {
        let path = prefixed_path(prefix, &add_leading_slash(&info.path));
        let pattern = PathPattern::new(&path, true).map_err(|e| {
            KeystoneError::Internal(format!("invalid excluded route {}: {e}", info.path))
        })?;
        Ok(Self {
            method: info.method,
            pattern,
        })
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.matches(method) && self.pattern.is_match(path)
    }
}

pub fn is_route_excluded(excluded: &[ExcludedRoute], method: &Method, path: &str) -> bool {
    excluded.iter().any(|route| route.matches(method, path))
}

/// `/api` + `/cats` is `/api/cats`; under a prefix `/*` becomes `/api*`.
pub(crate) fn prefixed_path(prefix: &str, path: &str) -> String {
    let prefix = strip_end_slash(prefix);
    if prefix.is_empty() {
        return path.to_string();
    }
    let prefix = add_leading_slash(prefix);
    if path == "/*" {
        format!("{prefix}*")
    } else {
        format!("{prefix}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_path() {
        assert_eq!(prefixed_path("", "/cats"), "/cats");
        assert_eq!(prefixed_path("api", "/cats"), "/api/cats");
        assert_eq!(prefixed_path("/api/", "/*"), "/api*");
    }

    #[test]
    fn test_excluded_route_matching() {
        let excluded = vec![
            ExcludedRoute::new(&RouteInfo::new("/cats/health", RequestMethod::Get), "api").unwrap(),
            ExcludedRoute::new(&RouteInfo::from("/dogs/:id"), "api").unwrap(),
        ];

        assert!(is_route_excluded(&excluded, &Method::GET, "/api/cats/health"));
        assert!(!is_route_excluded(&excluded, &Method::POST, "/api/cats/health"));
        assert!(is_route_excluded(&excluded, &Method::DELETE, "/api/dogs/3"));
        assert!(!is_route_excluded(&excluded, &Method::GET, "/api/dogs"));
        assert!(!is_route_excluded(&excluded, &Method::GET, "/cats/health"));
    }
}
