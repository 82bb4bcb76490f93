use crate::error::KeystoneError;
use crate::exception::http::error_response;
use crate::exception::{ArgumentsHost, Exception, ExceptionFilter, HttpException};
use crate::guard::GuardError;
use crate::pipe::PipeError;
use axum::{http::StatusCode, response::Response};

/// Fallback filter used when no registered filter handles an exception
#[derive(Default)]
pub struct BaseExceptionFilter;

impl ExceptionFilter for BaseExceptionFilter {
    fn catch(&self, exception: Exception, host: &ArgumentsHost) -> Response {
        let (status, message) = if let Some(http) = exception.downcast_ref::<HttpException>() {
            (http.status(), http.message().to_string())
        } else if let Some(guard) = exception.downcast_ref::<GuardError>() {
            match guard {
                GuardError::Forbidden(message) => (StatusCode::FORBIDDEN, message.clone()),
                GuardError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            }
        } else if let Some(pipe) = exception.downcast_ref::<PipeError>() {
            match pipe {
                PipeError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, pipe.to_string()),
                _ => (StatusCode::BAD_REQUEST, pipe.to_string()),
            }
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        };

        if status.is_server_error() {
            let kind = if exception.is::<KeystoneError>() {
                "resolution"
            } else {
                "unhandled"
            };
            tracing::error!(
                target: "keystone::exceptions_handler",
                method = %host.method(),
                uri = %host.uri(),
                "{kind} exception: {exception}"
            );
        }

        error_response(status, &message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::ContextId;
    use axum::http::{Method, Uri};

    fn host() -> ArgumentsHost {
        ArgumentsHost::new(Method::GET, Uri::from_static("/cats"), ContextId::STATIC)
    }

    #[test]
    fn test_status_mapping() {
        let filter = BaseExceptionFilter;
        let cases: Vec<(Exception, StatusCode)> = vec![
            (HttpException::not_found("missing").into(), StatusCode::NOT_FOUND),
            (GuardError::Unauthorized("token".into()).into(), StatusCode::UNAUTHORIZED),
            (PipeError::Validation("id".into()).into(), StatusCode::BAD_REQUEST),
            ("boom".into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (exception, expected) in cases {
            assert_eq!(filter.catch(exception, &host()).status(), expected);
        }
    }
}
