use std::future::Future;

use crate::error::Result;

/// Single error boundary for bootstrap entry points.
///
/// Every failure is logged once here before it is returned to the caller.
pub struct ExceptionsZone;

impl ExceptionsZone {
    pub fn run<T>(operation: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().inspect_err(|e| Self::report(operation, e))
    }

    pub async fn run_async<T>(operation: &str, f: impl Future<Output = Result<T>>) -> Result<T> {
        f.await.inspect_err(|e| Self::report(operation, e))
    }

    fn report(operation: &str, error: &crate::error::KeystoneError) {
        tracing::error!(target: "keystone::exceptions_zone", operation, "{error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeystoneError;

    #[tokio::test]
    async fn test_errors_pass_through() {
        let sync: Result<()> = ExceptionsZone::run("scan", || Err(KeystoneError::Internal("x".into())));
        assert!(sync.is_err());

        let value = ExceptionsZone::run_async("init", async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
    }
}
