use crate::di::{Dependencies, Dependency, Scope};
use crate::error::Result;

/// Trait for types the container can construct.
///
/// This trait is typically implemented automatically via the `#[derive(Injectable)]` macro.
///
/// # Example
/// ```
/// use keystone::Injectable;
/// use std::sync::Arc;
///
/// pub trait UserRepository: Send + Sync {}
///
/// #[derive(Injectable)]
/// pub struct UserService {
///     // Resolved from the module graph.
///     repository: Arc<dyn UserRepository>,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Lifetime policy declared by the type itself.
    fn scope() -> Scope {
        Scope::Default
    }

    /// Constructor dependencies, in argument order.
    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }

    /// Build an instance from resolved dependencies.
    ///
    /// # Errors
    /// Returns an error if a dependency has an unexpected type.
    fn construct(dependencies: &Dependencies) -> Result<Self>;
}
