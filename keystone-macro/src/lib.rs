use proc_macro::TokenStream;

mod injectable;
mod module;

/// Derive macro implementing `keystone::Injectable` for a struct.
///
/// `Arc<T>` fields are injected by type, `Arc<dyn Trait>` fields by trait
/// token and `Option<Arc<..>>` fields are optional. Any other field is
/// initialized with `Default::default()`.
///
/// # Example
/// ```ignore
/// #[derive(Injectable)]
/// #[injectable(scope = "request")]
/// pub struct CatsService {
///     repository: Arc<dyn CatsRepository>,
///     #[inject(token = "CONFIG")]
///     config: Arc<AppConfig>,
///     cache: Option<Arc<Cache>>,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(injectable, inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}

/// Attribute macro declaring a module
///
/// # Example
/// ```ignore
/// #[module(
///     imports = [DatabaseModule, forward(UsersModule)],
///     controllers = [CatsController],
///     providers = [CatsService],
///     bindings = [(dyn CatsRepository => PgCatsRepository)],
///     exports = [CatsService, DatabaseModule],
///     configure = configure_middleware,
/// )]
/// pub struct CatsModule;
/// ```
///
/// Modules importing each other must use `forward(..)` on one side.
#[proc_macro_attribute]
pub fn module(attr: TokenStream, item: TokenStream) -> TokenStream {
    module::module_attribute(attr, item)
}
