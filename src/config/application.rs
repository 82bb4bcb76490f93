use std::sync::Arc;

use crate::di::{ContextId, InstanceWrapper, WrapperId};
use crate::error::{self, KeystoneError};
use crate::exception::ExceptionFilter;
use crate::guard::Guard;
use crate::interceptor::Interceptor;
use crate::pipe::Pipe;

/// Application-wide settings: global prefix and global enhancers.
///
/// Static enhancers are stored as instances. Request/transient enhancers are
/// stored as wrappers and looked up per context.
#[derive(Default)]
pub struct ApplicationConfig {
    global_prefix: String,
    global_guards: Vec<Arc<dyn Guard>>,
    global_pipes: Vec<Arc<dyn Pipe>>,
    global_interceptors: Vec<Arc<dyn Interceptor>>,
    global_filters: Vec<Arc<dyn ExceptionFilter>>,
    global_request_guards: Vec<Arc<InstanceWrapper>>,
    global_request_pipes: Vec<Arc<InstanceWrapper>>,
    global_request_interceptors: Vec<Arc<InstanceWrapper>>,
    global_request_filters: Vec<Arc<InstanceWrapper>>,
}

impl ApplicationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_global_prefix(&mut self, prefix: impl Into<String>) {
        self.global_prefix = prefix.into();
    }

    pub fn global_prefix(&self) -> &str {
        &self.global_prefix
    }

    pub fn use_global_guards(&mut self, guards: impl IntoIterator<Item = Arc<dyn Guard>>) {
        self.global_guards.extend(guards);
    }

    pub fn use_global_pipes(&mut self, pipes: impl IntoIterator<Item = Arc<dyn Pipe>>) {
        self.global_pipes.extend(pipes);
    }

    pub fn use_global_interceptors(
        &mut self,
        interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>,
    ) {
        self.global_interceptors.extend(interceptors);
    }

    pub fn use_global_filters(&mut self, filters: impl IntoIterator<Item = Arc<dyn ExceptionFilter>>) {
        self.global_filters.extend(filters);
    }

    pub fn add_global_request_guard(&mut self, wrapper: Arc<InstanceWrapper>) {
        self.global_request_guards.push(wrapper);
    }

    pub fn add_global_request_pipe(&mut self, wrapper: Arc<InstanceWrapper>) {
        self.global_request_pipes.push(wrapper);
    }

    pub fn add_global_request_interceptor(&mut self, wrapper: Arc<InstanceWrapper>) {
        self.global_request_interceptors.push(wrapper);
    }

    pub fn add_global_request_filter(&mut self, wrapper: Arc<InstanceWrapper>) {
        self.global_request_filters.push(wrapper);
    }

    pub fn global_guards(&self) -> &[Arc<dyn Guard>] {
        &self.global_guards
    }

    pub fn global_pipes(&self) -> &[Arc<dyn Pipe>] {
        &self.global_pipes
    }

    pub fn global_interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.global_interceptors
    }

    pub fn global_filters(&self) -> &[Arc<dyn ExceptionFilter>] {
        &self.global_filters
    }

    pub fn global_request_guards(&self) -> &[Arc<InstanceWrapper>] {
        &self.global_request_guards
    }

    pub fn global_request_pipes(&self) -> &[Arc<InstanceWrapper>] {
        &self.global_request_pipes
    }

    pub fn global_request_interceptors(&self) -> &[Arc<InstanceWrapper>] {
        &self.global_request_interceptors
    }

    pub fn global_request_filters(&self) -> &[Arc<InstanceWrapper>] {
        &self.global_request_filters
    }

    /// Static guards followed by scoped guards resolved for `context`.
    ///
    /// Fails when a scoped guard was not built for `context`.
    pub fn guards_for(&self, context: ContextId, inquirer: Option<WrapperId>) -> error::Result<Vec<Arc<dyn Guard>>> {
        merge(&self.global_guards, &self.global_request_guards, context, inquirer)
    }

    pub fn pipes_for(&self, context: ContextId, inquirer: Option<WrapperId>) -> error::Result<Vec<Arc<dyn Pipe>>> {
        merge(&self.global_pipes, &self.global_request_pipes, context, inquirer)
    }

    pub fn interceptors_for(
        &self,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> error::Result<Vec<Arc<dyn Interceptor>>> {
        merge(
            &self.global_interceptors,
            &self.global_request_interceptors,
            context,
            inquirer,
        )
    }

    pub fn filters_for(
        &self,
        context: ContextId,
        inquirer: Option<WrapperId>,
    ) -> error::Result<Vec<Arc<dyn ExceptionFilter>>> {
        merge(&self.global_filters, &self.global_request_filters, context, inquirer)
    }

    /// Static filters plus whichever scoped filters are already cached for
    /// `context`. Used where no handler owns the request.
    pub fn cached_filters_for(&self, context: ContextId) -> Vec<Arc<dyn ExceptionFilter>> {
        let mut filters = self.global_filters.clone();
        if !context.is_static() {
            filters.extend(
                self.global_request_filters
                    .iter()
                    .filter_map(|wrapper| wrapper.instance_by_context(context, None))
                    .filter_map(|instance| instance.downcast_dyn::<dyn ExceptionFilter>()),
            );
        }
        filters
    }
}

fn merge<T: ?Sized + Send + Sync + 'static>(
    instances: &[Arc<T>],
    wrappers: &[Arc<InstanceWrapper>],
    context: ContextId,
    inquirer: Option<WrapperId>,
) -> error::Result<Vec<Arc<T>>> {
    let mut merged = instances.to_vec();
    if context.is_static() && inquirer.is_none() {
        return Ok(merged);
    }
    for wrapper in wrappers {
        let instance = wrapper
            .instance_by_context(context, inquirer)
            .and_then(|instance| instance.downcast_dyn::<T>())
            .ok_or_else(|| KeystoneError::UnavailableEnhancer {
                name: wrapper.name().to_string(),
                module: wrapper.host().to_string(),
            })?;
        merged.push(instance);
    }
    Ok(merged)
}
