use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased, shared provider instance.
///
/// Concrete values are stored directly; trait objects are stored as the
/// `Arc<dyn Trait>` itself so they can be recovered with [`Instance::downcast_dyn`].
#[derive(Clone)]
pub struct Instance {
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self { inner: value }
    }

    /// Wrap a trait object; pairs with [`Instance::downcast_dyn`].
    pub fn from_dyn<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::new(value)
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    pub fn downcast_dyn<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({:p})", Arc::as_ptr(&self.inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_concrete_round_trip() {
        let instance = Instance::new(42u32);
        assert_eq!(*instance.downcast::<u32>().unwrap(), 42);
        assert!(instance.downcast::<String>().is_none());
    }

    #[test]
    fn test_trait_object_round_trip() {
        let instance = Instance::from_dyn::<dyn Greeter>(Arc::new(English));
        assert_eq!(instance.downcast_dyn::<dyn Greeter>().unwrap().greet(), "hello");
    }

    #[test]
    fn test_identity() {
        let a = Instance::new(1u8);
        let b = a.clone();
        let c = Instance::new(1u8);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
