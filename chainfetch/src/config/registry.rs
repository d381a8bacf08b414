//! Client-wide interceptor registry.

use std::sync::{Arc, PoisonError, RwLock};

use super::interceptor::{ErrorInterceptor, Interceptors, RequestInterceptor, ResponseInterceptor};

/// The global interceptor chains shared by every request of a client.
///
/// Registration is append-only apart from [`reset`](Self::reset). Each
/// execution takes a [`snapshot`](Self::snapshot) when it starts; interceptors
/// added or cleared afterwards only affect later executions. Writers copy the
/// chains instead of mutating a list a reader may be iterating.
#[derive(Default)]
pub struct InterceptorRegistry {
    chains: RwLock<Arc<Interceptors>>,
}

impl InterceptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with `interceptors`.
    pub fn with_interceptors(interceptors: Interceptors) -> Self {
        Self {
            chains: RwLock::new(Arc::new(interceptors)),
        }
    }

    /// Append a global request interceptor.
    pub fn add_request_interceptor(&self, interceptor: RequestInterceptor) {
        self.update(|chains| chains.push_request(interceptor));
    }

    /// Append a global response interceptor.
    pub fn add_response_interceptor(&self, interceptor: ResponseInterceptor) {
        self.update(|chains| chains.push_response(interceptor));
    }

    /// Append a global error interceptor.
    pub fn add_error_interceptor(&self, interceptor: ErrorInterceptor) {
        self.update(|chains| chains.push_error(interceptor));
    }

    /// Remove every global interceptor.
    pub fn reset(&self) {
        *self.chains.write().unwrap_or_else(PoisonError::into_inner) = Arc::default();
    }

    /// The chains as they are right now.
    pub fn snapshot(&self) -> Arc<Interceptors> {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut Interceptors)) {
        let mut chains = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut chains));
    }
}

impl std::fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InterceptorRegistry")
            .field(&self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough() -> RequestInterceptor {
        RequestInterceptor::sync(Ok)
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_registration() {
        let registry = InterceptorRegistry::new();
        registry.add_request_interceptor(passthrough());

        let before = registry.snapshot();
        registry.add_request_interceptor(passthrough());
        registry.add_response_interceptor(ResponseInterceptor::sync(Ok));

        assert_eq!(before.len(), 1);
        assert_eq!(registry.snapshot().len(), 3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let registry = InterceptorRegistry::new();
        registry.add_request_interceptor(passthrough());
        registry.add_error_interceptor(ErrorInterceptor::sync(Ok));

        let held = registry.snapshot();
        registry.reset();

        assert!(registry.snapshot().is_empty());
        assert_eq!(held.len(), 2);
    }

    #[test]
    fn test_concurrent_registration_and_reads() {
        let registry = Arc::new(InterceptorRegistry::new());

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        registry.add_request_interceptor(passthrough());
                        let _ = registry.snapshot().len();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(registry.snapshot().len(), 200);
    }

    #[test]
    fn test_debug_shows_counts() {
        let registry = InterceptorRegistry::new();
        registry.add_request_interceptor(passthrough());
        assert_eq!(
            format!("{registry:?}"),
            "InterceptorRegistry(Interceptors { request: 1, response: 0, error: 0 })"
        );
    }
}
