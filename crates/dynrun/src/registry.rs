//! # Method Registry
//!
//! Maps service names to their methods. Services are assembled with the `Service`
//! builder and then handed to `Registry::register`, which freezes them.
//!
//! Uses DashMap so registration can happen while connection workers are already
//! looking methods up: a writer holds one shard lock for the duration of a single
//! insert, and readers only ever see fully built entries.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dynrpc::CoercionError;
use dynrpc::Shape;
use dynrpc::Typed;

use crate::handler::Handler;

/// Type-erased entry point of a registered method.
pub type InvokeFn = dyn Fn(Vec<Typed>) -> Result<Vec<Typed>, CoercionError> + Send + Sync;

/// Everything the dispatcher needs to call one method.
pub struct HandlerDescriptor {
    pub service: String,
    pub method: String,
    pub params: Vec<Shape>,
    pub results: Vec<Shape>,
    invoke: Arc<InvokeFn>,
}

impl HandlerDescriptor {
    /// Runs the method with arguments already coerced to `params`.
    pub fn invoke(&self, args: Vec<Typed>) -> Result<Vec<Typed>, CoercionError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("service", &self.service)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

struct Method {
    params: Vec<Shape>,
    results: Vec<Shape>,
    invoke: Arc<InvokeFn>,
}

/// Builder for a set of named methods.
#[derive(Default)]
pub struct Service {
    methods: HashMap<String, Method>,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method backed by a typed closure. A later method with the same name
    /// replaces the earlier one.
    pub fn method<H, Args>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let invoke: Arc<InvokeFn> = Arc::new(move |args: Vec<Typed>| handler.call(args));
        self.insert(name.into(), H::params(), H::results(), invoke)
    }

    /// Adds a method with hand-written shapes that works on `Typed` values directly.
    pub fn raw<F>(self, name: impl Into<String>, params: Vec<Shape>, results: Vec<Shape>, f: F) -> Self
    where
        F: Fn(Vec<Typed>) -> Result<Vec<Typed>, CoercionError> + Send + Sync + 'static,
    {
        self.insert(name.into(), params, results, Arc::new(f))
    }

    fn insert(
        mut self,
        name: String,
        params: Vec<Shape>,
        results: Vec<Shape>,
        invoke: Arc<InvokeFn>,
    ) -> Self {
        self.methods.insert(name, Method { params, results, invoke });
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// A registered, immutable service.
#[derive(Debug)]
pub struct ServiceEntry {
    name: String,
    methods: HashMap<String, Arc<HandlerDescriptor>>,
}

impl ServiceEntry {
    fn bind(name: String, service: Service) -> Self {
        let methods = service
            .methods
            .into_iter()
            .map(|(method, m)| {
                let descriptor = HandlerDescriptor {
                    service: name.clone(),
                    method: method.clone(),
                    params: m.params,
                    results: m.results,
                    invoke: m.invoke,
                };
                (method, Arc::new(descriptor))
            })
            .collect();
        Self { name, methods }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.methods.get(name).cloned()
    }

    /// Method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Concurrent service table shared by every connection worker.
#[derive(Default)]
pub struct Registry {
    services: DashMap<String, Arc<ServiceEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under `name`, replacing and returning any previous one.
    pub fn register(&self, name: impl Into<String>, service: Service) -> Option<Arc<ServiceEntry>> {
        let name = name.into();
        let entry = Arc::new(ServiceEntry::bind(name.clone(), service));
        self.services.insert(name, entry)
    }

    pub fn service(&self, name: &str) -> Option<Arc<ServiceEntry>> {
        self.services.get(name).map(|entry| entry.value().clone())
    }

    pub fn lookup(&self, service: &str, method: &str) -> Option<Arc<HandlerDescriptor>> {
        self.service(service)?.method(method)
    }

    /// Registered service names, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }
}
