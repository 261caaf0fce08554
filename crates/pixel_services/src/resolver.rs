//! Hierarchical service resolution.
//!
//! A [`ServiceResolver`] is one scope in a tree of scopes. Each scope holds
//! its own binding map and its own cache of built instances, plus an optional
//! parent scope it falls back to.
//!
//! # Lookup order
//!
//! 1. Bindings registered in this scope (latest registration wins)
//! 2. Inheritable bindings of the parent chain (closest wins)
//!
//! A scope that received [`register_default`](ServiceResolver::register_default)
//! for a type stops the walk for that type: the default is the sole provider.
//!
//! # Lifetimes
//!
//! | Lifetime | Built | Cached in |
//! |----------|-------|-----------|
//! | instance | by the caller | the registering scope |
//! | [`Lifetime::Singleton`] | once, on first use | the registering scope |
//! | [`Lifetime::Scoped`] | once per requesting scope | the requesting scope |
//! | [`Lifetime::Transient`] | on every resolution | nowhere |
//!
//! Scoped bindings are what keeps script engines and device handles from
//! leaking between prefabs: the binding is inherited, the instance is not.
//! Bindings marked [`scope_local`](ServiceBinding::scope_local) are not
//! inherited at all.

use core::any::TypeId;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};
use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::storage::{ErasedService, ServiceKey, Services};

/// Errors that can occur while resolving a service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// No binding exists for the requested service in this scope or its parents.
    #[error("no service registered for {0}")]
    NotRegistered(ServiceKey),

    /// The scope (or one of the parents it fell back to) has been disposed.
    #[error("service scope has been disposed")]
    Disposed,

    /// A factory failed to build the service.
    #[error("failed to build {key}: {message}")]
    Factory {
        /// The binding whose factory failed.
        key: ServiceKey,
        /// Error reported by the factory.
        message: String,
    },
}

impl ResolveError {
    /// Creates a factory error for the default binding of `T`.
    #[must_use]
    pub fn factory<T: ?Sized + 'static>(message: impl Into<String>) -> Self {
        ResolveError::Factory {
            key: ServiceKey::of::<T>(),
            message: message.into(),
        }
    }
}

/// How long a factory-built service lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Built once and shared by the registering scope and all its children.
    Singleton,
    /// Built once per scope that resolves it.
    Scoped,
    /// Built on every resolution.
    Transient,
}

/// Type-erased factory stored in a binding.
type Factory = Arc<dyn Fn(&ServiceResolver) -> Result<ErasedService, ResolveError> + Send + Sync>;

/// How a binding produces its service.
#[derive(Clone)]
enum Provider {
    Instance(ErasedService),
    Factory { lifetime: Lifetime, build: Factory },
}

/// A single registration inside a scope.
#[derive(Clone)]
struct Binding {
    key: ServiceKey,
    provider: Provider,
    inherit: bool,
}

/// Binding map of one scope.
#[derive(Default)]
struct Bindings {
    /// Registrations per service type, in registration order.
    by_type: HashMap<TypeId, Vec<Binding>>,
    /// Service types bound via `register_default`.
    sole: HashSet<TypeId>,
}

/// A typed registration ready to be added to a scope.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pixel_services::{ServiceBinding, ServiceResolver};
///
/// struct Device { port: u16 }
///
/// let resolver = ServiceResolver::new();
/// resolver.register(
///     ServiceBinding::scoped(|_| Ok(Arc::new(Device { port: 4723 })))
///         .named("appium")
///         .scope_local(),
/// );
///
/// let device = resolver.get_named::<Device>("appium").unwrap();
/// assert_eq!(device.port, 4723);
/// ```
pub struct ServiceBinding<T: ?Sized> {
    name: Option<Arc<str>>,
    provider: Provider,
    inherit: bool,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ServiceBinding<T> {
    /// Binds an already-built instance.
    #[must_use]
    pub fn instance(service: Arc<T>) -> Self {
        Self::from_provider(Provider::Instance(ErasedService::new(service)))
    }

    /// Binds a factory whose instance is shared with child scopes.
    #[must_use]
    pub fn singleton(
        factory: impl Fn(&ServiceResolver) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) -> Self {
        Self::from_factory(Lifetime::Singleton, factory)
    }

    /// Binds a factory that builds one instance per resolving scope.
    #[must_use]
    pub fn scoped(
        factory: impl Fn(&ServiceResolver) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) -> Self {
        Self::from_factory(Lifetime::Scoped, factory)
    }

    /// Binds a factory that builds a new instance on every resolution.
    #[must_use]
    pub fn transient(
        factory: impl Fn(&ServiceResolver) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) -> Self {
        Self::from_factory(Lifetime::Transient, factory)
    }

    /// Names the binding so it can coexist with other providers of `T`.
    #[must_use]
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Keeps the binding invisible to child scopes.
    #[must_use]
    pub fn scope_local(mut self) -> Self {
        self.inherit = false;
        self
    }

    fn from_factory(
        lifetime: Lifetime,
        factory: impl Fn(&ServiceResolver) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) -> Self {
        let build: Factory = Arc::new(move |resolver| factory(resolver).map(ErasedService::new));
        Self::from_provider(Provider::Factory { lifetime, build })
    }

    fn from_provider(provider: Provider) -> Self {
        Self {
            name: None,
            provider,
            inherit: true,
            _marker: PhantomData,
        }
    }

    fn into_binding(self) -> Binding {
        let key = match self.name {
            Some(name) => ServiceKey::named::<T>(name),
            None => ServiceKey::of::<T>(),
        };
        Binding {
            key,
            provider: self.provider,
            inherit: self.inherit,
        }
    }
}

/// A dependency-injection scope with an optional parent scope.
///
/// Registration and resolution take `&self`; the binding map and the
/// instance cache are guarded by `RwLock`s, so a scope can be shared behind
/// an `Arc` by the components that resolve from it.
///
/// Factories run without any lock held, which lets a factory resolve its own
/// dependencies from the scope it is handed.
pub struct ServiceResolver {
    /// Parent scope for inherited bindings.
    parent: Option<Arc<ServiceResolver>>,
    /// Registrations of this scope.
    bindings: RwLock<Bindings>,
    /// Instances built by (or for) this scope.
    instances: RwLock<Services>,
    /// Set once by [`dispose`](Self::dispose).
    disposed: AtomicBool,
}

impl Default for ServiceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceResolver {
    /// Creates a root scope with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: None,
            bindings: RwLock::new(Bindings::default()),
            instances: RwLock::new(Services::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Creates a child scope of this scope.
    ///
    /// The child sees every inheritable binding of its ancestors. Singletons
    /// are shared with the ancestors; scoped services get fresh instances.
    #[must_use]
    pub fn child(self: &Arc<Self>) -> ServiceResolver {
        ServiceResolver {
            parent: Some(Arc::clone(self)),
            ..ServiceResolver::new()
        }
    }

    /// Returns the parent scope, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<ServiceResolver>> {
        self.parent.as_ref()
    }

    /// Returns how many ancestors this scope has.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_deref();
        while let Some(scope) = current {
            depth += 1;
            current = scope.parent.as_deref();
        }
        depth
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────

    /// Adds a binding to this scope.
    pub fn register<T: ?Sized + Send + Sync + 'static>(&self, binding: ServiceBinding<T>) {
        let binding = binding.into_binding();
        let mut bindings = self.bindings.write();
        // A later registration replaces the cached instance of the same key.
        self.instances.write().remove(&binding.key);
        bindings
            .by_type
            .entry(binding.key.type_id())
            .or_default()
            .push(binding);
    }

    /// Binds an already-built instance as the default provider of `T`.
    pub fn register_instance<T: ?Sized + Send + Sync + 'static>(&self, service: Arc<T>) {
        self.register(ServiceBinding::instance(service));
    }

    /// Binds a singleton factory as the default provider of `T`.
    pub fn register_singleton<T: ?Sized + Send + Sync + 'static>(
        &self,
        factory: impl Fn(&ServiceResolver) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) {
        self.register(ServiceBinding::singleton(factory));
    }

    /// Binds a per-scope factory as the default provider of `T`.
    pub fn register_scoped<T: ?Sized + Send + Sync + 'static>(
        &self,
        factory: impl Fn(&ServiceResolver) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) {
        self.register(ServiceBinding::scoped(factory));
    }

    /// Binds a transient factory as the default provider of `T`.
    pub fn register_transient<T: ?Sized + Send + Sync + 'static>(
        &self,
        factory: impl Fn(&ServiceResolver) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
    ) {
        self.register(ServiceBinding::transient(factory));
    }

    /// Makes `service` the sole provider of `T` within this scope.
    ///
    /// Every other binding of `T` in this scope is dropped, and parent
    /// bindings of `T` are no longer consulted from here.
    pub fn register_default<T: ?Sized + Send + Sync + 'static>(&self, service: Arc<T>) {
        let type_id = TypeId::of::<T>();
        let binding = ServiceBinding::instance(service).into_binding();
        let mut bindings = self.bindings.write();
        self.instances.write().remove_type(type_id);
        bindings.by_type.insert(type_id, vec![binding]);
        bindings.sole.insert(type_id);
    }

    /// Returns `true` if `T` can be resolved from this scope.
    #[must_use]
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        matches!(self.find(&ServiceKey::of::<T>(), false), Ok(Some(_)))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────

    /// Resolves the default provider of `T`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NotRegistered`] if no scope in the chain binds `T`
    /// - [`ResolveError::Disposed`] if this scope or a consulted parent is disposed
    /// - [`ResolveError::Factory`] if the binding's factory fails
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        self.resolve_key(&ServiceKey::of::<T>())
    }

    /// Resolves the provider of `T` registered under `name`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ResolveError> {
        self.resolve_key(&ServiceKey::named::<T>(name))
    }

    /// Resolves `T` by an optional name.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_keyed<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<T>, ResolveError> {
        self.resolve_key(&ServiceKey::with_name::<T>(name))
    }

    /// Resolves every provider of `T` visible from this scope.
    ///
    /// Local bindings come first, in registration order, followed by the
    /// inherited bindings of each ancestor. A key bound more than once
    /// resolves to its closest, latest binding only.
    ///
    /// # Errors
    ///
    /// Returns the first resolution failure. An empty result is not an error.
    pub fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, ResolveError> {
        let type_id = TypeId::of::<T>();
        let mut seen: HashSet<ServiceKey> = HashSet::new();
        let mut resolved = Vec::new();
        let mut scope = Some(self);
        let mut inherited_only = false;

        while let Some(current) = scope {
            if current.is_disposed() {
                return Err(ResolveError::Disposed);
            }
            let (candidates, sole) = {
                let bindings = current.bindings.read();
                let candidates: Vec<Binding> = bindings
                    .by_type
                    .get(&type_id)
                    .map(|list| list.iter().rev().cloned().collect())
                    .unwrap_or_default();
                (candidates, bindings.sole.contains(&type_id))
            };

            // Reversed, so the latest binding of a key claims it first.
            let mut local = Vec::new();
            for binding in candidates {
                if inherited_only && !binding.inherit {
                    continue;
                }
                if seen.insert(binding.key.clone()) {
                    local.push(binding);
                }
            }
            for binding in local.into_iter().rev() {
                let service = self.instantiate(current, &binding)?;
                resolved.push(downcast::<T>(&binding.key, &service)?);
            }

            if sole {
                break;
            }
            scope = current.parent.as_deref();
            inherited_only = true;
        }

        Ok(resolved)
    }

    /// Drops every binding and built instance of this scope.
    ///
    /// Further resolution from this scope, or from child scopes falling back
    /// to it, fails with [`ResolveError::Disposed`]. Calling it again is a
    /// no-op.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut bindings = self.bindings.write();
        bindings.by_type.clear();
        bindings.sole.clear();
        self.instances.write().clear();
    }

    fn resolve_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &ServiceKey,
    ) -> Result<Arc<T>, ResolveError> {
        let (owner, binding) = self
            .find(key, false)?
            .ok_or_else(|| ResolveError::NotRegistered(key.clone()))?;
        let service = self.instantiate(owner, &binding)?;
        downcast::<T>(key, &service)
    }

    /// Finds the binding for `key`, walking up the parent chain.
    ///
    /// Returns the scope that owns the binding alongside a copy of it.
    fn find(
        &self,
        key: &ServiceKey,
        inherited_only: bool,
    ) -> Result<Option<(&ServiceResolver, Binding)>, ResolveError> {
        if self.is_disposed() {
            return Err(ResolveError::Disposed);
        }
        {
            let bindings = self.bindings.read();
            if let Some(list) = bindings.by_type.get(&key.type_id()) {
                let found = list
                    .iter()
                    .rev()
                    .find(|binding| binding.key == *key && (binding.inherit || !inherited_only));
                if let Some(binding) = found {
                    return Ok(Some((self, binding.clone())));
                }
            }
            if bindings.sole.contains(&key.type_id()) {
                return Ok(None);
            }
        }
        match self.parent.as_deref() {
            Some(parent) => parent.find(key, true),
            None => Ok(None),
        }
    }

    /// Produces the instance for a binding owned by `owner`, on behalf of `self`.
    fn instantiate(
        &self,
        owner: &ServiceResolver,
        binding: &Binding,
    ) -> Result<ErasedService, ResolveError> {
        match &binding.provider {
            Provider::Instance(service) => Ok(service.clone()),
            Provider::Factory { lifetime, build } => match lifetime {
                Lifetime::Transient => build(self),
                Lifetime::Singleton => owner.cached_or_build(&binding.key, build),
                Lifetime::Scoped => self.cached_or_build(&binding.key, build),
            },
        }
    }

    fn cached_or_build(
        &self,
        key: &ServiceKey,
        build: &Factory,
    ) -> Result<ErasedService, ResolveError> {
        if let Some(service) = self.instances.read().get(key) {
            return Ok(service.clone());
        }
        // Built outside the lock so the factory can resolve from this scope.
        let service = build(self)?;
        Ok(self.instances.write().get_or_insert(key.clone(), service))
    }
}

fn downcast<T: ?Sized + Send + Sync + 'static>(
    key: &ServiceKey,
    service: &ErasedService,
) -> Result<Arc<T>, ResolveError> {
    service.downcast::<T>().ok_or_else(|| ResolveError::Factory {
        key: key.clone(),
        message: format!("binding produced {}", service.type_name()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    trait ScriptEngine: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Engine(&'static str);

    impl ScriptEngine for Engine {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[derive(Debug)]
    struct Config {
        retries: u32,
    }

    #[test]
    fn instance_resolves_to_same_arc() {
        let resolver = ServiceResolver::new();
        let config = Arc::new(Config { retries: 3 });
        resolver.register_instance(Arc::clone(&config));

        let resolved = resolver.get::<Config>().unwrap();
        assert!(Arc::ptr_eq(&config, &resolved));
    }

    #[test]
    fn missing_binding_is_an_error() {
        let resolver = ServiceResolver::new();
        let err = resolver.get::<Config>().err().unwrap();
        assert!(matches!(err, ResolveError::NotRegistered(key) if key == ServiceKey::of::<Config>()));
    }

    #[test]
    fn trait_object_bindings() {
        let resolver = ServiceResolver::new();
        resolver.register_scoped::<dyn ScriptEngine>(|_| {
            let engine: Arc<dyn ScriptEngine> = Arc::new(Engine("roslyn"));
            Ok(engine)
        });

        assert_eq!(resolver.get::<dyn ScriptEngine>().unwrap().name(), "roslyn");
    }

    #[test]
    fn latest_registration_wins() {
        let resolver = ServiceResolver::new();
        resolver.register_instance(Arc::new(Config { retries: 1 }));
        resolver.register_instance(Arc::new(Config { retries: 2 }));

        assert_eq!(resolver.get::<Config>().unwrap().retries, 2);
    }

    #[test]
    fn singleton_is_built_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let resolver = ServiceResolver::new();
        resolver.register_singleton(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Config { retries: 5 }))
        });

        let a = resolver.get::<Config>().unwrap();
        let b = resolver.get::<Config>().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transient_builds_every_time() {
        let resolver = ServiceResolver::new();
        resolver.register_transient(|_| Ok(Arc::new(Config { retries: 0 })));

        let a = resolver.get::<Config>().unwrap();
        let b = resolver.get::<Config>().unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn factories_can_resolve_dependencies() {
        struct Retrying {
            retries: u32,
        }

        let resolver = ServiceResolver::new();
        resolver.register_instance(Arc::new(Config { retries: 7 }));
        resolver.register_scoped(|scope| {
            let config = scope.get::<Config>()?;
            Ok(Arc::new(Retrying {
                retries: config.retries,
            }))
        });

        assert_eq!(resolver.get::<Retrying>().unwrap().retries, 7);
    }

    #[test]
    fn named_bindings_coexist() {
        let resolver = ServiceResolver::new();
        resolver.register(ServiceBinding::instance(Arc::new(Config { retries: 1 })).named("fast"));
        resolver.register(ServiceBinding::instance(Arc::new(Config { retries: 9 })).named("slow"));

        assert_eq!(resolver.get_named::<Config>("fast").unwrap().retries, 1);
        assert_eq!(resolver.get_keyed::<Config>(Some("slow")).unwrap().retries, 9);
        assert!(resolver.get::<Config>().is_err());
        assert_eq!(resolver.get_all::<Config>().unwrap().len(), 2);
    }

    #[test]
    fn register_default_is_sole_provider() {
        let root = Arc::new(ServiceResolver::new());
        root.register_instance(Arc::new(Config { retries: 1 }));

        let child = Arc::new(root.child());
        child.register(ServiceBinding::instance(Arc::new(Config { retries: 2 })).named("other"));
        child.register_default(Arc::new(Config { retries: 3 }));

        let all = child.get_all::<Config>().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].retries, 3);
        assert!(child.get_named::<Config>("other").is_err());
        assert_eq!(root.get::<Config>().unwrap().retries, 1);
    }

    #[test]
    fn dispose_is_idempotent_and_blocks_resolution() {
        let resolver = ServiceResolver::new();
        resolver.register_instance(Arc::new(Config { retries: 1 }));

        resolver.dispose();
        resolver.dispose();

        assert!(resolver.is_disposed());
        assert!(matches!(resolver.get::<Config>(), Err(ResolveError::Disposed)));
    }

    #[test]
    fn depth_counts_ancestors() {
        let root = Arc::new(ServiceResolver::new());
        let child = Arc::new(root.child());
        let grandchild = child.child();

        assert_eq!(root.depth(), 0);
        assert_eq!(child.depth(), 1);
        assert_eq!(grandchild.depth(), 2);
    }
}
