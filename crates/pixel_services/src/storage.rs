//! Service instance storage.
//!
//! This module provides [`ServiceKey`] for identifying bindings,
//! [`ErasedService`] for type-erased shared instances and the [`Services`]
//! container a scope caches its built instances in.
//!
//! Services are always handed out as `Arc<T>`, where `T` may be unsized.
//! This lets a scope bind trait objects such as `dyn ScriptEngine` and hand
//! them back without knowing the concrete type.

use core::any::{Any, TypeId};
use core::fmt;
use hashbrown::HashMap;
use std::sync::Arc;

/// Identifies a service binding: the service type plus an optional name.
///
/// Unnamed bindings are the default provider of a type. Named bindings let a
/// scope hold several providers of the same type side by side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Arc<str>>,
}

impl ServiceKey {
    /// Creates the key of the default (unnamed) binding of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            name: None,
        }
    }

    /// Creates the key of a named binding of `T`.
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::of::<T>()
        }
    }

    /// Creates a key from an optional name.
    #[must_use]
    pub fn with_name<T: ?Sized + 'static>(name: Option<&str>) -> Self {
        match name {
            Some(name) => Self::named::<T>(name),
            None => Self::of::<T>(),
        }
    }

    /// Returns the `TypeId` of the service type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the service type name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the binding name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}]", self.type_name, name),
            None => f.write_str(self.type_name),
        }
    }
}

/// A type-erased, cheaply clonable service instance.
///
/// Internally holds an `Arc<T>` boxed behind `dyn Any`, so cloning only bumps
/// reference counts and [`downcast`](Self::downcast) returns the very same
/// `Arc<T>` that was stored.
#[derive(Clone)]
pub struct ErasedService {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ErasedService {
    /// Erases a shared service instance.
    #[must_use]
    pub fn new<T: ?Sized + Send + Sync + 'static>(service: Arc<T>) -> Self {
        Self {
            inner: Arc::new(service),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the stored instance if it was erased from an `Arc<T>`.
    #[must_use]
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.downcast_ref::<Arc<T>>().cloned()
    }

    /// Returns the type name of the erased service.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ErasedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedService")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Container for built service instances.
///
/// A scope stores the singleton and scoped instances it has built here, so
/// repeated resolution in the same scope returns the same `Arc`.
#[derive(Debug, Default)]
pub struct Services {
    storage: HashMap<ServiceKey, ErasedService>,
}

impl Services {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: HashMap::new(),
        }
    }

    /// Inserts an instance, replacing and returning any previous one.
    pub fn insert(&mut self, key: ServiceKey, service: ErasedService) -> Option<ErasedService> {
        self.storage.insert(key, service)
    }

    /// Inserts an instance unless one is already stored, returning the stored one.
    ///
    /// Two scopes racing to build the same instance both end up with the
    /// first one inserted.
    pub fn get_or_insert(&mut self, key: ServiceKey, service: ErasedService) -> ErasedService {
        self.storage.entry(key).or_insert(service).clone()
    }

    /// Returns the instance stored under `key`.
    #[must_use]
    pub fn get(&self, key: &ServiceKey) -> Option<&ErasedService> {
        self.storage.get(key)
    }

    /// Returns the instance stored under `key`, typed.
    #[must_use]
    pub fn get_typed<T: ?Sized + Send + Sync + 'static>(&self, key: &ServiceKey) -> Option<Arc<T>> {
        self.storage.get(key).and_then(ErasedService::downcast::<T>)
    }

    /// Returns `true` if an instance is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.storage.contains_key(key)
    }

    /// Removes and returns the instance stored under `key`.
    pub fn remove(&mut self, key: &ServiceKey) -> Option<ErasedService> {
        self.storage.remove(key)
    }

    /// Removes every instance stored for the service type `type_id`.
    pub fn remove_type(&mut self, type_id: TypeId) {
        self.storage.retain(|key, _| key.type_id() != type_id);
    }

    /// Drops every stored instance.
    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// Returns the number of stored instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
