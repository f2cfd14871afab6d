use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::caster::{Caster, CasterBinding};

/// Error raised when a caster binding cannot be materialised.
#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
    #[error("caster {0} is not registered and has no default constructor")]
    Unsatisfiable(&'static str),
}

/// Materialises user-defined casters named by a [`CasterBinding`].
pub trait Injector: Send + Sync {
    fn resolve(&self, binding: &CasterBinding) -> Result<Arc<dyn Caster>, InjectionError>;
}

/// Default injector: registered instances first, then the binding's own
/// `Default` constructor.
#[derive(Default)]
pub struct Container {
    instances: HashMap<TypeId, Arc<dyn Caster>>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a caster instance, replacing any earlier one of the same type.
    pub fn register<C: Caster + 'static>(&mut self, caster: C) -> &mut Self {
        self.instances.insert(TypeId::of::<C>(), Arc::new(caster));
        self
    }

    /// Builder-style [`Container::register`].
    pub fn with<C: Caster + 'static>(mut self, caster: C) -> Self {
        self.register(caster);
        self
    }

    /// Checks whether an instance of `C` was registered.
    pub fn contains<C: Caster + 'static>(&self) -> bool {
        self.instances.contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Injector for Container {
    fn resolve(&self, binding: &CasterBinding) -> Result<Arc<dyn Caster>, InjectionError> {
        if let Some(caster) = self.instances.get(&binding.type_id()) {
            debug!("resolved caster {} from container", binding.name());
            return Ok(Arc::clone(caster));
        }
        binding
            .construct()
            .ok_or(InjectionError::Unsatisfiable(binding.name()))
    }
}

impl<I: Injector + ?Sized> Injector for Arc<I> {
    fn resolve(&self, binding: &CasterBinding) -> Result<Arc<dyn Caster>, InjectionError> {
        (**self).resolve(binding)
    }
}
