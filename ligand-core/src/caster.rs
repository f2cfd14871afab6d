use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error::CastError;
use crate::value::Value;

/// Converts a raw source value into the value assigned to a field.
pub trait Caster: Send + Sync {
    fn cast(&self, value: Value) -> Result<Value, CastError>;
}

impl<F> Caster for F
where
    F: Fn(Value) -> Result<Value, CastError> + Send + Sync,
{
    fn cast(&self, value: Value) -> Result<Value, CastError> {
        self(value)
    }
}

/// Names a caster implementation bound to a field or a type.
///
/// The binding is an identity, not an instance: the mapper asks its
/// [`Injector`](crate::Injector) to materialise it. Bindings created with
/// [`CasterBinding::of`] can fall back to the caster's `Default` impl;
/// [`CasterBinding::injected`] bindings must be registered with the injector.
#[derive(Clone, Copy)]
pub struct CasterBinding {
    name: &'static str,
    type_id: TypeId,
    construct: Option<fn() -> Arc<dyn Caster>>,
}

impl CasterBinding {
    pub fn of<C: Caster + Default + 'static>() -> Self {
        CasterBinding {
            name: short_name(type_name::<C>()),
            type_id: TypeId::of::<C>(),
            construct: Some(construct_default::<C>),
        }
    }

    pub fn injected<C: Caster + 'static>() -> Self {
        CasterBinding {
            name: short_name(type_name::<C>()),
            type_id: TypeId::of::<C>(),
            construct: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Builds a fresh caster when the binding knows how to.
    pub fn construct(&self) -> Option<Arc<dyn Caster>> {
        self.construct.map(|construct| construct())
    }
}

impl PartialEq for CasterBinding {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for CasterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CasterBinding").field(&self.name).finish()
    }
}

fn construct_default<C: Caster + Default + 'static>() -> Arc<dyn Caster> {
    Arc::new(C::default())
}

fn short_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Upper;

    impl Caster for Upper {
        fn cast(&self, value: Value) -> Result<Value, CastError> {
            match value {
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                other => Err(CastError::invalid("string", &other)),
            }
        }
    }

    struct NeedsConfig;

    impl Caster for NeedsConfig {
        fn cast(&self, value: Value) -> Result<Value, CastError> {
            Ok(value)
        }
    }

    #[test]
    fn binding_constructs_default_casters() {
        let binding = CasterBinding::of::<Upper>();
        assert_eq!(binding.name(), "Upper");
        let caster = binding.construct().unwrap();
        assert_eq!(caster.cast("abc".into()).unwrap(), Value::from("ABC"));
    }

    #[test]
    fn injected_binding_has_no_constructor() {
        let binding = CasterBinding::injected::<NeedsConfig>();
        assert_eq!(binding.name(), "NeedsConfig");
        assert!(binding.construct().is_none());
        assert_ne!(binding, CasterBinding::of::<Upper>());
    }

    #[test]
    fn closures_are_casters() {
        let double = |value: Value| match value {
            Value::Int(i) => Ok(Value::Int(i * 2)),
            other => Err(CastError::invalid("integer", &other)),
        };
        assert_eq!(double.cast(Value::Int(21)).unwrap(), Value::Int(42));
    }
}
