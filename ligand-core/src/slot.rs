use std::sync::Arc;

use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::descriptor::{DeclaredType, Describe, ScalarKind, TypeRef};
use crate::error::CastError;
use crate::value::Value;

/// A Rust type that can hold a mapped field value.
///
/// `#[derive(Describe)]` reads the declared type, the allocation placeholder
/// and the assignment conversion of each field from this trait. Implement it
/// for custom value types, returning [`DeclaredType::Custom`] to attach a
/// type-level caster.
pub trait Slot: Sized {
    /// The declared type reported in the field descriptor.
    fn declared() -> DeclaredType;

    /// Placeholder used by raw allocation before the field is assigned.
    fn vacant() -> Self;

    /// Converts a resolved (already cast) value.
    fn from_value(value: Value) -> Result<Self, CastError>;
}

impl Slot for Value {
    fn declared() -> DeclaredType {
        DeclaredType::Scalar(ScalarKind::Mixed)
    }

    fn vacant() -> Self {
        Value::Null
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        Ok(value)
    }
}

impl Slot for String {
    fn declared() -> DeclaredType {
        DeclaredType::Scalar(ScalarKind::String)
    }

    fn vacant() -> Self {
        String::new()
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(CastError::invalid("string", &other)),
        }
    }
}

impl Slot for bool {
    fn declared() -> DeclaredType {
        DeclaredType::Scalar(ScalarKind::Boolean)
    }

    fn vacant() -> Self {
        false
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(CastError::invalid("boolean", &other)),
        }
    }
}

macro_rules! impl_slot_int {
    ($($t:ty),*) => {
        $(
            impl Slot for $t {
                fn declared() -> DeclaredType {
                    DeclaredType::Scalar(ScalarKind::Integer)
                }

                fn vacant() -> Self {
                    0
                }

                fn from_value(value: Value) -> Result<Self, CastError> {
                    match value {
                        Value::Int(i) => <$t>::try_from(i)
                            .map_err(|_| CastError::out_of_range(stringify!($t), i)),
                        other => Err(CastError::invalid("integer", &other)),
                    }
                }
            }
        )*
    };
}

impl_slot_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_slot_float {
    ($($t:ty),*) => {
        $(
            impl Slot for $t {
                fn declared() -> DeclaredType {
                    DeclaredType::Scalar(ScalarKind::Float)
                }

                fn vacant() -> Self {
                    0.0
                }

                fn from_value(value: Value) -> Result<Self, CastError> {
                    match value {
                        Value::Float(f) => Ok(f as $t),
                        Value::Int(i) => Ok(i as $t),
                        other => Err(CastError::invalid("float", &other)),
                    }
                }
            }
        )*
    };
}

impl_slot_float!(f32, f64);

impl Slot for OffsetDateTime {
    fn declared() -> DeclaredType {
        DeclaredType::Scalar(ScalarKind::DateTime)
    }

    fn vacant() -> Self {
        OffsetDateTime::UNIX_EPOCH
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(CastError::invalid("datetime", &other)),
        }
    }
}

impl<T: Slot> Slot for Option<T> {
    fn declared() -> DeclaredType {
        T::declared()
    }

    fn vacant() -> Self {
        None
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Without an `elements` annotation a list is a plain scalar value.
impl<T: Slot> Slot for Vec<T> {
    fn declared() -> DeclaredType {
        DeclaredType::Scalar(ScalarKind::List)
    }

    fn vacant() -> Self {
        Vec::new()
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(CastError::invalid("list", &other)),
        }
    }
}

impl<T: Slot> Slot for IndexMap<String, T> {
    fn declared() -> DeclaredType {
        DeclaredType::Scalar(ScalarKind::Map)
    }

    fn vacant() -> Self {
        IndexMap::new()
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        match value {
            Value::Map(map) => map
                .into_iter()
                .map(|(key, value)| T::from_value(value).map(|v| (key, v)))
                .collect(),
            other => Err(CastError::invalid("map", &other)),
        }
    }
}

/// Nested objects are held through `Arc` so children can point back at them.
impl<T: Describe> Slot for Arc<T> {
    fn declared() -> DeclaredType {
        DeclaredType::Object(TypeRef::of::<T>())
    }

    fn vacant() -> Self {
        Arc::new(T::allocate())
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        let Value::Object(instance) = &value else {
            return Err(CastError::invalid(T::type_name(), &value));
        };
        if let Some(strong) = instance.downcast::<T>() {
            return Ok(strong);
        }
        if instance.is_back_reference() && instance.type_name() == T::type_name() {
            return Err(CastError::PendingBackref(T::type_name()));
        }
        Err(CastError::Invalid {
            expected: T::type_name(),
            found: instance.type_name(),
        })
    }
}
