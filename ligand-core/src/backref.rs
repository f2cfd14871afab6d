use std::fmt;
use std::sync::{Arc, Weak};

use crate::descriptor::{DeclaredType, Describe, TypeRef};
use crate::error::CastError;
use crate::slot::Slot;
use crate::value::Value;

/// A reference from a nested object back to the object that contains it.
///
/// Backrefs exist in two states:
/// - **Weak**: points to the parent the mapper injected while populating it.
///   Upgrades once the parent has been fully constructed and stays valid as
///   long as someone holds the parent.
/// - **Strong**: owns an instance that was supplied explicitly in the source.
///
/// A field of this type receives the parent automatically when its name
/// matches the parent's inverse-relation key, e.g. `author: Backref<Author>`.
pub enum Backref<T> {
    Weak(Weak<T>),
    Strong(Arc<T>),
}

impl<T> Backref<T> {
    /// A backref that points nowhere.
    pub fn detached() -> Self {
        Backref::Weak(Weak::new())
    }

    /// Returns the referenced instance, if it is still alive.
    pub fn get(&self) -> Option<Arc<T>> {
        match self {
            Backref::Weak(weak) => weak.upgrade(),
            Backref::Strong(strong) => Some(Arc::clone(strong)),
        }
    }

    pub fn is_attached(&self) -> bool {
        match self {
            Backref::Weak(weak) => weak.strong_count() > 0,
            Backref::Strong(_) => true,
        }
    }

    /// Checks whether this backref points to `target`.
    pub fn points_to(&self, target: &Arc<T>) -> bool {
        match self {
            Backref::Weak(weak) => std::ptr::eq(weak.as_ptr(), Arc::as_ptr(target)),
            Backref::Strong(strong) => Arc::ptr_eq(strong, target),
        }
    }
}

impl<T> Clone for Backref<T> {
    fn clone(&self) -> Self {
        match self {
            Backref::Weak(weak) => Backref::Weak(Weak::clone(weak)),
            Backref::Strong(strong) => Backref::Strong(Arc::clone(strong)),
        }
    }
}

impl<T> Default for Backref<T> {
    fn default() -> Self {
        Self::detached()
    }
}

// Never prints the target: parent and child would recurse into each other.
impl<T> fmt::Debug for Backref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Backref::Weak(_) if self.is_attached() => "weak",
            Backref::Weak(_) => "detached",
            Backref::Strong(_) => "strong",
        };
        f.debug_tuple("Backref").field(&state).finish()
    }
}

impl<T: Describe> Slot for Backref<T> {
    fn declared() -> DeclaredType {
        DeclaredType::Object(TypeRef::of::<T>())
    }

    fn vacant() -> Self {
        Self::detached()
    }

    fn from_value(value: Value) -> Result<Self, CastError> {
        let Value::Object(instance) = &value else {
            return Err(CastError::invalid(T::type_name(), &value));
        };
        let converted = if instance.is_back_reference() {
            instance.downgrade::<T>().map(Backref::Weak)
        } else {
            instance.downcast::<T>().map(Backref::Strong)
        };
        converted.ok_or(CastError::Invalid {
            expected: T::type_name(),
            found: instance.type_name(),
        })
    }
}
