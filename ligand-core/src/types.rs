use indexmap::IndexMap;

use crate::descriptor::{Describe, TypeRef};

/// Target types addressable by name, for callers that only know the type at
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<&'static str, TypeRef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its type name. Re-registering a name replaces it.
    pub fn register<T: Describe>(&mut self) -> &mut Self {
        self.types.insert(T::type_name(), TypeRef::of::<T>());
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::error::CastError;
    use crate::validate::Validate;
    use crate::value::Value;

    macro_rules! unit_type {
        ($name:ident) => {
            struct $name;

            impl Validate for $name {}

            impl Describe for $name {
                fn type_name() -> &'static str {
                    stringify!($name)
                }

                fn describe() -> TypeDescriptor {
                    TypeDescriptor::new(stringify!($name))
                }

                fn allocate() -> Self {
                    $name
                }

                fn assign(&mut self, field: &str, _value: Value) -> Result<(), CastError> {
                    Err(CastError::UnknownField(field.to_string()))
                }
            }
        };
    }

    unit_type!(Alpha);
    unit_type!(Beta);

    #[test]
    fn keeps_registration_order() {
        let mut registry = TypeRegistry::new();
        assert!(registry.is_empty());
        registry.register::<Beta>().register::<Alpha>().register::<Beta>();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["Beta", "Alpha"]);
        assert!(registry.contains("Alpha"));
        assert_eq!(registry.get("Beta").map(TypeRef::name), Some("Beta"));
        assert!(registry.get("Gamma").is_none());
    }
}
