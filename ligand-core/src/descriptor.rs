use std::any::Any;
use std::fmt;

use crate::caster::CasterBinding;
use crate::error::{CastError, MapError};
use crate::mapper::ObjectMapper;
use crate::validate::Validate;
use crate::value::{Instance, Mapping, Value};

/// A type the mapper can populate from a [`Mapping`].
///
/// Usually generated with `#[derive(Describe)]`. The descriptor replaces
/// runtime reflection: it lists the fields in declaration order together with
/// their declared types, caster bindings and default information.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use ligand_core::{Backref, Describe};
///
/// #[derive(Debug, Describe)]
/// struct Author {
///     name: String,
///     #[ligand(elements = Arc<Book>)]
///     books: Vec<Arc<Book>>,
/// }
///
/// #[derive(Debug, Describe)]
/// struct Book {
///     title: String,
///     author: Backref<Author>,
/// }
/// ```
pub trait Describe: Validate + Any + Send + Sync + Sized {
    /// Short type name. Inverse-relation keys are derived from it.
    fn type_name() -> &'static str;

    /// Returns the descriptor table for this type.
    fn describe() -> TypeDescriptor;

    /// Allocates an instance without running any user constructor logic.
    ///
    /// Every field holds a placeholder or its declared default afterwards.
    fn allocate() -> Self;

    /// Assigns a resolved value to the field with the given source name.
    fn assign(&mut self, field: &str, value: Value) -> Result<(), CastError>;
}

/// Built-in scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    /// A list without an element annotation.
    List,
    Map,
    /// Accepts any value.
    Mixed,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::DateTime => "datetime",
            ScalarKind::List => "list",
            ScalarKind::Map => "map",
            ScalarKind::Mixed => "mixed",
        }
    }
}

/// A reference to another describable type.
///
/// Carries function pointers instead of a descriptor so recursive types can
/// refer to themselves.
#[derive(Clone, Copy)]
pub struct TypeRef {
    name: &'static str,
    describe: fn() -> TypeDescriptor,
    map: fn(&ObjectMapper, Mapping) -> Result<Instance, MapError>,
}

impl TypeRef {
    pub fn of<T: Describe>() -> Self {
        TypeRef {
            name: T::type_name(),
            describe: T::describe,
            map: map_erased::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn describe(&self) -> TypeDescriptor {
        (self.describe)()
    }

    /// Maps `source` into a fresh instance of the referenced type.
    pub fn map(&self, mapper: &ObjectMapper, source: Mapping) -> Result<Instance, MapError> {
        (self.map)(mapper, source)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name).finish()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

fn map_erased<T: Describe>(mapper: &ObjectMapper, source: Mapping) -> Result<Instance, MapError> {
    let instance = mapper.map_mapping(source, T::allocate())?;
    Ok(Instance::owned(T::type_name(), instance))
}

/// An opaque value type that is not mapped field by field.
///
/// Custom types behave like scalars during resolution but may carry a
/// type-level caster binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomType {
    pub name: &'static str,
    pub caster: Option<CasterBinding>,
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    Scalar(ScalarKind),
    Object(TypeRef),
    /// A list whose element type was declared with the `elements` annotation.
    List(Box<DeclaredType>),
    Custom(CustomType),
}

impl DeclaredType {
    pub fn list_of(element: DeclaredType) -> Self {
        DeclaredType::List(Box::new(element))
    }

    /// True for scalar and custom types, which never trigger recursive mapping.
    pub fn is_builtin(&self) -> bool {
        matches!(self, DeclaredType::Scalar(_) | DeclaredType::Custom(_))
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            DeclaredType::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// The referenced type when this is an object type.
    pub fn object(&self) -> Option<&TypeRef> {
        match self {
            DeclaredType::Object(type_ref) => Some(type_ref),
            _ => None,
        }
    }

    /// The element type when this is an annotated list of objects.
    pub fn element_object(&self) -> Option<&TypeRef> {
        match self {
            DeclaredType::List(element) => element.object(),
            _ => None,
        }
    }

    /// Caster bound to the declared type itself.
    pub fn type_binding(&self) -> Option<CasterBinding> {
        match self {
            DeclaredType::Object(type_ref) => type_ref.describe().caster(),
            DeclaredType::Custom(custom) => custom.caster,
            DeclaredType::Scalar(_) | DeclaredType::List(_) => None,
        }
    }

    /// Human-readable name, e.g. `integer`, `Book` or `list of Book`.
    pub fn name(&self) -> String {
        match self {
            DeclaredType::Scalar(kind) => kind.name().to_string(),
            DeclaredType::Object(type_ref) => type_ref.name().to_string(),
            DeclaredType::List(element) => format!("list of {}", element.name()),
            DeclaredType::Custom(custom) => custom.name.to_string(),
        }
    }
}

/// Where a field's default value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultSource {
    #[default]
    None,
    /// The field declares its own default.
    Declared,
    /// The type allocates through its `Default` impl, which covers every field.
    Constructor,
}

/// Describes one field of a target type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: &'static str,
    declared: DeclaredType,
    caster: Option<CasterBinding>,
    default: DefaultSource,
    date_format: Option<&'static str>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, declared: DeclaredType) -> Self {
        FieldDescriptor {
            name,
            declared,
            caster: None,
            default: DefaultSource::None,
            date_format: None,
        }
    }

    /// Binds a caster directly to this field.
    pub fn with_caster(mut self, caster: CasterBinding) -> Self {
        self.caster = Some(caster);
        self
    }

    pub fn with_default(mut self, default: DefaultSource) -> Self {
        self.default = default;
        self
    }

    /// Format description used by the built-in date/time caster.
    pub fn with_date_format(mut self, format: &'static str) -> Self {
        self.date_format = Some(format);
        self
    }

    /// The source key this field is read from.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declared(&self) -> &DeclaredType {
        &self.declared
    }

    pub fn caster(&self) -> Option<CasterBinding> {
        self.caster
    }

    pub fn default_source(&self) -> DefaultSource {
        self.default
    }

    pub fn has_default(&self) -> bool {
        self.default != DefaultSource::None
    }

    pub fn date_format(&self) -> Option<&'static str> {
        self.date_format
    }
}

/// Describes a target type: its name, fields and type-level caster.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    caster: Option<CasterBinding>,
}

impl TypeDescriptor {
    pub fn new(name: &'static str) -> Self {
        TypeDescriptor {
            name,
            fields: Vec::new(),
            caster: None,
        }
    }

    /// Appends a field. Call order is declaration order.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Binds a caster to the type. It applies to every field declared with
    /// this type that has no field-level binding.
    pub fn with_caster(mut self, caster: CasterBinding) -> Self {
        self.caster = Some(caster);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn caster(&self) -> Option<CasterBinding> {
        self.caster
    }
}
