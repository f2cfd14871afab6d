//! Ligand maps loosely-typed key/value data onto strongly-typed object graphs.
//!
//! Core concepts:
//! - **Value**: a dynamic tree of scalars, lists and maps, usually decoded with serde
//! - **Describe**: a type the mapper can populate, with a descriptor listing its fields
//! - **Caster**: converts a raw value into the representation a field expects
//! - **Backref**: a field pointing back at the object that contains it
//! - **ObjectMapper**: walks the descriptor, resolves every field and validates the result
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ligand_core::{Backref, Describe, ObjectMapper, Value};
//!
//! #[derive(Debug, Describe)]
//! struct Author {
//!     name: String,
//!     #[ligand(elements = Arc<Book>)]
//!     books: Vec<Arc<Book>>,
//! }
//!
//! #[derive(Debug, Describe)]
//! struct Book {
//!     title: String,
//!     author: Backref<Author>,
//! }
//!
//! let source: Value = serde_json::from_str(r#"{
//!     "name": "Brent",
//!     "books": [{"title": "Timeline Taxi"}]
//! }"#)?;
//!
//! let author: Arc<Author> = ObjectMapper::new().map(source)?;
//! assert!(author.books[0].author.points_to(&author));
//! ```

mod backref;
mod caster;
mod casters;
mod config;
mod container;
mod descriptor;
mod error;
mod mapper;
mod registry;
mod slot;
mod types;
mod unwrap;
mod validate;
mod value;

pub use backref::Backref;
pub use caster::{Caster, CasterBinding};
pub use casters::{BooleanCaster, DateFormat, DateTimeCaster, FloatCaster, IntegerCaster};
pub use config::{ConfigError, MapperConfig, NamingCase, RelationNaming};
pub use container::{Container, InjectionError, Injector};
pub use descriptor::{
    CustomType, DeclaredType, DefaultSource, Describe, FieldDescriptor, ScalarKind, TypeDescriptor,
    TypeRef,
};
pub use error::{CastError, MapError, MissingValues};
pub use mapper::ObjectMapper;
pub use registry::CasterRegistry;
pub use slot::Slot;
pub use types::TypeRegistry;
pub use unwrap::unwrap;
pub use validate::{NoopValidator, RuleValidator, Validate, ValidationError, Validator, Violation};
pub use value::{Instance, Mapping, Value};

#[cfg(feature = "derive")]
pub use ligand_derive::Describe;
