use std::fmt::Display;

use crate::container::InjectionError;
use crate::validate::ValidationError;
use crate::value::Value;

/// Error raised when a caster or a field assignment rejects a value.
#[derive(Debug, thiserror::Error)]
pub enum CastError {
    #[error("expected {expected}, found {found}")]
    Invalid {
        expected: &'static str,
        found: &'static str,
    },
    #[error("cannot parse {input:?} as {expected}")]
    Unparsable { expected: &'static str, input: String },
    #[error("{value} is out of range for {expected}")]
    OutOfRange { expected: &'static str, value: String },
    #[error("back reference to {0} is not available as an owned instance, use Backref")]
    PendingBackref(&'static str),
    #[error("no field named `{0}`")]
    UnknownField(String),
    #[error("{0}")]
    Custom(String),
}

impl CastError {
    /// Builds an [`CastError::Invalid`] from the offending value.
    pub fn invalid(expected: &'static str, found: &Value) -> Self {
        CastError::Invalid {
            expected,
            found: found.kind(),
        }
    }

    pub fn unparsable(expected: &'static str, input: impl Into<String>) -> Self {
        CastError::Unparsable {
            expected,
            input: input.into(),
        }
    }

    pub fn out_of_range(expected: &'static str, value: impl Display) -> Self {
        CastError::OutOfRange {
            expected,
            value: value.to_string(),
        }
    }

    /// Error for user-defined casters.
    pub fn custom(message: impl Display) -> Self {
        CastError::Custom(message.to_string())
    }
}

/// Required fields that were absent from the source and have no default.
///
/// Collected over a full pass of the target's fields, so the list is complete
/// and in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing values for {type_name}: {}", .fields.join(", "))]
pub struct MissingValues {
    type_name: &'static str,
    fields: Vec<&'static str>,
}

impl MissingValues {
    pub fn new(type_name: &'static str, fields: Vec<&'static str>) -> Self {
        MissingValues { type_name, fields }
    }

    /// Name of the type that could not be populated.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Missing field names, in declaration order.
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }
}

/// Error type for mapping operations.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    MissingValues(#[from] MissingValues),
    #[error("cannot cast field `{field}` of {type_name}: {source}")]
    Cast {
        type_name: &'static str,
        field: &'static str,
        source: CastError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unknown target type `{0}`")]
    UnknownType(String),
    #[error("{type_name} can only be mapped from a map, found {found}")]
    NotAMapping {
        type_name: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Injection(#[from] InjectionError),
    #[error("invalid date format for field `{field}`: {source}")]
    DateFormat {
        field: &'static str,
        source: time::error::InvalidFormatDescription,
    },
}

impl MapError {
    pub(crate) fn cast(type_name: &'static str, field: &'static str, source: CastError) -> Self {
        MapError::Cast {
            type_name,
            field,
            source,
        }
    }

    /// Returns the missing-values report if this is a [`MapError::MissingValues`].
    pub fn missing_values(&self) -> Option<&MissingValues> {
        match self {
            MapError::MissingValues(missing) => Some(missing),
            _ => None,
        }
    }
}
