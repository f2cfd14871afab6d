use std::fmt;

/// Post-construction checks a type can express about itself.
///
/// `#[derive(Describe)]` implements this with no violations unless the struct
/// names a check function through `#[ligand(validate = path)]`.
pub trait Validate {
    fn violations(&self) -> Vec<Violation> {
        Vec::new()
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Violation {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed for {type_name}: {}", join(.violations))]
pub struct ValidationError {
    pub type_name: &'static str,
    pub violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validation collaborator, invoked once per populated instance.
pub trait Validator: Send + Sync {
    fn validate(&self, type_name: &'static str, instance: &dyn Validate) -> Result<(), ValidationError>;
}

/// Fails when the instance reports any [`Violation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl Validator for RuleValidator {
    fn validate(&self, type_name: &'static str, instance: &dyn Validate) -> Result<(), ValidationError> {
        let violations = instance.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                type_name,
                violations,
            })
        }
    }
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, _type_name: &'static str, _instance: &dyn Validate) -> Result<(), ValidationError> {
        Ok(())
    }
}
