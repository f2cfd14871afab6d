use std::sync::Arc;

use log::trace;

use crate::caster::Caster;
use crate::casters::{BooleanCaster, DateTimeCaster, FloatCaster, IntegerCaster};
use crate::container::Injector;
use crate::descriptor::{FieldDescriptor, ScalarKind};
use crate::error::MapError;

/// Resolves the caster for a field.
///
/// Precedence, first match wins:
/// 1. caster bound to the field,
/// 2. caster bound to the field's declared type,
/// 3. built-in caster for integer, float, boolean and date/time kinds,
/// 4. none, meaning the raw value passes through.
#[derive(Clone)]
pub struct CasterRegistry {
    injector: Arc<dyn Injector>,
}

impl CasterRegistry {
    pub fn new(injector: Arc<dyn Injector>) -> Self {
        CasterRegistry { injector }
    }

    pub fn resolve(&self, field: &FieldDescriptor) -> Result<Option<Arc<dyn Caster>>, MapError> {
        let binding = field.caster().or_else(|| field.declared().type_binding());
        if let Some(binding) = binding {
            trace!("field `{}` casts with {}", field.name(), binding.name());
            return Ok(Some(self.injector.resolve(&binding)?));
        }
        builtin(field)
    }
}

fn builtin(field: &FieldDescriptor) -> Result<Option<Arc<dyn Caster>>, MapError> {
    let Some(kind) = field.declared().scalar_kind() else {
        return Ok(None);
    };
    let caster: Arc<dyn Caster> = match kind {
        ScalarKind::Integer => Arc::new(IntegerCaster),
        ScalarKind::Float => Arc::new(FloatCaster),
        ScalarKind::Boolean => Arc::new(BooleanCaster),
        ScalarKind::DateTime => match field.date_format() {
            Some(format) => Arc::new(DateTimeCaster::with_format(format).map_err(|source| {
                MapError::DateFormat {
                    field: field.name(),
                    source,
                }
            })?),
            None => Arc::new(DateTimeCaster::new()),
        },
        ScalarKind::String | ScalarKind::List | ScalarKind::Map | ScalarKind::Mixed => {
            return Ok(None);
        }
    };
    Ok(Some(caster))
}
