use std::sync::{Arc, Weak};

use log::{debug, trace};

use crate::caster::Caster;
use crate::config::MapperConfig;
use crate::container::{Container, Injector};
use crate::descriptor::{Describe, FieldDescriptor, TypeDescriptor, TypeRef};
use crate::error::{MapError, MissingValues};
use crate::registry::CasterRegistry;
use crate::types::TypeRegistry;
use crate::unwrap::unwrap;
use crate::validate::{RuleValidator, Validator};
use crate::value::{Instance, Mapping, Value};

/// Outcome of one resolution strategy for a field.
#[derive(Debug, Clone, PartialEq)]
enum Resolution {
    /// The strategy does not apply; try the next one.
    NotApplicable,
    Resolved(Value),
}

impl Resolution {
    fn or_else(
        self,
        next: impl FnOnce() -> Result<Resolution, MapError>,
    ) -> Result<Resolution, MapError> {
        match self {
            Resolution::NotApplicable => next(),
            resolved => Ok(resolved),
        }
    }
}

/// Maps loosely-typed [`Value`] maps onto [`Describe`] types.
///
/// For every described field, in declaration order, the mapper looks up the
/// source key and tries three strategies:
/// 1. **object**: an object-typed field given a map is mapped recursively,
/// 2. **list of objects**: a list annotated with an object element type has
///    each map element mapped recursively,
/// 3. **cast**: the field's caster is applied, or the value passes through.
///
/// Nested maps receive the parent instance under the inverse-relation keys
/// configured in [`RelationNaming`](crate::RelationNaming), so a child field
/// named after the parent type gets a back reference without the caller
/// providing it.
///
/// Fields absent from the source are collected and reported together in a
/// single [`MissingValues`] error. Validation runs only after every field was
/// populated. Failures are never rolled back: the partially populated instance
/// is simply dropped.
///
/// The mapper holds no per-call state and can be shared between threads.
pub struct ObjectMapper {
    config: MapperConfig,
    casters: CasterRegistry,
    validator: Arc<dyn Validator>,
    types: TypeRegistry,
}

impl ObjectMapper {
    /// Creates a mapper with the default config, an empty [`Container`] and
    /// the [`RuleValidator`].
    pub fn new() -> Self {
        ObjectMapper {
            config: MapperConfig::default(),
            casters: CasterRegistry::new(Arc::new(Container::new())),
            validator: Arc::new(RuleValidator),
            types: TypeRegistry::new(),
        }
    }

    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `injector` to materialise user-defined casters.
    pub fn with_injector(mut self, injector: impl Injector + 'static) -> Self {
        self.casters = CasterRegistry::new(Arc::new(injector));
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Makes `T` available to [`ObjectMapper::map_named`].
    pub fn register<T: Describe>(mut self) -> Self {
        self.types.register::<T>();
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Returns true if `source` can be mapped onto `T`.
    pub fn can_map<T: Describe>(&self, source: &Value) -> bool {
        source.is_map()
    }

    /// Returns true if `source` is a map and `type_name` is registered.
    pub fn can_map_named(&self, source: &Value, type_name: &str) -> bool {
        source.is_map() && self.types.contains(type_name)
    }

    /// Maps `source` onto a freshly allocated `T`.
    pub fn map<T: Describe>(&self, source: Value) -> Result<Arc<T>, MapError> {
        let source = expect_mapping(source, T::type_name())?;
        self.map_mapping(source, T::allocate())
    }

    /// Maps `source` onto an existing instance, overwriting the fields present
    /// in the source.
    pub fn map_into<T: Describe>(&self, source: Value, target: T) -> Result<Arc<T>, MapError> {
        let source = expect_mapping(source, T::type_name())?;
        self.map_mapping(source, target)
    }

    /// Maps `source` onto the registered type called `type_name`.
    pub fn map_named(&self, source: Value, type_name: &str) -> Result<Instance, MapError> {
        let type_ref = self
            .types
            .get(type_name)
            .ok_or_else(|| MapError::UnknownType(type_name.to_string()))?;
        let source = expect_mapping(source, type_ref.name())?;
        type_ref.map(self, source)
    }

    pub(crate) fn map_mapping<T: Describe>(&self, source: Mapping, target: T) -> Result<Arc<T>, MapError> {
        let descriptor = T::describe();
        let source = if self.config.unwrap_keys {
            unwrap(source, &self.config.key_delimiter)
        } else {
            source
        };
        debug!("mapping {} from {} keys", descriptor.name(), source.len());

        // Allocated cyclically so nested objects can hold a weak pointer to
        // the instance while it is still being populated.
        let mut populated = Ok(());
        let instance = Arc::new_cyclic(|this: &Weak<T>| {
            let mut target = target;
            let parent = Instance::parent(descriptor.name(), Weak::clone(this));
            populated = self.populate(&mut target, &descriptor, &source, &parent);
            target
        });
        populated?;

        self.validator.validate(descriptor.name(), instance.as_ref())?;
        debug!("mapped {}", descriptor.name());
        Ok(instance)
    }

    fn populate<T: Describe>(
        &self,
        target: &mut T,
        descriptor: &TypeDescriptor,
        source: &Mapping,
        parent: &Instance,
    ) -> Result<(), MapError> {
        let mut missing = Vec::new();

        for field in descriptor.fields() {
            let Some(raw) = source.get(field.name()) else {
                if !field.has_default() {
                    missing.push(field.name());
                }
                continue;
            };

            let caster = self.casters.resolve(field)?;
            let value = self.resolve(raw, field, caster.as_deref(), descriptor, parent)?;
            target
                .assign(field.name(), value)
                .map_err(|source| MapError::cast(descriptor.name(), field.name(), source))?;
        }

        if !missing.is_empty() {
            debug!("{} is missing {:?}", descriptor.name(), missing);
            return Err(MissingValues::new(descriptor.name(), missing).into());
        }
        Ok(())
    }

    fn resolve(
        &self,
        raw: &Value,
        field: &FieldDescriptor,
        caster: Option<&dyn Caster>,
        declaring: &TypeDescriptor,
        parent: &Instance,
    ) -> Result<Value, MapError> {
        let resolution = self
            .resolve_object(raw, field, caster, declaring, parent)?
            .or_else(|| self.resolve_list(raw, field, caster, declaring, parent))?;

        match resolution {
            Resolution::Resolved(value) => Ok(value),
            Resolution::NotApplicable => {
                trace!("{}.{}: cast", declaring.name(), field.name());
                cast(raw.clone(), field, caster, declaring)
            }
        }
    }

    fn resolve_object(
        &self,
        raw: &Value,
        field: &FieldDescriptor,
        caster: Option<&dyn Caster>,
        declaring: &TypeDescriptor,
        parent: &Instance,
    ) -> Result<Resolution, MapError> {
        let (Some(type_ref), Value::Map(data)) = (field.declared().object(), raw) else {
            return Ok(Resolution::NotApplicable);
        };
        trace!("{}.{}: object {}", declaring.name(), field.name(), type_ref.name());

        let input = self.with_relation_hints(data, declaring.name(), parent);
        let value = self.map_nested(type_ref, input, field, caster, declaring)?;
        Ok(Resolution::Resolved(value))
    }

    fn resolve_list(
        &self,
        raw: &Value,
        field: &FieldDescriptor,
        caster: Option<&dyn Caster>,
        declaring: &TypeDescriptor,
        parent: &Instance,
    ) -> Result<Resolution, MapError> {
        let (Some(type_ref), Value::List(items)) = (field.declared().element_object(), raw) else {
            return Ok(Resolution::NotApplicable);
        };
        trace!(
            "{}.{}: {} elements of {}",
            declaring.name(),
            field.name(),
            items.len(),
            type_ref.name()
        );

        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let value = match item {
                Value::Map(data) => {
                    let input = self.with_relation_hints(data, declaring.name(), parent);
                    self.map_nested(type_ref, input, field, caster, declaring)?
                }
                other => cast(other.clone(), field, caster, declaring)?,
            };
            values.push(value);
        }
        Ok(Resolution::Resolved(Value::List(values)))
    }

    fn map_nested(
        &self,
        type_ref: &TypeRef,
        input: Mapping,
        field: &FieldDescriptor,
        caster: Option<&dyn Caster>,
        declaring: &TypeDescriptor,
    ) -> Result<Value, MapError> {
        let input = match caster {
            Some(caster) => {
                let prepared = caster
                    .cast(Value::Map(input.clone()))
                    .map_err(|source| MapError::cast(declaring.name(), field.name(), source))?;
                match prepared {
                    Value::Null => input,
                    prepared => expect_mapping(prepared, type_ref.name())?,
                }
            }
            None => input,
        };
        type_ref.map(self, input).map(Value::Object)
    }

    /// Layers `data` over the inverse-relation hints for `declaring`.
    ///
    /// Hint keys come first; a key present in `data` overwrites the hint value
    /// while keeping its position.
    fn with_relation_hints(&self, data: &Mapping, declaring: &'static str, parent: &Instance) -> Mapping {
        let naming = &self.config.relations;
        if !naming.inject {
            return data.clone();
        }

        let mut input = Mapping::with_capacity(data.len() + 2);
        input.insert(naming.one(declaring), Value::Object(parent.clone()));
        input.insert(
            naming.many(declaring),
            Value::List(vec![Value::Object(parent.clone())]),
        );
        for (key, value) in data {
            input.insert(key.clone(), value.clone());
        }
        input
    }
}

impl Default for ObjectMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the field's caster. A caster answering `Null` keeps the raw value.
fn cast(
    raw: Value,
    field: &FieldDescriptor,
    caster: Option<&dyn Caster>,
    declaring: &TypeDescriptor,
) -> Result<Value, MapError> {
    let Some(caster) = caster else {
        return Ok(raw);
    };
    match caster.cast(raw.clone()) {
        Ok(Value::Null) => Ok(raw),
        Ok(value) => Ok(value),
        Err(source) => Err(MapError::cast(declaring.name(), field.name(), source)),
    }
}

fn expect_mapping(source: Value, type_name: &'static str) -> Result<Mapping, MapError> {
    match source {
        Value::Map(map) => Ok(map),
        other => Err(MapError::NotAMapping {
            type_name,
            found: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caster::CasterBinding;
    use crate::descriptor::{DeclaredType, DefaultSource, ScalarKind};
    use crate::error::CastError;
    use crate::slot::Slot;
    use crate::validate::{NoopValidator, Validate, Violation};
    use serde_json::json;

    fn source(json: serde_json::Value) -> Value {
        serde_json::from_value(json).unwrap()
    }

    /// Hand-written descriptor, the way generated code looks.
    #[derive(Debug)]
    struct Point {
        x: i64,
        y: i64,
        label: String,
    }

    impl Validate for Point {
        fn violations(&self) -> Vec<Violation> {
            if self.label == "invalid" {
                vec![Violation::field("label", "must not be `invalid`")]
            } else {
                Vec::new()
            }
        }
    }

    impl Describe for Point {
        fn type_name() -> &'static str {
            "Point"
        }

        fn describe() -> TypeDescriptor {
            TypeDescriptor::new("Point")
                .field(FieldDescriptor::new("x", i64::declared()))
                .field(FieldDescriptor::new("y", i64::declared()))
                .field(
                    FieldDescriptor::new("label", String::declared())
                        .with_default(DefaultSource::Declared),
                )
        }

        fn allocate() -> Self {
            Point {
                x: 0,
                y: 0,
                label: "origin".to_string(),
            }
        }

        fn assign(&mut self, field: &str, value: Value) -> Result<(), CastError> {
            match field {
                "x" => self.x = Slot::from_value(value)?,
                "y" => self.y = Slot::from_value(value)?,
                "label" => self.label = Slot::from_value(value)?,
                _ => return Err(CastError::UnknownField(field.to_string())),
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Segment {
        from: Arc<Point>,
        to: Option<Arc<Point>>,
        tags: Vec<Value>,
    }

    impl Validate for Segment {}

    impl Describe for Segment {
        fn type_name() -> &'static str {
            "Segment"
        }

        fn describe() -> TypeDescriptor {
            TypeDescriptor::new("Segment")
                .field(FieldDescriptor::new("from", Arc::<Point>::declared()))
                .field(
                    FieldDescriptor::new("to", Option::<Arc<Point>>::declared())
                        .with_default(DefaultSource::Declared),
                )
                .field(
                    FieldDescriptor::new("tags", DeclaredType::Scalar(ScalarKind::List))
                        .with_default(DefaultSource::Declared),
                )
        }

        fn allocate() -> Self {
            Segment {
                from: Slot::vacant(),
                to: None,
                tags: Vec::new(),
            }
        }

        fn assign(&mut self, field: &str, value: Value) -> Result<(), CastError> {
            match field {
                "from" => self.from = Slot::from_value(value)?,
                "to" => self.to = Slot::from_value(value)?,
                "tags" => self.tags = Slot::from_value(value)?,
                _ => return Err(CastError::UnknownField(field.to_string())),
            }
            Ok(())
        }
    }

    #[test]
    fn maps_flat_object_with_builtin_casts() {
        let mapper = ObjectMapper::new();
        let point: Arc<Point> = mapper.map(source(json!({"x": "3", "y": 4.0}))).unwrap();
        assert_eq!(point.x, 3);
        assert_eq!(point.y, 4);
        assert_eq!(point.label, "origin");
    }

    #[test]
    fn reports_all_missing_fields_in_order() {
        let mapper = ObjectMapper::new();
        let err = mapper.map::<Point>(source(json!({"label": "a"}))).unwrap_err();
        let missing = err.missing_values().unwrap();
        assert_eq!(missing.type_name(), "Point");
        assert_eq!(missing.fields(), &["x", "y"]);
    }

    #[test]
    fn missing_values_skip_validation() {
        // "invalid" would fail validation, but the missing field wins.
        let mapper = ObjectMapper::new();
        let err = mapper
            .map::<Point>(source(json!({"x": 1, "label": "invalid"})))
            .unwrap_err();
        assert!(matches!(err, MapError::MissingValues(_)));
    }

    #[test]
    fn validation_runs_after_population() {
        let mapper = ObjectMapper::new();
        let err = mapper
            .map::<Point>(source(json!({"x": 1, "y": 2, "label": "invalid"})))
            .unwrap_err();
        match err {
            MapError::Validation(err) => {
                assert_eq!(err.type_name, "Point");
                assert_eq!(err.violations[0].field.as_deref(), Some("label"));
            }
            other => panic!("expected validation error, got {other}"),
        }

        let lenient = ObjectMapper::new().with_validator(NoopValidator);
        let point = lenient
            .map::<Point>(source(json!({"x": 1, "y": 2, "label": "invalid"})))
            .unwrap();
        assert_eq!(point.label, "invalid");
    }

    #[test]
    fn cast_errors_abort_immediately() {
        let mapper = ObjectMapper::new();
        let err = mapper.map::<Point>(source(json!({"x": "three"}))).unwrap_err();
        assert!(matches!(
            err,
            MapError::Cast {
                type_name: "Point",
                field: "x",
                ..
            }
        ));
    }

    #[test]
    fn map_into_overwrites_existing_instance() {
        let mapper = ObjectMapper::new();
        let existing = Point {
            x: 10,
            y: 20,
            label: "kept".to_string(),
        };
        let point = mapper.map_into(source(json!({"x": 1, "y": 2})), existing).unwrap();
        assert_eq!((point.x, point.y), (1, 2));
        assert_eq!(point.label, "kept");
    }

    #[test]
    fn rejects_non_map_sources() {
        let mapper = ObjectMapper::new();
        assert!(!mapper.can_map::<Point>(&source(json!([1, 2]))));
        assert!(mapper.can_map::<Point>(&source(json!({}))));
        let err = mapper.map::<Point>(source(json!("x"))).unwrap_err();
        assert!(matches!(
            err,
            MapError::NotAMapping {
                type_name: "Point",
                found: "string"
            }
        ));
    }

    #[test]
    fn nested_objects_are_mapped_recursively() {
        let mapper = ObjectMapper::new();
        let segment: Arc<Segment> = mapper
            .map(source(json!({
                "from": {"x": 1, "y": 2},
                "to": {"x": "3", "y": "4", "label": "end"},
            })))
            .unwrap();
        assert_eq!((segment.from.x, segment.from.y), (1, 2));
        let to = segment.to.as_ref().unwrap();
        assert_eq!(to.label, "end");
        assert_eq!(to.x, 3);
    }

    #[test]
    fn nested_missing_values_propagate() {
        let mapper = ObjectMapper::new();
        let err = mapper
            .map::<Segment>(source(json!({"from": {"x": 1}})))
            .unwrap_err();
        let missing = err.missing_values().unwrap();
        assert_eq!(missing.type_name(), "Point");
        assert_eq!(missing.fields(), &["y"]);
    }

    #[test]
    fn null_nested_object_passes_through() {
        let mapper = ObjectMapper::new();
        let segment: Arc<Segment> = mapper
            .map(source(json!({"from": {"x": 0, "y": 0}, "to": null})))
            .unwrap();
        assert!(segment.to.is_none());
    }

    #[test]
    fn unannotated_lists_pass_through_verbatim() {
        let mapper = ObjectMapper::new();
        let segment: Arc<Segment> = mapper
            .map(source(json!({
                "from": {"x": 0, "y": 0},
                "tags": [{"x": 1}, "plain"],
            })))
            .unwrap();
        assert_eq!(segment.tags.len(), 2);
        assert!(segment.tags[0].is_map());
        assert_eq!(segment.tags[1], Value::from("plain"));
    }

    #[test]
    fn dotted_keys_are_unwrapped() {
        let mapper = ObjectMapper::new();
        let segment: Arc<Segment> = mapper
            .map(source(json!({"from.x": 5, "from.y": 6})))
            .unwrap();
        assert_eq!((segment.from.x, segment.from.y), (5, 6));
    }

    #[test]
    fn unwrapping_can_be_disabled() {
        let config = MapperConfig {
            unwrap_keys: false,
            ..MapperConfig::default()
        };
        let mapper = ObjectMapper::new().with_config(config);
        let err = mapper
            .map::<Segment>(source(json!({"from.x": 5, "from.y": 6})))
            .unwrap_err();
        assert_eq!(err.missing_values().unwrap().fields(), &["from"]);
    }

    #[test]
    fn field_caster_sees_merged_input() {
        #[derive(Default)]
        struct Centered;

        impl Caster for Centered {
            fn cast(&self, value: Value) -> Result<Value, CastError> {
                let Value::Map(mut map) = value else {
                    return Err(CastError::invalid("map", &value));
                };
                // the hint keys are visible to the caster
                assert!(map.contains_key("wrapper"));
                map.insert("x".into(), Value::Int(0));
                map.insert("y".into(), Value::Int(0));
                Ok(Value::Map(map))
            }
        }

        struct Wrapper {
            inner: Arc<Point>,
        }

        impl Validate for Wrapper {}

        impl Describe for Wrapper {
            fn type_name() -> &'static str {
                "Wrapper"
            }

            fn describe() -> TypeDescriptor {
                TypeDescriptor::new("Wrapper").field(
                    FieldDescriptor::new("inner", Arc::<Point>::declared())
                        .with_caster(CasterBinding::of::<Centered>()),
                )
            }

            fn allocate() -> Self {
                Wrapper { inner: Slot::vacant() }
            }

            fn assign(&mut self, field: &str, value: Value) -> Result<(), CastError> {
                match field {
                    "inner" => self.inner = Slot::from_value(value)?,
                    _ => return Err(CastError::UnknownField(field.to_string())),
                }
                Ok(())
            }
        }

        let mapper = ObjectMapper::new();
        let wrapper: Arc<Wrapper> = mapper.map(source(json!({"inner": {"label": "c"}}))).unwrap();
        assert_eq!((wrapper.inner.x, wrapper.inner.y), (0, 0));
        assert_eq!(wrapper.inner.label, "c");
    }

    #[test]
    fn null_from_caster_keeps_raw_value() {
        #[derive(Default)]
        struct Nullify;

        impl Caster for Nullify {
            fn cast(&self, _value: Value) -> Result<Value, CastError> {
                Ok(Value::Null)
            }
        }

        struct Tagged {
            label: String,
            inner: Arc<Point>,
            tags: Vec<Value>,
        }

        impl Validate for Tagged {}

        impl Describe for Tagged {
            fn type_name() -> &'static str {
                "Tagged"
            }

            fn describe() -> TypeDescriptor {
                let nullify = CasterBinding::of::<Nullify>();
                TypeDescriptor::new("Tagged")
                    .field(FieldDescriptor::new("label", String::declared()).with_caster(nullify))
                    .field(FieldDescriptor::new("inner", Arc::<Point>::declared()).with_caster(nullify))
                    .field(
                        FieldDescriptor::new("tags", DeclaredType::list_of(Arc::<Point>::declared()))
                            .with_caster(nullify)
                            .with_default(DefaultSource::Declared),
                    )
            }

            fn allocate() -> Self {
                Tagged {
                    label: Slot::vacant(),
                    inner: Slot::vacant(),
                    tags: Vec::new(),
                }
            }

            fn assign(&mut self, field: &str, value: Value) -> Result<(), CastError> {
                match field {
                    "label" => self.label = Slot::from_value(value)?,
                    "inner" => self.inner = Slot::from_value(value)?,
                    "tags" => self.tags = Slot::from_value(value)?,
                    _ => return Err(CastError::UnknownField(field.to_string())),
                }
                Ok(())
            }
        }

        let mapper = ObjectMapper::new();
        let tagged: Arc<Tagged> = mapper
            .map(source(json!({
                "label": "raw",
                "inner": {"x": 1, "y": 2},
                "tags": ["plain", {"x": 3, "y": 4}],
            })))
            .unwrap();
        assert_eq!(tagged.label, "raw");
        assert_eq!((tagged.inner.x, tagged.inner.y), (1, 2));
        assert_eq!(tagged.tags[0], Value::from("plain"));
        let mapped = tagged.tags[1].as_object().unwrap().downcast::<Point>().unwrap();
        assert_eq!(mapped.x, 3);
    }

    #[test]
    fn named_mapping_uses_registry() {
        let mapper = ObjectMapper::new().register::<Point>();
        assert!(mapper.can_map_named(&source(json!({})), "Point"));
        assert!(!mapper.can_map_named(&source(json!({})), "Line"));
        assert_eq!(mapper.types().names().collect::<Vec<_>>(), ["Point"]);

        let instance = mapper.map_named(source(json!({"x": 1, "y": 2})), "Point").unwrap();
        assert_eq!(instance.type_name(), "Point");
        assert_eq!(instance.downcast::<Point>().unwrap().y, 2);

        let err = mapper.map_named(source(json!({})), "Line").unwrap_err();
        assert!(matches!(err, MapError::UnknownType(name) if name == "Line"));
    }

    #[test]
    fn resolution_or_else_short_circuits() {
        let resolved = Resolution::Resolved(Value::Int(1))
            .or_else(|| panic!("must not run"))
            .unwrap();
        assert_eq!(resolved, Resolution::Resolved(Value::Int(1)));

        let next = Resolution::NotApplicable
            .or_else(|| Ok(Resolution::Resolved(Value::Null)))
            .unwrap();
        assert_eq!(next, Resolution::Resolved(Value::Null));
    }
}
