//! Built-in casters for integer, float, boolean and date/time fields.
//!
//! All of them pass `Null` through unchanged so optional fields accept nulls.

use time::format_description::OwnedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::caster::Caster;
use crate::error::CastError;
use crate::value::Value;

/// Casts to `i64`. Rejects anything that would lose information.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerCaster;

impl Caster for IntegerCaster {
    fn cast(&self, value: Value) -> Result<Value, CastError> {
        match value {
            Value::Null | Value::Int(_) => Ok(value),
            Value::Float(f) => {
                // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Ok(Value::Int(f as i64))
                } else {
                    Err(CastError::out_of_range("integer", f))
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| CastError::unparsable("integer", s)),
            other => Err(CastError::invalid("integer", &other)),
        }
    }
}

/// Casts to `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCaster;

impl Caster for FloatCaster {
    fn cast(&self, value: Value) -> Result<Value, CastError> {
        match value {
            Value::Null | Value::Float(_) => Ok(value),
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => Err(CastError::unparsable("float", s)),
            },
            other => Err(CastError::invalid("float", &other)),
        }
    }
}

/// Casts to `bool`.
///
/// Accepts `0`/`1` and the strings `true`, `false`, `1`, `0`, `yes`, `no`,
/// `on`, `off` (case-insensitive). The empty string is false.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCaster;

impl Caster for BooleanCaster {
    fn cast(&self, value: Value) -> Result<Value, CastError> {
        match value {
            Value::Null | Value::Bool(_) => Ok(value),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::Int(i) => Err(CastError::out_of_range("boolean", i)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" | "" => Ok(Value::Bool(false)),
                _ => Err(CastError::unparsable("boolean", s)),
            },
            other => Err(CastError::invalid("boolean", &other)),
        }
    }
}

/// Textual format understood by [`DateTimeCaster`].
#[derive(Debug, Clone, Default)]
pub enum DateFormat {
    #[default]
    Rfc3339,
    /// A `time` format description, e.g. `[year]-[month]-[day] [hour]:[minute]`.
    Custom(OwnedFormatItem),
}

impl DateFormat {
    pub fn parse(&self, input: &str) -> Result<OffsetDateTime, time::error::Parse> {
        match self {
            DateFormat::Rfc3339 => OffsetDateTime::parse(input, &Rfc3339),
            DateFormat::Custom(items) => OffsetDateTime::parse(input, items)
                .or_else(|_| PrimitiveDateTime::parse(input, items).map(PrimitiveDateTime::assume_utc))
                .or_else(|_| Date::parse(input, items).map(|date| date.midnight().assume_utc())),
        }
    }
}

/// Casts strings and unix timestamps to an immutable `OffsetDateTime`.
///
/// Custom formats without an offset are read as UTC; date-only formats as
/// midnight UTC.
#[derive(Debug, Clone, Default)]
pub struct DateTimeCaster {
    format: DateFormat,
}

impl DateTimeCaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(description: &str) -> Result<Self, time::error::InvalidFormatDescription> {
        let items = time::format_description::parse_owned::<2>(description)?;
        Ok(DateTimeCaster {
            format: DateFormat::Custom(items),
        })
    }

    pub fn format(&self) -> &DateFormat {
        &self.format
    }
}

impl Caster for DateTimeCaster {
    fn cast(&self, value: Value) -> Result<Value, CastError> {
        match value {
            Value::Null | Value::DateTime(_) => Ok(value),
            Value::Int(ts) => OffsetDateTime::from_unix_timestamp(ts)
                .map(Value::DateTime)
                .map_err(|_| CastError::out_of_range("datetime", ts)),
            Value::String(s) => self
                .format
                .parse(s.trim())
                .map(Value::DateTime)
                .map_err(|_| CastError::unparsable("datetime", s)),
            other => Err(CastError::invalid("datetime", &other)),
        }
    }
}
