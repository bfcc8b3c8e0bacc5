use crate::error::Issue;
use crate::types::{InfoType, MISSING};

/// A single typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The missing-value marker `.`
    Missing,
    Integer(i32),
    Float(f32),
    Character(char),
    String(String),
    Flag(bool),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn flag(&self) -> bool {
        matches!(self, Value::Flag(true))
    }
}

/// Converts a raw token into a [`Value`] of the given type.
///
/// The missing-value marker always yields [`Value::Missing`]. A Flag has no value of its own:
/// any token for a Flag field means the flag is set. The error is the reason only; see
/// [`coerce_or_missing`] for the recovering variant that reports it as an [`Issue`].
///
/// # Examples
///
/// ```
/// use rust_vcf_decode::record::value::{coerce, Value};
/// use rust_vcf_decode::types::InfoType;
///
/// assert_eq!(coerce("14", InfoType::Integer), Ok(Value::Integer(14)));
/// assert_eq!(coerce(".", InfoType::Float), Ok(Value::Missing));
/// assert!(coerce("x", InfoType::Integer).is_err());
/// ```
pub fn coerce(token: &str, kind: InfoType) -> Result<Value, String> {
    if token == MISSING {
        return Ok(Value::Missing);
    }
    match kind {
        InfoType::Integer => token
            .parse()
            .map(Value::Integer)
            .map_err(|e| format!("not an Integer: {}", e)),
        InfoType::Float => token
            .parse()
            .map(Value::Float)
            .map_err(|e| format!("not a Float: {}", e)),
        InfoType::Character => {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Character(c)),
                _ => Err("not a single Character".into()),
            }
        }
        InfoType::String => Ok(Value::String(token.into())),
        InfoType::Flag => Ok(Value::Flag(true)),
    }
}

/// Coerces the token of field `field`, as the record decoder does.
///
/// A token that does not parse is recorded as [`Issue::InvalidFieldValue`], carrying the field
/// identifier and the token, and decodes to [`Value::Missing`].
///
/// # Examples
///
/// ```
/// use rust_vcf_decode::error::Issue;
/// use rust_vcf_decode::record::value::{coerce_or_missing, Value};
/// use rust_vcf_decode::types::InfoType;
///
/// let mut issues = vec![];
/// assert_eq!(coerce_or_missing("DP", "many", InfoType::Integer, &mut issues), Value::Missing);
/// assert!(matches!(
///     &issues[..],
///     [Issue::InvalidFieldValue { field, token, .. }] if field == "DP" && token == "many"
/// ));
/// ```
pub fn coerce_or_missing(
    field: &str,
    token: &str,
    kind: InfoType,
    issues: &mut Vec<Issue>,
) -> Value {
    coerce(token, kind).unwrap_or_else(|reason| {
        issues.push(Issue::InvalidFieldValue {
            field: field.to_owned(),
            token: token.to_owned(),
            reason,
        });
        Value::Missing
    })
}
