use crate::device::{AttributeValue, DeviceSpec};
use serde::{Deserialize, Serialize};
use std::fmt;


/// Comparison operator of an attribute filter.
///
/// `eq` is valid for every attribute type; the ordering operators apply to
/// numeric attributes only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Eq => "eq",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
        };
        f.write_str(name)
    }
}

/// Comparison value, typed when the filter is parsed. A value that fits
/// none of these classes fails deserialization and never reaches matching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    Boolean(bool),
}

/// A single typed predicate over one device attribute.
///
/// Wire shape: `{"operator": "eq", "value": 50, "key": "brightness"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub operator: Operator,
    pub value: FilterValue,
    pub key: String,
}

/// Terminal filter evaluation errors. Any of these aborts the enclosing
/// query rather than degrading to a non-match.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// An ordering operator applied to a non-numeric attribute.
    UnsupportedOperator { operator: Operator, kind: &'static str },
    /// The attribute's active value and the filter value are of different
    /// type classes.
    TypeMismatch { key: String },
    /// `attribute.subkey` identifiers are reserved for structured attribute
    /// values, which the cache does not model.
    CompositeKeyUnsupported { key: String },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::UnsupportedOperator { operator, kind } => {
                write!(f, "operator '{}' is not supported for {} attributes", operator, kind)
            }
            FilterError::TypeMismatch { key } => {
                write!(f, "filter value type does not match attribute '{}'", key)
            }
            FilterError::CompositeKeyUnsupported { key } => {
                write!(f, "composite keys are not supported: '{}'", key)
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Evaluates `filters` as a conjunction against `device`.
///
/// Every filter is evaluated in order; the result is the logical AND of the
/// individual results. Evaluation stops early only on the first `false` or
/// the first terminal error. An empty filter set matches every device.
pub fn matches(device: &DeviceSpec, filters: &[AttributeFilter]) -> Result<bool, FilterError> {
    for filter in filters {
        if !matches_filter(device, filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_filter(device: &DeviceSpec, filter: &AttributeFilter) -> Result<bool, FilterError> {
    if filter.key.contains('.') {
        return Err(FilterError::CompositeKeyUnsupported {
            key: filter.key.clone(),
        });
    }

    let Some(attribute) = device.attributes.get(filter.key.as_str()) else {
        // A device without the attribute never satisfies a predicate on it.
        return Ok(false);
    };
    let Some(value) = &attribute.state.value else {
        // Same for an attribute with no current value.
        return Ok(false);
    };

    match (value, &filter.value) {
        (AttributeValue::Numeric(have), FilterValue::Number(want)) => {
            Ok(compare_numeric(*have, *want, filter.operator))
        }
        (AttributeValue::Text(have), FilterValue::Text(want)) => match filter.operator {
            Operator::Eq => Ok(have == want),
            operator => Err(FilterError::UnsupportedOperator {
                operator,
                kind: "text",
            }),
        },
        (AttributeValue::Boolean(have), FilterValue::Boolean(want)) => match filter.operator {
            Operator::Eq => Ok(*have == *want),
            operator => Err(FilterError::UnsupportedOperator {
                operator,
                kind: "boolean",
            }),
        },
        _ => Err(FilterError::TypeMismatch {
            key: filter.key.clone(),
        }),
    }
}

fn compare_numeric(have: f64, want: f64, operator: Operator) -> bool {
    match operator {
        Operator::Eq => have == want,
        Operator::Lt => have < want,
        Operator::Lte => have <= want,
        Operator::Gt => have > want,
        Operator::Gte => have >= want,
    }
}
