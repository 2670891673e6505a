//! Group keys.
//!
//! A [`GroupKey`] is the ordered tuple of group attribute values shared by an
//! entity and the aggregate row computed for it. Entity keys are read by bare
//! attribute name; row keys by bare column name, falling back to the
//! qualified name.
//!
//! Values are normalized before hashing so keys compare the way the database
//! compared them: `Int(10)`, `BigInt(10)`, `Double(10.0)` and
//! `Decimal("10.00")` are the same key, while `Text("10")` is not.

use crate::definition::GroupAttribute;
use scalar_relations_core::{Error, Model, Result, Row, TypeError, Value};
use std::collections::HashSet;

/// One normalized, hashable key component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Bool(bool),
    /// Any integer, or a float/decimal with an integral value
    Int(i64),
    /// Non-integral float, as IEEE-754 bits
    Float(u64),
    /// Non-integral decimal in canonical form (see `canonical_decimal`)
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    /// Date/time values tagged by kind, so a date never equals a timestamp
    Temporal(u8, i64),
    Uuid([u8; 16]),
    Json(String),
    Array(Vec<KeyPart>),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Bool(v) => KeyPart::Bool(*v),
            Value::TinyInt(v) => KeyPart::Int(i64::from(*v)),
            Value::SmallInt(v) => KeyPart::Int(i64::from(*v)),
            Value::Int(v) => KeyPart::Int(i64::from(*v)),
            Value::BigInt(v) => KeyPart::Int(*v),
            Value::Float(v) => float_part(f64::from(*v)),
            Value::Double(v) => float_part(*v),
            Value::Decimal(s) => decimal_part(s),
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::Bytes(b) => KeyPart::Bytes(b.clone()),
            Value::Date(v) => KeyPart::Temporal(0, i64::from(*v)),
            Value::Time(v) => KeyPart::Temporal(1, *v),
            Value::Timestamp(v) => KeyPart::Temporal(2, *v),
            Value::TimestampTz(v) => KeyPart::Temporal(3, *v),
            Value::Uuid(u) => KeyPart::Uuid(*u),
            Value::Json(j) => KeyPart::Json(j.to_string()),
            Value::Array(items) => KeyPart::Array(items.iter().map(KeyPart::from).collect()),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn float_part(v: f64) -> KeyPart {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        KeyPart::Int(v as i64)
    } else if v.is_nan() {
        KeyPart::Float(f64::NAN.to_bits())
    } else {
        KeyPart::Float(v.to_bits())
    }
}

fn decimal_part(raw: &str) -> KeyPart {
    let raw = raw.trim();
    match canonical_decimal(raw) {
        Some(canonical) => match canonical.parse::<i64>() {
            Ok(v) => KeyPart::Int(v),
            Err(_) => KeyPart::Decimal(canonical),
        },
        None => KeyPart::Decimal(raw.to_string()),
    }
}

/// Rewrite `[+-]int[.frac][e[+-]exp]` without redundant zeros, sign or
/// exponent, so equal numbers get equal strings. `None` if `raw` is not a
/// decimal literal.
fn canonical_decimal(raw: &str) -> Option<String> {
    let (negative, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (mantissa, exponent) = match rest.split_once(['e', 'E']) {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i64>().ok()?),
        None => (rest, 0),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if (int.is_empty() && frac.is_empty())
        || !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
    {
        return None;
    }

    // The value is 0.<significant> * 10^point.
    let digits = format!("{int}{frac}");
    let significant = digits.trim_start_matches('0');
    let point = i64::try_from(int.len())
        .ok()?
        .checked_add(exponent)?
        .checked_sub(i64::try_from(digits.len() - significant.len()).ok()?)?;
    let significant = significant.trim_end_matches('0');
    if significant.is_empty() {
        return Some("0".to_string());
    }

    let len = i64::try_from(significant.len()).ok()?;
    let body = if (len..=64).contains(&point) {
        let zeros = usize::try_from(point - len).ok()?;
        format!("{significant}{}", "0".repeat(zeros))
    } else if (1..len).contains(&point) {
        let at = usize::try_from(point).ok()?;
        format!("{}.{}", &significant[..at], &significant[at..])
    } else if (-64..=0).contains(&point) {
        let zeros = usize::try_from(-point).ok()?;
        format!("0.{}{significant}", "0".repeat(zeros))
    } else {
        format!("0.{significant}e{point}")
    };
    Some(if negative { format!("-{body}") } else { body })
}

/// Ordered, normalized group attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<KeyPart>);

impl GroupKey {
    /// Build a key from raw values in group attribute order.
    pub fn from_values(values: &[Value]) -> Self {
        GroupKey(values.iter().map(KeyPart::from).collect())
    }

    /// The key of an in-memory entity.
    #[allow(clippy::result_large_err)]
    pub fn for_entity<M: Model>(attributes: &[GroupAttribute], entity: &M) -> Result<Self> {
        Ok(Self::from_values(&entity_values(attributes, entity)?))
    }

    /// The key of a grouped result row.
    #[allow(clippy::result_large_err)]
    pub fn for_row(attributes: &[GroupAttribute], row: &Row) -> Result<Self> {
        let mut parts = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let value = row
                .get_by_name(attr.bare())
                .or_else(|| row.get_by_name(attr.qualified()))
                .ok_or_else(|| {
                    Error::Type(TypeError {
                        expected: "group column",
                        actual: format!("column '{}' not found in result row", attr.bare()),
                        column: Some(attr.bare().to_string()),
                    })
                })?;
            parts.push(KeyPart::from(value));
        }
        Ok(GroupKey(parts))
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

/// Read the group attribute values of an entity, by bare name.
///
/// An attribute the entity does not have is a configuration error: the
/// relation was defined against a column the entity type does not carry.
#[allow(clippy::result_large_err)]
pub fn entity_values<M: Model>(attributes: &[GroupAttribute], entity: &M) -> Result<Vec<Value>> {
    attributes
        .iter()
        .map(|attr| {
            entity.attribute(attr.bare()).ok_or_else(|| {
                Error::config(format!(
                    "group attribute '{}' is not an attribute of {}",
                    attr.bare(),
                    M::entity_name()
                ))
            })
        })
        .collect()
}

/// Distinct non-NULL values, in first-seen order.
pub fn distinct_non_null<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| !v.is_null())
        .filter(|v| seen.insert(KeyPart::from(*v)))
        .cloned()
        .collect()
}
