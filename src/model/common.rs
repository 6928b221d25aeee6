use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type Id = i64;

/// Read an optional id the way loosely typed clients send it.
///
/// Integers and numeric strings yield an id. Fractional numbers are truncated.
/// Anything else (blank or non-numeric strings, booleans, objects) reads as no
/// id at all instead of failing the whole document.
pub fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<Option<Id>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as Id)),
        serde_json::Value::String(text) => text.trim().parse::<Id>().ok(),
        _ => None,
    })
}

/// Parse a local timestamp such as `2025-12-22T10:00:00` (fractional seconds
/// optional) or the minute-precision form `2025-12-22T10:00`.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    value
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").ok())
}

/// A request field that keeps "absent", "explicit null" and "value" apart.
///
/// Use together with `#[serde(default)]` so a missing key becomes
/// [`Field::Absent`] while `"key": null` becomes [`Field::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Value(value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Field::Value(value),
            None => Field::Null,
        })
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Field::Value(value) => serializer.serialize_some(value),
            Field::Absent | Field::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct NumberedRequest {
        #[serde(default)]
        nr: Field<i32>,
    }

    #[test]
    fn test_field_distinguishes_absent_null_and_value() {
        let absent: NumberedRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.nr, Field::Absent);

        let null: NumberedRequest = serde_json::from_str(r#"{"nr": null}"#).unwrap();
        assert_eq!(null.nr, Field::Null);

        let value: NumberedRequest = serde_json::from_str(r#"{"nr": 3}"#).unwrap();
        assert_eq!(value.nr, Field::Value(3));
        assert_eq!(value.nr.into_option(), Some(3));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-12-22T10:00:00").is_some());
        assert!(parse_timestamp("2025-12-22T10:00:00.250").is_some());
        assert!(parse_timestamp("2025-12-22T10:00").is_some());
        assert!(parse_timestamp("22-12-2025").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
