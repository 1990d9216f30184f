use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// A weight or rep count exactly as a client logged it.
///
/// Clients are not consistent about sending numbers, so `"80"` and `80` are
/// both accepted and stored as-is. Interpretation happens at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoggedValue {
    Number(f64),
    Text(String),
}

impl LoggedValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LoggedValue::Number(value) => value.is_finite().then_some(*value),
            LoggedValue::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite()),
        }
    }

    pub fn parse_or_zero(&self) -> f64 {
        self.as_number().unwrap_or_default()
    }

    /// Present, numeric and non-zero.
    pub fn is_truthy_number(&self) -> bool {
        self.as_number().is_some_and(|value| value != 0.0)
    }
}

impl From<f64> for LoggedValue {
    fn from(value: f64) -> Self {
        LoggedValue::Number(value)
    }
}

impl From<&str> for LoggedValue {
    fn from(value: &str) -> Self {
        LoggedValue::Text(value.to_string())
    }
}

impl ToSql for LoggedValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            LoggedValue::Number(value) => value.to_sql(),
            LoggedValue::Text(raw) => raw.to_sql(),
        }
    }
}

impl FromSql for LoggedValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(number) => Ok(LoggedValue::Number(number as f64)),
            ValueRef::Real(number) => Ok(LoggedValue::Number(number)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|raw| LoggedValue::Text(raw.to_string()))
                .map_err(|error| FromSqlError::Other(Box::new(error))),
            ValueRef::Null | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LoggedValue;

    #[test]
    fn text_values_are_parsed_when_numeric() {
        assert_eq!(LoggedValue::from(" 82.5 ").as_number(), Some(82.5));
        assert_eq!(LoggedValue::from("heavy").as_number(), None);
        assert_eq!(LoggedValue::from("heavy").parse_or_zero(), 0.0);
    }

    #[test]
    fn zero_is_not_truthy() {
        assert!(!LoggedValue::Number(0.0).is_truthy_number());
        assert!(!LoggedValue::from("0").is_truthy_number());
        assert!(LoggedValue::Number(2.5).is_truthy_number());
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let values: Vec<LoggedValue> =
            serde_json::from_str(r#"[100, "12", "abc"]"#).expect("valid json");

        assert_eq!(
            values,
            vec![
                LoggedValue::Number(100.0),
                LoggedValue::Text("12".to_string()),
                LoggedValue::Text("abc".to_string()),
            ]
        );
    }
}
