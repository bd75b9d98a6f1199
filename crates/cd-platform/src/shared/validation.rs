//! Input validation for gateway writes

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::shared::error::{PlatformError, Result};

fn field_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static regex"))
}

/// True if `name` only uses `[A-Za-z0-9_]`
pub fn is_valid_field_name(name: &str) -> bool {
    field_name_pattern().is_match(name)
}

/// Reject any top-level field name outside `[A-Za-z0-9_]`.
///
/// Arrays are checked element by element; a non-object element is rejected.
pub fn validate_field_names(data: &Value) -> Result<()> {
    match data {
        Value::Object(map) => {
            if let Some(bad) = map.keys().find(|k| !is_valid_field_name(k)) {
                return Err(PlatformError::bad_request(format!("Invalid field name: '{}'", bad)));
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| match item {
            Value::Object(_) => validate_field_names(item),
            _ => Err(PlatformError::bad_request("Collection items must be JSON objects")),
        }),
        _ => Err(PlatformError::bad_request("Request data must be a JSON object or array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_names() {
        assert!(is_valid_field_name("partnerCode"));
        assert!(is_valid_field_name("total_amount_2"));
        assert!(!is_valid_field_name("bad col"));
        assert!(!is_valid_field_name("name;DROP"));
        assert!(!is_valid_field_name(""));
        assert!(!is_valid_field_name("naïve"));
    }

    #[test]
    fn test_validate_object() {
        assert!(validate_field_names(&json!({"id": "i1", "totalAmount": 100})).is_ok());
        let err = validate_field_names(&json!({"id": "i1", "bad col": 1})).unwrap_err();
        assert!(err.to_string().contains("bad col"));
    }

    #[test]
    fn test_validate_array() {
        assert!(validate_field_names(&json!([{"id": "a"}, {"id": "b"}])).is_ok());
        assert!(validate_field_names(&json!([{"id": "a"}, {"x-y": 1}])).is_err());
        assert!(validate_field_names(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_validate_rejects_scalars() {
        assert!(validate_field_names(&json!("text")).is_err());
        assert!(validate_field_names(&json!(null)).is_err());
    }
}
