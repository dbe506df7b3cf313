//! Validation of model-supplied arguments against an operation's JSON schema.
//!
//! Covers the subset the catalog declares: object shape, required fields,
//! `string`/`array` of strings types, `enum` values (case-insensitive) and
//! `format: "date"` (ISO `YYYY-MM-DD`).

use crate::error::{AppError, AppResult};
use crate::types::parse_due_date;
use serde_json::{Map, Value};

/// Check `args` against `schema`. Null values count as absent.
pub fn validate_arguments(schema: &Value, args: &Value) -> AppResult<()> {
    let Some(args) = args.as_object() else {
        return Err(AppError::validation(
            "arguments",
            "Arguments must be a JSON object.",
        ));
    };

    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            match args.get(field) {
                None | Some(Value::Null) => return Err(AppError::missing_field(field)),
                _ => {}
            }
        }
    }

    for (field, value) in args {
        if value.is_null() {
            continue;
        }
        if let Some(property) = properties.get(field) {
            validate_property(field, property, value)?;
        }
    }

    Ok(())
}

fn validate_property(field: &str, property: &Value, value: &Value) -> AppResult<()> {
    match property.get("type").and_then(Value::as_str) {
        Some("string") => {
            let Some(s) = value.as_str() else {
                return Err(AppError::validation(field, format!("{} must be a string", field)));
            };
            check_enum(field, property, s)?;
            if property.get("format").and_then(Value::as_str) == Some("date") {
                parse_due_date(s).map(|_| ()).map_err(|e| e.with_field(field))?;
            }
        }
        Some("array") => {
            let Some(items) = value.as_array() else {
                return Err(AppError::validation(field, format!("{} must be an array", field)));
            };
            if let Some(item_schema) = property.get("items") {
                for item in items {
                    validate_property(field, item_schema, item)?;
                }
            }
        }
        Some("integer") if !value.is_i64() && !value.is_u64() => {
            return Err(AppError::validation(field, format!("{} must be an integer", field)));
        }
        Some("boolean") if !value.is_boolean() => {
            return Err(AppError::validation(field, format!("{} must be a boolean", field)));
        }
        _ => {}
    }
    Ok(())
}

fn check_enum(field: &str, property: &Value, value: &str) -> AppResult<()> {
    let Some(allowed) = property.get("enum").and_then(Value::as_array) else {
        return Ok(());
    };
    let allowed: Vec<&str> = allowed.iter().filter_map(Value::as_str).collect();
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(value.trim())) {
        Ok(())
    } else {
        Err(AppError::validation(
            field,
            format!(
                "Invalid {} '{}'. Valid values: {}",
                field,
                value,
                allowed.join(", ")
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "priority": { "type": "string", "enum": ["High", "Medium", "Low"] },
                "due_date": { "type": "string", "format": "date" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["title"]
        })
    }

    #[test]
    fn accepts_valid_arguments() {
        let args = json!({"title": "Gym", "priority": "high", "due_date": "2025-01-10", "tags": ["a"]});
        assert!(validate_arguments(&schema(), &args).is_ok());
    }

    #[test]
    fn rejects_non_object() {
        let err = validate_arguments(&schema(), &json!(["Gym"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn required_field_missing_or_null() {
        let err = validate_arguments(&schema(), &json!({})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("title"));
        assert!(validate_arguments(&schema(), &json!({"title": null})).is_err());
    }

    #[test]
    fn optional_null_is_absent() {
        assert!(validate_arguments(&schema(), &json!({"title": "Gym", "priority": null})).is_ok());
    }

    #[test]
    fn rejects_bad_enum_type_and_date() {
        let err = validate_arguments(&schema(), &json!({"title": "Gym", "priority": "urgent"})).unwrap_err();
        assert!(err.message.contains("High, Medium, Low"));

        assert!(validate_arguments(&schema(), &json!({"title": 7})).is_err());
        assert!(validate_arguments(&schema(), &json!({"title": "Gym", "tags": "a,b"})).is_err());
        assert!(validate_arguments(&schema(), &json!({"title": "Gym", "tags": [1]})).is_err());

        let err = validate_arguments(&schema(), &json!({"title": "Gym", "due_date": "tomorrow"})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("due_date"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        assert!(validate_arguments(&schema(), &json!({"title": "Gym", "mood": 3})).is_ok());
    }
}
