//! Client-side payload validation
//!
//! Catches missing required fields before a network round-trip. The backend
//! still validates; this only saves the request.

use super::registry::ResourceDef;
use crate::api::error::ApiError;
use crate::api::http::Payload;
use serde_json::{Map, Value};

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn payload_fields(payload: &Payload) -> Result<Map<String, Value>, ApiError> {
    payload.fields().ok_or_else(|| ApiError::Validation {
        message: "Payload must be an object".to_string(),
        fields: Vec::new(),
    })
}

/// Every required field must be present and non-blank
pub fn validate_create(def: &ResourceDef, payload: &Payload) -> Result<(), ApiError> {
    let fields = payload_fields(payload)?;
    let missing: Vec<String> = def
        .required_fields
        .iter()
        .filter(|name| fields.get(name.as_str()).map_or(true, is_blank))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::missing_fields(missing))
    }
}

/// Partial updates may omit required fields but may not blank them
pub fn validate_update(def: &ResourceDef, payload: &Payload) -> Result<(), ApiError> {
    let fields = payload_fields(payload)?;
    let blanked: Vec<String> = def
        .required_fields
        .iter()
        .filter(|name| fields.get(name.as_str()).is_some_and(is_blank))
        .cloned()
        .collect();

    if blanked.is_empty() {
        Ok(())
    } else {
        Err(ApiError::missing_fields(blanked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def() -> ResourceDef {
        ResourceDef::new("products", "products").with_required(&["name", "price", "category"])
    }

    #[test]
    fn test_create_reports_missing_fields_in_order() {
        let payload = Payload::json(json!({"name": "Malbec", "category": "  "}));
        match validate_create(&def(), &payload) {
            Err(ApiError::Validation { fields, .. }) => {
                assert_eq!(fields, vec!["price".to_string(), "category".to_string()]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_accepts_complete_payload() {
        let payload = Payload::json(json!({"name": "Malbec", "price": 0, "category": "Wine"}));
        assert!(validate_create(&def(), &payload).is_ok());
    }

    #[test]
    fn test_update_allows_partial() {
        let payload = Payload::json(json!({"price": 19.5}));
        assert!(validate_update(&def(), &payload).is_ok());
    }

    #[test]
    fn test_update_rejects_blanked_required_field() {
        let payload = Payload::json(json!({"name": ""}));
        assert!(validate_update(&def(), &payload).is_err());
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let payload = Payload::json(json!(["not", "an", "object"]));
        assert!(validate_create(&def(), &payload).is_err());
    }
}
