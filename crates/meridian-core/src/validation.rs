//! # Payload Validation
//!
//! Validation helpers over schemaless JSON records.
//!
//! Reconciliation payloads arrive as `serde_json::Value` objects straight
//! from offline clients, so validation works on JSON maps rather than typed
//! structs: a required field must be present, non-null, and (for strings)
//! non-blank. Type mismatches on optional fields are left to the default
//! policy at create time.
//!
//! ## Usage
//! ```rust
//! use serde_json::json;
//! use meridian_core::validation::{as_object, require_fields};
//!
//! let item = json!({"id": "p1", "name": "Tea"});
//! let map = as_object(&item).unwrap();
//! require_fields(map, &["id", "name"]).unwrap();
//! assert!(require_fields(map, &["sku"]).is_err());
//! ```

use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationResult};

/// JSON object type alias used throughout the engine.
pub type JsonMap = Map<String, Value>;

// =============================================================================
// Object Access
// =============================================================================

/// Returns the item as a JSON object, or `NotAnObject`.
pub fn as_object(item: &Value) -> ValidationResult<&JsonMap> {
    item.as_object().ok_or(ValidationError::NotAnObject)
}

/// Returns true when a field value counts as absent: missing key, `null`,
/// or a blank string.
pub fn is_absent(map: &JsonMap, field: &str) -> bool {
    match map.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Validates that every listed field is present, non-null, and non-blank.
pub fn require_fields(map: &JsonMap, fields: &[&str]) -> ValidationResult<()> {
    for field in fields {
        if is_absent(map, field) {
            return Err(ValidationError::required(*field));
        }
    }
    Ok(())
}

/// Returns a trimmed string field, if present and non-blank.
pub fn str_field<'a>(map: &'a JsonMap, field: &str) -> Option<&'a str> {
    match map.get(field) {
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then_some(s)
        }
        _ => None,
    }
}

/// Returns a numeric field as f64, if present.
pub fn num_field(map: &JsonMap, field: &str) -> Option<f64> {
    map.get(field).and_then(Value::as_f64)
}

// =============================================================================
// Sale Line Items
// =============================================================================

/// Returns true when a sale line item is usable: an object referencing a
/// product or menu item, with a positive quantity.
pub fn is_valid_sale_line(line: &Value) -> bool {
    let Some(map) = line.as_object() else {
        return false;
    };

    let references_item =
        str_field(map, "productId").is_some() || str_field(map, "menuItemId").is_some();
    let quantity_ok = num_field(map, "quantity").is_some_and(|q| q > 0.0);

    references_item && quantity_ok
}

/// Counts the valid line items of a sale's `items` array.
///
/// A sale with zero valid lines is rejected by the engine.
pub fn count_valid_sale_lines(items: Option<&Value>) -> usize {
    items
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter(|l| is_valid_sale_line(l)).count())
        .unwrap_or(0)
}

/// Fills in a line's `lineTotal` as quantity × unitPrice when absent.
///
/// Monetary values are carried as provided; no rounding or currency
/// conversion happens here.
pub fn complete_sale_line(line: &mut Value) {
    let Some(map) = line.as_object_mut() else {
        return;
    };

    if !is_absent(map, "lineTotal") {
        return;
    }

    let quantity = map.get("quantity").and_then(Value::as_f64).unwrap_or(0.0);
    let unit_price = map.get("unitPrice").and_then(Value::as_f64).unwrap_or(0.0);
    if let Some(total) = serde_json::Number::from_f64(quantity * unit_price) {
        map.insert("lineTotal".to_string(), Value::Number(total));
    }
}

// =============================================================================
// Derived Fields
// =============================================================================

/// Recomputes a customer account's `isActive` flag from its `status`.
///
/// Active status is the `"active"` enumeration value; every other status
/// (`"frozen"`, `"closed"`, ...) deactivates the account.
pub fn derive_account_active(map: &mut JsonMap) {
    if let Some(status) = str_field(map, "status").map(str::to_owned) {
        map.insert(
            "isActive".to_string(),
            Value::Bool(status.eq_ignore_ascii_case("active")),
        );
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> JsonMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn required_fields_catch_absent_null_and_blank() {
        let map = obj(json!({"id": "x", "name": "", "phone": null}));

        assert!(require_fields(&map, &["id"]).is_ok());
        assert!(require_fields(&map, &["name"]).is_err());
        assert!(require_fields(&map, &["phone"]).is_err());
        assert!(require_fields(&map, &["missing"]).is_err());
    }

    #[test]
    fn sale_line_validity() {
        assert!(is_valid_sale_line(&json!({
            "productId": "p1", "quantity": 2, "unitPrice": 10
        })));
        assert!(is_valid_sale_line(&json!({
            "menuItemId": "m1", "quantity": 1
        })));
        // No product/menu reference
        assert!(!is_valid_sale_line(&json!({"quantity": 2})));
        // Zero quantity
        assert!(!is_valid_sale_line(&json!({"productId": "p1", "quantity": 0})));
        assert!(!is_valid_sale_line(&json!("not-an-object")));
    }

    #[test]
    fn counts_only_valid_lines() {
        let items = json!([
            {"productId": "p1", "quantity": 1, "unitPrice": 5},
            {"quantity": 3},
            {"menuItemId": "m1", "quantity": 2},
        ]);
        assert_eq!(count_valid_sale_lines(Some(&items)), 2);
        assert_eq!(count_valid_sale_lines(None), 0);
        assert_eq!(count_valid_sale_lines(Some(&json!({}))), 0);
    }

    #[test]
    fn line_total_computed_when_absent() {
        let mut line = json!({"productId": "p1", "quantity": 3, "unitPrice": 2.5});
        complete_sale_line(&mut line);
        assert_eq!(line["lineTotal"].as_f64(), Some(7.5));

        // Provided totals are never recomputed
        let mut line = json!({"productId": "p1", "quantity": 3, "unitPrice": 2.5, "lineTotal": 99});
        complete_sale_line(&mut line);
        assert_eq!(line["lineTotal"].as_f64(), Some(99.0));
    }

    #[test]
    fn account_active_follows_status() {
        let mut map = obj(json!({"status": "active"}));
        derive_account_active(&mut map);
        assert_eq!(map["isActive"], Value::Bool(true));

        let mut map = obj(json!({"status": "frozen"}));
        derive_account_active(&mut map);
        assert_eq!(map["isActive"], Value::Bool(false));

        // No status, no derivation
        let mut map = obj(json!({"customerName": "Ayşe"}));
        derive_account_active(&mut map);
        assert!(!map.contains_key("isActive"));
    }
}
