//! Schema-driven validation of untyped input
//!
//! A `Schema` lists an entity's fields and their semantic kinds. `validate`
//! checks one JSON value against a schema and a per-call required-field set,
//! collecting every violation into the given `Status`. Nested entities are
//! validated into a fresh child status; a failing child is recorded on the
//! parent twice, as `"<field>.err"` with the field's generic message and as
//! `"<field>.err.+"` with the child status itself.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use actix_web::http::header::HeaderValue;
use chrono::DateTime;
use serde_json::Value;

use crate::ids::is_identifier;
use crate::status::Status;

/// Semantic type of a field
#[derive(Debug)]
pub enum FieldKind {
    /// Native `{"$oid"}` form or any string
    Identifier,
    /// Non-empty string usable as an HTTP header value
    ContentType,
    /// RFC 3339 date-time string
    Timestamp,
    /// Standard base64 string
    Binary,
    /// Embedded entity validated against its own schema
    Nested {
        schema: &'static Schema,
        required: &'static [&'static str],
    },
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Message recorded when a required field is absent
    pub missing: &'static str,
    /// Message recorded when a present field fails its type check
    pub invalid: &'static str,
}

#[derive(Debug)]
pub struct Schema {
    /// Key used when the whole entity is missing or malformed
    pub entity_key: &'static str,
    pub missing: &'static str,
    pub fields: &'static [Field],
}

/// Error key for a field
pub fn error_key(field: &str) -> String {
    format!("{}.err", field)
}

/// Error key holding a nested field's full status
pub fn nested_error_key(field: &str) -> String {
    format!("{}.err.+", field)
}

/// Validate `data` against `schema`, requiring the fields named in `required`
pub fn validate(status: &mut Status, data: Option<&Value>, schema: &Schema, required: &[&str]) {
    let object = match data {
        None | Some(Value::Null) => {
            status.set_error(schema.entity_key, schema.missing);
            return;
        }
        Some(Value::Object(object)) => object,
        Some(_) => {
            status.set_error(schema.entity_key, "data is not an object");
            return;
        }
    };

    for field in schema.fields {
        if required.contains(&field.name) && !object.contains_key(field.name) {
            status.set_error(&error_key(field.name), field.missing);
        }
    }

    for field in schema.fields {
        if let Some(value) = object.get(field.name) {
            check_field(status, field.name, value, &field.kind, field.invalid);
        }
    }
}

/// Type-check a single present value, recording a failure under `name`
pub fn check_field(
    status: &mut Status,
    name: &str,
    value: &Value,
    kind: &FieldKind,
    invalid: &str,
) {
    match kind {
        FieldKind::Nested { schema, required } => {
            if value.is_null() {
                status.set_error(&error_key(name), invalid);
                return;
            }
            let mut nested = Status::new();
            validate(&mut nested, Some(value), schema, required);
            if !nested.is_success() {
                status.set_error(&error_key(name), invalid);
                status.set_error(&nested_error_key(name), nested);
            }
        }
        _ => {
            if !is_kind(value, kind) {
                status.set_error(&error_key(name), invalid);
            }
        }
    }
}

/// Scalar kind check. Nested kinds are never satisfied by a scalar check.
pub fn is_kind(value: &Value, kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Identifier => is_identifier(value),
        FieldKind::ContentType => value
            .as_str()
            .map(|s| !s.is_empty() && HeaderValue::from_str(s).is_ok())
            .unwrap_or(false),
        FieldKind::Timestamp => value
            .as_str()
            .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
            .unwrap_or(false),
        FieldKind::Binary => value
            .as_str()
            .map(|s| STANDARD.decode(s.as_bytes()).is_ok())
            .unwrap_or(false),
        FieldKind::Nested { .. } => false,
    }
}
