use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, Uri},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{AppError, FieldError};
use crate::state::AppState;

const SENSITIVE_KEY_PARTS: [&str; 4] = ["password", "token", "secret", "key"];

/// Keys whose values are never rewritten or scanned.
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEY_PARTS.iter().any(|part| key.contains(part))
}

/// Trims, collapses runs of whitespace and drops angle brackets.
pub fn clean_string(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| *c != '<' && *c != '>').collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Applies `clean_string` to every string leaf outside sensitive keys.
pub fn clean_value(value: &mut Value) {
    match value {
        Value::String(s) => *s = clean_string(s),
        Value::Array(items) => items.iter_mut().for_each(clean_value),
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if !is_sensitive_key(key) {
                    clean_value(item);
                }
            }
        }
        _ => {}
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn collect(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() { camel_case(field) } else { format!("{}.{}", prefix, camel_case(field)) };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    out.push(FieldError {
                        field: path.clone(),
                        message: err.message.as_ref().map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", path)),
                        kind: err.code.to_string(),
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect("", errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn shape_error(err: serde_json::Error) -> AppError {
    AppError::Validation(vec![FieldError {
        field: "body".to_string(),
        message: err.to_string(),
        kind: "invalid_type".to_string(),
    }])
}

/// Deserializes, validates every field, then re-reads the value with its
/// string leaves cleaned.
fn validate_value<T: DeserializeOwned + Validate>(mut value: Value) -> Result<T, AppError> {
    let parsed: T = serde_json::from_value(value.clone()).map_err(shape_error)?;
    if let Err(errors) = parsed.validate() {
        let details = field_errors(&errors);
        debug!(errors = details.len(), "Request failed validation");
        return Err(AppError::Validation(details));
    }

    clean_value(&mut value);
    serde_json::from_value(value).map_err(shape_error)
}

/// A JSON body that has passed its validation rules.
pub struct ValidatedJson<T>(pub T);

impl<T> FromRequest<Arc<AppState>> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::BadRequest("Unable to read request body".to_string()))?;
        let value: Value = if bytes.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(shape_error)?
        };
        validate_value(value).map(ValidatedJson)
    }
}

/// Query-string counterpart of `ValidatedJson`.
pub struct ValidatedQuery<T>(pub T);

impl<T> FromRequestParts<Arc<AppState>> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Query(parsed) = Query::<T>::try_from_uri(&parts.uri).map_err(|e| query_error(e.body_text()))?;
        if let Err(errors) = parsed.validate() {
            return Err(AppError::Validation(field_errors(&errors)));
        }

        let cleaned = clean_query(parts.uri.query().unwrap_or(""));
        let uri: Uri = format!("/?{}", cleaned)
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid query string".to_string()))?;
        let Query(sanitized) = Query::<T>::try_from_uri(&uri).map_err(|e| query_error(e.body_text()))?;
        Ok(ValidatedQuery(sanitized))
    }
}

fn query_error(message: String) -> AppError {
    AppError::Validation(vec![FieldError {
        field: "query".to_string(),
        message,
        kind: "invalid_type".to_string(),
    }])
}

/// Re-encodes a query string with every non-sensitive value cleaned.
pub fn clean_query(query: &str) -> String {
    let mut out = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if is_sensitive_key(&key) {
            out.append_pair(&key, &value);
        } else {
            out.append_pair(&key, &clean_string(&value));
        }
    }
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[validate(length(min = 1, max = 10, message = "Name must be 1-10 characters"))]
        display_name: String,
        #[validate(range(min = 1))]
        count: i64,
        password: String,
    }

    #[test]
    fn test_clean_string() {
        assert_eq!(clean_string("  My   <b>Bot</b>  "), "My bBot/b");
        assert_eq!(clean_string("\tMy Bot\n"), "My Bot");
    }

    #[test]
    fn test_collects_all_errors() {
        let err = validate_value::<Sample>(json!({"displayName": "", "count": 0, "password": "x"})).unwrap_err();
        let AppError::Validation(details) = err else { panic!("expected validation error") };
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].field, "count");
        assert_eq!(details[1].field, "displayName");
        assert_eq!(details[1].message, "Name must be 1-10 characters");
        assert_eq!(details[1].kind, "length");
    }

    #[test]
    fn test_sanitizes_after_validation_except_sensitive() {
        let sample = validate_value::<Sample>(json!({
            "displayName": "  My  Bot ",
            "count": 2,
            "password": "  <Pa ss>  ",
            "unknown": "dropped"
        }))
        .unwrap();
        assert_eq!(sample.display_name, "My Bot");
        assert_eq!(sample.password, "  <Pa ss>  ");
        assert_eq!(sample.count, 2);
    }

    #[test]
    fn test_clean_query_keeps_sensitive_values() {
        assert_eq!(clean_query("search=%20my%20%20bot%20&apiKey=%3Cx%3E"), "search=my+bot&apiKey=%3Cx%3E");
    }
}
