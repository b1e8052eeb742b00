use axum::{extract::rejection::JsonRejection, Json};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{ApiError, ValidationErrors};

pub const MAX_TITLE_LENGTH: usize = 255;

/// Unwraps a JSON body extraction into an object, turning malformed bodies
/// into a 422 on the `body` field instead of axum's plain-text rejection.
pub fn json_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(Json(_)) => Err(ApiError::validation_field(
            "body",
            "The request body must be a JSON object.",
        )),
        Err(rejection) => Err(ApiError::validation_field("body", rejection.body_text())),
    }
}

/// Collects field errors while reading typed values out of a JSON object.
pub struct Validator<'a> {
    payload: &'a Map<String, Value>,
    errors: ValidationErrors,
}

impl<'a> Validator<'a> {
    pub fn new(payload: &'a Map<String, Value>) -> Self {
        Self {
            payload,
            errors: ValidationErrors::new(),
        }
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn required_string(&mut self, field: &str, max: usize) -> Option<String> {
        let payload = self.payload;
        match payload.get(field) {
            None | Some(Value::Null) => {
                self.fail(field, format!("The {field} field is required."));
                None
            }
            Some(value) => self.non_empty_string(field, value, max),
        }
    }

    /// Like [`Self::required_string`], but only when the field is present.
    pub fn sometimes_string(&mut self, field: &str, max: usize) -> Option<String> {
        if self.payload.contains_key(field) {
            self.required_string(field, max)
        } else {
            None
        }
    }

    /// `None` when absent, `Some(None)` for an explicit `null`.
    pub fn nullable_string(&mut self, field: &str) -> Option<Option<String>> {
        let payload = self.payload;
        match payload.get(field)? {
            Value::Null => Some(None),
            Value::String(s) => Some(Some(s.clone())),
            _ => {
                self.fail(field, format!("The {field} field must be a string."));
                None
            }
        }
    }

    pub fn boolean(&mut self, field: &str) -> Option<bool> {
        let payload = self.payload;
        let value = payload.get(field)?;
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        };

        if parsed.is_none() {
            self.fail(field, format!("The {field} field must be true or false."));
        }
        parsed
    }

    pub fn nullable_integer(&mut self, field: &str) -> Option<Option<i64>> {
        let payload = self.payload;
        match payload.get(field)? {
            Value::Null => Some(None),
            Value::Number(n) if n.is_i64() => Some(n.as_i64()),
            _ => {
                self.fail(field, format!("The {field} field must be an integer."));
                None
            }
        }
    }

    pub fn required_uuid(&mut self, field: &str) -> Option<Uuid> {
        let payload = self.payload;
        match payload.get(field) {
            None | Some(Value::Null) => {
                self.fail(field, format!("The {field} field is required."));
                None
            }
            Some(Value::String(s)) => match Uuid::parse_str(s) {
                Ok(id) => Some(id),
                Err(_) => {
                    self.fail(field, format!("The {field} field must be a valid UUID."));
                    None
                }
            },
            Some(_) => {
                self.fail(field, format!("The {field} field must be a valid UUID."));
                None
            }
        }
    }

    pub fn prohibited(&mut self, field: &str) {
        if self.payload.contains_key(field) {
            self.fail(field, format!("The {field} field is prohibited."));
        }
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains(field)
    }

    pub fn finish<T>(self, value: T) -> Result<T, ApiError> {
        self.errors.into_result(value)
    }

    fn non_empty_string(&mut self, field: &str, value: &Value, max: usize) -> Option<String> {
        let Value::String(raw) = value else {
            self.fail(field, format!("The {field} field must be a string."));
            return None;
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.fail(field, format!("The {field} field is required."));
            return None;
        }
        if trimmed.chars().count() > max {
            self.fail(
                field,
                format!("The {field} field must not be greater than {max} characters."),
            );
            return None;
        }
        Some(trimmed.to_string())
    }
}
