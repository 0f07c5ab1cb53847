use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use log::{debug, error};
use potion::{Error, HtmlError};
use serde_json::json;

pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }

    /// Whether the failed statement hit a unique/primary key constraint.
    pub fn is_unique_violation(&self) -> bool {
        self.unique_violation
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                unique_violation: e.is_unique_violation(),
                info: format!("{e}"),
            },
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        error!("Query failed: {}", value.info);
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// Field keyed validation messages, rendered as `{"field": ["message"]}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationError {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut e = Self::new();
        e.add(field, message);
        e
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        debug!("Validation failed: {:?}", value.fields);
        Error {
            code: 400,
            info: Some(json!(value.fields).to_string()),
            redirect: None,
        }
    }
}

/// Relation already exists, or would be invalid to create.
pub struct ConflictError {
    info: String,
}

impl ConflictError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<ConflictError> for Error {
    fn from(value: ConflictError) -> Self {
        debug!("Conflict: {}", value.info);
        Error {
            code: 400,
            info: Some(json!({ "errors": value.info }).to_string()),
            redirect: None,
        }
    }
}

pub struct NotFoundError {
    info: String,
}

impl NotFoundError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<NotFoundError> for Error {
    fn from(value: NotFoundError) -> Self {
        Error {
            code: 404,
            info: Some(value.info),
            redirect: None,
        }
    }
}

pub struct PermissionError {
    info: String,
}

impl PermissionError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Default for PermissionError {
    fn default() -> Self {
        Self::new("You do not have permission to perform this action.")
    }
}

impl From<PermissionError> for Error {
    fn from(value: PermissionError) -> Self {
        Error {
            code: 403,
            info: Some(value.info),
            redirect: None,
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_error_collects_messages_per_field() {
        let mut e = ValidationError::new();
        e.add("cooking_time", "too small");
        e.add("ingredients", "empty");
        e.add("ingredients", "duplicate");

        assert_eq!(e.messages("ingredients"), ["empty", "duplicate"]);
        assert!(e.messages("name").is_empty());
        assert!(ValidationError::new().into_result().is_ok());
    }

    #[test]
    fn validation_error_renders_as_json_object() {
        let error: Error = ValidationError::field("amount", "must be at least 1").into();

        assert_eq!(error.code as u16, 400);
        let body: serde_json::Value =
            serde_json::from_str(&error.info.unwrap_or_default()).unwrap();
        assert_eq!(body, json!({ "amount": ["must be at least 1"] }));
    }

    #[test]
    fn conflict_error_is_bad_request_with_reason() {
        let error: Error = ConflictError::new("Recipe is already in favorites").into();

        assert_eq!(error.code as u16, 400);
        assert_eq!(
            error.info.as_deref(),
            Some(r#"{"errors":"Recipe is already in favorites"}"#)
        );
    }

    #[test]
    fn status_codes_per_kind() {
        let not_found: Error = NotFoundError::new("No recipe").into();
        let forbidden: Error = PermissionError::default().into();
        let query: Error = QueryError::new(String::from("boom")).into();

        assert_eq!(not_found.code as u16, 404);
        assert_eq!(forbidden.code as u16, 403);
        assert_eq!(query.code as u16, 500);
    }
}
