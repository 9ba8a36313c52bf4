//! ServerRecord - The Registry's Sole Entity
//!
//! TigerStyle: Explicit types, validation, builder-style helpers.

use serde::{Deserialize, Serialize};

// =============================================================================
// ServerRecord
// =============================================================================

/// A described server instance in the registry.
///
/// Optional text fields are empty strings rather than `Option`, matching the
/// JSON shape clients send and receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    /// Unique identifier, the record's sole identity
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Version string
    #[serde(default)]
    pub version: String,
    /// Repository URL
    #[serde(default)]
    pub repository: String,
    /// Author or owning organization
    #[serde(default)]
    pub author: String,
    /// Tags in insertion order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the server is active
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    /// RFC 3339 creation timestamp, stamped by the store when empty
    #[serde(default)]
    pub created_at: String,
}

fn default_is_active() -> bool {
    true
}

impl ServerRecord {
    /// Create an active record with the required fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            version: version.into(),
            repository: String::new(),
            author: String::new(),
            tags: Vec::new(),
            is_active: true,
            created_at: String::new(),
        }
    }

    /// Set description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set repository URL.
    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Set author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the active flag.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Set creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    /// Case-insensitive substring match on `name`.
    ///
    /// `query_lower` must already be lowercased.
    #[must_use]
    pub fn name_matches(&self, query_lower: &str) -> bool {
        self.name.to_lowercase().contains(query_lower)
    }
}

/// Aggregate counts over the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCount {
    /// Number of live records
    pub total: usize,
    /// Number of live records with `is_active = true`
    pub active: usize,
}

// =============================================================================
// Validation
// =============================================================================

/// A single field violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Offending field
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl ValidationError {
    fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            message: "is required".to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Every violation found in one record, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// True when no violations were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Names of the offending fields, in order.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no validation errors");
        }

        write!(f, "validation failed: ")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check the required fields of a record.
///
/// All of `id`, `name` and `version` are checked; every violation is
/// reported, not just the first.
///
/// # Errors
/// Returns the aggregated violations when any required field is empty.
pub fn validate_server(server: &ServerRecord) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if server.id.is_empty() {
        errors.push(ValidationError::required("id"));
    }
    if server.name.is_empty() {
        errors.push(ValidationError::required("name"));
    }
    if server.version.is_empty() {
        errors.push(ValidationError::required("version"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_server() {
        let server = ServerRecord::new("1", "filesystem-server", "1.0.0");
        assert!(validate_server(&server).is_ok());
    }

    #[test]
    fn test_validate_missing_single_field() {
        let cases = [
            (ServerRecord::new("", "n", "1"), "validation failed: id: is required"),
            (ServerRecord::new("1", "", "1"), "validation failed: name: is required"),
            (ServerRecord::new("1", "n", ""), "validation failed: version: is required"),
        ];

        for (server, expected) in cases {
            let err = validate_server(&server).unwrap_err();
            assert_eq!(err.len(), 1);
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_validate_aggregates_in_field_order() {
        let server = ServerRecord::new("", "", "");

        let err = validate_server(&server).unwrap_err();

        assert_eq!(err.fields(), vec!["id", "name", "version"]);
        assert_eq!(
            err.to_string(),
            "validation failed: id: is required, name: is required, version: is required"
        );
    }

    #[test]
    fn test_validate_ignores_optional_fields() {
        let server = ServerRecord::new("1", "n", "1").with_active(false);
        assert!(server.description.is_empty());
        assert!(validate_server(&server).is_ok());
    }

    #[test]
    fn test_empty_validation_errors_display() {
        assert_eq!(ValidationErrors::default().to_string(), "no validation errors");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError {
            field: "name".to_string(),
            message: "is required".to_string(),
        };
        assert_eq!(err.to_string(), "name: is required");
    }

    #[test]
    fn test_deserialize_defaults() {
        let server: ServerRecord =
            serde_json::from_str(r#"{"id":"1","name":"web-server","version":"2.0"}"#).unwrap();

        assert!(server.is_active, "is_active defaults to true");
        assert!(server.tags.is_empty());
        assert!(server.created_at.is_empty());
    }

    #[test]
    fn test_serialize_field_names() {
        let server = ServerRecord::new("1", "web-server", "2.0")
            .with_tags(["web", "http"])
            .with_active(false);

        let json = serde_json::to_value(&server).unwrap();

        assert_eq!(json["is_active"], false);
        assert_eq!(json["tags"], serde_json::json!(["web", "http"]));
        assert_eq!(json["created_at"], "");
    }

    #[test]
    fn test_name_matches_case_insensitive() {
        let server = ServerRecord::new("1", "FileSystem-Server", "1");
        assert!(server.name_matches("files"));
        assert!(server.name_matches("server"));
        assert!(!server.name_matches("database"));
    }
}
