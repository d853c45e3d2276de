use thiserror::Error;

/// Broad category of a [`DomainError`], for callers that map failures to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing field, wrong primitive type, or unrecognized enum value
    InvalidType,
    /// Well-shaped value that violates a business rule
    Range,
    /// Malformed IP, CIDR, domain, date or hash text
    Format,
    /// Required input that is empty
    Validation,
}

/// Core domain errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid type for '{field}': received {received}")]
    InvalidType { field: String, received: String },

    #[error("Out of range: {message}")]
    Range { message: String },

    #[error("Invalid format for '{field}': {value:?}")]
    Format { field: String, value: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn invalid_type(field: impl Into<String>, received: impl Into<String>) -> Self {
        Self::InvalidType {
            field: field.into(),
            received: received.into(),
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::Range {
            message: message.into(),
        }
    }

    pub fn format(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Format {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// The taxonomy bucket this error falls into
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidType { .. } => ErrorKind::InvalidType,
            Self::Range { .. } => ErrorKind::Range,
            Self::Format { .. } => ErrorKind::Format,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_type_error() {
        let error = DomainError::invalid_type("restricted", "string \"yes\"");
        assert_eq!(
            error.to_string(),
            "Invalid type for 'restricted': received string \"yes\""
        );
        assert_eq!(error.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn test_range_error() {
        let error = DomainError::range("expiry must be in the future");
        assert_eq!(error.to_string(), "Out of range: expiry must be in the future");
        assert_eq!(error.kind(), ErrorKind::Range);
    }

    #[test]
    fn test_format_error() {
        let error = DomainError::format("ipWhitelist.addresses", "999.1.1.1");
        assert_eq!(
            error.to_string(),
            "Invalid format for 'ipWhitelist.addresses': \"999.1.1.1\""
        );
        assert_eq!(error.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("secret cannot be empty");
        assert_eq!(error.to_string(), "Validation error: secret cannot be empty");
        assert_eq!(error.kind(), ErrorKind::Validation);
    }
}
