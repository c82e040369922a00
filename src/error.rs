use thiserror::Error;

/// A single rejected field on an incoming reading
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Errors returned by record store operations
#[derive(Debug, Error)]
pub enum ConsumptionError {
    /// Malformed or out-of-range input
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A record already exists for the (cpf, mes, ano) key
    #[error("{0}")]
    Conflict(String),

    /// No record for the requested key
    #[error("{0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type ConsumptionResult<T> = std::result::Result<T, ConsumptionError>;

impl ConsumptionError {
    /// Short machine-readable name, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ConsumptionError::Validation(_) => "validation",
            ConsumptionError::Conflict(_) => "conflict",
            ConsumptionError::NotFound(_) => "not_found",
            ConsumptionError::Storage(_) => "storage",
        }
    }

    /// True for errors caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ConsumptionError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_displayed_verbatim() {
        let err: ConsumptionError =
            ValidationError::new("mes", "Digite um mes entre 1 e 12").into();

        assert_eq!(err.to_string(), "Digite um mes entre 1 e 12");
        assert_eq!(err.kind(), "validation");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("ano", "Ano deve ser maior ou igual a 2000");

        assert_eq!(err.to_string(), "Ano deve ser maior ou igual a 2000");
        assert_eq!(err.field, "ano");

        let wrapped = ConsumptionError::from(err.clone());
        let source = std::error::Error::source(&wrapped).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some(err.message.as_str()));
    }

    #[test]
    fn test_storage_error_is_not_client_error() {
        let err: ConsumptionError = rusqlite::Error::InvalidQuery.into();

        assert_eq!(err.kind(), "storage");
        assert!(!err.is_client_error());
        assert!(err.to_string().starts_with("storage error"));
    }
}
