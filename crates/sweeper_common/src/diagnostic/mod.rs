/// A trait for errors that provide a diagnostic code and a suggestion for resolution.
pub trait Diagnosable: std::error::Error {
    /// A unique machine-readable code (e.g., "REG_AUTH_FAILED").
    fn code(&self) -> String;

    /// A human-readable suggestion for how to fix the error.
    fn suggestion(&self) -> Option<String>;
}

#[derive(Debug, thiserror::Error)]
#[error("{message} (Code: {code})")]
pub struct Error {
    message: String,
    code: String,
    suggestion: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new<E>(error: E) -> Self
    where
        E: Diagnosable + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            code: error.code(),
            suggestion: error.suggestion(),
            source: Some(Box::new(error)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Returns the wrapped error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.source.as_ref().and_then(|s| s.downcast_ref::<E>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("registry unreachable")]
    struct Unreachable;

    impl Diagnosable for Unreachable {
        fn code(&self) -> String {
            "TEST_UNREACHABLE".to_string()
        }
        fn suggestion(&self) -> Option<String> {
            Some("Try again later".to_string())
        }
    }

    #[test]
    fn test_error_carries_code_and_suggestion() {
        let err = Error::new(Unreachable);
        assert_eq!(err.message(), "registry unreachable");
        assert_eq!(err.code(), "TEST_UNREACHABLE");
        assert_eq!(err.suggestion(), Some("Try again later"));
        assert_eq!(err.to_string(), "registry unreachable (Code: TEST_UNREACHABLE)");
    }

    #[test]
    fn test_downcast_to_source() {
        let err = Error::new(Unreachable);
        assert!(err.downcast_ref::<Unreachable>().is_some());
        assert!(err.downcast_ref::<std::io::Error>().is_none());
    }
}
