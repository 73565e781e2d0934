//! Errors for loading and validating the pipeline configuration.
//!
//! Messages name the offending key in dotted form (`limits.workers`), the
//! same spelling used in the TOML file and in `KEEPSAKE__*` overrides.

/// A configuration file or override the pipeline cannot run with.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// What is wrong, starting with the dotted key when there is one
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a ConfigError at the caller's location.
    ///
    /// # Examples
    ///
    /// ```
    /// use keepsake_error::ConfigError;
    ///
    /// let err = ConfigError::new("Invalid compression profile: unknown codec");
    /// assert!(err.to_string().starts_with("Configuration Error: Invalid compression"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// A required key is absent or blank.
    ///
    /// ```
    /// use keepsake_error::ConfigError;
    ///
    /// let err = ConfigError::required("destinations.a");
    /// assert_eq!(err.message, "destinations.a is required");
    /// ```
    #[track_caller]
    pub fn required(key: &str) -> Self {
        Self::new(format!("{} is required", key))
    }

    /// A count or duration key is zero.
    #[track_caller]
    pub fn must_be_positive(key: &str) -> Self {
        Self::new(format!("{} must be greater than 0", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_point_at_the_validating_caller() {
        let err = ConfigError::must_be_positive("limits.workers");
        assert_eq!(err.message, "limits.workers must be greater than 0");
        assert!(err.file.ends_with("config.rs"));
        assert_eq!(err.line, line!() - 3);
    }
}
