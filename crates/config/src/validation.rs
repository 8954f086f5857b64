//! Validation helpers for the settings file
//!
//! Every settings section implements [`ConfigSection`]; validation collects all
//! problems instead of stopping at the first one.

pub use crate::error::ValidationError;

/// A settings section that can validate itself
pub trait ConfigSection: Default {
    /// Returns every problem found; `Ok` means valid
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Returns the section name for error reporting
    fn section_name(&self) -> &'static str;
}

/// Common validators for settings values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within a range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Validates that a string is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Validates that a command template mentions every required placeholder
    pub fn has_placeholders(
        template: &str,
        placeholders: &[&str],
        field: &str,
    ) -> Result<(), ValidationError> {
        let missing: Vec<&str> = placeholders
            .iter()
            .copied()
            .filter(|p| !template.contains(p))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::with_value(
                field,
                format!("must contain {}", missing.join(", ")),
                template,
            ))
        }
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range() {
        assert!(Validator::in_range(50, 0, 100, "test").is_ok());
        assert!(Validator::in_range(0, 0, 100, "test").is_ok());
        assert!(Validator::in_range(101, 0, 100, "test").is_err());
    }

    #[test]
    fn test_not_empty() {
        assert!(Validator::not_empty("  odmpy  ", "test").is_ok());
        assert!(Validator::not_empty("   ", "test").is_err());
    }

    #[test]
    fn test_has_placeholders() {
        assert!(
            Validator::has_placeholders("run -i={loan_id}", &["{loan_id}"], "cmd").is_ok()
        );
        let err = Validator::has_placeholders("run", &["{loan_id}", "{website_id}"], "cmd")
            .unwrap_err();
        assert!(err.message.contains("{loan_id}, {website_id}"));
    }

    #[test]
    fn test_collect_errors_some_err() {
        let results = vec![
            Ok(()),
            Err(ValidationError::new("field1", "error1")),
            Ok(()),
            Err(ValidationError::new("field2", "error2")),
        ];
        let errors = Validator::collect_errors(results).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
