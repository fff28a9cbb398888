//! Result type alias for Formex

use super::errors::FormexError;

/// Result type alias for Formex operations
///
/// # Examples
///
/// ```
/// use formex::domain::result::Result;
/// use formex::domain::errors::FormexError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(FormexError::Export("nothing to export".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, FormexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
