use miette::{Diagnostic, SourceSpan};
use smol_str::SmolStr;
use thiserror::Error;

/// A failure caused by the author's expression text. Always captured into a
/// [`crate::RecompileOutcome`], never raised past the recompiler.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(flowexpr::source_expression))]
pub struct SourceDiagnostic {
    pub message: String,
    #[source_code]
    pub expression_text: String,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl SourceDiagnostic {
    pub fn new(expression_text: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expression_text: expression_text.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, offset: usize, length: usize) -> Self {
        self.span = Some((offset, length).into());
        self
    }

    /// Diagnostic for a well-typed expression that is not an assignable location.
    pub fn invalid_location(expression_text: &str, fragment: Option<&str>) -> Self {
        let mut detail = "Invalid L-value expression.".to_string();
        if let Some(fragment) = fragment {
            detail.push(':');
            detail.push_str(fragment);
        }
        Self::new(
            expression_text,
            format!("Compiler error(s) encountered processing expression \"{expression_text}\". {detail}"),
        )
    }
}

/// Fatal, programming-error-class failures. These are propagated to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum RecompileError {
    #[error("Expression language mismatch: expected `{expected}`, found `{found}`")]
    #[diagnostic(code(flowexpr::language_mismatch))]
    LanguageMismatch { expected: SmolStr, found: SmolStr },

    #[error("Expression compiler failure: {0}")]
    #[diagnostic(code(flowexpr::backend_failure))]
    Backend(String),

    #[error("No expression factory can be resolved for type `{type_name}`")]
    #[diagnostic(code(flowexpr::factory_unavailable))]
    FactoryUnavailable { type_name: String },

    #[error("Expression factory for type `{type_name}` failed: {reason}")]
    #[diagnostic(code(flowexpr::factory_failed))]
    FactoryFailed { type_name: String, reason: String },

    #[error("Type is not part of the type universe")]
    #[diagnostic(code(flowexpr::unknown_type))]
    UnknownType,
}

pub type Result<T> = std::result::Result<T, RecompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_location_message() {
        let diagnostic = SourceDiagnostic::invalid_location("1 + 1", None);
        assert_eq!(
            diagnostic.to_string(),
            "Compiler error(s) encountered processing expression \"1 + 1\". Invalid L-value expression."
        );
        assert_eq!(diagnostic.expression_text, "1 + 1");

        let diagnostic = SourceDiagnostic::invalid_location("c.Id", Some("member `Id` is read-only"));
        assert!(diagnostic.to_string().ends_with("Invalid L-value expression.:member `Id` is read-only"));
    }

    #[test]
    fn test_with_span() {
        let diagnostic = SourceDiagnostic::new("x +", "unexpected end of expression").with_span(2, 1);
        assert_eq!(diagnostic.span, Some(SourceSpan::from((2, 1))));
    }
}
