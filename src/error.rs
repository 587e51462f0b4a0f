// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for function resolution and expression evaluation
//!
//! Two families are kept strictly apart: [`ResolutionError`] is raised while a
//! query is being compiled and never during evaluation, [`EvaluationError`] is
//! raised only when an expression runs against real bindings.

use std::fmt;
use thiserror::Error;

/// Result type for function resolution
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Result type for expression evaluation
pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Stable diagnostic code (SP0001, SP0002, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Numeric code
    pub code: u16,
}

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self { code }
    }

    /// Get the full error code string (e.g., "SP0001")
    pub fn code_str(&self) -> String {
        format!("SP{:04}", self.code)
    }

    /// Whether the code belongs to the compile-time (resolution) range
    pub fn is_resolution(&self) -> bool {
        (1..=50).contains(&self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SP{:04}", self.code)
    }
}

// Resolution errors (SP0001-SP0050)
/// Function matched but no arity shape fits
pub const SP0001: ErrorCode = ErrorCode::new(1);
/// Function matched an explicitly unsupported entry
pub const SP0002: ErrorCode = ErrorCode::new(2);
/// No provider recognised the function URI
pub const SP0003: ErrorCode = ErrorCode::new(3);
/// Argument has the wrong shape for the function
pub const SP0004: ErrorCode = ErrorCode::new(4);

// Evaluation errors (SP0051-SP0100)
/// Variable is not bound for the binding
pub const SP0051: ErrorCode = ErrorCode::new(51);
/// Operand has the wrong term type
pub const SP0052: ErrorCode = ErrorCode::new(52);
/// Operand is not numeric
pub const SP0053: ErrorCode = ErrorCode::new(53);
/// Literal lexical form is invalid for its datatype
pub const SP0054: ErrorCode = ErrorCode::new(54);
/// Value outside the function's domain
pub const SP0055: ErrorCode = ErrorCode::new(55);
/// Regular expression failed to compile
pub const SP0056: ErrorCode = ErrorCode::new(56);
/// Division by zero
pub const SP0057: ErrorCode = ErrorCode::new(57);
/// Placeholder for an unresolved extension function
pub const SP0058: ErrorCode = ErrorCode::new(58);
/// Aggregate evaluated without a group
pub const SP0059: ErrorCode = ErrorCode::new(59);
/// EXISTS evaluated by a context that cannot answer graph patterns
pub const SP0060: ErrorCode = ErrorCode::new(60);

/// Errors raised while turning a function reference into an expression node
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// Namespace and name matched but the argument count is not accepted
    #[error("Incorrect number of arguments for the {function}() function: expected {expected}, got {actual}")]
    UnsupportedArity {
        /// Function name as written in its vocabulary
        function: String,
        /// Accepted shape(s), human readable
        expected: String,
        /// Number of arguments supplied
        actual: usize,
    },

    /// Namespace and name matched an entry this vocabulary does not support
    #[error("The {function}() function is not supported")]
    UnsupportedFunction {
        /// Function name as written in its vocabulary
        function: String,
    },

    /// Nothing recognised the URI and unknown functions are not allowed
    #[error("Unknown function <{uri}>: no registered provider can resolve it")]
    UnresolvedFunction {
        /// The function URI
        uri: String,
    },

    /// An argument has a shape the function cannot accept
    #[error("Invalid argument for the {function}() function: {message}")]
    InvalidArgument {
        /// Function name
        function: String,
        /// What is wrong
        message: String,
    },
}

impl ResolutionError {
    /// Create an arity error
    pub fn arity(function: impl Into<String>, expected: impl fmt::Display, actual: usize) -> Self {
        Self::UnsupportedArity {
            function: function.into(),
            expected: expected.to_string(),
            actual,
        }
    }

    /// Create an unsupported-function error
    pub fn unsupported(function: impl Into<String>) -> Self {
        Self::UnsupportedFunction {
            function: function.into(),
        }
    }

    /// Create an unresolved-function error
    pub fn unresolved(uri: impl Into<String>) -> Self {
        Self::UnresolvedFunction { uri: uri.into() }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedArity { .. } => SP0001,
            Self::UnsupportedFunction { .. } => SP0002,
            Self::UnresolvedFunction { .. } => SP0003,
            Self::InvalidArgument { .. } => SP0004,
        }
    }
}

/// Errors raised while evaluating an expression against a binding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// Variable has no value in the binding
    #[error("Variable ?{name} is not bound")]
    UnboundVariable {
        /// Variable name without the leading '?'
        name: String,
    },

    /// Operand has the wrong kind of term
    #[error("Type error: expected {expected}, got {actual}")]
    TypeError {
        /// Expected kind of term
        expected: String,
        /// What was found
        actual: String,
    },

    /// Operand is not a recognised numeric literal
    #[error("Cannot evaluate {function}: operand {actual} is not numeric")]
    NotNumeric {
        /// Function or operator name
        function: String,
        /// Offending operand
        actual: String,
    },

    /// Literal lexical form is invalid for its datatype
    #[error("Invalid lexical form '{lexical}' for datatype <{datatype}>")]
    InvalidLexicalForm {
        /// Lexical form
        lexical: String,
        /// Datatype IRI
        datatype: String,
    },

    /// Value outside the domain of the function
    #[error("Domain error in {function}: {message}")]
    DomainError {
        /// Function name
        function: String,
        /// Error message
        message: String,
    },

    /// Regular expression could not be compiled
    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern text
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// Integer or decimal division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Placeholder node for a function no provider could resolve
    #[error("Function <{uri}> is unknown and cannot be evaluated")]
    UnknownFunction {
        /// Function URI
        uri: String,
    },

    /// Aggregate evaluated where the context defines no group
    #[error("Aggregate {aggregate} cannot be evaluated outside of a group")]
    AggregateOutsideGroup {
        /// Aggregate functor
        aggregate: String,
    },

    /// Context cannot evaluate graph patterns
    #[error("EXISTS cannot be evaluated by this evaluation context")]
    ExistsUnsupported,
}

impl EvaluationError {
    /// Create a type error
    pub fn type_error(expected: impl Into<String>, actual: impl fmt::Display) -> Self {
        Self::TypeError {
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }

    /// Create a not-numeric error
    pub fn not_numeric(function: impl Into<String>, actual: impl fmt::Display) -> Self {
        Self::NotNumeric {
            function: function.into(),
            actual: actual.to_string(),
        }
    }

    /// Create a domain error
    pub fn domain(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DomainError {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnboundVariable { .. } => SP0051,
            Self::TypeError { .. } => SP0052,
            Self::NotNumeric { .. } => SP0053,
            Self::InvalidLexicalForm { .. } => SP0054,
            Self::DomainError { .. } => SP0055,
            Self::InvalidPattern { .. } => SP0056,
            Self::DivisionByZero => SP0057,
            Self::UnknownFunction { .. } => SP0058,
            Self::AggregateOutsideGroup { .. } => SP0059,
            Self::ExistsUnsupported => SP0060,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ResolutionError::arity("ABS", "exactly 1 argument", 2);
        assert_eq!(err.error_code().code_str(), "SP0001");
        assert!(err.error_code().is_resolution());

        let err = EvaluationError::DivisionByZero;
        assert_eq!(err.error_code().to_string(), "SP0057");
        assert!(!err.error_code().is_resolution());
    }

    #[test]
    fn test_messages() {
        let err = ResolutionError::arity("ABS", "exactly 1 argument", 2);
        assert_eq!(
            err.to_string(),
            "Incorrect number of arguments for the ABS() function: expected exactly 1 argument, got 2"
        );

        let err = EvaluationError::UnboundVariable {
            name: "x".to_string(),
        };
        assert_eq!(err.to_string(), "Variable ?x is not bound");
    }
}
