use thiserror::Error;

/// Classification shared by every [SnekError]. There is no "generic" kind,
/// every failure belongs to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Name,
    Evaluation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "SnekSyntaxError",
            Self::Name => "SnekNameError",
            Self::Evaluation => "SnekEvaluationError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnekError {
    #[error("SnekSyntaxError: {0}")]
    Syntax(String),

    #[error("SnekNameError: {0}")]
    Name(String),

    #[error("SnekEvaluationError: {0}")]
    Evaluation(String),

    // Reported apart from ordinary evaluation failures, but still classified
    // as an evaluation error
    #[error("SnekEvaluationError: maximum evaluation depth of {limit} exceeded")]
    RecursionLimit { limit: usize },
}

impl SnekError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::Name(_) => ErrorKind::Name,
            Self::Evaluation(_) | Self::RecursionLimit { .. } => ErrorKind::Evaluation,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    pub(crate) fn unbound(name: &str) -> Self {
        Self::Name(format!("'{}' is not defined", name))
    }

    pub(crate) fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }

    pub(crate) fn arity(name: &str, expected: usize, got: usize) -> Self {
        Self::Evaluation(format!("'{}' expects {} operand(s), got {}", name, expected, got))
    }
}
