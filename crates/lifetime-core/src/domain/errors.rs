/// Stage of an evaluation that failed. Each stage has its own process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifetimeErrorCategory {
    /// Inputs that cannot be evaluated: shape mismatches, unphysical values, bad decks.
    Input,
    /// Files that could not be read or written.
    Io,
    /// Numerical procedures that did not converge.
    Computation,
    Internal,
}

impl LifetimeErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Input => 2,
            Self::Io => 3,
            Self::Computation => 4,
            Self::Internal => 5,
        }
    }
}

/// Error shared by every calculator once it leaves its own module.
///
/// `code` is a stable dotted identifier (`INPUT.SHAPE`, `RUN.QUADRATURE`, ...)
/// that front ends print verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct LifetimeError {
    category: LifetimeErrorCategory,
    code: &'static str,
    message: String,
}

impl LifetimeError {
    pub fn new(
        category: LifetimeErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn input(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(LifetimeErrorCategory::Input, code, message)
    }

    pub fn io(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(LifetimeErrorCategory::Io, code, message)
    }

    pub fn computation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(LifetimeErrorCategory::Computation, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(LifetimeErrorCategory::Internal, code, message)
    }

    pub const fn category(&self) -> LifetimeErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    /// `ERROR: [CODE] message`, the first stderr line of a failed run.
    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: {self}")
    }

    pub fn exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}
