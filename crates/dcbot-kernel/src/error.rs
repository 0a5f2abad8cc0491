//! Kernel error types.
//!
//! Parsing, binding, and registration failures each get their own type so
//! the dispatcher can report exactly what went wrong with a command line.
//! [`KernelError`] is the single error returned by every public API in this
//! crate; the narrower types are wrapped inside it.

/// A quoted token was left open (or an escape dangled) in command text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot tokenize `{input}`: {reason}")]
pub struct ParseError {
    /// The raw text that failed to split.
    pub input: String,
    /// Human-readable reason reported by the splitter.
    pub reason: String,
}

/// A single token could not be converted into its declared type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, got `{token}`: {reason}")]
pub struct ConversionError {
    /// Name of the target type (e.g. `int`).
    pub expected: String,
    /// The offending raw token.
    pub token: String,
    /// Why the conversion failed.
    pub reason: String,
}

impl ConversionError {
    pub fn new(
        expected: impl Into<String>,
        token: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            expected: expected.into(),
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to turn a token stream into a complete argument mapping.
///
/// Binding is all-or-nothing: whenever one of these is returned, every
/// partial binding made so far has been discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// A token could not be converted for the named parameter.
    #[error("invalid value `{token}` for parameter `{param}`: {source}")]
    InvalidValue {
        param: String,
        token: String,
        #[source]
        source: ConversionError,
    },

    /// No flag or positional token was available for a required parameter.
    #[error("missing required argument `{param}`")]
    MissingArgument { param: String },

    /// A scalar flag was given but not followed by a value.
    #[error("flag `{param}` expects a value")]
    MissingFlagValue { param: String },
}

impl BindError {
    /// The parameter this failure refers to.
    pub fn param(&self) -> &str {
        match self {
            Self::InvalidValue { param, .. }
            | Self::MissingArgument { param }
            | Self::MissingFlagValue { param } => param,
        }
    }
}

/// Unified error type for the dcbot kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Input errors -------------------------------------------------------
    /// Malformed quoting in command text.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Tokens could not be bound to the command's parameters.
    #[error(transparent)]
    Bind(#[from] BindError),

    // -- Registration errors ------------------------------------------------
    /// Two commands resolve to the same `prefix + name` key.
    #[error("command `{key}` is already registered")]
    DuplicateCommand { key: String },

    /// A handler declares the same parameter name twice.
    #[error("command `{command}` declares parameter `{param}` more than once")]
    DuplicateParameter { command: String, param: String },

    /// A command name is empty or contains whitespace, so it could never be
    /// matched against the head of a message.
    #[error("invalid command name `{name}`")]
    InvalidCommandName { name: String },

    // -- Invocation errors --------------------------------------------------
    /// The command handler itself returned an error.
    #[error("command `{command}` failed: {source}")]
    InvocationFailed {
        command: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A handler asked for an argument that was never bound.
    #[error("no argument named `{name}`")]
    UnknownArgument { name: String },

    /// A bound argument does not have the type the handler asked for.
    #[error("argument `{name}` is not a {expected}")]
    ArgumentType { name: String, expected: &'static str },
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
