use iokit_validate::ValidateError;
use std::fmt;

/// A single argument whose value failed coercion or validation.
#[derive(Debug, Clone)]
pub struct FieldError {
    pub argument: String,
    pub error: ValidateError,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.argument, self.error)
    }
}

fn list_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_missing(names: &[String], errors: &[FieldError]) -> String {
    let mut out = format!("missing required argument(s): {}", names.join(", "));
    if !errors.is_empty() {
        out.push_str("; invalid argument value(s): ");
        out.push_str(&list_field_errors(errors));
    }
    out
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("argument '{name}' is already defined")]
    DuplicateArgument { name: String },

    #[error("invalid argument '{name}': {reason}")]
    InvalidSpec { name: String, reason: String },

    /// Required arguments had no value. `errors` holds the values rejected
    /// in the same pass, if any.
    #[error("{}", describe_missing(names, errors))]
    MissingArgument {
        names: Vec<String>,
        errors: Vec<FieldError>,
    },

    #[error("invalid argument value(s): {}", list_field_errors(.0))]
    InvalidArguments(Vec<FieldError>),

    #[error("input was cancelled")]
    Cancelled,

    #[error("{message}")]
    Parse { message: String, usage: String },

    /// Help was requested on the command line; carries the rendered text.
    #[error("help requested")]
    HelpRequested(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
