//! Error types for the QuEST test harness

use quest_types::TypesError;
use thiserror::Error;

use crate::backend::RegisterId;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Everything that can stop a test file, a call, or a session
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Bad argument list in {func} expected {expected}, recieved {received}")]
    ArgumentCount {
        func: String,
        expected: usize,
        received: usize,
    },

    #[error("Bad arguments in function {func}: {reason}")]
    BadArguments { func: String, reason: String },

    #[error("{message} in {file} at line {line}")]
    File {
        message: String,
        file: String,
        line: usize,
    },

    /// Register initialisation problem not yet tied to a file position
    #[error("{0}")]
    Init(String),

    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Function {0} does not exist")]
    UnknownFunction(String),

    #[error("Unrecognised type {ty} requested in function {func}")]
    UnknownType { ty: String, func: String },

    #[error("{0} already defined")]
    DuplicateFunction(String),

    #[error("{0} not found in QuEST API")]
    MissingSymbol(String),

    #[error("A and B are not both density matrices")]
    NotBothDensity,

    #[error("A and B registers are not the same size")]
    SizeMismatch,

    #[error("Cannot test type {0} currently")]
    UnsupportedReturn(String),

    #[error("No call shape for {name} with signature {signature}")]
    UnsupportedSignature { name: String, signature: String },

    #[error("Unknown register {0}")]
    UnknownRegister(RegisterId),

    #[error("Unrecognised filetype in test run of file {0}")]
    UnrecognisedFiletype(String),

    #[error("Failed to load library '{path}': {reason}")]
    Library { path: String, reason: String },

    #[error("Invalid signature for {name}: {reason}")]
    Signature { name: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub(crate) fn file(message: impl Into<String>, file: &str, line: usize) -> Self {
        Self::File {
            message: message.into(),
            file: file.to_string(),
            line,
        }
    }
}
