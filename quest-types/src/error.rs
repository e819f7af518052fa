//! Tipos de erro para quest-types

use thiserror::Error;

/// Resultado customizado para conversões de tokens
pub type TypesResult<T> = Result<T, TypesError>;

/// Erros ao converter tokens de texto em valores C
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypesError {
    #[error("Bad array in input file: {0:?}")]
    BadArray(String),

    #[error("Bad {kind} in input file: expected {expected} values, received {received}")]
    WrongLength {
        kind: &'static str,
        expected: usize,
        received: usize,
    },
}
