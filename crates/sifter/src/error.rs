use crate::{
    expr::{EvalError, ValidateError},
    schema::SchemaError,
};
use thiserror::Error as ThisError;

///
/// Error
///
/// Aggregate error for callers that drive the whole pipeline (schema
/// derivation, validation, evaluation) through one surface.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
