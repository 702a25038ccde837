//! Boolean filter-expression engine for structured values: derive a schema
//! from the shape of the data, validate and prepare an expression against
//! it once, then evaluate it against any number of values.
extern crate self as sifter;

pub mod error;
pub mod evaluator;
pub mod expr;
pub mod schema;
pub mod shape;
pub mod traits;
pub mod value;


pub use error::Error;
pub use sifter_derive::Filterable;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
///

pub mod prelude {
    pub use crate::{
        evaluator::{Evaluator, EvaluatorConfig},
        expr::{Expr, MatchOp, Selector},
        schema::{FieldConfiguration, FieldConfigurations},
        shape::{FieldShape, Shape},
        traits::{Evaluable, Filterable},
        value::{ScalarType, Value},
    };
}
