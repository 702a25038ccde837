use crate::{
    error::Error,
    expr::{EvalError, Expr, Limits, ValidateError, eval, validate},
    schema::FieldConfigurations,
    traits::Filterable,
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// EvaluatorConfig
///
/// Resource bounds applied while preparing an expression. Bounded work per
/// evaluation is controlled here; evaluation itself has no knobs.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Maximum number of match expressions allowed; 0 means unlimited.
    /// Connectives do not count against this limit.
    pub max_matches: usize,
    /// Maximum byte length of any raw value; 0 means unlimited.
    pub max_raw_value_length: usize,
}

///
/// Evaluator
///
/// A validated expression bound to the configuration tree it was checked
/// against. Construction performs the one-time validation and coercion
/// pass; the result is immutable and freely shareable across threads, and
/// may evaluate independent values concurrently.
///

#[derive(Clone, Debug)]
pub struct Evaluator {
    fields: FieldConfigurations,
    expr: Expr,
}

impl Evaluator {
    /// Validate `expr` against `fields` with default (unlimited) bounds.
    pub fn new(expr: Expr, fields: FieldConfigurations) -> Result<Self, ValidateError> {
        Self::with_config(expr, fields, &EvaluatorConfig::default())
    }

    /// Validate `expr` against `fields`, enforcing the given bounds.
    pub fn with_config(
        mut expr: Expr,
        fields: FieldConfigurations,
        config: &EvaluatorConfig,
    ) -> Result<Self, ValidateError> {
        let limits = Limits {
            max_matches: config.max_matches,
            max_raw_value_length: config.max_raw_value_length,
        };
        validate(&mut expr, &fields, limits)?;

        Ok(Self { fields, expr })
    }

    /// Derive the schema from a host type, then validate `expr` against it.
    pub fn for_type<T: Filterable>(expr: Expr) -> Result<Self, Error> {
        let fields = FieldConfigurations::for_type::<T>()?;
        let evaluator = Self::new(expr, fields)?;

        Ok(evaluator)
    }

    /// Evaluate the expression against one value.
    pub fn evaluate(&self, datum: &Value) -> Result<bool, EvalError> {
        eval(&self.expr, datum, &self.fields)
    }

    #[must_use]
    pub const fn fields(&self) -> &FieldConfigurations {
        &self.fields
    }

    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }
}

///
/// TESTS
///
