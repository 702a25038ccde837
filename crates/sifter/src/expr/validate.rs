use crate::{
    expr::{Expr, MatchExpr, MatchOp, Selector},
    schema::{FieldConfiguration, FieldConfigurations, WILDCARD},
    value::{CoercionError, Value},
};
use thiserror::Error as ThisError;

///
/// Validation and preparation
///
/// Walks a parsed expression against the field configuration tree. Invalid
/// selectors and unsupported operators are rejected; raw literals are
/// coerced into typed values exactly once. After a successful pass the
/// evaluator may assume every precondition holds.
///

///
/// Limits
///
/// Resource bounds enforced during validation. Zero means unlimited.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Limits {
    pub max_matches: usize,
    pub max_raw_value_length: usize,
}

///
/// ValidateError
///
/// The expression does not fit the schema, or exceeds a resource bound.
/// The AST is unusable; nothing was partially prepared.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ValidateError {
    #[error("selector '{selector}' is not valid")]
    InvalidSelector { selector: Selector },

    #[error("operator {op} is not supported for selector '{selector}'")]
    UnsupportedOperator { selector: Selector, op: MatchOp },

    #[error("could not coerce value for selector '{selector}': {source}")]
    InvalidValue {
        selector: Selector,
        #[source]
        source: CoercionError,
    },

    #[error("operator {op} requires a value for selector '{selector}'")]
    MissingValue { selector: Selector, op: MatchOp },

    #[error("operator {op} takes no value for selector '{selector}'")]
    UnexpectedValue { selector: Selector, op: MatchOp },

    #[error("expression exceeds the limit of {limit} match expressions")]
    TooManyMatches { limit: usize },

    #[error("raw value for selector '{selector}' is {len} bytes; limit is {limit}")]
    RawValueTooLong {
        selector: Selector,
        len: usize,
        limit: usize,
    },
}

/// Validate an expression against the root configurations, coercing raw
/// literals in place. Validation is idempotent: re-running it on an
/// already-prepared expression produces the same result.
pub(crate) fn validate(
    expr: &mut Expr,
    fields: &FieldConfigurations,
    limits: Limits,
) -> Result<(), ValidateError> {
    let mut matches = 0_usize;
    validate_node(expr, fields, limits, &mut matches)
}

fn validate_node(
    expr: &mut Expr,
    fields: &FieldConfigurations,
    limits: Limits,
    matches: &mut usize,
) -> Result<(), ValidateError> {
    match expr {
        Expr::Not(inner) => validate_node(inner, fields, limits, matches),
        Expr::And(left, right) | Expr::Or(left, right) => {
            validate_node(left, fields, limits, matches)?;
            validate_node(right, fields, limits, matches)
        }
        Expr::Match(matcher) => validate_match(matcher, fields, limits, matches),
    }
}

fn validate_match(
    matcher: &mut MatchExpr,
    fields: &FieldConfigurations,
    limits: Limits,
    matches: &mut usize,
) -> Result<(), ValidateError> {
    *matches += 1;
    if limits.max_matches > 0 && *matches > limits.max_matches {
        return Err(ValidateError::TooManyMatches {
            limit: limits.max_matches,
        });
    }

    let terminal = walk_selector(&matcher.selector, fields)?;

    if !terminal.supports(matcher.op) {
        return Err(ValidateError::UnsupportedOperator {
            selector: matcher.selector.clone(),
            op: matcher.op,
        });
    }

    if !matcher.op.takes_value() {
        if matcher.value.is_some() {
            return Err(ValidateError::UnexpectedValue {
                selector: matcher.selector.clone(),
                op: matcher.op,
            });
        }

        return Ok(());
    }

    let Some(value) = matcher.value.as_mut() else {
        return Err(ValidateError::MissingValue {
            selector: matcher.selector.clone(),
            op: matcher.op,
        });
    };

    if limits.max_raw_value_length > 0 && value.raw.len() > limits.max_raw_value_length {
        return Err(ValidateError::RawValueTooLong {
            selector: matcher.selector.clone(),
            len: value.raw.len(),
            limit: limits.max_raw_value_length,
        });
    }

    value.converted = Some(match terminal.coerce {
        Some(scalar) => {
            scalar
                .coerce(&value.raw)
                .map_err(|source| ValidateError::InvalidValue {
                    selector: matcher.selector.clone(),
                    source,
                })?
        }
        // Hand-built configurations may admit a value-consuming operator
        // without declaring a coercion; the raw text is carried unchanged.
        None => Value::Text(value.raw.clone()),
    });

    Ok(())
}

// Walk the selector through the configuration tree, descending through the
// wildcard where a name has no direct binding.
fn walk_selector<'a>(
    selector: &Selector,
    fields: &'a FieldConfigurations,
) -> Result<&'a FieldConfiguration, ValidateError> {
    if selector.is_empty() {
        return Err(ValidateError::InvalidSelector {
            selector: selector.clone(),
        });
    }

    let mut current = fields;
    let mut terminal = None;
    for name in selector.iter() {
        let config = current.get(name).or_else(|| current.get(WILDCARD)).ok_or_else(|| {
            ValidateError::InvalidSelector {
                selector: selector.clone(),
            }
        })?;
        current = &config.sub_fields;
        terminal = Some(config);
    }

    Ok(terminal.expect("selector verified non-empty above"))
}

///
/// TESTS
///
