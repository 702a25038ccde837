use crate::{
    expr::{Expr, MatchExpr, MatchOp, Selector},
    schema::{FieldConfigurations, WILDCARD},
    value::Value,
};
use thiserror::Error as ThisError;

///
/// Evaluation
///
/// Executes a validated expression against one value. Evaluation is pure:
/// no I/O, no caching, no mutation of the data. Connectives short-circuit
/// left to right and errors from the left side win. Traversal strips
/// pointer indirection at every step and delegates to self-describing
/// values wherever one is encountered.
///
/// CONTRACT: expressions reach this module through validation only; a
/// structurally impossible traversal means the data does not conform to
/// the schema the expression was validated against, and surfaces as an
/// `EvalError` rather than a panic.
///

///
/// EvalError
///
/// Traversal hit a value the validated expression cannot apply to.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum EvalError {
    #[error("value at selector '{selector}' of kind {kind} does not support nested selection")]
    CannotNest {
        selector: Selector,
        kind: &'static str,
    },

    #[error("cannot perform in/contains on kind {kind} for selector '{selector}'")]
    CannotContain {
        selector: Selector,
        kind: &'static str,
    },

    #[error("operator {op} cannot be applied to kind {kind} at selector '{selector}'")]
    CannotApply {
        selector: Selector,
        op: MatchOp,
        kind: &'static str,
    },

    #[error("no configuration for name '{name}' under selector '{selector}'")]
    MissingConfiguration { selector: Selector, name: String },

    #[error("record has no field '{name}' at selector '{selector}'")]
    MissingField { selector: Selector, name: String },

    #[error("no prepared value for operator {op} at selector '{selector}'")]
    UnpreparedValue { selector: Selector, op: MatchOp },
}

/// Evaluate a validated expression against one value.
pub(crate) fn eval(
    expr: &Expr,
    datum: &Value,
    fields: &FieldConfigurations,
) -> Result<bool, EvalError> {
    match expr {
        Expr::Not(inner) => Ok(!eval(inner, datum, fields)?),
        Expr::And(left, right) => {
            if !eval(left, datum, fields)? {
                return Ok(false);
            }

            eval(right, datum, fields)
        }
        Expr::Or(left, right) => {
            if eval(left, datum, fields)? {
                return Ok(true);
            }

            eval(right, datum, fields)
        }
        Expr::Match(matcher) => eval_match(matcher, datum, fields),
    }
}

fn eval_match(
    matcher: &MatchExpr,
    datum: &Value,
    fields: &FieldConfigurations,
) -> Result<bool, EvalError> {
    let datum = datum.target();

    if let Value::Evaluable(inner) = datum {
        return inner.evaluate_match(matcher.selector.as_slice(), matcher.op, match_value(matcher));
    }

    eval_match_at(matcher, 0, datum, fields)
}

// Recursive traversal: `depth` names of the selector have been consumed and
// `value` is the value reached so far.
fn eval_match_at(
    matcher: &MatchExpr,
    depth: usize,
    value: &Value,
    fields: &FieldConfigurations,
) -> Result<bool, EvalError> {
    let value = value.target();

    if depth >= matcher.selector.len() {
        return eval_op(matcher, value);
    }

    match value {
        Value::Record(entries) => {
            let name = matcher.selector.get(depth).expect("depth bounded above");
            let config =
                fields
                    .get(name)
                    .ok_or_else(|| EvalError::MissingConfiguration {
                        selector: matcher.selector.prefix(depth),
                        name: name.to_string(),
                    })?;

            let field_name = config.record_field.as_deref().unwrap_or(name);
            let field_value =
                entries
                    .get(field_name)
                    .ok_or_else(|| EvalError::MissingField {
                        selector: matcher.selector.prefix(depth),
                        name: field_name.to_string(),
                    })?;
            let field_value = field_value.target();

            if let Value::Evaluable(inner) = field_value {
                return inner.evaluate_match(
                    &matcher.selector.as_slice()[depth + 1..],
                    matcher.op,
                    match_value(matcher),
                );
            }

            eval_match_at(matcher, depth + 1, field_value, &config.sub_fields)
        }
        Value::List(items) => {
            // Existential semantics: the same selector depth is applied to
            // every element and the first truthy result wins.
            for item in items {
                if eval_match_at(matcher, depth, item, fields)? {
                    return Ok(true);
                }
            }

            Ok(false)
        }
        Value::Map(_) => {
            let key = matcher.selector.get(depth).expect("depth bounded above");

            let Some(entry) = value.map_value(key) else {
                // Absent-key convention: a missing key is not equal to
                // anything, contains nothing, and is empty.
                return Ok(absent_key_answer(matcher.op));
            };
            let entry = entry.target();

            if let Value::Evaluable(inner) = entry {
                return inner.evaluate_match(
                    &matcher.selector.as_slice()[depth + 1..],
                    matcher.op,
                    match_value(matcher),
                );
            }

            let wildcard =
                fields
                    .get(WILDCARD)
                    .ok_or_else(|| EvalError::MissingConfiguration {
                        selector: matcher.selector.prefix(depth),
                        name: WILDCARD.to_string(),
                    })?;

            eval_match_at(matcher, depth + 1, entry, &wildcard.sub_fields)
        }
        other => Err(EvalError::CannotNest {
            selector: matcher.selector.prefix(depth),
            kind: other.kind_name(),
        }),
    }
}

// Apply the operator at the end of the selector.
fn eval_op(matcher: &MatchExpr, value: &Value) -> Result<bool, EvalError> {
    match matcher.op {
        MatchOp::Eq => op_equal(matcher, value),
        MatchOp::Ne => op_equal(matcher, value).map(|matched| !matched),
        MatchOp::In => op_in(matcher, value),
        MatchOp::NotIn => op_in(matcher, value).map(|matched| !matched),
        MatchOp::IsEmpty => op_is_empty(matcher, value),
        MatchOp::IsNotEmpty => op_is_empty(matcher, value).map(|empty| !empty),
    }
}

fn op_equal(matcher: &MatchExpr, value: &Value) -> Result<bool, EvalError> {
    let needle = required_value(matcher)?;

    Ok(needle == value)
}

fn op_in(matcher: &MatchExpr, value: &Value) -> Result<bool, EvalError> {
    let needle = required_value(matcher)?;

    match value {
        Value::Map(entries) => Ok(entries.iter().any(|(key, _)| key == needle)),
        Value::List(items) => Ok(items.iter().any(|item| item == needle)),
        Value::Text(text) => match needle.as_text() {
            Some(fragment) => Ok(text.contains(fragment)),
            None => Err(EvalError::CannotContain {
                selector: matcher.selector.clone(),
                kind: needle.kind_name(),
            }),
        },
        other => Err(EvalError::CannotContain {
            selector: matcher.selector.clone(),
            kind: other.kind_name(),
        }),
    }
}

fn op_is_empty(matcher: &MatchExpr, value: &Value) -> Result<bool, EvalError> {
    value.is_empty().ok_or_else(|| EvalError::CannotApply {
        selector: matcher.selector.clone(),
        op: matcher.op,
        kind: value.kind_name(),
    })
}

// Truth table for operators applied through a missing map key. Whatever
// was looked for cannot be equal because it does not exist; likewise it
// cannot be in a container, and every absent container is empty.
const fn absent_key_answer(op: MatchOp) -> bool {
    match op {
        MatchOp::Eq | MatchOp::In | MatchOp::IsNotEmpty => false,
        MatchOp::Ne | MatchOp::NotIn | MatchOp::IsEmpty => true,
    }
}

fn match_value(matcher: &MatchExpr) -> Option<&Value> {
    matcher.value.as_ref().and_then(|value| value.converted.as_ref())
}

fn required_value(matcher: &MatchExpr) -> Result<&Value, EvalError> {
    match_value(matcher).ok_or_else(|| EvalError::UnpreparedValue {
        selector: matcher.selector.clone(),
        op: matcher.op,
    })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        evaluator::Evaluator,
        expr::ValidateError,
        schema::{FieldConfiguration, SchemaError},
        shape::{FieldShape, Shape},
        traits::Evaluable,
        value::ScalarType,
    };
    use std::{
        collections::BTreeMap,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    fn person_shape() -> Shape {
        Shape::Record(vec![
            FieldShape::new("name", Shape::Scalar(ScalarType::Text)),
            FieldShape::new("age", Shape::Scalar(ScalarType::Int64)),
            FieldShape::new("tags", Shape::List(Box::new(Shape::Scalar(ScalarType::Text)))),
            FieldShape::new(
                "meta",
                Shape::Map {
                    key: Box::new(Shape::Scalar(ScalarType::Text)),
                    value: Box::new(Shape::Scalar(ScalarType::Text)),
                },
            ),
            FieldShape::new(
                "users",
                Shape::List(Box::new(Shape::Record(vec![FieldShape::new(
                    "name",
                    Shape::Scalar(ScalarType::Text),
                )]))),
            ),
        ])
    }

    fn person_datum() -> Value {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::Text("alice".into()));
        fields.insert("age".to_string(), Value::Int64(30));
        fields.insert(
            "tags".to_string(),
            Value::List(vec![
                Value::Text("red".into()),
                Value::Text("green".into()),
                Value::Text("blue".into()),
            ]),
        );
        fields.insert(
            "meta".to_string(),
            Value::Map(vec![(
                Value::Text("env".into()),
                Value::Text("prod".into()),
            )]),
        );
        fields.insert(
            "users".to_string(),
            Value::List(vec![
                Value::Record(BTreeMap::from([(
                    "name".to_string(),
                    Value::Text("a".into()),
                )])),
                Value::Record(BTreeMap::from([(
                    "name".to_string(),
                    Value::Text("b".into()),
                )])),
            ]),
        );

        Value::Record(fields)
    }

    fn check(expr: Expr, expected: bool) {
        let fields = FieldConfigurations::for_shape(&person_shape()).unwrap();
        let evaluator = Evaluator::new(expr, fields).unwrap();
        assert_eq!(evaluator.evaluate(&person_datum()), Ok(expected));
    }

    #[test]
    fn equality_and_conjunction() {
        check(Expr::eq("name", "alice").and(Expr::ne("age", "40")), true);
        check(Expr::eq("name", "alice").and(Expr::eq("age", "40")), false);
        check(Expr::eq("name", "bob").or(Expr::eq("age", "30")), true);
        check(Expr::eq("name", "bob").not(), true);
    }

    #[test]
    fn membership_in_primitive_lists() {
        check(Expr::in_("tags", "green"), true);
        check(Expr::in_("tags", "yellow"), false);
        check(Expr::not_in("tags", "yellow"), true);
    }

    #[test]
    fn membership_in_map_keys_and_nested_values() {
        check(Expr::in_("meta", "env"), true);
        check(Expr::in_("meta", "region"), false);
        check(Expr::eq("meta.env", "prod"), true);
        check(Expr::ne("meta.env", "prod"), false);
    }

    #[test]
    fn absent_map_keys_follow_the_convention() {
        check(Expr::eq("meta.missing", "x"), false);
        check(Expr::ne("meta.missing", "x"), true);
        check(Expr::is_empty("meta.missing"), true);
        check(Expr::is_not_empty("meta.missing"), false);
        check(Expr::in_("meta.missing", "x"), false);
        check(Expr::not_in("meta.missing", "x"), true);
    }

    #[test]
    fn emptiness_of_collections() {
        check(Expr::is_empty("tags"), false);
        check(Expr::is_not_empty("tags"), true);
        check(Expr::is_empty("meta"), false);

        let fields = FieldConfigurations::for_shape(&person_shape()).unwrap();
        let evaluator = Evaluator::new(Expr::is_empty("tags"), fields).unwrap();
        let mut datum_fields = BTreeMap::new();
        datum_fields.insert("tags".to_string(), Value::List(vec![]));
        assert_eq!(
            evaluator.evaluate(&Value::Record(datum_fields)),
            Ok(true)
        );
    }

    #[test]
    fn lists_descend_existentially_through_records() {
        check(Expr::eq("users.name", "b"), true);
        check(Expr::eq("users.name", "z"), false);
    }

    #[test]
    fn pointers_are_stripped_during_traversal() {
        let fields = FieldConfigurations::for_shape(&person_shape()).unwrap();
        let evaluator = Evaluator::new(Expr::eq("name", "alice"), fields).unwrap();

        let mut datum_fields = BTreeMap::new();
        datum_fields.insert(
            "name".to_string(),
            Value::Pointer(Box::new(Value::Text("alice".into()))),
        );
        let datum = Value::Pointer(Box::new(Value::Record(datum_fields)));

        assert_eq!(evaluator.evaluate(&datum), Ok(true));
    }

    #[test]
    fn substring_containment_on_text_terminals() {
        // Hand-built configuration admitting `in` on a text field, which
        // the structural deriver never produces.
        let fields: FieldConfigurations = [(
            "title".to_string(),
            FieldConfiguration {
                coerce: Some(ScalarType::Text),
                ops: vec![MatchOp::In, MatchOp::NotIn],
                ..FieldConfiguration::default()
            },
        )]
        .into_iter()
        .collect();

        let evaluator = Evaluator::new(Expr::in_("title", "meta"), fields).unwrap();
        let mut datum_fields = BTreeMap::new();
        datum_fields.insert(
            "title".to_string(),
            Value::Text("metamorphosis".into()),
        );

        assert_eq!(evaluator.evaluate(&Value::Record(datum_fields)), Ok(true));
    }

    #[test]
    fn nesting_into_a_primitive_is_a_runtime_error() {
        // The schema says "deep" is a nested map, but the data carries text.
        let fields: FieldConfigurations = [(
            "deep".to_string(),
            FieldConfiguration {
                sub_fields: [(
                    "inner".to_string(),
                    FieldConfiguration {
                        coerce: Some(ScalarType::Text),
                        ops: vec![MatchOp::Eq, MatchOp::Ne],
                        ..FieldConfiguration::default()
                    },
                )]
                .into_iter()
                .collect(),
                ..FieldConfiguration::default()
            },
        )]
        .into_iter()
        .collect();

        let evaluator = Evaluator::new(Expr::eq("deep.inner", "x"), fields).unwrap();
        let mut datum_fields = BTreeMap::new();
        datum_fields.insert("deep".to_string(), Value::Text("not nested".into()));

        assert_eq!(
            evaluator.evaluate(&Value::Record(datum_fields)),
            Err(EvalError::CannotNest {
                selector: Selector::from("deep"),
                kind: "text",
            })
        );
    }

    #[test]
    fn error_on_the_left_short_circuits_the_connective() {
        let fields: FieldConfigurations = [(
            "deep".to_string(),
            FieldConfiguration {
                sub_fields: [(
                    "inner".to_string(),
                    FieldConfiguration {
                        coerce: Some(ScalarType::Text),
                        ops: vec![MatchOp::Eq, MatchOp::Ne],
                        ..FieldConfiguration::default()
                    },
                )]
                .into_iter()
                .collect(),
                ..FieldConfiguration::default()
            },
        )]
        .into_iter()
        .collect();

        let expr = Expr::eq("deep.inner", "x").and(Expr::ne("deep.inner", "x"));
        let evaluator = Evaluator::new(expr, fields).unwrap();
        let mut datum_fields = BTreeMap::new();
        datum_fields.insert("deep".to_string(), Value::Int(1));

        assert!(matches!(
            evaluator.evaluate(&Value::Record(datum_fields)),
            Err(EvalError::CannotNest { .. })
        ));
    }

    ///
    /// Probe
    ///
    /// Counting evaluable used to observe delegation and short-circuiting.
    ///

    #[derive(Debug, Default)]
    struct Probe {
        hits: AtomicUsize,
        answer: bool,
    }

    impl Probe {
        fn configurations() -> FieldConfigurations {
            [(
                "calls".to_string(),
                FieldConfiguration {
                    coerce: Some(ScalarType::Text),
                    ops: vec![MatchOp::Eq, MatchOp::Ne],
                    ..FieldConfiguration::default()
                },
            )]
            .into_iter()
            .collect()
        }
    }

    impl Evaluable for Probe {
        fn field_configurations(&self) -> FieldConfigurations {
            Self::configurations()
        }

        fn evaluate_match(
            &self,
            _selector: &[String],
            _op: MatchOp,
            _value: Option<&Value>,
        ) -> Result<bool, EvalError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    fn probe_fields() -> FieldConfigurations {
        [
            (
                "flag".to_string(),
                FieldConfiguration {
                    coerce: Some(ScalarType::Bool),
                    ops: vec![MatchOp::Eq, MatchOp::Ne],
                    ..FieldConfiguration::default()
                },
            ),
            (
                "probe".to_string(),
                FieldConfiguration {
                    sub_fields: Probe::configurations(),
                    ..FieldConfiguration::default()
                },
            ),
        ]
        .into_iter()
        .collect()
    }

    fn probe_datum(probe: &Arc<Probe>, flag: bool) -> Value {
        let evaluable: Arc<dyn Evaluable> = Arc::clone(probe) as Arc<dyn Evaluable>;
        let mut fields = BTreeMap::new();
        fields.insert("flag".to_string(), Value::Bool(flag));
        fields.insert("probe".to_string(), Value::Evaluable(evaluable));

        Value::Record(fields)
    }

    #[test]
    fn and_short_circuits_on_false_left() {
        let probe = Arc::new(Probe {
            answer: true,
            ..Probe::default()
        });
        let expr = Expr::eq("flag", "true").and(Expr::eq("probe.calls", "1"));
        let evaluator = Evaluator::new(expr, probe_fields()).unwrap();

        assert_eq!(evaluator.evaluate(&probe_datum(&probe, false)), Ok(false));
        assert_eq!(probe.hits.load(Ordering::SeqCst), 0);

        assert_eq!(evaluator.evaluate(&probe_datum(&probe, true)), Ok(true));
        assert_eq!(probe.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn or_short_circuits_on_true_left() {
        let probe = Arc::new(Probe {
            answer: true,
            ..Probe::default()
        });
        let expr = Expr::ne("flag", "false").or(Expr::eq("probe.calls", "1"));
        let evaluator = Evaluator::new(expr, probe_fields()).unwrap();

        assert_eq!(evaluator.evaluate(&probe_datum(&probe, true)), Ok(true));
        assert_eq!(probe.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn evaluable_at_the_root_receives_the_whole_selector() {
        #[derive(Debug)]
        struct Recorder {
            seen: std::sync::Mutex<Vec<String>>,
        }

        impl Evaluable for Recorder {
            fn field_configurations(&self) -> FieldConfigurations {
                Probe::configurations()
            }

            fn evaluate_match(
                &self,
                selector: &[String],
                _op: MatchOp,
                value: Option<&Value>,
            ) -> Result<bool, EvalError> {
                let mut seen = self.seen.lock().unwrap();
                seen.extend(selector.iter().cloned());
                Ok(value == Some(&Value::Text("1".into())))
            }
        }

        let recorder = Arc::new(Recorder {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let fields =
            FieldConfigurations::for_shape(&Shape::Evaluable(Probe::configurations())).unwrap();
        let evaluator = Evaluator::new(Expr::eq("calls", "1"), fields).unwrap();

        let datum = Value::Evaluable(Arc::clone(&recorder) as Arc<dyn Evaluable>);
        assert_eq!(evaluator.evaluate(&datum), Ok(true));
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["calls".to_string()]);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let fields = FieldConfigurations::for_shape(&person_shape()).unwrap();
        let expr = Expr::eq("name", "alice").and(Expr::in_("tags", "green"));
        let evaluator = Evaluator::new(expr, fields).unwrap();
        let datum = person_datum();

        let first = evaluator.evaluate(&datum);
        let second = evaluator.evaluate(&datum);
        assert_eq!(first, second);
        assert_eq!(first, Ok(true));
    }

    #[test]
    fn suppressed_fields_are_invisible_to_expressions() {
        let shape = Shape::Record(vec![
            FieldShape::new("name", Shape::Scalar(ScalarType::Text)),
            FieldShape::new("secret", Shape::Scalar(ScalarType::Text)).with_tag("-"),
        ]);
        let fields = FieldConfigurations::for_shape(&shape).unwrap();

        assert!(matches!(
            Evaluator::new(Expr::eq("secret", "x"), fields),
            Err(ValidateError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn schema_rejects_unfilterable_top_levels() {
        assert_eq!(
            FieldConfigurations::for_type::<Vec<String>>(),
            Err(SchemaError::InvalidTopLevel { kind: "list" })
        );
    }
}
