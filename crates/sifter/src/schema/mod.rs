use crate::{
    expr::MatchOp,
    shape::{FieldShape, Shape},
    traits::Filterable,
    value::ScalarType,
};
use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

/// Selectable name matching any key of a map shape.
pub const WILDCARD: &str = "*";

///
/// FieldConfiguration
///
/// How validation and evaluation treat one selector step: the physical
/// record field to read, the nested configurations below it, the coercion
/// applied to right-hand sides when it is the terminal step, and the
/// operators it admits.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldConfiguration {
    /// Physical record field name; `None` means the selectable name is
    /// already canonical.
    pub record_field: Option<String>,
    pub sub_fields: FieldConfigurations,
    pub coerce: Option<ScalarType>,
    pub ops: Vec<MatchOp>,
}

impl FieldConfiguration {
    #[must_use]
    pub fn supports(&self, op: MatchOp) -> bool {
        self.ops.contains(&op)
    }
}

///
/// FieldConfigurations
///
/// All valid selectable names at one level, with their configurations.
/// The wildcard name `*` stands for any key of a map shape.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldConfigurations(BTreeMap<String, FieldConfiguration>);

impl FieldConfigurations {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Derive the root configurations for a described data shape.
    ///
    /// The top level must be a record, a text-keyed map, or an evaluable
    /// shape; anything else is a `SchemaError`.
    pub fn for_shape(shape: &Shape) -> Result<Self, SchemaError> {
        match shape.target() {
            Shape::Evaluable(fields) => Ok(fields.clone()),
            Shape::Record(fields) => record_configurations(fields),
            Shape::Map { key, value } => {
                if !key.is_text() {
                    return Err(SchemaError::InvalidMapKeys {
                        kind: key.kind_name(),
                    });
                }

                let mut configs = Self::new();
                if let Some(config) = shape_configuration(value)? {
                    configs.insert(WILDCARD.to_string(), config);
                }

                Ok(configs)
            }
            other => Err(SchemaError::InvalidTopLevel {
                kind: other.kind_name(),
            }),
        }
    }

    /// Derive the root configurations from a host type.
    pub fn for_type<T: Filterable>() -> Result<Self, SchemaError> {
        Self::for_shape(&T::shape())
    }
}

impl FromIterator<(String, FieldConfiguration)> for FieldConfigurations {
    fn from_iter<I: IntoIterator<Item = (String, FieldConfiguration)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

///
/// SchemaError
///
/// Schema derivation rejected the described shape.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("invalid top-level shape {kind}; expected a record, a text-keyed map, or an evaluable")]
    InvalidTopLevel { kind: &'static str },

    #[error("cannot derive configurations for maps keyed by {kind}")]
    InvalidMapKeys { kind: &'static str },

    #[error("selectable name '{name}' is bound more than once in one record")]
    DuplicateName { name: String },
}

// Derive the configuration for one nested shape. `None` means the shape is
// not filterable and contributes nothing to the schema.
fn shape_configuration(shape: &Shape) -> Result<Option<FieldConfiguration>, SchemaError> {
    match shape {
        Shape::Pointer(inner) => shape_configuration(inner),
        Shape::Evaluable(fields) => Ok(Some(FieldConfiguration {
            sub_fields: fields.clone(),
            ..FieldConfiguration::default()
        })),
        Shape::Scalar(scalar) => Ok(Some(FieldConfiguration {
            coerce: Some(*scalar),
            ops: vec![MatchOp::Eq, MatchOp::Ne],
            ..FieldConfiguration::default()
        })),
        Shape::Map { key, value } => map_configuration(key, value).map(Some),
        Shape::List(element) => list_configuration(element).map(Some),
        Shape::Record(fields) => Ok(Some(FieldConfiguration {
            sub_fields: record_configurations(fields)?,
            ..FieldConfiguration::default()
        })),
        Shape::Unsupported => Ok(None),
    }
}

fn map_configuration(key: &Shape, value: &Shape) -> Result<FieldConfiguration, SchemaError> {
    if !key.is_text() {
        // Without text keys there is nothing to index by; only emptiness
        // checks remain.
        return Ok(FieldConfiguration {
            ops: vec![MatchOp::IsEmpty, MatchOp::IsNotEmpty],
            ..FieldConfiguration::default()
        });
    }

    let mut config = FieldConfiguration {
        coerce: Some(ScalarType::Text),
        ops: vec![
            MatchOp::IsEmpty,
            MatchOp::IsNotEmpty,
            MatchOp::In,
            MatchOp::NotIn,
        ],
        ..FieldConfiguration::default()
    };

    if let Some(sub) = shape_configuration(value)? {
        config.sub_fields.insert(WILDCARD.to_string(), sub);
    }

    Ok(config)
}

fn list_configuration(element: &Shape) -> Result<FieldConfiguration, SchemaError> {
    if let Shape::Scalar(scalar) = element.target() {
        // Lists of primitives support membership against their elements.
        return Ok(FieldConfiguration {
            coerce: Some(*scalar),
            ops: vec![
                MatchOp::In,
                MatchOp::NotIn,
                MatchOp::IsEmpty,
                MatchOp::IsNotEmpty,
            ],
            ..FieldConfiguration::default()
        });
    }

    let mut config = FieldConfiguration {
        ops: vec![MatchOp::IsEmpty, MatchOp::IsNotEmpty],
        ..FieldConfiguration::default()
    };

    // Selectors descend through the list existentially, so the element's
    // sub-fields surface directly at the list step.
    if let Some(sub) = shape_configuration(element)? {
        if !sub.sub_fields.is_empty() {
            config.sub_fields = sub.sub_fields;
        }
    }

    Ok(config)
}

fn record_configurations(fields: &[FieldShape]) -> Result<FieldConfigurations, SchemaError> {
    let mut configs = FieldConfigurations::new();

    for field in fields {
        let Some(names) = field.selectable_names() else {
            continue;
        };
        let Some(mut config) = shape_configuration(&field.shape)? else {
            // Unsupported shapes are simply not filterable.
            continue;
        };
        config.record_field = Some(field.name.clone());

        for name in names {
            if configs.contains_key(&name) {
                return Err(SchemaError::DuplicateName { name });
            }
            configs.insert(name, config.clone());
        }
    }

    Ok(configs)
}

///
/// TESTS
///
