use crate::{schema::FieldConfigurations, value::ScalarType};
use serde::{Deserialize, Serialize};

///
/// Shape
///
/// Structural description of a data shape, the input to schema derivation.
/// Shapes are usually produced by `#[derive(Filterable)]`, but can be built
/// by hand when the data is not backed by a host type.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Shape {
    Scalar(ScalarType),
    Record(Vec<FieldShape>),
    Map { key: Box<Self>, value: Box<Self> },
    List(Box<Self>),
    /// Indirection to another shape; stripped before kind inspection.
    Pointer(Box<Self>),
    /// Self-describing shape carrying its declared configuration.
    Evaluable(FieldConfigurations),
    /// Opaque shape; not filterable.
    Unsupported,
}

impl Shape {
    /// Follow pointer indirection to the underlying shape.
    #[must_use]
    pub fn target(&self) -> &Self {
        let mut shape = self;
        while let Self::Pointer(inner) = shape {
            shape = inner;
        }
        shape
    }

    /// Stable lowercase kind label used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(scalar) => scalar.label(),
            Self::Record(_) => "record",
            Self::Map { .. } => "map",
            Self::List(_) => "list",
            Self::Pointer(inner) => inner.kind_name(),
            Self::Evaluable(_) => "evaluable",
            Self::Unsupported => "unsupported",
        }
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.target(), Self::Scalar(ScalarType::Text))
    }
}

///
/// FieldShape
///
/// One named field of a record shape.
///
/// `tag` is the schema annotation: a comma-separated list of selectable
/// names, or `-` to suppress the field. Fields that are not public are
/// omitted from the schema unless a tag exposes them.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldShape {
    pub name: String,
    pub shape: Shape,
    pub tag: Option<String>,
    pub public: bool,
}

impl FieldShape {
    #[must_use]
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            tag: None,
            public: true,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Names under which this field is selectable, or `None` when the
    /// field is suppressed (tag `-`, or non-public with no tag).
    #[must_use]
    pub fn selectable_names(&self) -> Option<Vec<String>> {
        match self.tag.as_deref() {
            Some(tag) => {
                let names: Vec<String> = tag.split(',').map(str::to_string).collect();
                if names.first().map(String::as_str) == Some("-") {
                    None
                } else {
                    Some(names)
                }
            }
            None if self.public => Some(vec![self.name.clone()]),
            None => None,
        }
    }
}

///
/// TESTS
///
