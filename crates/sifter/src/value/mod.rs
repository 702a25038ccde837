mod coerce;

use crate::traits::Evaluable;
use std::{collections::BTreeMap, sync::Arc};

// re-exports
pub use coerce::{CoercionError, ScalarType};

///
/// Value
///
/// Runtime representation of the data under evaluation.
///
/// One variant per primitive kind, plus the compound shapes the evaluator
/// can traverse. `Pointer` is transparent indirection: equality and
/// traversal look through it before inspecting the kind. `Evaluable`
/// carries a self-describing value that supplies its own match semantics.
///

#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint(u64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Text(String),
    /// Ordered collection of homogeneous elements.
    List(Vec<Self>),
    /// Keyed collection as entry pairs. Key order is not significant.
    Map(Vec<(Self, Self)>),
    /// Named fields, indexed by their physical names.
    Record(BTreeMap<String, Self>),
    /// Indirection to another value; stripped before kind dispatch.
    Pointer(Box<Self>),
    /// Self-describing value with its own configuration and matcher.
    Evaluable(Arc<dyn Evaluable>),
}

impl Value {
    /// Follow pointer indirection to the underlying value.
    #[must_use]
    pub fn target(&self) -> &Self {
        let mut value = self;
        while let Self::Pointer(inner) = value {
            value = inner;
        }
        value
    }

    /// Stable lowercase kind label used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => ScalarType::Bool.label(),
            Self::Int(_) => ScalarType::Int.label(),
            Self::Int8(_) => ScalarType::Int8.label(),
            Self::Int16(_) => ScalarType::Int16.label(),
            Self::Int32(_) => ScalarType::Int32.label(),
            Self::Int64(_) => ScalarType::Int64.label(),
            Self::Uint(_) => ScalarType::Uint.label(),
            Self::Uint8(_) => ScalarType::Uint8.label(),
            Self::Uint16(_) => ScalarType::Uint16.label(),
            Self::Uint32(_) => ScalarType::Uint32.label(),
            Self::Uint64(_) => ScalarType::Uint64.label(),
            Self::Float32(_) => ScalarType::Float32.label(),
            Self::Float64(_) => ScalarType::Float64.label(),
            Self::Text(_) => ScalarType::Text.label(),
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Pointer(inner) => inner.kind_name(),
            Self::Evaluable(_) => "evaluable",
        }
    }

    /// Returns the text content for text-kinded values, through pointers.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self.target() {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Emptiness is defined for text, lists, and maps only.
    #[must_use]
    pub fn is_empty(&self) -> Option<bool> {
        match self.target() {
            Self::Text(text) => Some(text.is_empty()),
            Self::List(items) => Some(items.is_empty()),
            Self::Map(entries) => Some(entries.is_empty()),
            _ => None,
        }
    }

    /// Look up a map entry by text key, through pointers on the key side.
    #[must_use]
    pub fn map_value(&self, key: &str) -> Option<&Self> {
        match self.target() {
            Self::Map(entries) => entries
                .iter()
                .find_map(|(k, v)| (k.as_text() == Some(key)).then_some(v)),
            _ => None,
        }
    }
}

// Equality is the native equality of the primitive kind. Two distinct
// kinds are never equal; pointers compare by their targets; evaluable
// values compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.target(), other.target()) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int8(a), Self::Int8(b)) => a == b,
            (Self::Int16(a), Self::Int16(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Uint8(a), Self::Uint8(b)) => a == b,
            (Self::Uint16(a), Self::Uint16(b)) => a == b,
            (Self::Uint32(a), Self::Uint32(b)) => a == b,
            (Self::Uint64(a), Self::Uint64(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            (Self::Evaluable(a), Self::Evaluable(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[macro_export]
macro_rules! impl_value_from {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_value_from! {
    bool   => Bool,
    i8     => Int8,
    i16    => Int16,
    i32    => Int32,
    i64    => Int64,
    u8     => Uint8,
    u16    => Uint16,
    u32    => Uint32,
    u64    => Uint64,
    f32    => Float32,
    f64    => Float64,
    &str   => Text,
    String => Text,
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(fields: BTreeMap<String, Self>) -> Self {
        Self::Record(fields)
    }
}

///
/// TESTS
///
