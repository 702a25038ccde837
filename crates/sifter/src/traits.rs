use crate::{
    expr::{EvalError, MatchOp},
    schema::FieldConfigurations,
    shape::Shape,
    value::{ScalarType, Value},
};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    rc::Rc,
    sync::Arc,
};

///
/// Filterable
///
/// A host type that can describe its own shape and lower instances into
/// the runtime value model. Implementations for structs are normally
/// generated by `#[derive(Filterable)]`.
///
/// `Option<T>` is deliberately not filterable: the value model has no nil,
/// so optionals are normalized at ingestion (drop absent map entries, or
/// supply a concrete default).
///

pub trait Filterable {
    /// Structural description of this type, consumed by schema derivation.
    fn shape() -> Shape;

    /// Lower one instance into the runtime value model.
    fn to_value(&self) -> Value;
}

///
/// Evaluable
///
/// A self-describing value: it supplies its own field configurations and
/// its own match semantics, and generic traversal delegates to it instead
/// of recursing. This lets domain types expose virtual fields and
/// implement operators directly.
///

pub trait Evaluable: fmt::Debug + Send + Sync {
    /// The selectors and operators this value supports.
    fn field_configurations(&self) -> FieldConfigurations;

    /// Apply `op` at the end of `selector`, with the prepared right-hand
    /// value when the operator consumes one.
    fn evaluate_match(
        &self,
        selector: &[String],
        op: MatchOp,
        value: Option<&Value>,
    ) -> Result<bool, EvalError>;
}

// Scalars whose Value variant holds the host type directly.
macro_rules! impl_filterable_scalar {
    ( $( $type:ty => $scalar:ident ),* $(,)? ) => {
        $(
            impl Filterable for $type {
                fn shape() -> Shape {
                    Shape::Scalar(ScalarType::$scalar)
                }

                fn to_value(&self) -> Value {
                    Value::$scalar(*self)
                }
            }
        )*
    };
}

impl_filterable_scalar! {
    bool => Bool,
    i8   => Int8,
    i16  => Int16,
    i32  => Int32,
    i64  => Int64,
    u8   => Uint8,
    u16  => Uint16,
    u32  => Uint32,
    u64  => Uint64,
    f32  => Float32,
    f64  => Float64,
}

// Machine-width integers carry their own kind, widened for storage.
impl Filterable for isize {
    fn shape() -> Shape {
        Shape::Scalar(ScalarType::Int)
    }

    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }
}

impl Filterable for usize {
    fn shape() -> Shape {
        Shape::Scalar(ScalarType::Uint)
    }

    fn to_value(&self) -> Value {
        Value::Uint(*self as u64)
    }
}

impl Filterable for String {
    fn shape() -> Shape {
        Shape::Scalar(ScalarType::Text)
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl Filterable for str {
    fn shape() -> Shape {
        Shape::Scalar(ScalarType::Text)
    }

    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl<T: Filterable> Filterable for Vec<T> {
    fn shape() -> Shape {
        Shape::List(Box::new(T::shape()))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Filterable::to_value).collect())
    }
}

impl<K: Filterable, V: Filterable> Filterable for BTreeMap<K, V> {
    fn shape() -> Shape {
        Shape::Map {
            key: Box::new(K::shape()),
            value: Box::new(V::shape()),
        }
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(key, value)| (key.to_value(), value.to_value()))
                .collect(),
        )
    }
}

impl<K: Filterable, V: Filterable> Filterable for HashMap<K, V> {
    fn shape() -> Shape {
        Shape::Map {
            key: Box::new(K::shape()),
            value: Box::new(V::shape()),
        }
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(key, value)| (key.to_value(), value.to_value()))
                .collect(),
        )
    }
}

// Pointer-like containers are transparent indirection; schema derivation
// and evaluation strip them before inspecting the kind.
macro_rules! impl_filterable_pointer {
    ( $( $type:ident ),* $(,)? ) => {
        $(
            impl<T: Filterable + ?Sized> Filterable for $type<T> {
                fn shape() -> Shape {
                    Shape::Pointer(Box::new(T::shape()))
                }

                fn to_value(&self) -> Value {
                    Value::Pointer(Box::new((**self).to_value()))
                }
            }
        )*
    };
}

impl_filterable_pointer!(Box, Rc, Arc);

impl<T: Filterable + ?Sized> Filterable for &T {
    fn shape() -> Shape {
        Shape::Pointer(Box::new(T::shape()))
    }

    fn to_value(&self) -> Value {
        Value::Pointer(Box::new((**self).to_value()))
    }
}

///
/// TESTS
///
