use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{BitAnd, BitOr, Not},
};

///
/// Expression AST
///
/// Pure representation of a boolean filter expression, as produced by a
/// surface parser or built through the constructors below. The AST carries
/// raw literal text; validation coerces the literals once and the result is
/// then immutable and freely shareable.
///

///
/// MatchOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum MatchOp {
    Eq,
    Ne,
    In,
    NotIn,
    IsEmpty,
    IsNotEmpty,
}

impl MatchOp {
    /// Whether the operator consumes a right-hand value.
    #[must_use]
    pub const fn takes_value(self) -> bool {
        match self {
            Self::Eq | Self::Ne | Self::In | Self::NotIn => true,
            Self::IsEmpty | Self::IsNotEmpty => false,
        }
    }

    /// Surface token of the operator.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::IsEmpty => "is empty",
            Self::IsNotEmpty => "is not empty",
        }
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

///
/// Selector
///
/// Ordered sequence of names identifying a nested field path.
/// Displays as the dotted surface form.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Selector(Vec<String>);

impl Selector {
    #[must_use]
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, depth: usize) -> Option<&str> {
        self.0.get(depth).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The first `depth` names, used when reporting where traversal failed.
    #[must_use]
    pub fn prefix(&self, depth: usize) -> Self {
        Self(self.0.iter().take(depth).cloned().collect())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for Selector {
    fn from(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Selector {
    fn from(parts: [S; N]) -> Self {
        Self::new(parts)
    }
}

///
/// MatchValue
///
/// Right-hand side of a match: the raw literal text, plus the typed value
/// produced by validation. `converted` is derived state and does not
/// travel on the wire.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchValue {
    pub raw: String,
    #[serde(skip)]
    pub converted: Option<Value>,
}

impl MatchValue {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            converted: None,
        }
    }
}

///
/// MatchExpr
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchExpr {
    pub selector: Selector,
    pub op: MatchOp,
    pub value: Option<MatchValue>,
}

impl MatchExpr {
    #[must_use]
    pub fn new(selector: impl Into<Selector>, op: MatchOp, raw: Option<String>) -> Self {
        Self {
            selector: selector.into(),
            op,
            value: raw.map(MatchValue::new),
        }
    }
}

///
/// Expr
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Expr {
    Not(Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Match(MatchExpr),
}

impl Expr {
    #[must_use]
    pub fn eq(selector: impl Into<Selector>, raw: impl Into<String>) -> Self {
        Self::Match(MatchExpr::new(selector, MatchOp::Eq, Some(raw.into())))
    }

    #[must_use]
    pub fn ne(selector: impl Into<Selector>, raw: impl Into<String>) -> Self {
        Self::Match(MatchExpr::new(selector, MatchOp::Ne, Some(raw.into())))
    }

    #[must_use]
    pub fn in_(selector: impl Into<Selector>, raw: impl Into<String>) -> Self {
        Self::Match(MatchExpr::new(selector, MatchOp::In, Some(raw.into())))
    }

    #[must_use]
    pub fn not_in(selector: impl Into<Selector>, raw: impl Into<String>) -> Self {
        Self::Match(MatchExpr::new(selector, MatchOp::NotIn, Some(raw.into())))
    }

    #[must_use]
    pub fn is_empty(selector: impl Into<Selector>) -> Self {
        Self::Match(MatchExpr::new(selector, MatchOp::IsEmpty, None))
    }

    #[must_use]
    pub fn is_not_empty(selector: impl Into<Selector>) -> Self {
        Self::Match(MatchExpr::new(selector, MatchOp::IsNotEmpty, None))
    }

    /// Combine two expressions; the left side evaluates first.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combine two expressions; the left side evaluates first.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Negate this expression.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

///
/// Bit Operations
/// allow us to do | & and ! on expressions
///

impl BitAnd for Expr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Expr {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for Expr {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

///
/// TESTS
///
