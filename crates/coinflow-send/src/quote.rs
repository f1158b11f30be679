//! Tri-state values for asynchronously delivered external data.

use serde::{Deserialize, Serialize};

/// An external value that may not have arrived yet, or may not exist.
///
/// `Pending` and `Unavailable` are distinct: a pending exchange rate keeps
/// the send flow alive with a disabled button, an unavailable one ends it
/// when amounts are entered in fiat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Quote<T> {
    /// The provider has no value.
    Unavailable,
    /// Requested, not delivered yet.
    #[default]
    Pending,
    Value(T),
}

impl<T> Quote<T> {
    /// `Value` for `Some`, `Unavailable` for `None`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::Unavailable,
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Quote<&T> {
        match self {
            Self::Unavailable => Quote::Unavailable,
            Self::Pending => Quote::Pending,
            Self::Value(v) => Quote::Value(v),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Quote<U> {
        match self {
            Self::Unavailable => Quote::Unavailable,
            Self::Pending => Quote::Pending,
            Self::Value(v) => Quote::Value(f(v)),
        }
    }

    /// Combine two quotes. `Unavailable` dominates `Pending`.
    pub fn zip<U>(self, other: Quote<U>) -> Quote<(T, U)> {
        match (self, other) {
            (Self::Value(a), Quote::Value(b)) => Quote::Value((a, b)),
            (Self::Unavailable, _) | (_, Quote::Unavailable) => Quote::Unavailable,
            _ => Quote::Pending,
        }
    }
}

impl<T> From<Option<T>> for Quote<T> {
    fn from(value: Option<T>) -> Self {
        Self::from_option(value)
    }
}
