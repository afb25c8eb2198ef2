//! Constant values carried by `Constant` and `Relational` tests.
//!
//! Constants arrive already folded by the host. Floats are stored as `u64`
//! bits so every constant is `Eq + Hash` (structural node equality depends
//! on it). Integral constants keep their concrete kind: range merging only
//! ever compares values of the same kind.

use std::fmt;
use std::sync::Arc;

use crate::TypeId;

/// Concrete integral kind of an ordinal constant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegralKind {
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

/// A folded constant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstValue {
    Bool(bool),
    /// Integral or char value, widened to `i128` so `u64::MAX` and
    /// `i64::MIN` both fit.
    Integral {
        kind: IntegralKind,
        value: i128,
    },
    /// IEEE bits of an `f64`.
    Float(u64),
    Str(Arc<str>),
    /// Enum member by ordinal. Not merged into ranges: enum ordinals are
    /// not required to be dense.
    Enum {
        ty: TypeId,
        ordinal: i64,
    },
}

impl ConstValue {
    /// An `i32` constant, the common case in tests and examples.
    pub const fn int(value: i32) -> Self {
        ConstValue::Integral {
            kind: IntegralKind::I32,
            value: value as i128,
        }
    }

    /// A `char` constant.
    pub const fn char(value: char) -> Self {
        ConstValue::Integral {
            kind: IntegralKind::Char,
            value: value as i128,
        }
    }

    pub fn float(value: f64) -> Self {
        ConstValue::Float(value.to_bits())
    }

    pub fn str(value: &str) -> Self {
        ConstValue::Str(Arc::from(value))
    }

    /// Ordinal view used by range merging.
    ///
    /// Only integral and char constants are ordinal.
    pub const fn ordinal(&self) -> Option<(IntegralKind, i128)> {
        match *self {
            ConstValue::Integral { kind, value } => Some((kind, value)),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Integral {
                kind: IntegralKind::Char,
                value,
            } => match u32::try_from(*value).ok().and_then(char::from_u32) {
                Some(c) => write!(f, "{c:?}"),
                None => write!(f, "'\\u{{{value:x}}}'"),
            },
            ConstValue::Integral { value, .. } => write!(f, "{value}"),
            ConstValue::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            ConstValue::Str(s) => write!(f, "{s:?}"),
            ConstValue::Enum { ty, ordinal } => write!(f, "{ty}.#{ordinal}"),
        }
    }
}
