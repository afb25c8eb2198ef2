//! Opaque host identities.
//!
//! The engine never resolves symbols, types or expressions itself. The host's
//! front end binds the source and hands us compact, comparable IDs; equality
//! of two IDs is the only question the engine ever asks of them.
//!
//! # Trait Surface
//! All IDs are Copy, Eq, Ord and Hash, so they key maps and sort runs
//! without any help from the host.

/// Defines a `u32` newtype ID.
///
/// Each generated type has:
/// - `new()` / `raw()` conversions
/// - `Debug` showing `TypeName(raw)`
/// - `Display` showing `prefix` followed by the raw value
macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident => $prefix:literal),* $(,)?) => { $(
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    )* };
}

define_id!(
    /// A named entity: local, parameter, field, property or pattern variable.
    ///
    /// Members and variables share one namespace; the host guarantees that
    /// distinct entities get distinct symbols.
    Symbol => "s",
    /// A type, as far as type tests and conversions are concerned.
    TypeId => "T",
    /// A source expression node. Opaque operations are kept by this ID.
    ExprId => "e",
    /// A deconstruct method (`Deconstruct(out a, out b)` style).
    MethodId => "m",
);
