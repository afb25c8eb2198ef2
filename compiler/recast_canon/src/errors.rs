//! Rejections and synthesis errors.
//!
//! Every outcome short of a refactoring is a value, not a panic. The host
//! shows all [`Rejection`]s the same way ("nothing to offer"); the variants
//! exist for logging and tests. [`SynthError::Invariant`] is the one that
//! indicates a bug.

use recast_ir::Symbol;

/// Why the synthesizer could not render a tree.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SynthError {
    /// A shape with no pattern syntax, in a position where it cannot be
    /// split off into a residual.
    #[error("unrepresentable: {reason}")]
    Unrepresentable { reason: String },

    /// A shape a canonical tree never contains.
    #[error("internal invariant violated: {reason}")]
    Invariant { reason: String },
}

impl SynthError {
    pub(crate) fn unrepresentable(reason: impl Into<String>) -> Self {
        SynthError::Unrepresentable {
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::error!(%reason, "SYNTHESIS INVARIANT BUG");
        SynthError::Invariant { reason }
    }

    /// Returns `true` for errors that indicate a bug rather than an
    /// unsupported input.
    pub fn is_bug(&self) -> bool {
        matches!(self, SynthError::Invariant { .. })
    }
}

/// Why no refactoring is offered.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Some sub-expression has no safe translation (a side-effecting
    /// operand, for instance).
    #[error("expression cannot be analyzed")]
    Unanalyzable,

    /// The expression is already in canonical form.
    #[error("expression is already canonical")]
    NoChange,

    /// Nothing structural was found; the whole expression is opaque.
    #[error("expression has no structural tests")]
    OpaqueOnly,

    /// The result would declare a pattern variable where the target
    /// grammar does not allow one.
    #[error("binding {symbol} would be declared in an illegal position")]
    IllegalBinding { symbol: Symbol },

    #[error(transparent)]
    Unrepresentable(#[from] SynthError),
}
