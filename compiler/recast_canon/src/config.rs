//! Engine configuration.

use bitflags::bitflags;

/// Default bound on reduce/normalize rounds.
pub const MAX_ROUNDS: usize = 4;

/// Default shortest run of consecutive constants merged into a range.
pub const MIN_RANGE_RUN: usize = 3;

/// Default largest positional pattern synthesized.
pub const MAX_POSITIONAL_ARITY: usize = 32;

bitflags! {
    /// Enclosing constructs a pattern variable can be declared under.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BindingScope: u8 {
        /// Inside an `or` pattern or a `||` expression.
        const UNDER_OR = 1 << 0;
        /// Inside a `not` pattern or a `!` expression.
        const UNDER_NOT = 1 << 1;
    }
}

/// Where the target grammar allows pattern variables.
///
/// A binding declared inside any scope in `forbidden` is rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BindingPolicy {
    pub forbidden: BindingScope,
}

impl Default for BindingPolicy {
    fn default() -> Self {
        Self {
            forbidden: BindingScope::UNDER_OR | BindingScope::UNDER_NOT,
        }
    }
}

impl BindingPolicy {
    /// A policy that accepts bindings anywhere.
    pub const fn permissive() -> Self {
        Self {
            forbidden: BindingScope::empty(),
        }
    }

    /// Returns `true` if a binding may be declared under `scope`.
    pub const fn allows(self, scope: BindingScope) -> bool {
        !self.forbidden.intersects(scope)
    }
}

/// Configuration for one [`refactor`](crate::refactor) run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecastConfig {
    /// Upper bound on reduce/normalize rounds before the tree is accepted
    /// as canonical. Defaults to 4.
    pub max_rounds: usize,

    /// Shortest run of consecutive integral constants in an `or` that is
    /// merged into a `>= lo and <= hi` range. Defaults to 3.
    pub min_range_run: usize,

    /// Largest arity written as a positional pattern. Element tests on a
    /// longer tuple or indexer stay in the residual. Defaults to 32.
    pub max_positional_arity: usize,

    pub binding_policy: BindingPolicy,
}

impl Default for RecastConfig {
    fn default() -> Self {
        Self {
            max_rounds: MAX_ROUNDS,
            min_range_run: MIN_RANGE_RUN,
            max_positional_arity: MAX_POSITIONAL_ARITY,
            binding_policy: BindingPolicy::default(),
        }
    }
}

impl RecastConfig {
    /// Create a new config with the specified round bound.
    pub fn with_max_rounds(max_rounds: usize) -> Self {
        Self {
            max_rounds,
            ..Default::default()
        }
    }

    /// Create a new config with the specified range-merge threshold.
    pub fn with_min_range_run(min_range_run: usize) -> Self {
        Self {
            min_range_run,
            ..Default::default()
        }
    }

    /// Create a new config with the specified positional arity bound.
    pub fn with_max_positional_arity(max_positional_arity: usize) -> Self {
        Self {
            max_positional_arity,
            ..Default::default()
        }
    }

    /// Create a new config with the specified binding policy.
    pub fn with_binding_policy(binding_policy: BindingPolicy) -> Self {
        Self {
            binding_policy,
            ..Default::default()
        }
    }
}
